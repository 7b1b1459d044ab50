use std::io;

use super::{PaletteTable, TableError};
use crate::{
    episode::EpisodeId,
    model::{ColorCluster, FrameColorRecord, Rgb},
};

const SEASON: [&str; 2] = ["season", "temporada"];
const EPISODE: [&str; 2] = ["episode", "episodio"];
const FRAME_NAME: [&str; 2] = ["frame_name", "nome_frame"];

fn rgb_column(slot: usize) -> String {
    format!("cor_{slot}_rgb")
}

fn proportion_column(slot: usize) -> String {
    format!("proporcao_cor_{slot}")
}

pub fn headers(max_colors: usize) -> Vec<String> {
    let mut headers: Vec<String> =
        vec![SEASON[0].into(), EPISODE[0].into(), FRAME_NAME[0].into()];
    for slot in 1..=max_colors {
        headers.push(rgb_column(slot));
        headers.push(proportion_column(slot));
    }
    headers
}

/// One row per record, `max_colors` slot pairs per row, unused slots left empty.
pub fn write(table: &PaletteTable, writer: impl io::Write) -> Result<(), TableError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(headers(table.max_colors))?;

    for record in &table.records {
        let mut row = vec![
            record.episode.season_label(),
            record.episode.episode_label(),
            record.frame_name.clone(),
        ];
        for slot in 0..table.max_colors {
            match record.clusters.get(slot) {
                Some(cluster) => {
                    row.push(cluster.rgb.to_string());
                    row.push(cluster.proportion.to_string());
                }
                None => {
                    row.push(String::new());
                    row.push(String::new());
                }
            }
        }
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

struct Columns {
    season: usize,
    episode: usize,
    frame_name: usize,
    /// (rgb, proportion) per slot
    slots: Vec<(usize, usize)>,
}

impl Columns {
    fn find(headers: &csv::StringRecord) -> Result<Self, TableError> {
        let position = |name: &str| headers.iter().position(|h| h.trim() == name);
        let any_of = |names: [&'static str; 2]| {
            names
                .iter()
                .find_map(|name| position(name))
                .ok_or(TableError::MissingColumn(names[0]))
        };

        let mut slots = Vec::new();
        for slot in 1.. {
            let (Some(rgb), Some(prop)) = (
                position(&rgb_column(slot)),
                position(&proportion_column(slot)),
            ) else {
                break;
            };
            slots.push((rgb, prop));
        }

        Ok(Self {
            season: any_of(SEASON)?,
            episode: any_of(EPISODE)?,
            frame_name: any_of(FRAME_NAME)?,
            slots,
        })
    }
}

/// Reads both tables written by [`write`] and older ones whose
/// identity columns are named in Portuguese. The number of slots is taken from the
/// headers.
pub fn read(reader: impl io::Read) -> Result<PaletteTable, TableError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let columns = Columns::find(rdr.headers()?)?;
    let mut table = PaletteTable::new(columns.slots.len());

    for row in rdr.records() {
        let row = row?;
        let line = row.position().map(|pos| pos.line()).unwrap_or(0);
        let bad = |reason: String| TableError::BadRow { line, reason };
        let cell = |idx: usize| row.get(idx).unwrap_or("").trim();

        let episode = EpisodeId::from_labels(cell(columns.season), cell(columns.episode))
            .map_err(|e| bad(e.to_string()))?;

        let mut clusters = Vec::with_capacity(columns.slots.len());
        for &(rgb_idx, prop_idx) in &columns.slots {
            let rgb = cell(rgb_idx);
            if rgb.is_empty() {
                continue;
            }
            let rgb = rgb.parse::<Rgb>().map_err(|e| bad(e.to_string()))?;
            let proportion: f64 = cell(prop_idx)
                .parse()
                .map_err(|_| bad(format!("bad proportion {:?}", cell(prop_idx))))?;
            clusters.push(ColorCluster { rgb, proportion });
        }

        table.push(FrameColorRecord {
            episode,
            frame_name: cell(columns.frame_name).to_string(),
            clusters,
        })?;
    }

    Ok(table)
}
