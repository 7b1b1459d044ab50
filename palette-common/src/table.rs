//! The palette table, the one file that passes from the extractor to the analysis.
//!
//! Two encodings are supported, picked by file extension. `.ron` is the structured one,
//! with the clusters of a frame nested in its record and a version number up front.
//! `.csv` is the flat layout older tables were written in, one `cor_N_rgb` and
//! `proporcao_cor_N` column pair per color slot.

pub mod legacy_csv;

use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::{episode::EpisodeId, model::FrameColorRecord};

pub const TABLE_VERSION: u32 = 1;

#[derive(thiserror::Error, Debug)]
pub enum TableError {
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error("ron: {0}")]
    RonRead(#[from] ron::error::SpannedError),
    #[error("ron: {0}")]
    RonWrite(#[from] ron::Error),
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("unsupported table version {0}, only {TABLE_VERSION} is known")]
    UnsupportedVersion(u32),
    #[error("unknown table format for {0:?}, expected a .csv or .ron file")]
    UnknownFormat(PathBuf),
    #[error("missing column {0:?}")]
    MissingColumn(&'static str),
    #[error("line {line}: {reason}")]
    BadRow { line: u64, reason: String },
    #[error("frame {frame:?} has {got} colors but the table holds at most {max}")]
    TooManyColors {
        frame: String,
        got: usize,
        max: usize,
    },
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum LookupError {
    #[error("no frame named {0:?} in the table")]
    NotFound(String),
    #[error("frame {frame:?} is in several episodes, pick one of: {}", list(.episodes))]
    Ambiguous {
        frame: String,
        episodes: Vec<EpisodeId>,
    },
}

fn list(episodes: &[EpisodeId]) -> String {
    episodes
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Ron,
}

impl TableFormat {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TableError> {
        let path = path.as_ref();
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("csv") => Ok(Self::Csv),
            Some("ron") => Ok(Self::Ron),
            _ => Err(TableError::UnknownFormat(path.to_owned())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PaletteTable {
    pub version: u32,
    /// How many color slots each record has room for
    pub max_colors: usize,
    pub records: Vec<FrameColorRecord>,
}

impl PaletteTable {
    pub fn new(max_colors: usize) -> Self {
        Self {
            version: TABLE_VERSION,
            max_colors,
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, record: FrameColorRecord) -> Result<(), TableError> {
        if record.clusters.len() > self.max_colors {
            return Err(TableError::TooManyColors {
                frame: record.frame_name,
                got: record.clusters.len(),
                max: self.max_colors,
            });
        }
        self.records.push(record);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The record of frame `frame_name`. Frame names repeat across episodes, so without
    /// `episode` the name must be unique in the table.
    pub fn find_frame(
        &self,
        frame_name: &str,
        episode: Option<EpisodeId>,
    ) -> Result<&FrameColorRecord, LookupError> {
        let mut found = self.records.iter().filter(|r| {
            r.frame_name == frame_name && episode.map_or(true, |e| r.episode == e)
        });
        let first = found
            .next()
            .ok_or_else(|| LookupError::NotFound(frame_name.to_string()))?;
        if episode.is_none() {
            let mut episodes: Vec<_> = found.map(|r| r.episode).collect();
            if !episodes.is_empty() {
                episodes.insert(0, first.episode);
                episodes.sort();
                episodes.dedup();
                return Err(LookupError::Ambiguous {
                    frame: frame_name.to_string(),
                    episodes,
                });
            }
        }
        Ok(first)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), TableError> {
        let path = path.as_ref();
        let format = TableFormat::from_path(path)?;
        let mut writer = BufWriter::new(File::create(path)?);
        match format {
            TableFormat::Csv => legacy_csv::write(self, &mut writer)?,
            TableFormat::Ron => self.write_ron(&mut writer)?,
        }
        writer.flush()?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, TableError> {
        let path = path.as_ref();
        let format = TableFormat::from_path(path)?;
        let reader = BufReader::new(File::open(path)?);
        match format {
            TableFormat::Csv => legacy_csv::read(reader),
            TableFormat::Ron => Self::read_ron(reader),
        }
    }

    pub fn write_ron(&self, writer: impl io::Write) -> Result<(), TableError> {
        let conf = ron::ser::PrettyConfig::new().struct_names(true);
        ron::ser::to_writer_pretty(writer, self, conf)?;
        Ok(())
    }

    pub fn read_ron(reader: impl io::Read) -> Result<Self, TableError> {
        let table: Self = ron::de::from_reader(reader)?;
        if table.version != TABLE_VERSION {
            return Err(TableError::UnsupportedVersion(table.version));
        }
        if let Some(record) = table
            .records
            .iter()
            .find(|record| record.clusters.len() > table.max_colors)
        {
            return Err(TableError::TooManyColors {
                frame: record.frame_name.clone(),
                got: record.clusters.len(),
                max: table.max_colors,
            });
        }
        Ok(table)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        episode::EpisodeId,
        model::{ColorCluster, Rgb},
    };

    pub(super) fn sample_table() -> PaletteTable {
        let mut table = PaletteTable::new(3);
        table
            .push(FrameColorRecord {
                episode: EpisodeId::new(1, 2),
                frame_name: "frame_000000.png".to_string(),
                clusters: vec![
                    ColorCluster {
                        rgb: Rgb::new(255, 0, 0),
                        proportion: 5.0 / 9.0,
                    },
                    ColorCluster {
                        rgb: Rgb::new(0, 0, 255),
                        proportion: 4.0 / 9.0,
                    },
                ],
            })
            .unwrap();
        table
            .push(FrameColorRecord {
                episode: EpisodeId::new(1, 3),
                frame_name: "frame_000001.png".to_string(),
                clusters: vec![],
            })
            .unwrap();
        table
    }

    #[test]
    fn find_frame_by_episode() {
        let mut table = sample_table();
        let mut other = table.records[0].clone();
        other.episode = EpisodeId::new(3, 5);
        other.clusters.truncate(1);
        table.push(other).unwrap();

        assert_eq!(
            Err(LookupError::Ambiguous {
                frame: "frame_000000.png".to_string(),
                episodes: vec![EpisodeId::new(1, 2), EpisodeId::new(3, 5)],
            }),
            table.find_frame("frame_000000.png", None)
        );

        let found = table
            .find_frame("frame_000000.png", Some(EpisodeId::new(3, 5)))
            .unwrap();
        assert_eq!(EpisodeId::new(3, 5), found.episode);
        assert_eq!(1, found.clusters.len());

        let found = table
            .find_frame("frame_000000.png", Some(EpisodeId::new(1, 2)))
            .unwrap();
        assert_eq!(2, found.clusters.len());

        assert_eq!(
            EpisodeId::new(1, 3),
            table.find_frame("frame_000001.png", None).unwrap().episode
        );
        assert!(matches!(
            table.find_frame("frame_000001.png", Some(EpisodeId::new(1, 2))),
            Err(LookupError::NotFound(_))
        ));
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(TableFormat::Csv, TableFormat::from_path("a/b.CSV").unwrap());
        assert_eq!(TableFormat::Ron, TableFormat::from_path("b.ron").unwrap());
        assert!(matches!(
            TableFormat::from_path("b.json"),
            Err(TableError::UnknownFormat(_))
        ));
        assert!(TableFormat::from_path("noext").is_err());
    }

    #[test]
    fn push_rejects_too_many() {
        let mut table = PaletteTable::new(1);
        let record = FrameColorRecord {
            episode: EpisodeId::new(1, 1),
            frame_name: "f".to_string(),
            clusters: vec![
                ColorCluster {
                    rgb: Rgb::new(0, 0, 0),
                    proportion: 0.5,
                };
                2
            ],
        };
        assert!(matches!(
            table.push(record),
            Err(TableError::TooManyColors { got: 2, max: 1, .. })
        ));
        assert!(table.is_empty());
    }

    #[test]
    fn ron_keeps_nesting() {
        let table = sample_table();
        let mut buf = Vec::new();
        table.write_ron(&mut buf).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.contains("PaletteTable"));

        let back = PaletteTable::read_ron(buf.as_slice()).unwrap();
        assert_eq!(table.records.len(), back.records.len());
        assert_eq!(table.records[1], back.records[1]);
        let first = &back.records[0];
        assert_eq!(Rgb::new(0, 0, 255), first.clusters[1].rgb);
        assert!((first.proportion_sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn ron_rejects_other_versions() {
        let mut table = sample_table();
        table.version = 7;
        let mut buf = Vec::new();
        table.write_ron(&mut buf).unwrap();
        assert!(matches!(
            PaletteTable::read_ron(buf.as_slice()),
            Err(TableError::UnsupportedVersion(7))
        ));
    }

    #[test]
    fn save_and_load_both_formats() {
        let tmp = tempfile::tempdir().unwrap();
        let table = sample_table();
        for name in ["table.ron", "table.csv"] {
            let path = tmp.path().join(name);
            table.save(&path).unwrap();
            let back = PaletteTable::load(&path).unwrap();
            assert_eq!(table.max_colors, back.max_colors);
            assert_eq!(table.records.len(), back.records.len());
            assert_eq!(table.records[0].clusters.len(), back.records[0].clusters.len());
            assert!(back.records[1].clusters.is_empty());
        }
    }
}
