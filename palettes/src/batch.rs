use std::{
    io,
    path::{Path, PathBuf},
    time::Duration,
};

use palette_common::{
    bin_common::termination::StopSignal,
    episode::EpisodeId,
    model::FrameColorRecord,
    table::{PaletteTable, TableError},
    utils::{fsutils, time::Every},
};

use crate::dominant::{ExtractError, PaletteArgs, FRAME_EXTENSIONS};

#[derive(thiserror::Error, Debug)]
pub enum BatchError {
    #[error("failed to list {path:?}: {source}")]
    List {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Table(#[from] TableError),
}

/// Where the frames of each episode are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeDir {
    pub episode: EpisodeId,
    pub dir: PathBuf,
}

/// The `<root>/<season>/<episode>` directories, sorted. Directories whose names aren't
/// season or episode labels are skipped.
pub fn episode_dirs(root: &Path) -> Result<Vec<EpisodeDir>, BatchError> {
    let list = |path: &Path| {
        fsutils::sub_dirs(path).map_err(|source| BatchError::List {
            path: path.to_owned(),
            source,
        })
    };

    let mut found = Vec::new();
    for season_dir in list(root)? {
        let season = file_name(&season_dir);
        for episode_dir in list(&season_dir)? {
            match EpisodeId::from_labels(&season, &file_name(&episode_dir)) {
                Ok(episode) => found.push(EpisodeDir {
                    episode,
                    dir: episode_dir,
                }),
                Err(e) => log::warn!("Skipping {}: {}", episode_dir.display(), e),
            }
        }
    }
    Ok(found)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[derive(Debug, Default)]
pub struct BatchReport {
    /// Frames that could not be read, they have no record.
    pub failed: Vec<ExtractError>,
    /// Interrupted before all frames were done.
    pub stopped: bool,
}

/// Extracts the palettes of all frames in `dirs`, one record per readable frame.
pub fn extract_all(
    dirs: &[EpisodeDir],
    args: &PaletteArgs,
    stop: &StopSignal,
) -> Result<(PaletteTable, BatchReport), BatchError> {
    let mut table = PaletteTable::new(usize::from(args.colors().get()));
    let mut report = BatchReport::default();

    'dirs: for EpisodeDir { episode, dir } in dirs {
        let frames = fsutils::files_with_extension(dir, FRAME_EXTENSIONS).map_err(
            |source| BatchError::List {
                path: dir.clone(),
                source,
            },
        )?;
        log::info!("Extracting {} frames of {}", frames.len(), episode);

        let mut progress = Every::new(Duration::from_secs(10));
        for (i, frame) in frames.iter().enumerate() {
            if stop.should_stop() {
                log::warn!("Stopping early, at {}", frame.display());
                report.stopped = true;
                break 'dirs;
            }

            match args.extract_file(frame) {
                Ok(clusters) => table.push(FrameColorRecord {
                    episode: *episode,
                    frame_name: file_name(frame),
                    clusters,
                })?,
                Err(e) => {
                    log::error!("Skipping a frame of {}: {}", episode, e);
                    report.failed.push(e);
                }
            }

            progress.perform(|| {
                log::info!("{}: {}/{} frames", episode, i + 1, frames.len());
            });
        }
    }

    Ok((table, report))
}

#[cfg(test)]
mod test {
    use super::*;
    use image::RgbImage;

    fn frame(path: PathBuf, color: [u8; 3]) {
        RgbImage::from_pixel(4, 4, image::Rgb(color))
            .save(path)
            .unwrap();
    }

    #[test]
    fn walks_the_frame_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        for dir in ["supernatural.s03/e02", "s03/e01", "s01/e10", "s01/extras"] {
            std::fs::create_dir_all(root.join(dir)).unwrap();
        }

        let found: Vec<_> = episode_dirs(root)
            .unwrap()
            .into_iter()
            .map(|d| d.episode.to_string())
            .collect();
        assert_eq!(vec!["s01e10", "s03e01", "s03e02"], found);
    }

    #[test]
    fn bad_frames_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("s01").join("e01");
        std::fs::create_dir_all(&dir).unwrap();
        frame(dir.join("frame_000000.png"), [255, 0, 0]);
        std::fs::write(dir.join("frame_000001.png"), b"garbage").unwrap();
        frame(dir.join("frame_000002.jpg"), [0, 0, 0]);
        std::fs::write(dir.join("notes.txt"), b"").unwrap();

        let dirs = episode_dirs(tmp.path()).unwrap();
        let (table, report) =
            extract_all(&dirs, &PaletteArgs::default(), &StopSignal::detached()).unwrap();

        assert_eq!(5, table.max_colors);
        assert_eq!(
            vec!["frame_000000.png", "frame_000002.jpg"],
            table
                .records
                .iter()
                .map(|r| r.frame_name.as_str())
                .collect::<Vec<_>>()
        );
        assert_eq!(EpisodeId::new(1, 1), table.records[0].episode);
        assert_eq!(1, table.records[0].clusters.len());
        assert_eq!(1, report.failed.len());
        assert!(!report.stopped);
    }

    #[test]
    fn stops_when_asked() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("s01").join("e01");
        std::fs::create_dir_all(&dir).unwrap();
        frame(dir.join("frame_000000.png"), [255, 0, 0]);

        let stop = StopSignal::detached();
        stop.raise();
        let (table, report) =
            extract_all(&episode_dirs(tmp.path()).unwrap(), &PaletteArgs::default(), &stop)
                .unwrap();
        assert!(table.is_empty());
        assert!(report.stopped);
    }
}
