use std::{
    io,
    path::{Path, PathBuf},
};

use palette_common::{
    bin_common::termination::StopSignal,
    episode::{EpisodeId, EpisodeMatcher},
    utils::fsutils,
};

use crate::{
    frame_extractor::{ContextLogger, FrameExtractor},
    sampler::{self, DirSink, SampleArgs, SampleError, SampleReport},
};

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv"];

/// Video files directly in `dir`, sorted by name.
pub fn find_videos(dir: impl AsRef<Path>) -> io::Result<Vec<PathBuf>> {
    fsutils::files_with_extension(dir, VIDEO_EXTENSIONS)
}

/// Samples one video into `out_dir`. The video is opened before the directory is touched,
/// so a broken video leaves existing frames alone.
pub fn sample_video(
    video: &Path,
    out_dir: &Path,
    args: &SampleArgs,
) -> Result<SampleReport, SampleError> {
    let mut extractor = FrameExtractor::new_with_logger(video, ContextLogger::new(video))?;
    log::debug!("Opened {:?}", extractor);
    let (mut sink, first_index) = DirSink::prepare(out_dir, *args.policy(), *args.format())?;
    sampler::sample(&mut extractor, &mut sink, args, first_index)
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub sampled: Vec<(EpisodeId, SampleReport)>,
    /// Names that don't look like an episode of the series.
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, SampleError)>,
    /// Interrupted before all videos were done.
    pub stopped: bool,
}

/// Samples every video whose name `matcher` recognizes into `<out_root>/sNN/eNN`. A video
/// that fails is recorded and the rest are still sampled.
pub fn sample_all(
    videos: &[PathBuf],
    matcher: &EpisodeMatcher,
    out_root: &Path,
    args: &SampleArgs,
    stop: &StopSignal,
) -> BatchReport {
    let mut report = BatchReport::default();

    for (i, video) in videos.iter().enumerate() {
        if stop.should_stop() {
            log::warn!("Stopping early, {} videos left", videos.len() - i);
            report.stopped = true;
            break;
        }

        let Some(episode) = matcher.parse_path(video) else {
            log::warn!("Not an episode, skipping: {}", video.display());
            report.skipped.push(video.clone());
            continue;
        };

        log::info!(
            "({}/{}) Sampling {} from {}",
            i + 1,
            videos.len(),
            episode,
            video.display()
        );
        match sample_video(video, &episode.dir_in(out_root), args) {
            Ok(sampled) => report.sampled.push((episode, sampled)),
            Err(e) => {
                log::error!("Failed to sample {}: {}", video.display(), e);
                report.failed.push((video.clone(), e));
            }
        }
    }

    report
}
