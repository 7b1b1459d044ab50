use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{self, Context};
use framesampler::{
    batch::{find_videos, sample_all},
    sampler::SampleCli,
};
use palette_common::{
    bin_common::{
        init::{init_eyre, init_logger, verbosity_to_level},
        termination::StopSignal,
    },
    episode::EpisodeMatcher,
};

#[derive(Parser, Debug)]
#[command()]
/// Samples frames at a fixed interval out of every episode in a directory.
///
/// Frames end up in `<out>/sNN/eNN/frame_NNNNNN.<format>`.
struct Cli {
    #[command(flatten)]
    sample_args: SampleCli,

    /// Directory with the video files
    #[arg(long)]
    videos: PathBuf,

    /// Root of the frame directories
    #[arg(long)]
    out: PathBuf,

    /// Series name that file names start with, like `Supernatural.S03E05.mkv`
    #[arg(long, default_value = "Supernatural")]
    series: String,

    /// Also log to this file
    #[arg(long)]
    logfile: Option<PathBuf>,

    /// More output, can be repeated
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> eyre::Result<()> {
    init_eyre()?;
    let cli = Cli::parse();
    init_logger(verbosity_to_level(cli.verbose), cli.logfile.as_deref())?;

    log::debug!("CLI arguments: {cli:#?}");

    let stop = StopSignal::install().wrap_err("failed to install the signal handlers")?;
    let matcher = EpisodeMatcher::new(&cli.series).wrap_err("bad series name")?;
    let sample_args = cli.sample_args.to_args();

    log::info!("Finding videos in: {}", cli.videos.display());
    let videos = find_videos(&cli.videos)
        .wrap_err_with(|| format!("failed to list {}", cli.videos.display()))?;
    log::info!("Found {} videos", videos.len());

    let report = sample_all(&videos, &matcher, &cli.out, &sample_args, &stop);

    let frames: u32 = report.sampled.iter().map(|(_, r)| r.written).sum();
    log::info!(
        "Sampled {} frames from {} episodes, skipped {} files",
        frames,
        report.sampled.len(),
        report.skipped.len()
    );

    if !report.failed.is_empty() {
        let mut lines = vec!["Summary of videos that errored:".to_string()];
        lines.extend(
            report
                .failed
                .into_iter()
                .map(|(path, error)| format!("'{}': {:?}", path.display(), error)),
        );
        eyre::bail!(lines.join("\n"));
    }

    eyre::ensure!(!report.stopped, "Interrupted");

    Ok(())
}
