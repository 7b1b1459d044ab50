use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{self, Context};
use palette_common::{
    bin_common::{
        init::{init_eyre, init_logger, verbosity_to_level},
        termination::StopSignal,
    },
    episode::EpisodeId,
};
use palettes::{
    batch::{episode_dirs, extract_all, EpisodeDir},
    dominant::PaletteCli,
};

#[derive(Parser, Debug)]
#[command()]
/// Finds the dominant colors of sampled frames and writes them to a palette table.
///
/// The table format follows the extension of `--table`, `.ron` or `.csv`.
struct Cli {
    #[command(flatten)]
    palette_args: PaletteCli,

    /// Root of the `sNN/eNN` frame directories, or a single directory of frames if
    /// `--season` and `--episode` are given
    #[arg(long)]
    frames: PathBuf,

    /// Where to write the palette table
    #[arg(long)]
    table: PathBuf,

    /// Season label, like `s01`, of a single frame directory
    #[arg(long, requires = "episode")]
    season: Option<String>,

    /// Episode label, like `e01`, of a single frame directory
    #[arg(long, requires = "season")]
    episode: Option<String>,

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
    let palette_args = cli.palette_args.to_args();

    let dirs = match (&cli.season, &cli.episode) {
        (Some(season), Some(episode)) => vec![EpisodeDir {
            episode: EpisodeId::from_labels(season, episode)?,
            dir: cli.frames.clone(),
        }],
        _ => episode_dirs(&cli.frames)?,
    };
    log::info!("Found {} episodes in {}", dirs.len(), cli.frames.display());

    let (table, report) = extract_all(&dirs, &palette_args, &stop)?;

    log::info!("Writing {} records to {}", table.len(), cli.table.display());
    table
        .save(&cli.table)
        .wrap_err_with(|| format!("failed to write {}", cli.table.display()))?;

    if !report.failed.is_empty() {
        log::warn!("{} frames could not be read", report.failed.len());
    }
    eyre::ensure!(!report.stopped, "Interrupted, the table is incomplete");

    Ok(())
}
