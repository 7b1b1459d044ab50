use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{self, Context};
use palette_common::{
    bin_common::init::{init_eyre, init_logger, verbosity_to_level},
    episode::EpisodeId,
    table::PaletteTable,
    utils::plot::{palette_chart, unit_bar_chart},
};
use palettes::aggregate::{frame_luminosity, summarize, weighted_average};

#[derive(Parser, Debug)]
#[command()]
/// Prints the mean luminosity of every episode in a palette table.
struct Cli {
    /// The palette table, `.ron` or `.csv`
    #[arg(long)]
    table: PathBuf,

    /// Plot the palette of the frame with this name
    #[arg(long, requires = "plot_out")]
    palette_plot: Option<String>,

    /// The episode of `--palette-plot`, like `s03e05`. Needed when the frame name is in
    /// more than one episode.
    #[arg(long, requires = "palette_plot")]
    palette_episode: Option<EpisodeId>,

    /// Where to write the palette plot, an svg
    #[arg(long)]
    plot_out: Option<PathBuf>,

    /// Plot the mean luminosity of the episodes into this svg
    #[arg(long)]
    luminosity_plot: Option<PathBuf>,

    /// More output, can be repeated
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> eyre::Result<()> {
    init_eyre()?;
    let cli = Cli::parse();
    init_logger(verbosity_to_level(cli.verbose), None)?;

    let table = PaletteTable::load(&cli.table)
        .wrap_err_with(|| format!("failed to read {}", cli.table.display()))?;
    log::info!(
        "Read {} records with at most {} colors each",
        table.len(),
        table.max_colors
    );

    let summaries = summarize(&table.records);
    println!("episode  frames  undefined  luminosity  std_dev");
    for s in &summaries {
        println!(
            "{:<8} {:>6}  {:>9}  {:>10}  {:>7.4}",
            s.episode,
            s.frames,
            s.undefined_frames,
            s.mean_luminosity
                .map(|l| format!("{l:.4}"))
                .unwrap_or_else(|| "-".to_string()),
            s.luminosity_std_dev
        );
    }

    if let (Some(name), Some(out)) = (&cli.palette_plot, &cli.plot_out) {
        let record = table.find_frame(name, cli.palette_episode)?;
        log::info!(
            "{} {}: mean color {}, luminosity {}",
            record.episode,
            record.frame_name,
            weighted_average(record).map_or("-".to_string(), |rgb| rgb.to_string()),
            frame_luminosity(record).map_or("-".to_string(), |l| format!("{l:.4}"))
        );
        palette_chart(out, &record.clusters)
            .wrap_err_with(|| format!("failed to plot the palette of {name}"))?;
    }

    if let Some(out) = &cli.luminosity_plot {
        let bars: Vec<_> = summaries
            .iter()
            .filter_map(|s| s.mean_luminosity.map(|l| (s.episode, l)))
            .collect();
        unit_bar_chart(out, "mean luminosity", &bars)
            .wrap_err("failed to plot the luminosities")?;
    }

    Ok(())
}
