use std::path::Path;

use color_eyre::{
    config::{HookBuilder, Theme},
    eyre::{self, Context},
};
use fern_format::{Format, Stream};

/// Installs color-eyre for the main thread and makes panics end up in the log as well.
pub fn init_eyre() -> eyre::Result<()> {
    let eyre_color = if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
        Theme::dark()
    } else {
        Theme::new()
    };

    let (stderr_panic_hook, eyre_hook) =
        HookBuilder::default().theme(eyre_color).into_hooks();
    eyre_hook
        .install()
        .wrap_err("failed to install eyre hook")?;

    let (log_panic_hook, _) = HookBuilder::default().theme(Theme::new()).into_hooks();

    std::panic::set_hook(Box::new(move |info| {
        eprintln!("{}", stderr_panic_hook.panic_report(info));
        log::error!(target: "panic", "{}", log_panic_hook.panic_report(info));
    }));

    Ok(())
}

/// Logs to stdout, and to `logfile` if given. The logfile receives everything, stdout only
/// what `level` lets through.
pub fn init_logger(level: log::LevelFilter, logfile: Option<&Path>) -> eyre::Result<()> {
    let mut dispatch = fern::Dispatch::new()
        .level(log::LevelFilter::Trace)
        .level_for("ffmpeg", log::LevelFilter::Info)
        .chain(
            fern::Dispatch::new()
                .level(level)
                .format(Format::new().color_if_supported(Stream::Stdout).callback())
                .chain(std::io::stdout()),
        );

    if let Some(logfile) = logfile {
        dispatch = dispatch.chain(
            fern::Dispatch::new()
                .format(Format::new().callback())
                .chain(fern::log_file(logfile).wrap_err_with(|| {
                    format!("failed to open the log file at: {logfile:?}")
                })?),
        );
    }

    dispatch.apply().wrap_err("failed to set the logger")?;

    Ok(())
}

/// `-v` flags to a level, starting at info.
pub fn verbosity_to_level(verbose: u8) -> log::LevelFilter {
    match verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn verbosity() {
        assert_eq!(log::LevelFilter::Info, verbosity_to_level(0));
        assert_eq!(log::LevelFilter::Debug, verbosity_to_level(1));
        assert_eq!(log::LevelFilter::Trace, verbosity_to_level(5));
    }
}
