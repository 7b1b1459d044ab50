use std::{fmt::Arguments, path::Path};

/// A message from ffmpeg, held until the extractor that caused it can pass it on.
pub struct Item {
    pub level: Level,
    pub target: String,
    pub body: String,
}

/// Where a [FrameExtractor](super::FrameExtractor) sends its own and ffmpeg's messages.
pub trait Logger {
    fn log(&self, level: Level, target: &str, body: Arguments<'_>);

    fn log_item(&self, Item { level, target, body }: Item) {
        self.log(level, &target, format_args!("{body}"))
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Level {
    Verbose,
    Info,
    Warn,
    Error,
}

impl From<Level> for log::Level {
    fn from(level: Level) -> Self {
        match level {
            Level::Verbose => Self::Debug,
            Level::Info => Self::Info,
            Level::Warn => Self::Warn,
            Level::Error => Self::Error,
        }
    }
}

/// Straight to the `log` crate.
pub struct LogLogger;

impl Logger for LogLogger {
    fn log(&self, level: Level, target: &str, body: Arguments<'_>) {
        log::log!(target: target, level.into(), "{body}");
    }
}

/// Like [LogLogger], with the path of the video at the end of every message.
pub struct ContextLogger<'a> {
    video: &'a Path,
}

impl<'a> ContextLogger<'a> {
    pub fn new(video: &'a Path) -> Self {
        Self { video }
    }
}

impl Logger for ContextLogger<'_> {
    fn log(&self, level: Level, target: &str, body: Arguments<'_>) {
        let video = self.video.display();
        LogLogger.log(level, target, format_args!("{body} ({video})"))
    }
}

macro_rules! log_at {
    ($level:ident, $logger:expr, $($args:tt)+) => {
        $logger.log(
            $crate::frame_extractor::logger::Level::$level,
            std::module_path!(),
            std::format_args!($($args)+),
        )
    };
}

macro_rules! warning {
    ($logger:expr, $($args:tt)+) => {
        $crate::frame_extractor::logger::log_at!(Warn, $logger, $($args)+)
    };
}

macro_rules! fault {
    ($logger:expr, $($args:tt)+) => {
        $crate::frame_extractor::logger::log_at!(Error, $logger, $($args)+)
    };
}

pub(crate) use fault;
pub(crate) use log_at;
pub(crate) use warning;
