extern crate ffmpeg_next as ffmpeg;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to initialize ffmpeg: {0}")]
    Init(#[source] ffmpeg::Error),

    /// The file could not be opened or has nothing decodable in it. Skip it.
    #[error("source unavailable: {reason}")]
    SourceUnavailable {
        reason: &'static str,
        #[source]
        source: Option<ffmpeg::Error>,
    },

    /// Seeking by time is not possible without this.
    #[error("the video is missing its {0}")]
    MetadataMissing(&'static str),

    #[error("failed to {action}: {source}")]
    Ffmpeg {
        action: &'static str,
        #[source]
        source: ffmpeg::Error,
    },
}

impl Error {
    pub(super) fn unavailable(reason: &'static str) -> Self {
        Self::SourceUnavailable {
            reason,
            source: None,
        }
    }

    pub(super) fn unavailable_by(reason: &'static str) -> impl FnOnce(ffmpeg::Error) -> Self {
        move |source| Self::SourceUnavailable {
            reason,
            source: Some(source),
        }
    }

    pub(super) fn ffmpeg(action: &'static str) -> impl FnOnce(ffmpeg::Error) -> Self {
        move |source| Self::Ffmpeg { action, source }
    }
}
