pub mod error;
pub mod frame_extractor;
pub mod logger;
pub mod timestamp;

pub use error::{Error, Result};
pub use frame_extractor::FrameExtractor;
pub use logger::ContextLogger;
pub use timestamp::Timestamp;
