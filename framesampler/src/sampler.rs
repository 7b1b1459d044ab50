use std::{
    fmt, io,
    path::PathBuf,
    time::Duration,
};

use image::RgbImage;
use palette_common::{
    bin_common::args_helper::args,
    utils::{fsutils, time::Every},
};

use crate::frame_extractor::{self, logger::Logger, FrameExtractor};

const FRAME_PREFIX: &str = "frame_";

args! {
    #[derive(Debug, Clone)]
    Sample {
        "Time between two sampled frames"
        interval: humantime::Duration = Duration::from_secs(5).into();

        "What to do with frames already in an episode's output directory"
        policy: OutputPolicy = OutputPolicy::Wipe;

        "Image format of the written frames"
        format: FrameFormat = FrameFormat::Png;

        "How often to log progress"
        progress_every: humantime::Duration = Duration::from_secs(10).into();
    }
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputPolicy {
    /// Empty the directory first, numbering starts at zero.
    #[default]
    Wipe,
    /// Keep what is there and number after the highest existing frame.
    Append,
}

impl fmt::Display for OutputPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wipe => write!(f, "wipe"),
            Self::Append => write!(f, "append"),
        }
    }
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameFormat {
    #[default]
    Png,
    Jpg,
}

impl FrameFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpg => "jpg",
        }
    }
}

impl fmt::Display for FrameFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SampleError {
    #[error("the sampling interval must be positive")]
    ZeroInterval,
    #[error("failed to prepare the output directory {path:?}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Source(#[from] frame_extractor::Error),
}

/// Something frames can be pulled out of at arbitrary offsets.
pub trait FrameSource {
    /// The first frame at or after `offset` from the start. `None` when there is nothing
    /// more to decode.
    fn frame_at(&mut self, offset: Duration) -> frame_extractor::Result<Option<RgbImage>>;

    fn approx_length(&self) -> Duration;
}

impl<L: Logger> FrameSource for FrameExtractor<L> {
    fn frame_at(&mut self, offset: Duration) -> frame_extractor::Result<Option<RgbImage>> {
        self.seek_to_offset(offset)?;
        Ok(self.next()?.map(|(_, img)| img))
    }

    fn approx_length(&self) -> Duration {
        FrameExtractor::approx_length(self)
    }
}

/// Where sampled frames end up.
pub trait FrameSink {
    fn write(&mut self, index: u32, frame: &RgbImage) -> image::ImageResult<()>;
}

/// Writes `frame_NNNNNN.<ext>` files into one directory.
#[derive(Debug)]
pub struct DirSink {
    dir: PathBuf,
    format: FrameFormat,
}

impl DirSink {
    /// Applies `policy` to `dir` and returns the sink together with the first free frame
    /// index.
    pub fn prepare(
        dir: impl Into<PathBuf>,
        policy: OutputPolicy,
        format: FrameFormat,
    ) -> Result<(Self, u32), SampleError> {
        let dir = dir.into();
        let wrap = |source| SampleError::OutputDir {
            path: dir.clone(),
            source,
        };

        let first_index = match policy {
            OutputPolicy::Wipe => {
                fsutils::clear_dir(&dir).map_err(wrap)?;
                0
            }
            OutputPolicy::Append => {
                std::fs::create_dir_all(&dir).map_err(wrap)?;
                fsutils::next_free_index(&dir, parse_frame_index).map_err(wrap)?
            }
        };

        Ok((Self { dir, format }, first_index))
    }
}

impl FrameSink for DirSink {
    fn write(&mut self, index: u32, frame: &RgbImage) -> image::ImageResult<()> {
        frame.save(self.dir.join(frame_file_name(index, self.format)))
    }
}

pub fn frame_file_name(index: u32, format: FrameFormat) -> String {
    format!("{FRAME_PREFIX}{index:06}.{}", format.extension())
}

/// The index of a file named like [frame_file_name], any extension.
pub fn parse_frame_index(file_name: &str) -> Option<u32> {
    let stem = file_name.strip_prefix(FRAME_PREFIX)?;
    let digits = stem.split_once('.').map_or(stem, |(digits, _)| digits);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// How many frames a source of length `length` should give. Only for progress reports.
pub fn expected_frames(length: Duration, interval: Duration) -> u64 {
    if interval.is_zero() {
        return 0;
    }
    u64::try_from(length.as_nanos() / interval.as_nanos())
        .unwrap_or(u64::MAX)
        .saturating_add(1)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEnd {
    Exhausted,
    /// Holds the rendered error, the sequence ended early.
    DecodeFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleReport {
    pub written: u32,
    pub failed_writes: u32,
    pub ended_by: StreamEnd,
}

/// Pulls a frame every `interval` out of `source` and hands them to `sink`, numbered
/// densely from `first_index`.
pub fn sample<S, K>(
    source: &mut S,
    sink: &mut K,
    args: &SampleArgs,
    first_index: u32,
) -> Result<SampleReport, SampleError>
where
    S: FrameSource + ?Sized,
    K: FrameSink + ?Sized,
{
    let interval: Duration = (*args.interval()).into();
    if interval.is_zero() {
        return Err(SampleError::ZeroInterval);
    }

    let expected = expected_frames(source.approx_length(), interval);
    log::info!(
        "Sampling every {} ({} frames expected)",
        args.interval(),
        expected
    );

    let mut progress = Every::new((*args.progress_every()).into());
    let mut index = first_index;
    let mut report = SampleReport {
        written: 0,
        failed_writes: 0,
        ended_by: StreamEnd::Exhausted,
    };

    for step in 0u32.. {
        let Some(offset) = interval.checked_mul(step) else {
            break;
        };

        let frame = match source.frame_at(offset) {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(e) => {
                log::warn!(
                    "Stopped at {}: {}",
                    humantime::format_duration(offset),
                    e
                );
                report.ended_by = StreamEnd::DecodeFailed(e.to_string());
                break;
            }
        };

        match sink.write(index, &frame) {
            Ok(()) => {
                index += 1;
                report.written += 1;
            }
            Err(e) => {
                log::error!("Failed to save frame {}: {}", index, e);
                report.failed_writes += 1;
            }
        }

        progress.perform(|| {
            log::info!("Frames sampled: {}/{}", report.written, expected);
        });
    }

    log::info!("Sampled {} frames", report.written);
    Ok(report)
}

#[cfg(test)]
mod test {
    use super::*;

    struct FakeSource {
        length: Duration,
        fail_after: Option<Duration>,
        asked: Vec<Duration>,
    }

    impl FakeSource {
        fn new(length: Duration) -> Self {
            Self {
                length,
                fail_after: None,
                asked: Vec::new(),
            }
        }
    }

    impl FrameSource for FakeSource {
        fn frame_at(&mut self, offset: Duration) -> frame_extractor::Result<Option<RgbImage>> {
            self.asked.push(offset);
            if self.fail_after.is_some_and(|f| offset > f) {
                return Err(frame_extractor::Error::Ffmpeg {
                    action: "decode a frame",
                    source: ffmpeg_next::Error::InvalidData,
                });
            }
            if offset > self.length {
                return Ok(None);
            }
            Ok(Some(RgbImage::new(2, 2)))
        }

        fn approx_length(&self) -> Duration {
            self.length
        }
    }

    #[derive(Default)]
    struct MemorySink {
        indices: Vec<u32>,
        fail_every: Option<usize>,
        calls: usize,
    }

    impl FrameSink for MemorySink {
        fn write(&mut self, index: u32, _frame: &RgbImage) -> image::ImageResult<()> {
            self.calls += 1;
            if self.fail_every.is_some_and(|n| self.calls % n == 0) {
                return Err(image::ImageError::IoError(io::Error::other("disk full")));
            }
            self.indices.push(index);
            Ok(())
        }
    }

    fn every(secs: u64) -> SampleArgs {
        SampleArgs::default().with_interval(Duration::from_secs(secs).into())
    }

    #[test]
    fn frame_count_and_offsets() {
        let mut source = FakeSource::new(Duration::from_secs(10));
        let mut sink = MemorySink::default();
        let report = sample(&mut source, &mut sink, &every(3), 0).unwrap();

        assert_eq!(4, report.written);
        assert_eq!(StreamEnd::Exhausted, report.ended_by);
        assert_eq!(vec![0, 1, 2, 3], sink.indices);
        assert_eq!(
            vec![0, 3, 6, 9, 12],
            source.asked.iter().map(|d| d.as_secs()).collect::<Vec<_>>()
        );
        assert_eq!(4, expected_frames(Duration::from_secs(10), Duration::from_secs(3)));
    }

    #[test]
    fn exact_multiple() {
        let mut source = FakeSource::new(Duration::from_secs(9));
        let mut sink = MemorySink::default();
        let report = sample(&mut source, &mut sink, &every(3), 0).unwrap();
        assert_eq!(4, report.written);
    }

    #[test]
    fn failed_writes_leave_no_gaps() {
        let mut source = FakeSource::new(Duration::from_secs(10));
        let mut sink = MemorySink {
            fail_every: Some(2),
            ..Default::default()
        };
        let report = sample(&mut source, &mut sink, &every(1), 7).unwrap();

        assert_eq!(6, report.written);
        assert_eq!(5, report.failed_writes);
        assert_eq!((7..13).collect::<Vec<_>>(), sink.indices);
    }

    #[test]
    fn decode_error_ends_the_sequence() {
        let mut source = FakeSource::new(Duration::from_secs(10));
        source.fail_after = Some(Duration::from_secs(4));
        let mut sink = MemorySink::default();
        let report = sample(&mut source, &mut sink, &every(2), 0).unwrap();

        assert_eq!(3, report.written);
        match &report.ended_by {
            StreamEnd::DecodeFailed(msg) => assert!(msg.contains("decode a frame"), "{msg}"),
            other => panic!("{other:?}"),
        }
        assert_eq!(4, source.asked.len());
    }

    #[test]
    fn zero_interval() {
        let mut source = FakeSource::new(Duration::from_secs(10));
        let mut sink = MemorySink::default();
        assert!(matches!(
            sample(&mut source, &mut sink, &every(0), 0),
            Err(SampleError::ZeroInterval)
        ));
        assert!(source.asked.is_empty());
    }

    #[test]
    fn frame_names() {
        assert_eq!("frame_000042.png", frame_file_name(42, FrameFormat::Png));
        assert_eq!("frame_000000.jpg", frame_file_name(0, FrameFormat::Jpg));
        assert_eq!(Some(42), parse_frame_index("frame_000042.png"));
        assert_eq!(Some(1_234_567), parse_frame_index("frame_1234567.jpg"));
        assert_eq!(None, parse_frame_index("frame_.png"));
        assert_eq!(None, parse_frame_index("frame_12a.png"));
        assert_eq!(None, parse_frame_index("thumb_000001.png"));
    }

    #[test]
    fn dir_sink_policies() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("s01").join("e02");

        let (mut sink, first) = DirSink::prepare(&dir, OutputPolicy::Wipe, FrameFormat::Png).unwrap();
        assert_eq!(0, first);
        sink.write(0, &RgbImage::new(2, 2)).unwrap();
        sink.write(1, &RgbImage::new(2, 2)).unwrap();
        assert!(dir.join("frame_000001.png").is_file());

        let (_, first) = DirSink::prepare(&dir, OutputPolicy::Append, FrameFormat::Png).unwrap();
        assert_eq!(2, first);

        let (_, first) = DirSink::prepare(&dir, OutputPolicy::Wipe, FrameFormat::Png).unwrap();
        assert_eq!(0, first);
        assert_eq!(0, std::fs::read_dir(&dir).unwrap().count());
    }
}
