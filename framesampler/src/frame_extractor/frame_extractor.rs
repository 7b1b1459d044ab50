extern crate ffmpeg_next as ffmpeg;

use std::{cell::RefCell, ffi::CStr, fmt, path::Path, sync::OnceLock, time::Duration};

use super::error::{Error, Result};
use super::logger::{self, fault, warning, Item};
use super::timestamp::Timestamp;

use ffmpeg::codec::Context as CodecContext;
use ffmpeg::decoder::Video as DecoderVideo;
use ffmpeg::format::context::Input as FormatContext;
use ffmpeg::format::{input_with_dictionary, Pixel};
use ffmpeg::frame::Video as FrameVideo;
use ffmpeg::media::Type;
use ffmpeg::software::scaling::{context::Context as ScalingContext, Flags};
use ffmpeg::util::log as ffmpeglog;
use ffmpeg::{Dictionary, Packet, Rational, Rescale};
use ffmpeg_sys_next::{AV_NOPTS_VALUE, AV_TIME_BASE_Q};
use image::RgbImage;

static FFMPEG_INITIALIZED: OnceLock<std::result::Result<(), ffmpeg::Error>> =
    OnceLock::new();

thread_local! {
    /// ffmpeg's messages, waiting to be handed to the logger of the extractor that caused
    /// them.
    static LOGS: RefCell<Vec<Item>> = const {RefCell::new(Vec::new())};
}

/// Decodes RGB frames out of the best video stream of a file. The ffmpeg handles are
/// released on drop.
pub struct FrameExtractor<L: logger::Logger = logger::LogLogger> {
    logger: L,

    input: FormatContext,
    decoder: DecoderVideo,
    scaler: ScalingContext,
    stream_index: usize,

    /// Frames before this are decoded and thrown away
    target_ts: i64,
    last_ts: i64,

    first_ts: i64,
    end_ts: i64,
    timebase: Rational,
    frame_rate: Rational,
    rotation: Rotation,
}

/// What one round of [FrameExtractor::receive] got.
enum Received {
    Frame(FrameVideo),
    NeedsInput,
    Finished,
}

impl FrameExtractor<logger::LogLogger> {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new_with_logger(path, logger::LogLogger)
    }
}

impl<L> FrameExtractor<L>
where
    L: logger::Logger,
{
    pub fn new_with_logger(path: impl AsRef<Path>, logger: L) -> Result<Self> {
        init_ffmpeg()?;

        let mut options = Dictionary::new();
        options.set("analyzeduration", "10M");
        options.set("probesize", "5M");
        let mut input = input_with_dictionary(&path, options)
            .map_err(Error::unavailable_by("failed to open the file"))?;

        let stream = input
            .streams()
            .best(Type::Video)
            .ok_or(Error::unavailable("no video stream"))?;
        let stream_index = stream.index();
        let timebase = stream.time_base();

        let frame_rate = pick_frame_rate([stream.avg_frame_rate(), stream.rate()])?;

        let first_ts = stream.start_time();
        if first_ts == AV_NOPTS_VALUE {
            return Err(Error::MetadataMissing("start time"));
        }
        let length = match (stream.duration(), input.duration()) {
            (AV_NOPTS_VALUE, AV_NOPTS_VALUE) => {
                return Err(Error::MetadataMissing("duration"))
            }
            (AV_NOPTS_VALUE, container) => container.rescale(AV_TIME_BASE_Q, timebase),
            (own, _) => own,
        };

        let rotation = Rotation::of(&stream).unwrap_or_else(|| {
            warning!(logger, "Unsupported rotation, leaving frames as they are");
            Rotation::None
        });

        let decoder = CodecContext::from_parameters(stream.parameters())
            .map_err(Error::unavailable_by("no codec found"))?
            .decoder()
            .video()
            .map_err(Error::unavailable_by("not a video codec"))?;
        if decoder.format() == Pixel::None {
            return Err(Error::unavailable("no pixel format"));
        }
        let scaler = ScalingContext::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            Flags::FAST_BILINEAR,
        )
        .map_err(Error::ffmpeg("create the pixel converter"))?;

        for mut other in input.streams_mut().filter(|s| s.index() != stream_index) {
            discard_all(&mut other);
        }

        let extractor = Self {
            logger,
            input,
            decoder,
            scaler,
            stream_index,
            target_ts: first_ts,
            last_ts: first_ts,
            first_ts,
            end_ts: first_ts.saturating_add(length),
            timebase,
            frame_rate,
            rotation,
        };
        extractor.forward_logs();
        Ok(extractor)
    }

    fn forward_logs(&self) {
        LOGS.with_borrow_mut(|items| {
            items.drain(..).for_each(|item| self.logger.log_item(item))
        })
    }

    /// The next decoded frame at or after the last seek target. `None` at the end of the
    /// stream.
    pub fn next(&mut self) -> Result<Option<(Timestamp, RgbImage)>> {
        loop {
            let frame = match self.receive()? {
                Received::Frame(frame) => frame,
                Received::NeedsInput => {
                    self.feed()?;
                    continue;
                }
                Received::Finished => return Ok(None),
            };

            let Some(ts) = frame.timestamp() else {
                let after = self.timestamp(self.last_ts);
                warning!(self.logger, "Skipping a frame without timestamp after {}", after);
                continue;
            };
            self.last_ts = ts;
            if ts < self.target_ts {
                continue;
            }

            let mut rgb = FrameVideo::empty();
            self.scaler
                .run(&frame, &mut rgb)
                .map_err(Error::ffmpeg("convert the decoded frame"))?;
            let img = self.rotation.undo(to_rgb_image(&rgb));
            return Ok(Some((self.timestamp(ts), img)));
        }
    }

    fn receive(&mut self) -> Result<Received> {
        let mut frame = FrameVideo::empty();
        let res = self.decoder.receive_frame(&mut frame);
        self.forward_logs();
        match res {
            Ok(()) => Ok(Received::Frame(frame)),
            Err(ffmpeg::Error::Other {
                errno: libc::EAGAIN,
            }) => Ok(Received::NeedsInput),
            Err(ffmpeg::Error::Eof) => Ok(Received::Finished),
            Err(e) => Err(Error::ffmpeg("receive a decoded frame")(e)),
        }
    }

    /// Sends the next packet of the video stream to the decoder, or EOF if there are no
    /// more. Packets the decoder rejects are logged and skipped.
    fn feed(&mut self) -> Result<()> {
        loop {
            let mut packet = Packet::empty();
            let res = packet.read(&mut self.input);
            self.forward_logs();
            match res {
                Ok(()) if packet.stream() != self.stream_index => (),
                Ok(()) => {
                    let sent = self.decoder.send_packet(&packet);
                    self.forward_logs();
                    match sent {
                        Ok(()) => return Ok(()),
                        Err(e) => fault!(self.logger, "Skipping a bad packet: {}", e),
                    }
                }
                Err(ffmpeg::Error::Eof) => {
                    return self
                        .decoder
                        .send_eof()
                        .map_err(Error::ffmpeg("send EOF to the decoder"))
                }
                Err(e) => return Err(Error::ffmpeg("read a packet")(e)),
            }
        }
    }

    /// Seeks so that the next frame is the first one at or after `offset` from the start
    /// of the stream.
    pub fn seek_to_offset(&mut self, offset: Duration) -> Result<()> {
        let target = self
            .first_ts
            .saturating_add(Timestamp::ticks(offset, self.timebase));

        // lands on a keyframe at or before target, `next` decodes the rest of the way
        let res = seek_stream(&mut self.input, self.stream_index, i64::MIN, target, target);
        self.forward_logs();
        res.map_err(Error::ffmpeg("seek"))?;
        self.decoder.flush();
        self.target_ts = target;
        Ok(())
    }

    fn timestamp(&self, ts: i64) -> Timestamp {
        Timestamp::new(ts, self.timebase, self.first_ts)
    }

    /// From the container metadata, not a promise.
    pub fn approx_length(&self) -> Duration {
        self.timestamp(self.end_ts).to_duration()
    }

    pub fn frame_rate(&self) -> f64 {
        f64::from(self.frame_rate.numerator()) / f64::from(self.frame_rate.denominator())
    }
}

impl<L: logger::Logger> Drop for FrameExtractor<L> {
    fn drop(&mut self) {
        self.forward_logs();
    }
}

impl<L: logger::Logger> fmt::Debug for FrameExtractor<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FrameExtractor {{ stream: {}, ts: {}..{}, at: {}, timebase: {}/{}, fps: {:.3}, rotation: {:?} }}",
            self.stream_index,
            self.first_ts,
            self.end_ts,
            self.last_ts,
            self.timebase.numerator(),
            self.timebase.denominator(),
            self.frame_rate(),
            self.rotation,
        )
    }
}

fn init_ffmpeg() -> Result<()> {
    let res = FFMPEG_INITIALIZED.get_or_init(|| {
        ffmpeg::init()?;
        ffmpeglog::set_level(ffmpeglog::Level::Warning);
        // SAFETY: the callback only touches a thread local
        unsafe {
            ffmpeg_sys_next::av_log_set_callback(Some(ffmpeg_log_callback));
        }
        Ok(())
    });
    if let Err(e) = res {
        return Err(Error::Init(*e));
    }
    Ok(())
}

/// How far decoded frames must be turned clockwise to be upright.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Rotation {
    None,
    Quarter,
    Half,
    ThreeQuarters,
}

impl Rotation {
    /// None if the angle isn't a multiple of 90 degrees.
    fn of(stream: &ffmpeg::Stream) -> Option<Self> {
        let Some(matrix) = stream
            .side_data()
            .find(|data| data.kind() == ffmpeg::packet::side_data::Type::DisplayMatrix)
        else {
            return Some(Self::None);
        };

        // SAFETY: display matrix side data is nine i32s
        let degrees = unsafe {
            ffmpeg_sys_next::av_display_rotation_get(matrix.data().as_ptr().cast::<i32>())
        };
        if !degrees.is_finite() {
            return Some(Self::None);
        }
        // counter clockwise
        match (degrees.round() as i32).rem_euclid(360) {
            0 => Some(Self::None),
            90 => Some(Self::ThreeQuarters),
            180 => Some(Self::Half),
            270 => Some(Self::Quarter),
            _ => None,
        }
    }

    fn undo(self, img: RgbImage) -> RgbImage {
        use image::imageops::{rotate180, rotate270, rotate90};
        match self {
            Self::None => img,
            Self::Quarter => rotate90(&img),
            Self::Half => rotate180(&img),
            Self::ThreeQuarters => rotate270(&img),
        }
    }
}

/// Copies an RGB24 frame, minus the row padding ffmpeg may have added.
fn to_rgb_image(frame: &FrameVideo) -> RgbImage {
    assert_eq!(Pixel::RGB24, frame.format());
    let (width, height) = (frame.width(), frame.height());
    let row_len = 3 * width as usize;
    let stride = frame.stride(0);
    assert!(stride >= row_len);

    let pixels: Vec<u8> = frame
        .data(0)
        .chunks(stride)
        .take(height as usize)
        .flat_map(|row| &row[..row_len])
        .copied()
        .collect();

    RgbImage::from_raw(width, height, pixels).expect("every row was copied")
}

fn discard_all(stream: &mut ffmpeg::StreamMut<'_>) {
    // SAFETY: the pointer comes from a live format context
    unsafe {
        let ptr = stream.as_mut_ptr();
        if !ptr.is_null() {
            (*ptr).discard = ffmpeg_sys_next::AVDiscard::AVDISCARD_ALL;
        }
    }
}

/// `avformat_seek_file` on a specific stream, timestamps in its timebase.
fn seek_stream(
    input: &mut FormatContext,
    stream_index: usize,
    min_ts: i64,
    ts: i64,
    max_ts: i64,
) -> std::result::Result<(), ffmpeg::Error> {
    let stream_index =
        i32::try_from(stream_index).map_err(|_| ffmpeg::Error::StreamNotFound)?;
    // SAFETY: the context is open
    let ret = unsafe {
        ffmpeg_sys_next::avformat_seek_file(
            input.as_mut_ptr(),
            stream_index,
            min_ts,
            ts,
            max_ts,
            0,
        )
    };
    if ret >= 0 {
        Ok(())
    } else {
        Err(ffmpeg::Error::from(ret))
    }
}

/// The first usable rate, the average one is preferred. Zero and unknown rates are
/// reported as missing.
fn pick_frame_rate(candidates: [Rational; 2]) -> Result<Rational> {
    candidates
        .into_iter()
        .find(|rate| rate.numerator() > 0 && rate.denominator() > 0)
        .ok_or(Error::MetadataMissing("frame rate"))
}

extern "C" {
    fn vsnprintf(
        buf: *mut libc::c_char,
        size: libc::size_t,
        format: *const libc::c_char,
        args: *mut libc::c_void,
    ) -> libc::c_int;
}

const LOG_LINE_MAX: usize = 2048;

unsafe extern "C" fn ffmpeg_log_callback(
    avcl: *mut libc::c_void,
    level: libc::c_int,
    fmt: *const libc::c_char,
    args: *mut ffmpeg_sys_next::__va_list_tag,
) {
    if level > ffmpeg_sys_next::av_log_get_level() {
        return;
    }

    let mut buf = vec![0u8; LOG_LINE_MAX];
    let written = vsnprintf(buf.as_mut_ptr().cast(), LOG_LINE_MAX, fmt, args.cast());
    let Ok(written) = usize::try_from(written) else {
        eprintln!(
            "could not format a log message from ffmpeg: {}",
            std::io::Error::last_os_error()
        );
        return;
    };
    buf.truncate(written.min(LOG_LINE_MAX - 1));
    let body = String::from_utf8_lossy(&buf).trim_end().to_string();

    let item = Item {
        level: log_level(level),
        target: format!("ffmpeg::{}", class_name(avcl)),
        body,
    };
    LOGS.with_borrow_mut(|items| items.push(item));
}

fn log_level(level: libc::c_int) -> logger::Level {
    use ffmpeglog::Level as L;
    match L::try_from(level) {
        Ok(L::Panic | L::Fatal | L::Error) => logger::Level::Error,
        Ok(L::Warning) => logger::Level::Warn,
        Ok(L::Info) | Err(_) => logger::Level::Info,
        Ok(_) => logger::Level::Verbose,
    }
}

/// The name of the ffmpeg component that logged, like `h264` or `matroska,webm`.
unsafe fn class_name(avcl: *mut libc::c_void) -> String {
    if avcl.is_null() {
        return "NULL_avcl".to_string();
    }
    let class = *avcl.cast::<*const ffmpeg_sys_next::AVClass>();
    if class.is_null() {
        return "NULL_avc".to_string();
    }
    let Some(item_name) = (*class).item_name else {
        return "NULL_item".to_string();
    };
    let item = CStr::from_ptr(item_name(avcl)).to_string_lossy();
    if item == "NULL" {
        CStr::from_ptr((*class).class_name)
            .to_string_lossy()
            .into_owned()
    } else {
        item.into_owned()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn picked(candidates: [(i32, i32); 2]) -> Result<(i32, i32)> {
        pick_frame_rate(candidates.map(|(n, d)| Rational::new(n, d)))
            .map(|rate| (rate.numerator(), rate.denominator()))
    }

    #[test]
    fn frame_rate_fallback() {
        assert_eq!((25, 1), picked([(0, 1), (25, 1)]).unwrap());
        assert_eq!((30000, 1001), picked([(30000, 1001), (30, 1)]).unwrap());
    }

    #[test]
    fn zero_frame_rate() {
        for candidates in [[(0, 1), (0, 1)], [(0, 0), (25, 0)]] {
            assert!(matches!(
                picked(candidates),
                Err(Error::MetadataMissing("frame rate"))
            ));
        }
    }
}
