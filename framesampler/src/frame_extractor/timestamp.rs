extern crate ffmpeg_next as ffmpeg;

use std::{fmt, time::Duration};

use ffmpeg::{Rational, Rescale};
use ffmpeg_sys_next::AV_TIME_BASE_Q;

/// A position in a stream, relative to the stream's first timestamp.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timestamp {
    timestamp: i64,
    first_timestamp: i64,
    timebase_numerator: i32,
    timebase_denominator: i32,
}

impl Timestamp {
    pub(super) fn new(ts: i64, timebase: Rational, first_timestamp: i64) -> Self {
        Self {
            timestamp: ts,
            first_timestamp,
            timebase_numerator: timebase.numerator(),
            timebase_denominator: timebase.denominator(),
        }
    }

    /// `dur` expressed in ticks of `timebase`.
    pub(super) fn ticks(dur: Duration, timebase: Rational) -> i64 {
        let micros: i64 = dur.as_micros().try_into().unwrap_or(i64::MAX);
        micros.rescale(AV_TIME_BASE_Q, timebase)
    }

    /// Saturates at zero for timestamps before the first one.
    pub fn to_duration(&self) -> Duration {
        let ticks = i128::from(self.timestamp.saturating_sub(self.first_timestamp).max(0));
        let nanos = (ticks * i128::from(self.timebase_numerator) * 1_000_000_000)
            .checked_div(i128::from(self.timebase_denominator))
            .unwrap_or(0);
        Duration::from_nanos(u64::try_from(nanos.max(0)).unwrap_or(u64::MAX))
    }
}

/// `HH:MM:SS.mmm`
impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.to_duration();
        let millis = total.subsec_millis();
        let secs = total.as_secs();
        write!(
            f,
            "{:02}:{:02}:{:02}.{:03}",
            secs / 3600,
            (secs % 3600) / 60,
            secs % 60,
            millis
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn timestamp_to_string() {
        let ts = Timestamp::new(50, Rational::new(1, 1000), 0);
        assert_eq!("00:00:00.050", ts.to_string());

        let ts = Timestamp::new(3_661_005, Rational::new(1, 1000), 0);
        assert_eq!("01:01:01.005", ts.to_string());
    }

    #[test]
    fn relative_to_first() {
        let ts = Timestamp::new(1500, Rational::new(1, 1000), 500);
        assert_eq!(Duration::from_secs(1), ts.to_duration());

        let before = Timestamp::new(100, Rational::new(1, 1000), 500);
        assert_eq!(Duration::ZERO, before.to_duration());
    }

    #[test]
    fn duration_to_ticks() {
        assert_eq!(
            90_000 * 3,
            Timestamp::ticks(Duration::from_secs(3), Rational::new(1, 90_000))
        );
        assert_eq!(
            25,
            Timestamp::ticks(Duration::from_secs(1), Rational::new(1, 25))
        );
    }
}
