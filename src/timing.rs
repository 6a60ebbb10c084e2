//! Exact frame-index to timestamp arithmetic.
//!
//! Timestamps are computed with integer math on the stream's rational time
//! base and frame rate. Floating point is never used on the hot path, so the
//! mapping from frame index to tick never drifts, no matter how far into the
//! stream a caller scrubs.
//!
//! # Example
//!
//! ```
//! use frameseek::{FrameClock, Rational};
//!
//! let clock = FrameClock::new(Rational::new(1, 9000), Rational::new(60, 1), 0).unwrap();
//! assert_eq!(clock.timestamp(0), 0);
//! assert_eq!(clock.timestamp(59), 8850);
//! ```

use std::{cmp::Ordering, time::Duration};

use ffmpeg_next::Rational;

/// Maps frame indices to stream ticks for a constant nominal frame rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameClock {
    time_base: Rational,
    frame_rate: Rational,
    start: i64,
}

impl FrameClock {
    /// Build a clock from a stream time base, an average frame rate and the
    /// stream start time (in ticks).
    ///
    /// Returns `None` unless both rationals are strictly positive.
    pub fn new(time_base: Rational, frame_rate: Rational, start: i64) -> Option<Self> {
        if !is_positive(time_base) || !is_positive(frame_rate) {
            return None;
        }

        Some(Self {
            time_base,
            frame_rate,
            start,
        })
    }

    /// The stream time base (seconds per tick).
    pub fn time_base(&self) -> Rational {
        self.time_base
    }

    /// The nominal frame rate (frames per second).
    pub fn frame_rate(&self) -> Rational {
        self.frame_rate
    }

    /// Tick of the first frame.
    pub fn start(&self) -> i64 {
        self.start
    }

    /// Presentation tick of frame `index`:
    /// `start + floor(index * frame_interval / time_base)`.
    pub fn timestamp(&self, index: u64) -> i64 {
        let numerator = index as i128
            * self.frame_rate.denominator() as i128
            * self.time_base.denominator() as i128;
        let denominator =
            self.frame_rate.numerator() as i128 * self.time_base.numerator() as i128;
        let offset = numerator.div_euclid(denominator);
        saturate(self.start as i128 + offset)
    }

    /// [`timestamp`](FrameClock::timestamp) paired with the clock's time base.
    pub fn frame_timestamp(&self, index: u64) -> FrameTimestamp {
        FrameTimestamp {
            ticks: self.timestamp(index),
            time_base: self.time_base,
        }
    }

    /// Length of one frame interval in ticks, never less than one.
    pub fn frame_interval_ticks(&self) -> i64 {
        (self.timestamp(1) - self.start).max(1)
    }

    /// Estimate the number of frames in `duration_ticks` ticks of stream
    /// time: `floor(duration * time_base * frame_rate)`.
    pub fn frames_in(&self, duration_ticks: i64) -> u64 {
        frames_in_duration(duration_ticks, self.time_base, self.frame_rate)
    }
}

/// Estimate how many frames fit in `duration` ticks of `time_base` at
/// `frame_rate`. Non-positive inputs yield `0`.
pub(crate) fn frames_in_duration(duration: i64, time_base: Rational, frame_rate: Rational) -> u64 {
    if duration <= 0 || !is_positive(time_base) || !is_positive(frame_rate) {
        return 0;
    }

    let numerator =
        duration as i128 * time_base.numerator() as i128 * frame_rate.numerator() as i128;
    let denominator = time_base.denominator() as i128 * frame_rate.denominator() as i128;
    u64::try_from(numerator / denominator).unwrap_or(u64::MAX)
}

pub(crate) fn is_positive(value: Rational) -> bool {
    value.numerator() > 0 && value.denominator() > 0
}

fn saturate(value: i128) -> i64 {
    i64::try_from(value).unwrap_or(if value < 0 { i64::MIN } else { i64::MAX })
}

/// Presentation timestamp of a frame: an integer tick count and the
/// rational time base it is expressed in.
///
/// The time base is always strictly positive. Ordering and equality compare
/// the exact rational instant, so timestamps in different time bases compare
/// correctly.
#[derive(Debug, Clone, Copy)]
pub struct FrameTimestamp {
    ticks: i64,
    time_base: Rational,
}

impl FrameTimestamp {
    /// Create a timestamp from a tick count and its time base.
    ///
    /// Returns `None` unless `time_base` is strictly positive.
    pub fn new(ticks: i64, time_base: Rational) -> Option<Self> {
        is_positive(time_base).then_some(Self { ticks, time_base })
    }

    /// Tick count in [`time_base`](FrameTimestamp::time_base) units.
    pub fn ticks(&self) -> i64 {
        self.ticks
    }

    /// Seconds per tick.
    pub fn time_base(&self) -> Rational {
        self.time_base
    }

    /// The timestamp in seconds. Intended for display only.
    pub fn seconds(&self) -> f64 {
        self.ticks as f64 * self.time_base.numerator() as f64
            / self.time_base.denominator() as f64
    }

    /// The timestamp as a [`Duration`], clamped at zero.
    pub fn as_duration(&self) -> Duration {
        let nanos = self.ticks as i128 * self.time_base.numerator() as i128 * 1_000_000_000
            / self.time_base.denominator() as i128;
        Duration::from_nanos(u64::try_from(nanos.max(0)).unwrap_or(u64::MAX))
    }

    /// `(ticks, time_base)` pair, the shape the presentation layer consumes.
    pub fn into_parts(self) -> (i64, Rational) {
        (self.ticks, self.time_base)
    }

    /// Cross-multiplied value used for exact comparison against `other`.
    fn scaled_against(&self, other: &FrameTimestamp) -> i128 {
        self.ticks as i128
            * self.time_base.numerator() as i128
            * other.time_base.denominator() as i128
    }
}

impl PartialEq for FrameTimestamp {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FrameTimestamp {}

impl PartialOrd for FrameTimestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrameTimestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.scaled_against(other).cmp(&other.scaled_against(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sixty_fps_at_9000_ticks() {
        let clock = FrameClock::new(Rational::new(1, 9000), Rational::new(60, 1), 0).unwrap();
        assert_eq!(clock.timestamp(1), 150);
        assert_eq!(clock.timestamp(60), 9000);
        assert_eq!(clock.frame_interval_ticks(), 150);
        assert_eq!(clock.frames_in(9000), 60);
    }

    #[test]
    fn ntsc_rate_does_not_drift() {
        let clock =
            FrameClock::new(Rational::new(1, 90000), Rational::new(30000, 1001), 0).unwrap();
        // 30000 frames of 29.97 fps is exactly 1001 seconds.
        assert_eq!(clock.timestamp(30_000), 1001 * 90_000);
        assert_eq!(clock.timestamp(1), 3003);
    }

    #[test]
    fn floors_fractional_ticks() {
        let clock = FrameClock::new(Rational::new(1, 1000), Rational::new(30, 1), 0).unwrap();
        assert_eq!(clock.timestamp(1), 33);
        assert_eq!(clock.timestamp(2), 66);
        assert_eq!(clock.timestamp(3), 100);
    }

    #[test]
    fn start_offset_is_applied() {
        let clock = FrameClock::new(Rational::new(1, 9000), Rational::new(60, 1), 1200).unwrap();
        assert_eq!(clock.timestamp(0), 1200);
        assert_eq!(clock.timestamp(2), 1500);
    }

    #[test]
    fn rejects_non_positive_rationals() {
        assert!(FrameClock::new(Rational::new(0, 1), Rational::new(60, 1), 0).is_none());
        assert!(FrameClock::new(Rational::new(1, 9000), Rational::new(0, 0), 0).is_none());
        assert_eq!(frames_in_duration(-5, Rational::new(1, 9000), Rational::new(60, 1)), 0);
    }

    #[test]
    fn timestamps_compare_across_time_bases() {
        let a = FrameTimestamp::new(150, Rational::new(1, 9000)).unwrap();
        let b = FrameTimestamp::new(1, Rational::new(1, 60)).unwrap();
        let c = FrameTimestamp::new(151, Rational::new(1, 9000)).unwrap();
        assert_eq!(a, b);
        assert!(a < c);
        assert!(c > b);
        assert_eq!(a.as_duration(), Duration::from_nanos(16_666_666));
    }

    #[test]
    fn timestamp_requires_positive_time_base() {
        assert!(FrameTimestamp::new(10, Rational::new(1, 0)).is_none());
        assert!(FrameTimestamp::new(10, Rational::new(1, -9000)).is_none());
        assert!(FrameTimestamp::new(10, Rational::new(-1, 9000)).is_none());
        assert!(FrameTimestamp::new(-10, Rational::new(1, 9000)).is_some());
    }

    #[test]
    fn clock_timestamps_carry_the_time_base() {
        let clock = FrameClock::new(Rational::new(1, 9000), Rational::new(60, 1), 0).unwrap();
        let timestamp = clock.frame_timestamp(3);
        assert_eq!(timestamp.into_parts(), (450, Rational::new(1, 9000)));
        assert!(clock.frame_timestamp(4) > timestamp);
    }
}
