//! FFmpeg initialisation and log level control.
//!
//! FFmpeg prints its own diagnostics to stderr independently of the Rust
//! [`log`](https://crates.io/crates/log) facade. Scrubbing through a damaged
//! file can produce a warning per packet, so applications usually want to
//! turn that output down without importing `ffmpeg-next` themselves.
//!
//! # Example
//!
//! ```no_run
//! use frameseek::{FfmpegLogLevel, VideoStream};
//!
//! frameseek::set_ffmpeg_log_level(FfmpegLogLevel::Error);
//! let stream = VideoStream::open("input.mp4").unwrap();
//! ```

use std::str::FromStr;

use ffmpeg_next::util::log::{self as ffmpeg_log, Level};

use crate::error::FrameSeekError;

/// How much FFmpeg itself prints, from silent to debugging output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FfmpegLogLevel {
    Quiet,
    Error,
    /// FFmpeg's default.
    Warning,
    Info,
    Debug,
}

/// Each level with the FFmpeg level it sets and the names it parses from,
/// quietest first.
const LEVELS: [(FfmpegLogLevel, Level, &[&str]); 5] = [
    (FfmpegLogLevel::Quiet, Level::Quiet, &["quiet", "off"]),
    (FfmpegLogLevel::Error, Level::Error, &["error"]),
    (FfmpegLogLevel::Warning, Level::Warning, &["warning", "warn"]),
    (FfmpegLogLevel::Info, Level::Info, &["info"]),
    (FfmpegLogLevel::Debug, Level::Debug, &["debug"]),
];

impl FromStr for FfmpegLogLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let name = value.trim().to_ascii_lowercase();
        LEVELS
            .iter()
            .find(|(_, _, names)| names.contains(&name.as_str()))
            .map(|(level, _, _)| *level)
            .ok_or_else(|| format!("unknown FFmpeg log level: {name}"))
    }
}

/// Set FFmpeg's internal log verbosity. Does not affect `log` output.
pub fn set_ffmpeg_log_level(level: FfmpegLogLevel) {
    if let Some((_, ffmpeg_level, _)) = LEVELS.iter().find(|(entry, _, _)| *entry == level) {
        ffmpeg_log::set_level(*ffmpeg_level);
    }
}

/// Current FFmpeg log verbosity. Levels set outside this crate (`fatal`,
/// `verbose`, ...) report the nearest quieter level.
pub fn get_ffmpeg_log_level() -> Option<FfmpegLogLevel> {
    let current = i32::from(ffmpeg_log::get_level().ok()?);
    LEVELS
        .iter()
        .rev()
        .find(|(_, ffmpeg_level, _)| i32::from(*ffmpeg_level) <= current)
        .map(|(level, _, _)| *level)
}

/// Initialise FFmpeg. Safe to call repeatedly.
pub(crate) fn ensure_initialized() -> Result<(), FrameSeekError> {
    ffmpeg_next::init().map_err(FrameSeekError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_names_parse() {
        assert_eq!("quiet".parse(), Ok(FfmpegLogLevel::Quiet));
        assert_eq!(" Warn ".parse(), Ok(FfmpegLogLevel::Warning));
        assert_eq!("DEBUG".parse(), Ok(FfmpegLogLevel::Debug));
        assert!("chatty".parse::<FfmpegLogLevel>().is_err());
    }

    #[test]
    fn levels_are_listed_quietest_first() {
        assert!(LEVELS.windows(2).all(|pair| pair[0].0 < pair[1].0));
        assert!(
            LEVELS
                .windows(2)
                .all(|pair| i32::from(pair[0].1) < i32::from(pair[1].1))
        );
    }

    #[test]
    fn log_level_round_trips_through_ffmpeg() {
        set_ffmpeg_log_level(FfmpegLogLevel::Error);
        assert_eq!(get_ffmpeg_log_level(), Some(FfmpegLogLevel::Error));

        // Levels without a variant report the nearest quieter one.
        ffmpeg_log::set_level(Level::Verbose);
        assert_eq!(get_ffmpeg_log_level(), Some(FfmpegLogLevel::Info));
        set_ffmpeg_log_level(FfmpegLogLevel::Warning);
    }
}
