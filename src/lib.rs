//! # frameseek
//!
//! Frame-indexed video decoding for scrubbing and editing tools.
//!
//! `frameseek` opens a video file, reports its metadata, and returns any
//! frame by index as packed RGB24 pixels, together with that frame's exact
//! presentation timestamp. Decoding is powered by FFmpeg via the
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate, optionally on
//! a hardware accelerator.
//!
//! ## Quick Start
//!
//! ### Read a Frame
//!
//! ```no_run
//! use frameseek::VideoStream;
//!
//! let mut stream = VideoStream::open("input.mp4")?;
//! let pixels = stream.frame_buffer(0)?;
//! assert_eq!(pixels.len(), stream.metadata().frame_buffer_len());
//! # Ok::<(), frameseek::FrameSeekError>(())
//! ```
//!
//! ### Scrub With a Hardware Decoder
//!
//! ```no_run
//! use frameseek::{StreamOptions, VideoStream};
//!
//! let options = StreamOptions::new().with_accelerator("vaapi");
//! let mut stream = VideoStream::open_with_options("input.mp4", &options)?;
//!
//! for index in [120, 121, 122, 40, 41] {
//!     let timestamp = stream.timestamp(index)?;
//!     let pixels = stream.frame_buffer(index)?;
//!     println!("frame {index} at {:.3}s, {} bytes", timestamp.seconds(), pixels.len());
//! }
//! # Ok::<(), frameseek::FrameSeekError>(())
//! ```
//!
//! ### Save a Frame
//!
//! ```no_run
//! use frameseek::VideoStream;
//!
//! let mut stream = VideoStream::open("input.mp4")?;
//! stream.save_frame(30, "frame_30.png")?;
//! # Ok::<(), frameseek::FrameSeekError>(())
//! ```
//!
//! ## Features
//!
//! - **Random access**: any frame by index; nearby forward steps decode
//!   on from the current position instead of seeking
//! - **Exact timestamps**: index to timestamp mapping in the stream's own
//!   time base using rational arithmetic
//! - **Reusable output buffer**: one RGB24 buffer per stream, refilled in
//!   place on every call
//! - **Hardware decoding**: any device type the codec advertises, with no
//!   silent fallback to software
//! - **Stream probing**: lightweight `StreamProbe` for quick inspection
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod configuration;
mod conversion;
mod decoder;
pub mod error;
pub mod ffmpeg;
pub mod hardware;
pub mod metadata;
pub mod probe;
mod seek;
pub mod stream;
pub mod timing;

pub use configuration::{DEFAULT_CONTAINER_TYPE, StreamOptions};
pub use error::FrameSeekError;
pub use ffmpeg::{FfmpegLogLevel, get_ffmpeg_log_level, set_ffmpeg_log_level};
pub use ffmpeg_next::Rational;
pub use hardware::{HardwareContext, available_accelerators, supported_accelerators};
pub use metadata::{OUTPUT_PIXEL_FORMAT, StreamMetadata};
pub use probe::StreamProbe;
pub use seek::DecodeStats;
pub use stream::VideoStream;
pub use timing::{FrameClock, FrameTimestamp};
