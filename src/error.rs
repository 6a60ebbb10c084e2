//! Error types for the `frameseek` crate.
//!
//! This module defines [`FrameSeekError`], the unified error type returned by
//! all fallible operations in the crate. Every error is fatal to the single
//! operation that raised it; nothing is retried internally. Callers decide
//! how to recover, for example by reopening a stream without an accelerator
//! after [`FrameSeekError::UnsupportedHardware`].

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

/// The unified error type for all `frameseek` operations.
///
/// Variants carry enough context to diagnose the problem without needing
/// additional logging at the call site.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FrameSeekError {
    /// The path does not resolve to a readable file.
    #[error("Video file not found at {path}: {reason}")]
    FileNotFound {
        /// Path (or URL) that was passed to [`crate::VideoStream::open`].
        path: PathBuf,
        /// Underlying reason the file could not be read.
        reason: String,
    },

    /// The container or codec cannot be opened, does not match the
    /// expected container type, or holds no usable video stream.
    #[error("Unsupported container {path}: {reason}")]
    UnsupportedContainer {
        /// Path (or URL) of the rejected file.
        path: PathBuf,
        /// Why the container was rejected.
        reason: String,
    },

    /// The requested accelerator is not advertised by the codec, or its
    /// device context could not be created.
    #[error(
        "Hardware accelerator '{requested}' is unavailable: {reason} (codec supports: {supported})"
    )]
    UnsupportedHardware {
        /// Accelerator name that was requested.
        requested: String,
        /// Comma-separated accelerators the codec advertises, in codec order.
        supported: String,
        /// Why negotiation failed.
        reason: String,
    },

    /// The frame index is negative or beyond the decodable stream length.
    #[error("Frame {index} is out of range (video has {total_frames} frames)")]
    IndexOutOfRange {
        /// The frame index that was requested.
        index: i64,
        /// The best known frame count at the time of the request.
        total_frames: u64,
    },

    /// An I/O or bitstream error occurred while decoding.
    #[error("Failed to decode video frame: {0}")]
    DecodeFailure(String),

    /// An error originating from the FFmpeg libraries outside a decode loop.
    #[error("FFmpeg error: {0}")]
    Ffmpeg(String),

    /// An I/O error occurred while writing files.
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// An error from the `image` crate while exporting a frame.
    #[error("Image processing error: {0}")]
    Image(#[from] ImageError),
}

impl From<FfmpegError> for FrameSeekError {
    fn from(error: FfmpegError) -> Self {
        FrameSeekError::Ffmpeg(error.to_string())
    }
}

impl FrameSeekError {
    /// Returns `true` for [`FrameSeekError::IndexOutOfRange`].
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, FrameSeekError::IndexOutOfRange { .. })
    }

    /// Returns `true` for [`FrameSeekError::UnsupportedHardware`].
    ///
    /// The usual response is to reopen the stream with software decoding.
    pub fn is_unsupported_hardware(&self) -> bool {
        matches!(self, FrameSeekError::UnsupportedHardware { .. })
    }
}
