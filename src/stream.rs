//! Core [`VideoStream`] implementation.
//!
//! `VideoStream` is the main entry point for the crate. It opens a video,
//! negotiates the decoder, captures metadata, and answers frame requests by
//! index. The decoder, hardware device and output buffer are owned by the
//! stream and released when it is dropped.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::Path,
};

use ffmpeg_next::{Rational, codec::context::Context as CodecContext};
use image::RgbImage;

use crate::{
    configuration::StreamOptions,
    conversion::FrameConverter,
    decoder::DecoderSource,
    error::FrameSeekError,
    hardware::{self, HardwareContext},
    metadata::{OUTPUT_PIXEL_FORMAT, StreamMetadata},
    probe::{self, ProbedContainer},
    seek::{DecodeStats, SeekController},
    timing::{FrameClock, FrameTimestamp},
};

/// An open video file, addressable by frame index.
///
/// Created via [`VideoStream::open`] or [`VideoStream::open_with_options`].
/// All operations block until they finish. Decoding methods take
/// `&mut self`, so a stream serves one request at a time; open one stream
/// per file.
///
/// # Example
///
/// ```no_run
/// use frameseek::VideoStream;
///
/// let mut stream = VideoStream::open("input.mp4")?;
/// println!("{} ({}x{})", stream.decoder_name(), stream.width(), stream.height());
///
/// let pixels = stream.frame_buffer(42)?;
/// assert_eq!(pixels.len(), stream.width() as usize * stream.height() as usize * 3);
///
/// let (ticks, time_base) = stream.timestamp(42)?.into_parts();
/// println!("frame 42 at {ticks} x {time_base}");
/// # Ok::<(), frameseek::FrameSeekError>(())
/// ```
pub struct VideoStream {
    metadata: StreamMetadata,
    source: DecoderSource,
    controller: SeekController,
    converter: FrameConverter,
    /// Timestamp of the frame whose pixels are in the converter's buffer.
    buffer_pts: Option<i64>,
    hardware: Option<HardwareContext>,
}

impl Debug for VideoStream {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("VideoStream")
            .field("metadata", &self.metadata)
            .field("position", &self.controller.position())
            .field("stats", &self.controller.stats())
            .field("hardware", &self.hardware)
            .finish_non_exhaustive()
    }
}

impl VideoStream {
    /// Open an mp4 video for software decoding.
    ///
    /// `url` is a path, a `file:` URL, or any URL FFmpeg can read.
    ///
    /// # Errors
    ///
    /// - [`FrameSeekError::FileNotFound`] if a local path cannot be read.
    /// - [`FrameSeekError::UnsupportedContainer`] if the file is not an mp4
    ///   container or has no decodable video stream.
    pub fn open(url: &str) -> Result<Self, FrameSeekError> {
        Self::open_with_options(url, &StreamOptions::new())
    }

    /// Open a video with explicit options.
    ///
    /// # Errors
    ///
    /// Everything [`open`](VideoStream::open) returns, plus
    /// [`FrameSeekError::UnsupportedHardware`] when the requested accelerator
    /// is not advertised by the codec or cannot be initialised. Nothing
    /// acquired before the failure outlives the call.
    pub fn open_with_options(url: &str, options: &StreamOptions) -> Result<Self, FrameSeekError> {
        let probed = probe::open_container(url, options.container_type())?;
        let hardware = hardware::negotiate(&probed.codec, options.accelerator())?;
        let metadata =
            probed.describe(hardware.as_ref().map(|device| device.name().to_string()))?;

        let ProbedContainer {
            input,
            path,
            stream_index,
            parameters,
            codec,
            time_base,
            frame_rate,
            start_time,
            total_frames,
            frame_count_exact,
            ..
        } = probed;

        let unsupported = |reason: String| FrameSeekError::UnsupportedContainer {
            path: path.clone(),
            reason,
        };

        let mut codec_context = CodecContext::from_parameters(parameters)
            .map_err(|error| unsupported(format!("invalid codec parameters: {error}")))?;
        if let Some(device) = &hardware {
            device.attach(&mut codec_context);
        }

        let decoder = codec_context.decoder().video().map_err(|error| match &hardware {
            Some(device) => FrameSeekError::UnsupportedHardware {
                requested: device.name().to_string(),
                supported: metadata.hardware_accelerators_supported_by_codec(),
                reason: format!("decoder failed to open: {error}"),
            },
            None => unsupported(format!("failed to open {} decoder: {error}", codec.name())),
        })?;

        let clock = FrameClock::new(time_base, frame_rate, start_time)
            .ok_or_else(|| unsupported("stream timing is not positive".to_string()))?;

        // A duration-derived count can overshoot; its last second is only
        // trusted once decoded.
        let validation_margin = if frame_count_exact {
            0
        } else {
            one_second_of_frames(frame_rate)
        };

        log::info!(
            "Opened video: {} ({}x{}, {}, {:.3} fps, ~{} frames{}, decoder={}, hardware={})",
            path.display(),
            metadata.width,
            metadata.height,
            metadata.native_pixel_format,
            metadata.frames_per_second(),
            metadata.total_frames,
            if frame_count_exact { "" } else { " estimated" },
            metadata.codec,
            metadata.hardware_accelerator.as_deref().unwrap_or("none"),
        );

        let source = DecoderSource::new(
            input,
            decoder,
            stream_index,
            start_time,
            clock.frame_interval_ticks(),
        );

        Ok(Self {
            controller: SeekController::new(clock, total_frames, options.forward_window())
                .with_validation_margin(validation_margin),
            converter: FrameConverter::new(metadata.width, metadata.height),
            metadata,
            source,
            buffer_pts: None,
            hardware,
        })
    }

    /// Metadata captured when the stream was opened.
    pub fn metadata(&self) -> &StreamMetadata {
        &self.metadata
    }

    /// Human-readable codec description.
    pub fn decoder_name(&self) -> &str {
        &self.metadata.decoder_name
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.metadata.width
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.metadata.height
    }

    /// Output pixel format of [`frame_buffer`](VideoStream::frame_buffer),
    /// always `"rgb24"`.
    pub fn pixel_format(&self) -> &'static str {
        OUTPUT_PIXEL_FORMAT
    }

    /// Pixel format the decoder produces before conversion.
    pub fn native_pixel_format(&self) -> &str {
        &self.metadata.native_pixel_format
    }

    /// Seconds per stream tick.
    pub fn time_base(&self) -> Rational {
        self.metadata.time_base
    }

    /// Estimated frame count from the container; `0` if unknown.
    pub fn total_frames(&self) -> u64 {
        self.metadata.total_frames
    }

    /// Accelerator in use, `None` for software decoding.
    pub fn hardware_accelerator(&self) -> Option<&str> {
        self.metadata.hardware_accelerator.as_deref()
    }

    /// Accelerators the codec advertises, joined with `", "` in codec order.
    pub fn hardware_accelerators_supported_by_codec(&self) -> String {
        self.metadata.hardware_accelerators_supported_by_codec()
    }

    /// Index-to-timestamp mapping used by this stream.
    pub fn frame_clock(&self) -> FrameClock {
        *self.controller.clock()
    }

    /// Seek and decode work done so far.
    pub fn decode_stats(&self) -> DecodeStats {
        self.controller.stats()
    }

    /// Packed RGB24 pixels of frame `index`, `width * height * 3` bytes,
    /// rows top to bottom.
    ///
    /// The slice borrows the stream's reusable buffer and is overwritten by
    /// the next call; copy it out to keep it.
    ///
    /// # Errors
    ///
    /// - [`FrameSeekError::IndexOutOfRange`] for negative indices, indices
    ///   at or past the frame count, and indices the decoder cannot reach.
    /// - [`FrameSeekError::DecodeFailure`] on I/O or bitstream errors.
    pub fn frame_buffer(&mut self, index: i64) -> Result<&[u8], FrameSeekError> {
        let located = self.controller.locate(&mut self.source, index)?;

        if !located.fresh && self.buffer_pts == Some(located.pts) && self.converter.is_populated()
        {
            log::trace!("Frame {index} served from the current buffer");
            return Ok(self.converter.buffer());
        }

        self.buffer_pts = None;
        let buffer = self.converter.convert(self.source.current_frame())?;
        self.buffer_pts = Some(located.pts);
        Ok(buffer)
    }

    /// Presentation timestamp of frame `index` as `(ticks, time_base)`.
    ///
    /// Computed from the frame rate without decoding. Indices that the
    /// container's frame count cannot vouch for (any index when there is no
    /// count, or the last second of a duration-derived estimate) are
    /// confirmed by locating the frame first, so `timestamp` and
    /// [`frame_buffer`](VideoStream::frame_buffer) reject the same indices.
    ///
    /// # Errors
    ///
    /// The same [`FrameSeekError::IndexOutOfRange`] bounds as
    /// [`frame_buffer`](VideoStream::frame_buffer).
    pub fn timestamp(&mut self, index: i64) -> Result<FrameTimestamp, FrameSeekError> {
        let target = self.controller.check_bounds(index)?;
        if self.controller.needs_decode_to_validate(target) {
            self.controller.locate(&mut self.source, index)?;
        }

        self.controller.timestamp(index)
    }

    /// Hand back the most recent frame buffer without decoding, for
    /// re-uploading after the rendering surface was invalidated.
    ///
    /// `None` until a frame has been produced.
    pub fn reload_buffer(&self) -> Option<&[u8]> {
        self.converter.last()
    }

    /// Frame `index` as an owned [`RgbImage`].
    pub fn frame_image(&mut self, index: i64) -> Result<RgbImage, FrameSeekError> {
        let (width, height) = (self.width(), self.height());
        let pixels = self.frame_buffer(index)?.to_vec();
        RgbImage::from_raw(width, height, pixels).ok_or_else(|| {
            FrameSeekError::DecodeFailure(format!(
                "frame {index} does not fill a {width}x{height} image"
            ))
        })
    }

    /// Decode frame `index` and write it to `path`; the image format follows
    /// the file extension.
    pub fn save_frame<P: AsRef<Path>>(&mut self, index: i64, path: P) -> Result<(), FrameSeekError> {
        let image = self.frame_image(index)?;
        image.save(path)?;
        Ok(())
    }
}

/// Frames in one second at `frame_rate`, rounded up, at least one.
fn one_second_of_frames(frame_rate: Rational) -> u64 {
    let numerator = u64::try_from(frame_rate.numerator()).unwrap_or(0);
    let denominator = u64::try_from(frame_rate.denominator()).unwrap_or(1).max(1);
    numerator.div_ceil(denominator).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_margin_covers_one_second() {
        assert_eq!(one_second_of_frames(Rational(60, 1)), 60);
        assert_eq!(one_second_of_frames(Rational(30000, 1001)), 30);
        assert_eq!(one_second_of_frames(Rational(1, 2)), 1);
    }
}
