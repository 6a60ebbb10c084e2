//! Stream metadata.
//!
//! [`StreamMetadata`] is captured once when a stream is opened and never
//! changes afterwards. It describes the first video stream of the container
//! and the decoder chosen for it.

use std::time::Duration;

use ffmpeg_next::Rational;

use crate::hardware::format_accelerator_list;

/// Identifier of the fixed output pixel layout: packed 8-bit RGB.
pub const OUTPUT_PIXEL_FORMAT: &str = "rgb24";

/// Bytes per pixel of [`OUTPUT_PIXEL_FORMAT`].
pub const OUTPUT_BYTES_PER_PIXEL: usize = 3;

/// Metadata for an opened video stream.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct StreamMetadata {
    /// Human-readable codec description, e.g.
    /// `"H.264 / AVC / MPEG-4 AVC / MPEG-4 part 10"`.
    pub decoder_name: String,
    /// Short codec name, e.g. `"h264"`.
    pub codec: String,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Decoder-native pixel format, e.g. `"yuv420p"`.
    pub native_pixel_format: String,
    /// Seconds per stream tick.
    pub time_base: Rational,
    /// Average frame rate used for index-to-timestamp mapping.
    pub frame_rate: Rational,
    /// Tick of the first frame.
    pub start_time: i64,
    /// Estimated number of frames. `0` when no duration is known.
    pub total_frames: u64,
    /// Stream duration, when the container reports one.
    pub duration: Option<Duration>,
    /// Demuxer name as reported by FFmpeg, e.g. `"mov,mp4,m4a,3gp,3g2,mj2"`.
    pub container: String,
    /// Index of the video stream inside the container.
    pub stream_index: usize,
    /// Accelerator in use, `None` for software decoding.
    pub hardware_accelerator: Option<String>,
    /// Accelerators the codec advertises, in codec order.
    pub supported_accelerators: Vec<String>,
}

impl StreamMetadata {
    /// The fixed output pixel format identifier.
    pub fn pixel_format(&self) -> &'static str {
        OUTPUT_PIXEL_FORMAT
    }

    /// Size in bytes of one converted frame.
    pub fn frame_buffer_len(&self) -> usize {
        self.width as usize * self.height as usize * OUTPUT_BYTES_PER_PIXEL
    }

    /// Comma-separated accelerator list, e.g. `"cuda, vaapi, vdpau, vulkan"`.
    pub fn hardware_accelerators_supported_by_codec(&self) -> String {
        format_accelerator_list(&self.supported_accelerators)
    }

    /// Frame rate as a float, for display.
    pub fn frames_per_second(&self) -> f64 {
        self.frame_rate.numerator() as f64 / self.frame_rate.denominator().max(1) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StreamMetadata {
        StreamMetadata {
            decoder_name: "H.264 / AVC / MPEG-4 AVC / MPEG-4 part 10".to_string(),
            codec: "h264".to_string(),
            width: 640,
            height: 480,
            native_pixel_format: "yuv420p".to_string(),
            time_base: Rational(1, 9000),
            frame_rate: Rational(30000, 1001),
            start_time: 0,
            total_frames: 60,
            duration: Some(Duration::from_secs(2)),
            container: "mov,mp4,m4a,3gp,3g2,mj2".to_string(),
            stream_index: 0,
            hardware_accelerator: None,
            supported_accelerators: vec![
                "cuda".to_string(),
                "vaapi".to_string(),
                "vdpau".to_string(),
                "vulkan".to_string(),
            ],
        }
    }

    #[test]
    fn accelerator_list_keeps_codec_order() {
        assert_eq!(
            sample().hardware_accelerators_supported_by_codec(),
            "cuda, vaapi, vdpau, vulkan"
        );
    }

    #[test]
    fn buffer_length_is_three_bytes_per_pixel() {
        let metadata = sample();
        assert_eq!(metadata.frame_buffer_len(), 640 * 480 * 3);
        assert_eq!(metadata.pixel_format(), "rgb24");
    }

    #[test]
    fn ntsc_frame_rate_as_float() {
        assert!((sample().frames_per_second() - 29.97).abs() < 0.001);
    }
}
