//! Container probing.
//!
//! Opens a path or URL, checks the container against the caller's type hint,
//! selects the first video stream and reads the timing information every
//! later frame lookup depends on. [`StreamProbe`] reports the same metadata
//! without opening a decoder.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use ffmpeg_next::{
    Error as FfmpegError, Rational,
    codec::{Codec, Parameters, context::Context as CodecContext},
    format::{self, Pixel, context::Input, stream::Disposition},
    media::Type,
};

use crate::{
    configuration::StreamOptions,
    error::FrameSeekError,
    hardware,
    metadata::StreamMetadata,
    timing::{frames_in_duration, is_positive},
};

/// Microseconds, FFmpeg's container-level time base.
const CONTAINER_TIME_BASE: Rational = Rational(1, 1_000_000);

/// Everything learned about a container before a decoder is created.
pub(crate) struct ProbedContainer {
    pub input: Input,
    pub path: PathBuf,
    pub container: String,
    pub stream_index: usize,
    pub parameters: Parameters,
    pub codec: Codec,
    pub time_base: Rational,
    pub frame_rate: Rational,
    pub start_time: i64,
    pub total_frames: u64,
    /// `total_frames` comes from the container's own frame count rather than
    /// a duration.
    pub frame_count_exact: bool,
    pub duration: Option<Duration>,
}

impl ProbedContainer {
    /// Snapshot the stream as described by its codec parameters.
    pub fn describe(
        &self,
        hardware_accelerator: Option<String>,
    ) -> Result<StreamMetadata, FrameSeekError> {
        let unsupported = |reason: String| FrameSeekError::UnsupportedContainer {
            path: self.path.clone(),
            reason,
        };

        // Filling an unopened context only copies the parameters; no decoder
        // is initialised.
        let context = CodecContext::from_parameters(self.parameters.clone())
            .map_err(|error| unsupported(format!("invalid codec parameters: {error}")))?;
        let (width, height, format) = unsafe {
            let context = context.as_ptr();
            ((*context).width, (*context).height, Pixel::from((*context).pix_fmt))
        };

        let (Ok(width @ 1..), Ok(height @ 1..)) = (u32::try_from(width), u32::try_from(height))
        else {
            return Err(unsupported(format!("invalid frame size {width}x{height}")));
        };

        let native_pixel_format = format
            .descriptor()
            .map(|descriptor| descriptor.name().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        Ok(StreamMetadata {
            decoder_name: self.codec.description().to_string(),
            codec: self.codec.name().to_string(),
            width,
            height,
            native_pixel_format,
            time_base: self.time_base,
            frame_rate: self.frame_rate,
            start_time: self.start_time,
            total_frames: self.total_frames,
            duration: self.duration,
            container: self.container.clone(),
            stream_index: self.stream_index,
            hardware_accelerator,
            supported_accelerators: hardware::supported_accelerators(&self.codec),
        })
    }
}

/// Where a URL points and what to hand to FFmpeg.
struct Location {
    display: PathBuf,
    target: String,
    local: Option<PathBuf>,
}

fn resolve_location(url: &str) -> Location {
    let stripped = url.strip_prefix("file://").or_else(|| url.strip_prefix("file:"));
    match stripped {
        Some(path) => Location {
            display: PathBuf::from(url),
            target: path.to_string(),
            local: Some(PathBuf::from(path)),
        },
        None if url.contains("://") => Location {
            display: PathBuf::from(url),
            target: url.to_string(),
            local: None,
        },
        None => Location {
            display: PathBuf::from(url),
            target: url.to_string(),
            local: Some(PathBuf::from(url)),
        },
    }
}

fn check_local_file(path: &Path, display: &Path) -> Result<(), FrameSeekError> {
    let not_found = |reason: String| FrameSeekError::FileNotFound {
        path: display.to_path_buf(),
        reason,
    };

    let metadata = std::fs::metadata(path).map_err(|error| not_found(error.to_string()))?;
    if metadata.is_dir() {
        return Err(not_found("path is a directory".to_string()));
    }
    Ok(())
}

fn map_open_error(error: FfmpegError, display: &Path) -> FrameSeekError {
    if let FfmpegError::Other { errno } = error {
        let kind = std::io::Error::from_raw_os_error(errno).kind();
        if matches!(kind, ErrorKind::NotFound | ErrorKind::PermissionDenied) {
            return FrameSeekError::FileNotFound {
                path: display.to_path_buf(),
                reason: error.to_string(),
            };
        }
    }

    FrameSeekError::UnsupportedContainer {
        path: display.to_path_buf(),
        reason: error.to_string(),
    }
}

/// Whether the demuxer FFmpeg picked answers to `hint`, by short name or by
/// registered file extension.
pub(crate) fn container_matches(names: &str, extensions: &[&str], hint: &str) -> bool {
    let hint = hint.trim().trim_start_matches('.');
    if hint.is_empty() {
        return true;
    }

    names
        .split(',')
        .chain(extensions.iter().copied())
        .any(|candidate| candidate.trim().eq_ignore_ascii_case(hint))
}

fn valid_timestamp(value: i64) -> Option<i64> {
    (value != ffmpeg_sys_next::AV_NOPTS_VALUE).then_some(value)
}

/// Open `url` and locate its first video stream.
pub(crate) fn open_container(
    url: &str,
    container_type: Option<&str>,
) -> Result<ProbedContainer, FrameSeekError> {
    let location = resolve_location(url);
    let path = location.display.clone();
    log::debug!("Opening video: {}", path.display());

    crate::ffmpeg::ensure_initialized()?;

    if let Some(local) = &location.local {
        check_local_file(local, &path)?;
    }

    let input = format::input(&location.target).map_err(|error| map_open_error(error, &path))?;
    let unsupported = |reason: String| FrameSeekError::UnsupportedContainer {
        path: path.clone(),
        reason,
    };

    let container = input.format().name().to_string();
    if let Some(hint) = container_type {
        let demuxer = input.format();
        if !container_matches(demuxer.name(), &demuxer.extensions(), hint) {
            return Err(unsupported(format!(
                "expected a {hint} container, found {container}"
            )));
        }
    }

    let stream = input
        .streams()
        .find(|stream| {
            stream.parameters().medium() == Type::Video
                && !stream.disposition().contains(Disposition::ATTACHED_PIC)
        })
        .ok_or_else(|| unsupported("no video stream found".to_string()))?;

    let stream_index = stream.index();
    let parameters = stream.parameters();
    let codec_id = parameters.id();
    let codec = ffmpeg_next::decoder::find(codec_id)
        .ok_or_else(|| unsupported(format!("no decoder available for codec {codec_id:?}")))?;

    let time_base = stream.time_base();
    if !is_positive(time_base) {
        return Err(unsupported(format!(
            "invalid time base {}/{}",
            time_base.numerator(),
            time_base.denominator()
        )));
    }

    let frame_rate = if is_positive(stream.avg_frame_rate()) {
        stream.avg_frame_rate()
    } else if is_positive(stream.rate()) {
        log::warn!(
            "Stream {stream_index} has no average frame rate, using base rate {}/{}",
            stream.rate().numerator(),
            stream.rate().denominator()
        );
        stream.rate()
    } else {
        return Err(unsupported("stream reports no frame rate".to_string()));
    };

    let start_time = valid_timestamp(stream.start_time()).unwrap_or(0);

    // Stream duration first, then the container's. The muxer's frame count
    // (the sample table in mp4/mov) caps either.
    let stream_duration = valid_timestamp(stream.duration()).filter(|ticks| *ticks > 0);
    let container_duration = valid_timestamp(input.duration()).filter(|micros| *micros > 0);
    let (duration_frames, duration) = if let Some(ticks) = stream_duration {
        (
            frames_in_duration(ticks, time_base, frame_rate),
            Some(ticks_to_duration(ticks, time_base)),
        )
    } else if let Some(micros) = container_duration {
        (
            frames_in_duration(micros, CONTAINER_TIME_BASE, frame_rate),
            Some(Duration::from_micros(micros as u64)),
        )
    } else {
        (0, None)
    };
    let counted_frames = u64::try_from(stream.frames()).unwrap_or(0);
    let (total_frames, frame_count_exact) = match (duration_frames, counted_frames) {
        (estimate, 0) => (estimate, false),
        (0, counted) => (counted, true),
        (estimate, counted) => (estimate.min(counted), true),
    };
    if total_frames == 0 {
        log::warn!("No duration or frame count for stream {stream_index}; frame count is unknown");
    }

    log::debug!(
        "Probed {}: container={container}, stream={stream_index}, codec={}, time_base={}/{}, rate={}/{}, ~{total_frames} frames",
        path.display(),
        codec.name(),
        time_base.numerator(),
        time_base.denominator(),
        frame_rate.numerator(),
        frame_rate.denominator(),
    );

    Ok(ProbedContainer {
        input,
        path,
        container,
        stream_index,
        parameters,
        codec,
        time_base,
        frame_rate,
        start_time,
        total_frames,
        frame_count_exact,
        duration,
    })
}

fn ticks_to_duration(ticks: i64, time_base: Rational) -> Duration {
    let nanos = ticks as i128 * time_base.numerator() as i128 * 1_000_000_000
        / time_base.denominator() as i128;
    Duration::from_nanos(u64::try_from(nanos.max(0)).unwrap_or(u64::MAX))
}

/// Lightweight metadata probe.
///
/// Reads the container and codec parameters into a [`StreamMetadata`]
/// without opening a decoder or creating a hardware device, and releases
/// every FFmpeg resource before returning. Frame size and pixel format come
/// from the codec parameters, which is what a decoder would start with.
///
/// # Example
///
/// ```no_run
/// use frameseek::StreamProbe;
///
/// let metadata = StreamProbe::probe("input.mp4")?;
/// println!("{}x{}, ~{} frames", metadata.width, metadata.height, metadata.total_frames);
/// # Ok::<(), frameseek::FrameSeekError>(())
/// ```
pub struct StreamProbe;

impl StreamProbe {
    /// Probe with default options (mp4 hint, software decoding).
    pub fn probe(url: &str) -> Result<StreamMetadata, FrameSeekError> {
        Self::probe_with_options(url, &StreamOptions::new())
    }

    /// Probe with explicit options.
    ///
    /// A requested accelerator is checked against the codec's advertised
    /// list, as [`VideoStream::open_with_options`](crate::VideoStream::open_with_options)
    /// does, but no device is created, so a device that later fails to
    /// initialise is not detected here.
    pub fn probe_with_options(
        url: &str,
        options: &StreamOptions,
    ) -> Result<StreamMetadata, FrameSeekError> {
        let probed = open_container(url, options.container_type())?;
        if let Some(requested) = options.accelerator() {
            hardware::check_advertised(&probed.codec, requested)?;
        }
        probed.describe(options.accelerator().map(str::to_string))
    }

    /// Probe several inputs; failures are reported per entry.
    pub fn probe_many<S: AsRef<str>>(urls: &[S]) -> Vec<Result<StreamMetadata, FrameSeekError>> {
        urls.iter().map(|url| Self::probe(url.as_ref())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MOV_NAMES: &str = "mov,mp4,m4a,3gp,3g2,mj2";
    const MKV_EXTENSIONS: [&str; 5] = ["mkv", "mk3d", "mka", "mks", "webm"];

    #[test]
    fn container_hint_matches_short_names() {
        assert!(container_matches(MOV_NAMES, &[], "mp4"));
        assert!(container_matches(MOV_NAMES, &[], "MOV"));
        assert!(!container_matches(MOV_NAMES, &[], "avi"));
    }

    #[test]
    fn container_hint_matches_extensions() {
        assert!(container_matches("matroska,webm", &MKV_EXTENSIONS, "mkv"));
        assert!(container_matches("matroska,webm", &MKV_EXTENSIONS, ".mkv"));
        assert!(!container_matches("matroska,webm", &MKV_EXTENSIONS, "mp4"));
    }

    #[test]
    fn file_urls_resolve_to_local_paths() {
        let location = resolve_location("file:tests/clip.mp4");
        assert_eq!(location.target, "tests/clip.mp4");
        assert_eq!(location.local, Some(PathBuf::from("tests/clip.mp4")));

        let remote = resolve_location("https://example.com/clip.mp4");
        assert!(remote.local.is_none());
    }
}
