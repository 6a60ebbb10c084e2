//! Stream configuration.
//!
//! [`StreamOptions`] is a builder that carries the container type hint, the
//! requested hardware accelerator and seek tuning into
//! [`VideoStream::open_with_options`](crate::VideoStream::open_with_options).
//!
//! # Example
//!
//! ```no_run
//! use frameseek::{StreamOptions, VideoStream};
//!
//! let options = StreamOptions::new()
//!     .with_container_type("mkv")
//!     .with_accelerator("vaapi");
//!
//! let stream = match VideoStream::open_with_options("input.mkv", &options) {
//!     Ok(stream) => stream,
//!     Err(error) if error.is_unsupported_hardware() => {
//!         VideoStream::open_with_options("input.mkv", &options.with_software_decoding())?
//!     }
//!     Err(error) => return Err(error),
//! };
//! # Ok::<(), frameseek::FrameSeekError>(())
//! ```

/// Container type hint used when none is given.
pub const DEFAULT_CONTAINER_TYPE: &str = "mp4";

/// Options applied when opening a [`VideoStream`](crate::VideoStream).
///
/// Defaults: container hint `"mp4"`, software decoding, forward window of
/// one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOptions {
    /// Expected container type. `None` accepts whatever FFmpeg detects.
    pub(crate) container_type: Option<String>,
    /// Requested accelerator name. `None` means software decoding.
    pub(crate) accelerator: Option<String>,
    /// How many frames ahead of the current position a request may be and
    /// still be served by decoding forward instead of seeking.
    pub(crate) forward_window: u64,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            container_type: Some(DEFAULT_CONTAINER_TYPE.to_string()),
            accelerator: None,
            forward_window: 1,
        }
    }

    /// Set the expected container type (e.g. `"mp4"`, `"mkv"`, `"avi"`).
    ///
    /// The hint is checked against the demuxer FFmpeg selects; a mismatch
    /// fails the open with
    /// [`UnsupportedContainer`](crate::FrameSeekError::UnsupportedContainer).
    #[must_use]
    pub fn with_container_type<S: Into<String>>(mut self, container_type: S) -> Self {
        self.container_type = Some(container_type.into());
        self
    }

    /// Accept any container FFmpeg can open.
    #[must_use]
    pub fn with_any_container(mut self) -> Self {
        self.container_type = None;
        self
    }

    /// Request a hardware accelerator by FFmpeg device name (`"cuda"`,
    /// `"vaapi"`, `"vdpau"`, `"vulkan"`, `"videotoolbox"`, ...).
    ///
    /// `"software"`, `"none"` and the empty string select software decoding.
    #[must_use]
    pub fn with_accelerator<S: AsRef<str>>(mut self, accelerator: S) -> Self {
        self.accelerator = normalize_accelerator(accelerator.as_ref());
        self
    }

    /// Decode in software.
    #[must_use]
    pub fn with_software_decoding(mut self) -> Self {
        self.accelerator = None;
        self
    }

    /// Set the forward decode window. `0` forces a keyframe seek on every
    /// request that moves the position.
    #[must_use]
    pub fn with_forward_window(mut self, frames: u64) -> Self {
        self.forward_window = frames;
        self
    }

    /// The container type hint, if any.
    pub fn container_type(&self) -> Option<&str> {
        self.container_type.as_deref()
    }

    /// The requested accelerator, if any.
    pub fn accelerator(&self) -> Option<&str> {
        self.accelerator.as_deref()
    }

    /// The forward decode window in frames.
    pub fn forward_window(&self) -> u64 {
        self.forward_window
    }
}

/// Map user-facing accelerator spellings to an optional device name.
pub(crate) fn normalize_accelerator(value: &str) -> Option<String> {
    let trimmed = value.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "" | "software" | "none" | "sw" | "cpu" => None,
        lowered => Some(lowered.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = StreamOptions::new();
        assert_eq!(options.container_type(), Some("mp4"));
        assert_eq!(options.accelerator(), None);
        assert_eq!(options.forward_window(), 1);
    }

    #[test]
    fn software_spellings_disable_hardware() {
        for name in ["software", "SOFTWARE", "none", "", "  "] {
            assert_eq!(StreamOptions::new().with_accelerator(name).accelerator(), None);
        }
        assert_eq!(
            StreamOptions::new().with_accelerator("CUDA").accelerator(),
            Some("cuda")
        );
    }
}
