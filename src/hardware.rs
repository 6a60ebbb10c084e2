//! Hardware-accelerated decoding.
//!
//! Accelerators are identified by FFmpeg device type names (`"cuda"`,
//! `"vaapi"`, `"vdpau"`, `"vulkan"`, `"videotoolbox"`, ...). Support is a
//! runtime capability query against the codec's hardware configurations,
//! so the set of names depends on both the codec and the FFmpeg build.
//!
//! Negotiation never falls back to software on its own. A requested
//! accelerator that the codec does not advertise, or whose device cannot
//! be created, fails with
//! [`FrameSeekError::UnsupportedHardware`](crate::FrameSeekError::UnsupportedHardware)
//! and the caller decides whether to reopen in software.

use std::ffi::{CStr, CString};

use ffmpeg_next::{
    codec::{Codec, context::Context as CodecContext},
    frame::Video as VideoFrame,
};
use ffmpeg_sys_next::{
    AV_CODEC_HW_CONFIG_METHOD_HW_DEVICE_CTX, AVBufferRef, AVCodecHWConfig, AVHWDeviceType,
};

use crate::error::FrameSeekError;

/// List the device types compiled into the linked FFmpeg build.
///
/// This is independent of any codec; use [`supported_accelerators`] for the
/// subset a particular codec can decode with.
pub fn available_accelerators() -> Vec<String> {
    let mut names = Vec::new();
    let mut device_type = AVHWDeviceType::AV_HWDEVICE_TYPE_NONE;

    loop {
        device_type = unsafe { ffmpeg_sys_next::av_hwdevice_iterate_types(device_type) };
        if device_type == AVHWDeviceType::AV_HWDEVICE_TYPE_NONE {
            break;
        }
        if let Some(name) = device_type_name(device_type) {
            names.push(name);
        }
    }

    names
}

/// Accelerators the codec advertises through a hardware device context, in
/// the codec's own order and without duplicates.
pub fn supported_accelerators(codec: &Codec) -> Vec<String> {
    let codec_pointer = unsafe { codec.as_ptr() };
    if codec_pointer.is_null() {
        return Vec::new();
    }

    let mut names: Vec<String> = Vec::new();
    let mut index: i32 = 0;

    loop {
        let config: *const AVCodecHWConfig =
            unsafe { ffmpeg_sys_next::avcodec_get_hw_config(codec_pointer, index) };
        if config.is_null() {
            break;
        }

        let methods = unsafe { (*config).methods };
        let device_type = unsafe { (*config).device_type };
        if methods & (AV_CODEC_HW_CONFIG_METHOD_HW_DEVICE_CTX as i32) != 0
            && device_type != AVHWDeviceType::AV_HWDEVICE_TYPE_NONE
        {
            if let Some(name) = device_type_name(device_type) {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }

        index += 1;
    }

    names
}

/// Join accelerator names the way the presentation layer displays them.
pub fn format_accelerator_list(names: &[String]) -> String {
    names.join(", ")
}

/// An FFmpeg hardware device context.
///
/// Owns one reference to the device; the reference is released on drop.
/// Decoders that use the device hold their own reference.
pub struct HardwareContext {
    device: *mut AVBufferRef,
    name: String,
}

impl HardwareContext {
    /// The accelerator name this context was created for.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Hand a new device reference to `codec_context`. Must be called
    /// before the decoder is opened.
    pub(crate) fn attach(&self, codec_context: &mut CodecContext) {
        unsafe {
            let context_pointer = codec_context.as_mut_ptr();
            if !(*context_pointer).hw_device_ctx.is_null() {
                ffmpeg_sys_next::av_buffer_unref(&mut (*context_pointer).hw_device_ctx);
            }
            (*context_pointer).hw_device_ctx = ffmpeg_sys_next::av_buffer_ref(self.device);
        }
    }
}

impl std::fmt::Debug for HardwareContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HardwareContext")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Drop for HardwareContext {
    fn drop(&mut self) {
        if !self.device.is_null() {
            unsafe {
                ffmpeg_sys_next::av_buffer_unref(&mut self.device);
            }
            log::debug!("Released {} hardware device", self.name);
        }
    }
}

/// Negotiate a hardware context for `codec`.
///
/// `requested == None` selects software decoding and always succeeds with
/// `Ok(None)`. A named accelerator is checked against
/// [`supported_accelerators`] before any device is created.
///
/// # Errors
///
/// [`FrameSeekError::UnsupportedHardware`] if the codec does not advertise
/// the accelerator or the device context cannot be created. The error
/// carries the codec's supported list.
pub fn negotiate(
    codec: &Codec,
    requested: Option<&str>,
) -> Result<Option<HardwareContext>, FrameSeekError> {
    let Some(requested) = requested else {
        log::debug!("Software decoding selected for codec {}", codec.name());
        return Ok(None);
    };

    let device_type = check_advertised(codec, requested)?;

    let mut device: *mut AVBufferRef = std::ptr::null_mut();
    let result = unsafe {
        ffmpeg_sys_next::av_hwdevice_ctx_create(
            &mut device,
            device_type,
            std::ptr::null(),
            std::ptr::null_mut(),
            0,
        )
    };

    if result < 0 || device.is_null() {
        return Err(FrameSeekError::UnsupportedHardware {
            requested: requested.to_string(),
            supported: format_accelerator_list(&supported_accelerators(codec)),
            reason: format!(
                "device context creation failed: {}",
                ffmpeg_next::Error::from(result)
            ),
        });
    }

    log::info!(
        "Created {requested} hardware device for codec {}",
        codec.name()
    );

    Ok(Some(HardwareContext {
        device,
        name: requested.to_string(),
    }))
}

/// Check that `codec` advertises `requested` and that FFmpeg knows the
/// device type, without creating a device.
pub(crate) fn check_advertised(
    codec: &Codec,
    requested: &str,
) -> Result<AVHWDeviceType, FrameSeekError> {
    let supported = supported_accelerators(codec);
    let unsupported = |reason: String| FrameSeekError::UnsupportedHardware {
        requested: requested.to_string(),
        supported: format_accelerator_list(&supported),
        reason,
    };

    if !supported.iter().any(|name| name == requested) {
        return Err(unsupported(format!(
            "not advertised by codec {}",
            codec.name()
        )));
    }

    device_type_by_name(requested).ok_or_else(|| unsupported("unknown device type".to_string()))
}

/// Whether `frame` lives in device memory and needs a readback.
pub(crate) fn is_hardware_frame(frame: &VideoFrame) -> bool {
    unsafe { !(*frame.as_ptr()).hw_frames_ctx.is_null() }
}

/// Read a hardware surface back into `software_frame`, reusing its
/// allocation where FFmpeg allows.
pub(crate) fn transfer_hardware_frame(
    hardware_frame: &VideoFrame,
    software_frame: &mut VideoFrame,
) -> Result<(), FrameSeekError> {
    let result = unsafe {
        ffmpeg_sys_next::av_frame_unref(software_frame.as_mut_ptr());
        ffmpeg_sys_next::av_hwframe_transfer_data(
            software_frame.as_mut_ptr(),
            hardware_frame.as_ptr(),
            0,
        )
    };

    if result < 0 {
        return Err(FrameSeekError::DecodeFailure(format!(
            "hardware frame transfer failed: {}",
            ffmpeg_next::Error::from(result)
        )));
    }

    unsafe {
        ffmpeg_sys_next::av_frame_copy_props(software_frame.as_mut_ptr(), hardware_frame.as_ptr());
    }

    Ok(())
}

fn device_type_name(device_type: AVHWDeviceType) -> Option<String> {
    let name = unsafe { ffmpeg_sys_next::av_hwdevice_get_type_name(device_type) };
    if name.is_null() {
        return None;
    }
    let name = unsafe { CStr::from_ptr(name) };
    Some(name.to_string_lossy().into_owned())
}

fn device_type_by_name(name: &str) -> Option<AVHWDeviceType> {
    let name = CString::new(name).ok()?;
    let device_type = unsafe { ffmpeg_sys_next::av_hwdevice_find_type_by_name(name.as_ptr()) };
    if device_type == AVHWDeviceType::AV_HWDEVICE_TYPE_NONE {
        None
    } else {
        Some(device_type)
    }
}
