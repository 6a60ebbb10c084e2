//! Decoded frame to packed RGB24 conversion.
//!
//! [`FrameConverter`] reads hardware surfaces back to system memory, runs a
//! cached software scaler into RGB24 at the stream's dimensions and packs
//! the rows into one reusable buffer. The buffer keeps its allocation across
//! calls and always holds the last converted frame.

use ffmpeg_next::{
    format::Pixel,
    frame::Video as VideoFrame,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};

use crate::{
    error::FrameSeekError,
    hardware::{is_hardware_frame, transfer_hardware_frame},
    metadata::OUTPUT_BYTES_PER_PIXEL,
};

/// Source layout a cached scaler was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScalerKey {
    format: Pixel,
    width: u32,
    height: u32,
}

pub(crate) struct FrameConverter {
    width: u32,
    height: u32,
    scaler: Option<(ScalerKey, ScalingContext)>,
    software_frame: VideoFrame,
    rgb_frame: VideoFrame,
    buffer: Vec<u8>,
    populated: bool,
}

impl FrameConverter {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            scaler: None,
            software_frame: VideoFrame::empty(),
            rgb_frame: VideoFrame::empty(),
            buffer: Vec::with_capacity(width as usize * height as usize * OUTPUT_BYTES_PER_PIXEL),
            populated: false,
        }
    }

    /// Convert `frame` into the reusable buffer and return it.
    pub fn convert(&mut self, frame: &VideoFrame) -> Result<&[u8], FrameSeekError> {
        let Self {
            width,
            height,
            scaler,
            software_frame,
            rgb_frame,
            buffer,
            populated,
        } = self;

        let source = if is_hardware_frame(frame) {
            transfer_hardware_frame(frame, software_frame)?;
            &*software_frame
        } else {
            frame
        };

        let key = ScalerKey {
            format: source.format(),
            width: source.width(),
            height: source.height(),
        };
        let context = match scaler {
            Some((cached, context)) if *cached == key => context,
            _ => {
                log::debug!(
                    "Building scaler {:?} {}x{} -> RGB24 {}x{}",
                    key.format,
                    key.width,
                    key.height,
                    width,
                    height
                );
                let context = ScalingContext::get(
                    key.format,
                    key.width,
                    key.height,
                    Pixel::RGB24,
                    *width,
                    *height,
                    ScalingFlags::BILINEAR,
                )
                .map_err(|error| {
                    FrameSeekError::DecodeFailure(format!(
                        "cannot convert {:?} frames to RGB24: {error}",
                        key.format
                    ))
                })?;
                &mut scaler.insert((key, context)).1
            }
        };

        context.run(source, rgb_frame).map_err(|error| {
            FrameSeekError::DecodeFailure(format!("pixel conversion failed: {error}"))
        })?;

        let row_bytes = *width as usize * OUTPUT_BYTES_PER_PIXEL;
        pack_rows(
            rgb_frame.data(0),
            rgb_frame.stride(0),
            row_bytes,
            *height as usize,
            buffer,
        );
        *populated = true;

        Ok(buffer.as_slice())
    }

    /// The last converted frame, if any.
    pub fn last(&self) -> Option<&[u8]> {
        self.populated.then_some(self.buffer.as_slice())
    }

    pub fn is_populated(&self) -> bool {
        self.populated
    }

    /// The reusable buffer; empty until the first conversion.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }
}

/// Copy `rows` rows of `row_bytes` bytes out of a plane with `stride` bytes
/// per row into `out`, dropping the padding. `out` is cleared first and
/// keeps its capacity.
pub(crate) fn pack_rows(data: &[u8], stride: usize, row_bytes: usize, rows: usize, out: &mut Vec<u8>) {
    out.clear();

    if stride == row_bytes {
        out.extend_from_slice(&data[..row_bytes * rows]);
    } else {
        for row in 0..rows {
            let row_start = row * stride;
            out.extend_from_slice(&data[row_start..row_start + row_bytes]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tight_plane_is_copied_whole() {
        let data: Vec<u8> = (0..12).collect();
        let mut out = Vec::new();
        pack_rows(&data, 6, 6, 2, &mut out);
        assert_eq!(out, data);
    }

    #[test]
    fn padding_is_stripped() {
        // Two rows of 2 RGB pixels, each row padded to 8 bytes.
        let data = [1, 2, 3, 4, 5, 6, 0, 0, 7, 8, 9, 10, 11, 12, 0, 0];
        let mut out = Vec::new();
        pack_rows(&data, 8, 6, 2, &mut out);
        assert_eq!(out, [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
    }

    #[test]
    fn buffer_allocation_is_reused() {
        let mut out = Vec::with_capacity(64);
        let pointer = out.as_ptr();
        pack_rows(&[9; 16], 8, 6, 2, &mut out);
        pack_rows(&[3; 16], 8, 6, 2, &mut out);
        assert_eq!(out, [3; 12]);
        assert_eq!(out.as_ptr(), pointer);
    }
}
