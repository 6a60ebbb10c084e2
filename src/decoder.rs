//! FFmpeg-backed [`FrameSource`].
//!
//! Wraps the demuxer and the (software or hardware) video decoder for one
//! stream. Seeking uses `avformat_seek_file` on the video stream itself, so
//! target timestamps stay in the stream's exact time base instead of being
//! rounded through microseconds.

use ffmpeg_next::{
    Error as FfmpegError, Packet, decoder::Video as VideoDecoder, format::context::Input,
    frame::Video as VideoFrame,
};

use crate::{error::FrameSeekError, seek::FrameSource};

pub(crate) struct DecoderSource {
    input: Input,
    decoder: VideoDecoder,
    stream_index: usize,
    frame: VideoFrame,
    draining: bool,
    /// Timestamp assumed for a first frame that carries none: the stream
    /// start after opening, one interval short of the target after a seek.
    anchor: i64,
    last_pts: Option<i64>,
    frame_interval: i64,
}

impl DecoderSource {
    pub fn new(
        input: Input,
        decoder: VideoDecoder,
        stream_index: usize,
        start_time: i64,
        frame_interval: i64,
    ) -> Self {
        Self {
            input,
            decoder,
            stream_index,
            frame: VideoFrame::empty(),
            draining: false,
            anchor: start_time,
            last_pts: None,
            frame_interval,
        }
    }

    /// The most recently decoded frame.
    pub fn current_frame(&self) -> &VideoFrame {
        &self.frame
    }

    fn frame_pts(&mut self) -> i64 {
        let pts = match self.frame.pts().or_else(|| self.frame.timestamp()) {
            Some(pts) => pts,
            None => {
                let guessed = synthesized_pts(self.last_pts, self.anchor, self.frame_interval);
                log::warn!("Decoded frame without timestamp, assuming {guessed}");
                guessed
            }
        };
        self.last_pts = Some(pts);
        pts
    }

    /// Send the next video packet to the decoder, or enter draining mode at
    /// end of input.
    fn feed(&mut self) -> Result<(), FrameSeekError> {
        loop {
            let mut packet = Packet::empty();
            match packet.read(&mut self.input) {
                Ok(()) => {
                    if packet.stream() as usize != self.stream_index {
                        continue;
                    }
                    return self.decoder.send_packet(&packet).map_err(|error| {
                        FrameSeekError::DecodeFailure(format!(
                            "decoder rejected packet at dts {:?}: {error}",
                            packet.dts()
                        ))
                    });
                }
                Err(FfmpegError::Eof) => {
                    self.draining = true;
                    return self.decoder.send_eof().map_err(|error| {
                        FrameSeekError::DecodeFailure(format!("failed to flush decoder: {error}"))
                    });
                }
                Err(error) => {
                    return Err(FrameSeekError::DecodeFailure(format!(
                        "failed to read packet: {error}"
                    )));
                }
            }
        }
    }
}

/// Anchor after seeking to `target`. The seek lands on a keyframe at or
/// before the target, so an untimed first frame must not count as reaching it.
fn seek_anchor(target: i64, frame_interval: i64) -> i64 {
    target.saturating_sub(frame_interval)
}

/// Timestamp for a frame decoded without one: the frame after `last_pts`,
/// or `anchor` when nothing has been decoded since the last seek.
fn synthesized_pts(last_pts: Option<i64>, anchor: i64, frame_interval: i64) -> i64 {
    last_pts.map_or(anchor, |last| last.saturating_add(frame_interval))
}

impl FrameSource for DecoderSource {
    fn seek_keyframe(&mut self, timestamp: i64) -> Result<(), FrameSeekError> {
        let stream_index = self.stream_index as i32;
        let result = unsafe {
            ffmpeg_sys_next::avformat_seek_file(
                self.input.as_mut_ptr(),
                stream_index,
                i64::MIN,
                timestamp,
                timestamp,
                0,
            )
        };

        if result < 0 {
            // Targets ahead of the first keyframe: rewind to the earliest one.
            log::warn!(
                "Seek to {timestamp} failed ({}), rewinding to stream start",
                FfmpegError::from(result)
            );
            let retry = unsafe {
                ffmpeg_sys_next::avformat_seek_file(
                    self.input.as_mut_ptr(),
                    stream_index,
                    i64::MIN,
                    i64::MIN,
                    timestamp,
                    0,
                )
            };
            if retry < 0 {
                return Err(FrameSeekError::DecodeFailure(format!(
                    "seek to {timestamp} failed: {}",
                    FfmpegError::from(retry)
                )));
            }
        }

        self.decoder.flush();
        self.draining = false;
        self.anchor = seek_anchor(timestamp, self.frame_interval);
        self.last_pts = None;
        Ok(())
    }

    fn decode_next(&mut self) -> Result<Option<i64>, FrameSeekError> {
        loop {
            match self.decoder.receive_frame(&mut self.frame) {
                Ok(()) => return Ok(Some(self.frame_pts())),
                Err(FfmpegError::Eof) => return Ok(None),
                Err(FfmpegError::Other { errno }) if errno == ffmpeg_next::error::EAGAIN => {
                    if self.draining {
                        return Ok(None);
                    }
                    self.feed()?;
                }
                Err(error) => {
                    return Err(FrameSeekError::DecodeFailure(format!(
                        "failed to receive frame: {error}"
                    )));
                }
            }
        }
    }
}
