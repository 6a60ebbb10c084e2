//! Frame-index seek controller.
//!
//! The controller turns a frame index into a target timestamp, asks its
//! [`FrameSource`] for the keyframe at or before that timestamp and decodes
//! forward until the first frame whose presentation timestamp reaches the
//! target. Requests just ahead of the current position skip the seek and keep
//! decoding; the discard rule is the same, so both paths pick the same frame.
//!
//! The frame count read from the container is only an estimate. When the
//! decoder runs out of frames before reaching a target, the controller
//! remembers that index as the decodable limit and rejects it (and everything
//! after it) from then on. Indices in the last `validation_margin` frames of
//! the estimate, or any index when there is no estimate, are only trusted
//! once decoding has reached them, so timestamp lookups and frame lookups
//! accept the same indices.

use crate::{
    error::FrameSeekError,
    timing::{FrameClock, FrameTimestamp},
};

/// A sequential decoder that can jump back to keyframes.
pub(crate) trait FrameSource {
    /// Reposition at the keyframe at or before `timestamp` (stream ticks) and
    /// discard any buffered decoder state.
    fn seek_keyframe(&mut self, timestamp: i64) -> Result<(), FrameSeekError>;

    /// Decode the next frame in presentation order and return its
    /// timestamp, or `None` at end of stream. The decoded frame stays
    /// available from the source until the next call.
    fn decode_next(&mut self) -> Result<Option<i64>, FrameSeekError>;
}

/// Last frame the controller produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DecodePosition {
    /// Nothing decoded since open, or the last request failed.
    Idle,
    /// Frame `index` is held by the source with timestamp `pts`.
    Positioned { index: u64, pts: i64 },
}

/// Result of a successful lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LocatedFrame {
    pub index: u64,
    pub pts: i64,
    /// `false` when the source still holds the frame from an earlier request.
    pub fresh: bool,
}

/// Decode work performed so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    /// Keyframe seeks issued.
    pub seeks: u64,
    /// Frames pulled out of the decoder, discarded ones included.
    pub frames_decoded: u64,
}

enum Outcome {
    Found(i64),
    EndOfStream,
}

pub(crate) struct SeekController {
    clock: FrameClock,
    estimated_frames: u64,
    decodable_limit: Option<u64>,
    highest_decoded: Option<u64>,
    forward_window: u64,
    validation_margin: u64,
    position: DecodePosition,
    stats: DecodeStats,
}

impl SeekController {
    pub fn new(clock: FrameClock, estimated_frames: u64, forward_window: u64) -> Self {
        Self {
            clock,
            estimated_frames,
            decodable_limit: None,
            highest_decoded: None,
            forward_window,
            validation_margin: 0,
            position: DecodePosition::Idle,
            stats: DecodeStats::default(),
        }
    }

    /// Distrust the last `frames` indices of the estimate until decoding
    /// confirms them. `0` when the estimate is an exact count.
    pub fn with_validation_margin(mut self, frames: u64) -> Self {
        self.validation_margin = frames;
        self
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn position(&self) -> DecodePosition {
        self.position
    }

    pub fn stats(&self) -> DecodeStats {
        self.stats
    }

    /// Best known frame count: the estimate, tightened by anything learned
    /// from reaching end of stream. `0` when neither is known.
    pub fn known_frames(&self) -> u64 {
        match (self.estimated_frames, self.decodable_limit) {
            (0, Some(limit)) => limit,
            (estimate, Some(limit)) => estimate.min(limit),
            (estimate, None) => estimate,
        }
    }

    fn out_of_range(&self, index: i64) -> FrameSeekError {
        FrameSeekError::IndexOutOfRange {
            index,
            total_frames: self.known_frames(),
        }
    }

    /// Validate `index` against everything known without decoding.
    pub fn check_bounds(&self, index: i64) -> Result<u64, FrameSeekError> {
        let Ok(target) = u64::try_from(index) else {
            return Err(self.out_of_range(index));
        };

        if self.estimated_frames > 0 && target >= self.estimated_frames {
            return Err(self.out_of_range(index));
        }
        if self.decodable_limit.is_some_and(|limit| target >= limit) {
            return Err(self.out_of_range(index));
        }

        Ok(target)
    }

    /// Whether bounds for `index` can only be confirmed by decoding: nothing
    /// at or past `index` has been decoded yet, and either the stream
    /// reported no frame count or `index` lies in the untrusted tail of the
    /// estimate.
    pub fn needs_decode_to_validate(&self, index: u64) -> bool {
        if self.highest_decoded.is_some_and(|highest| index <= highest) {
            return false;
        }
        self.estimated_frames == 0
            || index.saturating_add(self.validation_margin) >= self.estimated_frames
    }

    /// Nominal timestamp of `index`, bounds-checked against what is known
    /// without decoding.
    pub fn timestamp(&self, index: i64) -> Result<FrameTimestamp, FrameSeekError> {
        let target = self.check_bounds(index)?;
        Ok(self.clock.frame_timestamp(target))
    }

    /// Drive `source` until it holds the frame for `index`.
    pub fn locate<S: FrameSource>(
        &mut self,
        source: &mut S,
        index: i64,
    ) -> Result<LocatedFrame, FrameSeekError> {
        let target = self.check_bounds(index)?;
        let target_timestamp = self.clock.timestamp(target);

        let held = match self.position {
            DecodePosition::Positioned { index: current, pts } if current == target => {
                log::trace!("Frame {target} already held");
                Some(LocatedFrame {
                    index: target,
                    pts,
                    fresh: false,
                })
            }
            DecodePosition::Positioned { index: current, pts }
                if target > current
                    && target - current <= self.forward_window
                    && pts >= target_timestamp =>
            {
                log::trace!("Frame {target} shares the held frame of {current}");
                Some(LocatedFrame {
                    index: target,
                    pts,
                    fresh: false,
                })
            }
            _ => None,
        };
        if let Some(frame) = held {
            self.position = DecodePosition::Positioned {
                index: target,
                pts: frame.pts,
            };
            return Ok(frame);
        }

        let continue_forward = matches!(
            self.position,
            DecodePosition::Positioned { index: current, .. }
                if target > current && target - current <= self.forward_window
        );

        let outcome = if continue_forward {
            log::trace!("Decoding forward to frame {target} (ts={target_timestamp})");
            self.decode_until(source, target_timestamp)
        } else {
            log::debug!("Seeking to frame {target} (ts={target_timestamp})");
            self.stats.seeks += 1;
            match source.seek_keyframe(target_timestamp) {
                Ok(()) => self.decode_until(source, target_timestamp),
                Err(error) => Err(error),
            }
        };

        match outcome {
            Ok(Outcome::Found(pts)) => {
                self.position = DecodePosition::Positioned { index: target, pts };
                self.highest_decoded = Some(self.highest_decoded.map_or(target, |h| h.max(target)));
                Ok(LocatedFrame {
                    index: target,
                    pts,
                    fresh: true,
                })
            }
            Ok(Outcome::EndOfStream) => {
                self.position = DecodePosition::Idle;
                self.decodable_limit = Some(self.decodable_limit.map_or(target, |l| l.min(target)));
                log::debug!(
                    "End of stream before frame {target}; decodable limit is now {}",
                    self.known_frames()
                );
                Err(self.out_of_range(index))
            }
            Err(error) => {
                self.position = DecodePosition::Idle;
                Err(error)
            }
        }
    }

    fn decode_until<S: FrameSource>(
        &mut self,
        source: &mut S,
        target_timestamp: i64,
    ) -> Result<Outcome, FrameSeekError> {
        while let Some(pts) = source.decode_next()? {
            self.stats.frames_decoded += 1;
            if pts >= target_timestamp {
                return Ok(Outcome::Found(pts));
            }
        }
        Ok(Outcome::EndOfStream)
    }
}
