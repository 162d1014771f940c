//! Animation accumulator.
//!
//! Encodes pictures one at a time and queues them on an absolute timeline.
//! A frame's duration is only known once the next frame (or the end of the
//! sequence) arrives, so the most recent frame is held back until then.
//!
//! ```rust
//! use zensticker::mux::{AnimationAccumulator, assemble};
//! use zensticker::{EncodingConfig, Picture};
//! use rgb::RGBA8;
//!
//! let mut anim = AnimationAccumulator::new(16, 16, EncodingConfig::new())?;
//! let red = Picture::from_pixels(vec![RGBA8::new(255, 0, 0, 255); 256], 16, 16).unwrap();
//! anim.append(&red, 0)?;
//! anim.append(&red, 100)?;
//! anim.finalize(250)?;
//!
//! let container = assemble(anim)?;
//! assert_eq!(container.total_duration_ms(), 250);
//! # Ok::<(), zensticker::mux::MuxError>(())
//! ```

use super::assemble::{MuxFrame, WebPMux};
use super::error::MuxError;
use crate::encoder::{EncodingConfig, MAX_DIMENSION, Picture, encode_picture};

/// Largest duration an `ANMF` chunk can carry.
const MAX_FRAME_DURATION_MS: u32 = (1 << 24) - 1;

/// Last-frame duration when the sequence was never finalized and there is
/// no earlier frame to average over.
const FALLBACK_LAST_DURATION_MS: u32 = 100;

/// Frame waiting for the next timestamp to compute its duration.
struct PendingFrame {
    mux_frame: MuxFrame,
    timestamp_ms: u32,
}

/// Owns the encoder state of one animation run.
///
/// Consumed by [`assemble`](super::assemble), which produces the container.
pub struct AnimationAccumulator {
    width: u32,
    height: u32,
    config: EncodingConfig,
    mux: WebPMux,
    pending: Option<PendingFrame>,
    first_timestamp_ms: Option<u32>,
    frames_appended: u32,
}

impl AnimationAccumulator {
    /// Create an accumulator for a `width x height` canvas.
    ///
    /// The canvas dimensions must be between 1 and 16383 (inclusive), the
    /// largest frame a VP8 header can describe.
    pub fn new(width: u32, height: u32, config: EncodingConfig) -> Result<Self, MuxError> {
        let max = MAX_DIMENSION as u32;
        if width == 0 || height == 0 || width > max || height > max {
            return Err(MuxError::InvalidDimensions { width, height });
        }
        config.validate()?;

        let mut mux = WebPMux::new(width, height);
        mux.set_animation(config.background_color, config.loop_count());
        Ok(Self {
            width,
            height,
            config,
            mux,
            pending: None,
            first_timestamp_ms: None,
            frames_appended: 0,
        })
    }

    /// Canvas width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Canvas height.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of frames accepted so far.
    pub fn frame_count(&self) -> u32 {
        self.frames_appended
    }

    /// Encodes `picture` and queues it to start at `timestamp_ms`.
    ///
    /// The previously queued frame lasts until `timestamp_ms`. On error the
    /// accumulator is unchanged.
    pub fn append(&mut self, picture: &Picture, timestamp_ms: u32) -> Result<(), MuxError> {
        let (width, height) = (picture.width() as u32, picture.height() as u32);
        if width != self.width || height != self.height {
            return Err(MuxError::FrameDimensionMismatch {
                width,
                height,
                canvas_width: self.width,
                canvas_height: self.height,
            });
        }
        self.check_timestamp(timestamp_ms)?;

        let encoded = encode_picture(picture, &self.config)?;

        self.flush_pending(timestamp_ms)?;
        self.pending = Some(PendingFrame {
            mux_frame: MuxFrame {
                width,
                height,
                // set when the next frame arrives or on finalize
                duration_ms: 0,
                bitstream: encoded.bitstream,
                alpha_data: encoded.alpha_data,
            },
            timestamp_ms,
        });
        if self.first_timestamp_ms.is_none() {
            self.first_timestamp_ms = Some(timestamp_ms);
        }
        self.frames_appended += 1;
        Ok(())
    }

    /// Ends the sequence: the last frame lasts until `timestamp_ms`.
    pub fn finalize(&mut self, timestamp_ms: u32) -> Result<(), MuxError> {
        if self.pending.is_none() {
            return Err(MuxError::NoFrames);
        }
        self.check_timestamp(timestamp_ms)?;
        self.flush_pending(timestamp_ms)
    }

    fn check_timestamp(&self, timestamp_ms: u32) -> Result<(), MuxError> {
        match &self.pending {
            Some(prev) if timestamp_ms <= prev.timestamp_ms => Err(MuxError::TimestampOutOfOrder {
                timestamp_ms,
                previous_ms: prev.timestamp_ms,
            }),
            _ => Ok(()),
        }
    }

    fn flush_pending(&mut self, timestamp_ms: u32) -> Result<(), MuxError> {
        if let Some(prev) = self.pending.take() {
            let mut frame = prev.mux_frame;
            frame.duration_ms = clamp_duration(timestamp_ms - prev.timestamp_ms);
            self.mux.push_frame(frame)?;
        }
        Ok(())
    }

    /// Hands the queued frames to the container writer.
    ///
    /// Without a [`finalize`](Self::finalize) the last frame gets the average
    /// duration of the frames before it.
    pub(super) fn into_mux(mut self) -> Result<WebPMux, MuxError> {
        if let Some(prev) = &self.pending {
            let earlier = self.frames_appended.saturating_sub(1);
            let duration = match self.first_timestamp_ms {
                Some(first) if earlier > 0 => ((prev.timestamp_ms - first) / earlier).max(1),
                _ => FALLBACK_LAST_DURATION_MS,
            };
            log::warn!("animation was not finalized, last frame lasts {duration} ms");
            let end = prev.timestamp_ms.saturating_add(duration);
            self.flush_pending(end)?;
        }
        Ok(self.mux)
    }
}

fn clamp_duration(duration_ms: u32) -> u32 {
    if duration_ms > MAX_FRAME_DURATION_MS {
        log::warn!("frame duration {duration_ms} ms clamped to {MAX_FRAME_DURATION_MS} ms");
        MAX_FRAME_DURATION_MS
    } else {
        duration_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;
    use rgb::RGBA8;

    fn solid(width: usize, height: usize, color: RGBA8) -> Picture {
        Picture::from_pixels(vec![color; width * height], width, height).unwrap()
    }

    #[test]
    fn test_rejects_bad_canvas() {
        assert!(matches!(
            AnimationAccumulator::new(0, 10, EncodingConfig::new()),
            Err(MuxError::InvalidDimensions { .. })
        ));
        assert!(matches!(
            AnimationAccumulator::new(16384, 10, EncodingConfig::new()),
            Err(MuxError::InvalidDimensions { .. })
        ));
        assert!(AnimationAccumulator::new(16383, 1, EncodingConfig::new()).is_ok());
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = EncodingConfig::new();
        config.quality = 200;
        assert!(matches!(
            AnimationAccumulator::new(8, 8, config),
            Err(MuxError::EncodeError(_))
        ));
    }

    #[test]
    fn test_durations_follow_timestamps() {
        let mut anim = AnimationAccumulator::new(8, 8, EncodingConfig::new()).unwrap();
        anim.append(&solid(8, 8, RGBA8::new(255, 0, 0, 255)), 0).unwrap();
        anim.append(&solid(8, 8, RGBA8::new(0, 255, 0, 255)), 100).unwrap();
        anim.finalize(350).unwrap();
        let durations: Vec<u32> = anim.mux.frames().iter().map(|f| f.duration_ms).collect();
        assert_eq!(durations, [100, 250]);
    }

    #[test]
    fn test_frame_errors_leave_state_unchanged() {
        let mut anim = AnimationAccumulator::new(8, 8, EncodingConfig::new()).unwrap();
        let ok = solid(8, 8, RGBA8::new(1, 2, 3, 255));
        anim.append(&ok, 10).unwrap();
        assert!(matches!(
            anim.append(&solid(4, 8, RGBA8::default()), 20),
            Err(MuxError::FrameDimensionMismatch { width: 4, .. })
        ));
        assert!(matches!(
            anim.append(&ok, 10),
            Err(MuxError::TimestampOutOfOrder { previous_ms: 10, .. })
        ));
        assert_eq!(anim.frame_count(), 1);
        assert!(anim.mux.frames().is_empty());
    }

    #[test]
    fn test_finalize_without_frames_fails() {
        let mut anim = AnimationAccumulator::new(8, 8, EncodingConfig::new()).unwrap();
        assert!(matches!(anim.finalize(100), Err(MuxError::NoFrames)));
    }

    #[test]
    fn test_unfinalized_last_frame_gets_average() {
        let mut anim = AnimationAccumulator::new(8, 8, EncodingConfig::new()).unwrap();
        let picture = solid(8, 8, RGBA8::new(9, 9, 9, 255));
        for ts in [0, 100, 300] {
            anim.append(&picture, ts).unwrap();
        }
        let mux = anim.into_mux().unwrap();
        let durations: Vec<u32> = mux.frames().iter().map(|f| f.duration_ms).collect();
        assert_eq!(durations, [100, 200, 150]);
    }

    #[test]
    fn test_huge_durations_are_clamped() {
        assert_eq!(clamp_duration(20_000_000), MAX_FRAME_DURATION_MS);
        assert_eq!(clamp_duration(40), 40);
    }
}
