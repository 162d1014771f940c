//! Frame-rate reduction with duration carry-over.

use alloc::vec::Vec;

use crate::frame::Frame;

/// Duration limits applied when frames are decimated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct TimingLimits {
    /// Shortest frame a sticker viewer honours. Default: 8 ms.
    pub min_frame_ms: u32,
    /// Longest total running time. Default: 10 000 ms.
    pub max_total_ms: u32,
}

impl Default for TimingLimits {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingLimits {
    /// 8 ms minimum frame, 10 s maximum total.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            min_frame_ms: 8,
            max_total_ms: 10_000,
        }
    }

    /// Set the shortest allowed frame duration.
    #[must_use]
    pub const fn with_min_frame_ms(mut self, min_frame_ms: u32) -> Self {
        self.min_frame_ms = min_frame_ms;
        self
    }

    /// Set the longest allowed total duration.
    #[must_use]
    pub const fn with_max_total_ms(mut self, max_total_ms: u32) -> Self {
        self.max_total_ms = max_total_ms;
        self
    }
}

/// Drops frames to go from `source_fps` to `target_fps`.
///
/// A frame is kept each time the running fraction `target / source` reaches a
/// whole frame; dropped frames add their duration to the next kept frame
/// (frames dropped at the end go to the last kept frame). Kept durations are
/// raised to `limits.min_frame_ms`, and the output stops once
/// `limits.max_total_ms` is reached, shortening the frame that crosses it.
///
/// Returns the input unchanged when `target_fps >= source_fps`.
pub fn decimate_fps<'a, B>(
    frames: &[Frame<'a, B>],
    source_fps: u32,
    target_fps: u32,
    limits: &TimingLimits,
) -> Vec<Frame<'a, B>> {
    if target_fps >= source_fps || frames.is_empty() {
        return frames.to_vec();
    }

    let (source, target) = (u64::from(source_fps), u64::from(target_fps));
    let mut kept: Vec<Frame<'a, B>> = Vec::with_capacity(frames.len());
    let mut phase = 0u64;
    let mut carried = 0u32;
    let mut total = 0u32;

    for frame in frames {
        phase += target;
        if phase < source {
            carried = carried.saturating_add(frame.duration_ms);
            continue;
        }
        phase -= source;

        let duration = frame.duration_ms.saturating_add(carried).max(limits.min_frame_ms);
        carried = 0;
        let remaining = limits.max_total_ms.saturating_sub(total);
        if duration > remaining {
            if remaining > 0 {
                kept.push(Frame::new(frame.buffer, remaining));
            }
            log::warn!("animation capped at {} ms", limits.max_total_ms);
            return kept;
        }
        kept.push(Frame::new(frame.buffer, duration));
        total += duration;
    }

    if let Some(last) = kept.last_mut() {
        let room = limits.max_total_ms.saturating_sub(total);
        last.duration_ms += carried.min(room);
    }
    log::debug!(
        "decimated {} frames at {source_fps} fps to {} at {target_fps} fps",
        frames.len(),
        kept.len()
    );
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames<'a>(buffer: &'a u8, durations: &[u32]) -> Vec<Frame<'a, u8>> {
        durations.iter().map(|&d| Frame::new(buffer, d)).collect()
    }

    fn durations(frames: &[Frame<'_, u8>]) -> Vec<u32> {
        frames.iter().map(|f| f.duration_ms).collect()
    }

    #[test]
    fn test_no_op_when_not_slower() {
        let buffer = 0u8;
        let input = frames(&buffer, &[3, 3, 3]);
        let out = decimate_fps(&input, 10, 10, &TimingLimits::new());
        assert_eq!(durations(&out), [3, 3, 3]);
        assert!(decimate_fps(&input[..0], 10, 5, &TimingLimits::new()).is_empty());
    }

    #[test]
    fn test_halving_keeps_every_other_frame() {
        let buffer = 0u8;
        let input = frames(&buffer, &[100; 6]);
        let out = decimate_fps(&input, 10, 5, &TimingLimits::new());
        assert_eq!(durations(&out), [200, 200, 200]);
    }

    #[test]
    fn test_uneven_ratio_preserves_total() {
        let buffer = 0u8;
        let input = frames(&buffer, &[100; 10]);
        let out = decimate_fps(&input, 10, 7, &TimingLimits::new());
        assert_eq!(out.len(), 7);
        assert_eq!(durations(&out).iter().sum::<u32>(), 1000);
    }

    #[test]
    fn test_trailing_drops_go_to_last_frame() {
        let buffer = 0u8;
        let input = frames(&buffer, &[100, 100, 100]);
        let out = decimate_fps(&input, 10, 5, &TimingLimits::new());
        assert_eq!(durations(&out), [300]);
    }

    #[test]
    fn test_short_frames_are_raised() {
        let buffer = 0u8;
        let input = frames(&buffer, &[2; 6]);
        let out = decimate_fps(&input, 10, 5, &TimingLimits::new());
        assert_eq!(durations(&out), [8, 8, 8]);
    }

    #[test]
    fn test_total_is_capped() {
        let buffer = 0u8;
        let input = frames(&buffer, &[1000; 20]);
        let out = decimate_fps(&input, 10, 5, &TimingLimits::new());
        assert_eq!(durations(&out), [2000; 5]);

        let limits = TimingLimits::new().with_max_total_ms(4500);
        let out = decimate_fps(&input, 10, 5, &limits);
        assert_eq!(durations(&out), [2000, 2000, 500]);
    }
}
