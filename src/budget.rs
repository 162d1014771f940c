//! Fitting a sticker into a byte budget.
//!
//! [`encode_within_budget`] retries [`encode_animation`] with falling quality
//! and, once quality is exhausted, with a lower frame rate, until the file
//! fits.

use crate::encoder::EncodingConfig;
use crate::frame::{Frame, PixelBuffer};
use crate::mux::AssembledContainer;
use crate::pipeline::{PipelineError, encode_animation};
use crate::timing::{TimingLimits, decimate_fps};

/// Encoder method of the default budget search.
const BUDGET_METHOD: u8 = 1;

/// Size limits of a sticker platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct StickerPreset {
    /// Sticker canvas width.
    pub width: u32,
    /// Sticker canvas height.
    pub height: u32,
    /// Largest animated sticker file.
    pub max_animated_bytes: usize,
}

impl StickerPreset {
    /// 512x512 animated stickers of at most 500 KiB.
    pub const STANDARD: Self = Self {
        width: 512,
        height: 512,
        max_animated_bytes: 500 * 1024,
    };
}

impl Default for StickerPreset {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Search space of [`encode_within_budget`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct BudgetConfig {
    /// Largest acceptable container. Default: 500 KiB.
    pub max_bytes: usize,
    /// First quality tried at each frame rate. Default: 25.
    pub start_quality: u8,
    /// Quality decrement between attempts. Default: 10.
    pub quality_step: u8,
    /// Lowest quality tried. Default: 25.
    pub min_quality: u8,
    /// Frame rate of the input frames. Default: 10.
    pub source_fps: u32,
    /// Frame-rate decrement once quality is exhausted. Default: 5.
    pub fps_step: u32,
    /// Lowest frame rate tried. Default: 5.
    pub min_fps: u32,
    /// Duration limits used when dropping frames.
    pub timing: TimingLimits,
    /// Settings for every attempt; the quality is replaced by the search.
    /// Default: method 1.
    pub encoding: EncodingConfig,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl BudgetConfig {
    /// Defaults for an animated [`StickerPreset::STANDARD`] sticker.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_bytes: StickerPreset::STANDARD.max_animated_bytes,
            start_quality: 25,
            quality_step: 10,
            min_quality: 25,
            source_fps: 10,
            fps_step: 5,
            min_fps: 5,
            timing: TimingLimits::new(),
            encoding: EncodingConfig::new().with_method(BUDGET_METHOD),
        }
    }

    /// Set the byte budget.
    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Set the qualities to try: from `start` down to `min` in steps of
    /// `step` (at least 1).
    #[must_use]
    pub fn with_quality_range(mut self, start: u8, min: u8, step: u8) -> Self {
        self.start_quality = start.min(100);
        self.min_quality = min.min(100);
        self.quality_step = step.max(1);
        self
    }

    /// Set the frame rates to try: from `source` down to `min` in steps of
    /// `step` (at least 1). `min` is at least 1.
    #[must_use]
    pub fn with_fps_range(mut self, source: u32, min: u32, step: u32) -> Self {
        self.source_fps = source;
        self.min_fps = min.max(1);
        self.fps_step = step.max(1);
        self
    }

    /// Set the duration limits.
    #[must_use]
    pub fn with_timing(mut self, timing: TimingLimits) -> Self {
        self.timing = timing;
        self
    }

    /// Set the per-attempt encoder settings.
    #[must_use]
    pub fn with_encoding(mut self, encoding: EncodingConfig) -> Self {
        self.encoding = encoding;
        self
    }

    fn validate(&self) -> Result<(), PipelineError> {
        if self.quality_step == 0 || self.fps_step == 0 {
            return Err(PipelineError::InvalidInput("budget steps must be positive"));
        }
        if self.min_fps == 0 {
            return Err(PipelineError::InvalidInput("minimum frame rate must be positive"));
        }
        Ok(())
    }
}

/// A container that fits the budget, and how it was made.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct BudgetOutcome {
    /// The sticker.
    pub container: AssembledContainer,
    /// Quality of the successful attempt.
    pub quality: u8,
    /// Frame rate of the successful attempt.
    pub fps: u32,
    /// Number of encodes run, including the successful one.
    pub attempts: u32,
}

/// Encodes `frames` at decreasing quality and frame rate until the container
/// is at most `budget.max_bytes`.
///
/// For each frame rate from `source_fps` down to `min_fps`, the frames are
/// decimated to that rate and every quality from `start_quality` down to
/// `min_quality` is tried. A failed attempt is logged and the search goes on.
pub fn encode_within_budget<B: PixelBuffer>(
    frames: &[Frame<'_, B>],
    width: u32,
    height: u32,
    budget: &BudgetConfig,
) -> Result<BudgetOutcome, PipelineError> {
    budget.validate()?;

    let mut best_size: Option<usize> = None;
    let mut attempts = 0u32;
    let mut fps = budget.source_fps;

    while fps >= budget.min_fps {
        let decimated = decimate_fps(frames, budget.source_fps, fps, &budget.timing);
        let mut quality = budget.start_quality;

        while quality >= budget.min_quality {
            attempts += 1;
            let config = budget.encoding.clone().with_quality(quality);
            match encode_animation(&decimated, width, height, &config) {
                Ok(container) => {
                    let size = container.len();
                    log::info!("attempt {attempts}: {fps} fps, quality {quality}: {size} bytes");
                    if (1..=budget.max_bytes).contains(&size) {
                        return Ok(BudgetOutcome {
                            container,
                            quality,
                            fps,
                            attempts,
                        });
                    }
                    best_size = Some(best_size.map_or(size, |best| best.min(size)));
                }
                Err(err) => log::warn!("attempt {attempts}: {fps} fps, quality {quality} failed: {err}"),
            }
            let Some(next) = quality.checked_sub(budget.quality_step) else {
                break;
            };
            quality = next;
        }

        let Some(next) = fps.checked_sub(budget.fps_step) else {
            break;
        };
        fps = next;
    }

    log::error!(
        "no encoding fits in {} bytes after {attempts} attempts (smallest: {best_size:?})",
        budget.max_bytes
    );
    Err(PipelineError::BudgetExceeded {
        best_size,
        max_bytes: budget.max_bytes,
    })
}

/// Display time of a still picture wrapped as an animation.
pub const STILL_AS_ANIMATION_MS: u32 = 1000;

/// Quality used for a still picture wrapped as an animation.
pub const STILL_AS_ANIMATION_QUALITY: u8 = 90;

/// Wraps one still picture as a single-frame animation, for packs that only
/// accept animated stickers.
pub fn encode_still_as_animation<B: PixelBuffer>(
    buffer: &B,
    width: u32,
    height: u32,
) -> Result<AssembledContainer, PipelineError> {
    let config = EncodingConfig::new().with_quality(STILL_AS_ANIMATION_QUALITY);
    encode_animation(&[Frame::new(buffer, STILL_AS_ANIMATION_MS)], width, height, &config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::MemoryBuffer;
    use alloc::vec::Vec;

    /// Deterministic noise, which compresses badly at every quality.
    fn noise(width: u32, height: u32, seed: u32) -> MemoryBuffer {
        let mut state = seed;
        let data: Vec<u8> = (0..width * height * 4)
            .map(|i| {
                if i % 4 == 3 {
                    return 255;
                }
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                (state >> 16) as u8
            })
            .collect();
        MemoryBuffer::from_rgba(data, width, height)
    }

    #[test]
    fn test_first_attempt_fits() {
        let buffer = MemoryBuffer::solid(32, 32, [10, 200, 30, 255]);
        let frames = [Frame::new(&buffer, 100), Frame::new(&buffer, 100)];
        let outcome = encode_within_budget(&frames, 32, 32, &BudgetConfig::new()).unwrap();
        assert_eq!((outcome.quality, outcome.fps, outcome.attempts), (25, 10, 1));
        assert_eq!(outcome.container.total_duration_ms(), 200);
    }

    #[test]
    fn test_quality_drops_before_fps() {
        let buffer = noise(64, 64, 7);
        let frames = [Frame::new(&buffer, 100)];
        let small = encode_animation(&frames, 64, 64, &EncodingConfig::new().with_quality(25))
            .unwrap()
            .len();

        let budget = BudgetConfig::new()
            .with_max_bytes(small)
            .with_quality_range(75, 25, 50);
        let outcome = encode_within_budget(&frames, 64, 64, &budget).unwrap();
        assert_eq!((outcome.quality, outcome.fps, outcome.attempts), (25, 10, 2));
        assert_eq!(outcome.container.len(), small);
    }

    #[test]
    fn test_budget_exceeded_reports_smallest() {
        let buffer = noise(32, 32, 3);
        let frames = [Frame::new(&buffer, 100), Frame::new(&buffer, 100)];
        let budget = BudgetConfig::new()
            .with_max_bytes(16)
            .with_quality_range(45, 25, 10);
        match encode_within_budget(&frames, 32, 32, &budget) {
            Err(PipelineError::BudgetExceeded {
                best_size: Some(size),
                max_bytes: 16,
            }) => assert!(size > 16),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_failed_attempts_continue() {
        let buffer = MemoryBuffer::solid(8, 8, [0; 4]);
        let frames = [Frame::new(&buffer, 100)];
        // canvas larger than the buffer: every import fails
        assert!(matches!(
            encode_within_budget(&frames, 16, 16, &BudgetConfig::new()),
            Err(PipelineError::BudgetExceeded { best_size: None, .. })
        ));
    }

    #[test]
    fn test_zero_steps_are_rejected() {
        let buffer = MemoryBuffer::solid(8, 8, [0; 4]);
        let mut budget = BudgetConfig::new();
        budget.fps_step = 0;
        assert!(matches!(
            encode_within_budget(&[Frame::new(&buffer, 100)], 8, 8, &budget),
            Err(PipelineError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_default_search_uses_fast_method() {
        let budget = BudgetConfig::new();
        assert_eq!(budget.encoding.method, 1);
        assert_eq!(budget.max_bytes, StickerPreset::default().max_animated_bytes);
        assert_eq!(EncodingConfig::new().method, 4);
    }

    #[test]
    fn test_still_as_animation() {
        let buffer = MemoryBuffer::solid(24, 24, [0, 0, 0, 128]);
        let sticker = encode_still_as_animation(&buffer, 24, 24).unwrap();
        assert_eq!(sticker.frame_count(), 1);
        assert_eq!(sticker.total_duration_ms(), u64::from(STILL_AS_ANIMATION_MS));
    }
}
