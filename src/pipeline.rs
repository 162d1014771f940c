//! Frames in, sticker out.
//!
//! [`encode_animation`] drives the whole conversion: it imports each frame,
//! appends it to one [`AnimationAccumulator`] on a running timeline, ends the
//! sequence and assembles the container.
//!
//! Problems with a single frame never abort the run. The frame is logged and
//! skipped, and its display time is given to the frame before it. Only bad
//! input, a failed setup and a failed assembly are fatal.
//!
//! ```rust
//! use zensticker::{EncodingConfig, Frame, MemoryBuffer, encode_animation};
//!
//! let red = MemoryBuffer::solid(64, 64, [255, 0, 0, 255]);
//! let blue = MemoryBuffer::solid(64, 64, [0, 0, 255, 255]);
//! let frames = [Frame::new(&red, 100), Frame::new(&blue, 150)];
//!
//! let sticker = encode_animation(&frames, 64, 64, &EncodingConfig::new())?;
//! assert_eq!(sticker.frame_count(), 2);
//! assert_eq!(sticker.total_duration_ms(), 250);
//! # Ok::<(), zensticker::PipelineError>(())
//! ```

use thiserror::Error;

use crate::encoder::EncodingConfig;
use crate::frame::{Frame, ImportError, PixelBuffer, import_picture};
use crate::mux::{AnimationAccumulator, AssembledContainer, MuxError, assemble};

/// Why no sticker was produced.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PipelineError {
    /// The frame list is empty, a duration is zero, or the timeline overflows.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    /// The animation could not be started (bad canvas size or config).
    #[error("animation setup failed: {0}")]
    Setup(#[source] MuxError),

    /// The container could not be assembled, for example because every frame
    /// was skipped.
    #[error("container assembly failed: {0}")]
    Assembly(#[source] MuxError),

    /// No quality/frame-rate combination produced a small enough file.
    #[error("no encoding fits in {max_bytes} bytes (smallest: {best_size:?})")]
    BudgetExceeded {
        /// Size of the smallest container produced, if any encode succeeded.
        best_size: Option<usize>,
        /// The byte budget.
        max_bytes: usize,
    },
}

/// Reason a frame was left out.
#[derive(Debug, Error)]
enum SkipReason {
    #[error("import failed: {0}")]
    Import(#[from] ImportError),
    #[error("append failed: {0}")]
    Append(#[from] MuxError),
}

/// Encodes `frames` as one infinitely looping animated WebP.
///
/// Every frame is cropped to `width x height` from its top-left corner.
/// Frames that cannot be imported or encoded are skipped; the remaining
/// frames keep their start times, so the total running time equals the sum
/// of all durations as long as the first frame survives.
pub fn encode_animation<B: PixelBuffer>(
    frames: &[Frame<'_, B>],
    width: u32,
    height: u32,
    config: &EncodingConfig,
) -> Result<AssembledContainer, PipelineError> {
    let end_ms = validate_input(frames).inspect_err(|err| log::error!("{err}"))?;

    let mut anim = AnimationAccumulator::new(width, height, config.clone()).map_err(|err| {
        log::error!("cannot start {width}x{height} animation: {err}");
        PipelineError::Setup(err)
    })?;

    let mut timestamp_ms = 0u32;
    let mut skipped = 0usize;
    for (index, frame) in frames.iter().enumerate() {
        if let Err(reason) = import_and_append(&mut anim, frame, width, height, timestamp_ms) {
            log::warn!("skipping frame {index} at {timestamp_ms} ms: {reason}");
            skipped += 1;
        }
        // validate_input guarantees the sum fits
        timestamp_ms += frame.duration_ms;
    }
    debug_assert_eq!(timestamp_ms, end_ms);

    if let Err(err) = anim.finalize(timestamp_ms) {
        log::warn!("finalize at {timestamp_ms} ms failed: {err}");
    }

    let container = assemble(anim).map_err(|err| {
        log::error!("assembly failed after skipping {skipped} of {} frames: {err}", frames.len());
        PipelineError::Assembly(err)
    })?;

    log::info!(
        "encoded sticker: {} frames in, {} out, {} bytes, {} ms",
        frames.len(),
        container.frame_count(),
        container.len(),
        container.total_duration_ms()
    );
    Ok(container)
}

/// Returns the end of the timeline.
fn validate_input<B>(frames: &[Frame<'_, B>]) -> Result<u32, PipelineError> {
    if frames.is_empty() {
        return Err(PipelineError::InvalidInput("no frames"));
    }
    frames.iter().try_fold(0u32, |total, frame| {
        if frame.duration_ms == 0 {
            return Err(PipelineError::InvalidInput("frame duration must be positive"));
        }
        total
            .checked_add(frame.duration_ms)
            .ok_or(PipelineError::InvalidInput("total duration overflows"))
    })
}

fn import_and_append<B: PixelBuffer>(
    anim: &mut AnimationAccumulator,
    frame: &Frame<'_, B>,
    width: u32,
    height: u32,
    timestamp_ms: u32,
) -> Result<(), SkipReason> {
    let picture = import_picture(frame.buffer, width, height)?;
    anim.append(&picture, timestamp_ms)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{BufferInfo, MemoryBuffer, PixelFormat};
    use crate::mux::WebPDemuxer;
    use alloc::vec;
    use alloc::vec::Vec;

    fn durations(container: &AssembledContainer) -> Vec<u32> {
        let demux = WebPDemuxer::new(container.as_bytes()).unwrap();
        demux.frames().iter().map(|f| f.duration_ms).collect()
    }

    fn rgb565(width: u32, height: u32) -> MemoryBuffer {
        MemoryBuffer::new(
            vec![0; (width * height * 2) as usize],
            BufferInfo {
                width,
                height,
                stride: width * 2,
                format: PixelFormat::Rgb565,
            },
        )
    }

    #[test]
    fn test_rejects_bad_input() {
        let buffer = MemoryBuffer::solid(8, 8, [0; 4]);
        let none: [Frame<'_, MemoryBuffer>; 0] = [];
        assert!(matches!(
            encode_animation(&none, 8, 8, &EncodingConfig::new()),
            Err(PipelineError::InvalidInput(_))
        ));
        assert!(matches!(
            encode_animation(&[Frame::new(&buffer, 0)], 8, 8, &EncodingConfig::new()),
            Err(PipelineError::InvalidInput(_))
        ));
        let overflow = [Frame::new(&buffer, u32::MAX), Frame::new(&buffer, 1)];
        assert!(matches!(
            encode_animation(&overflow, 8, 8, &EncodingConfig::new()),
            Err(PipelineError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_bad_canvas_is_setup_error() {
        let buffer = MemoryBuffer::solid(8, 8, [0; 4]);
        assert!(matches!(
            encode_animation(&[Frame::new(&buffer, 10)], 0, 8, &EncodingConfig::new()),
            Err(PipelineError::Setup(MuxError::InvalidDimensions { .. }))
        ));
    }

    #[test]
    fn test_skipped_frame_time_goes_to_previous() {
        let red = MemoryBuffer::solid(16, 16, [255, 0, 0, 255]);
        let bad = rgb565(16, 16);
        let blue = MemoryBuffer::solid(16, 16, [0, 0, 255, 255]);
        let frames = [Frame::new(&red, 100), Frame::new(&bad, 150), Frame::new(&blue, 200)];
        let sticker = encode_animation(&frames, 16, 16, &EncodingConfig::new()).unwrap();
        assert_eq!(durations(&sticker), [250, 200]);
        assert_eq!(sticker.total_duration_ms(), 450);
    }

    #[test]
    fn test_skipped_first_frame_has_no_slot() {
        let bad = rgb565(16, 16);
        let green = MemoryBuffer::solid(16, 16, [0, 255, 0, 255]);
        let frames = [Frame::new(&bad, 100), Frame::new(&green, 50), Frame::new(&green, 30)];
        let sticker = encode_animation(&frames, 16, 16, &EncodingConfig::new()).unwrap();
        assert_eq!(durations(&sticker), [50, 30]);
        assert_eq!(sticker.total_duration_ms(), 80);
    }

    #[test]
    fn test_undersized_frame_is_skipped() {
        let big = MemoryBuffer::solid(16, 16, [1, 2, 3, 255]);
        let small = MemoryBuffer::solid(8, 8, [1, 2, 3, 255]);
        let frames = [Frame::new(&big, 40), Frame::new(&big, 40), Frame::new(&small, 40)];
        let sticker = encode_animation(&frames, 16, 16, &EncodingConfig::new()).unwrap();
        assert_eq!(durations(&sticker), [40, 80]);
    }

    #[test]
    fn test_all_frames_bad_is_assembly_error() {
        let bad = rgb565(8, 8);
        let frames = [Frame::new(&bad, 100), Frame::new(&bad, 100)];
        assert!(matches!(
            encode_animation(&frames, 8, 8, &EncodingConfig::new()),
            Err(PipelineError::Assembly(MuxError::NoFrames))
        ));
    }
}
