//! Animated WebP stickers from raw RGBA frames.
//!
//! This crate turns an ordered list of RGBA frames, each with a display
//! duration, into one infinitely looping, lossy animated WebP file.
//!
//! # Encoding
//!
//! The usual entry point is [`encode_animation`]:
//!
//! ```rust
//! use zensticker::{EncodingConfig, Frame, MemoryBuffer, encode_animation};
//!
//! let buffers = [
//!     MemoryBuffer::solid(128, 128, [255, 0, 0, 255]),
//!     MemoryBuffer::solid(128, 128, [0, 255, 0, 255]),
//!     MemoryBuffer::solid(128, 128, [0, 0, 255, 255]),
//! ];
//! let frames = Frame::zip(&buffers, &[100, 150, 200]).unwrap();
//!
//! let config = EncodingConfig::new().with_quality(75);
//! let sticker = encode_animation(&frames, 128, 128, &config)?;
//! assert_eq!(sticker.frame_count(), 3);
//! assert_eq!(sticker.total_duration_ms(), 450);
//! # Ok::<(), zensticker::PipelineError>(())
//! ```
//!
//! Frames that cannot be read or encoded are skipped rather than failing the
//! whole sticker; the frame before a skipped one stays on screen for its
//! slot.
//!
//! # Size budgets
//!
//! [`encode_within_budget`] repeats the encode at lower quality and frame
//! rate until the file fits, for platforms that cap sticker size:
//!
//! ```rust
//! use zensticker::{BudgetConfig, Frame, MemoryBuffer, encode_within_budget};
//!
//! let buffer = MemoryBuffer::solid(96, 96, [20, 40, 60, 255]);
//! let frames = [Frame::new(&buffer, 100); 4];
//! let outcome = encode_within_budget(&frames, 96, 96, &BudgetConfig::new())?;
//! assert!(outcome.container.len() <= 500 * 1024);
//! # Ok::<(), zensticker::PipelineError>(())
//! ```
//!
//! # Pixel sources
//!
//! Frames borrow any [`PixelBuffer`]: an externally owned raster that is
//! locked only while its pixels are copied. [`MemoryBuffer`] is the in-memory
//! implementation.
//!
//! # Logging
//!
//! Progress and skipped frames are reported through the [`log`] facade. No
//! logger is installed by this crate.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

extern crate alloc;

pub(crate) mod common;
pub mod encoder;
pub mod frame;
pub mod mux;

mod budget;
mod pipeline;
mod slice_reader;
mod timing;

pub use budget::{
    BudgetConfig, BudgetOutcome, STILL_AS_ANIMATION_MS, STILL_AS_ANIMATION_QUALITY, StickerPreset,
    encode_still_as_animation, encode_within_budget,
};
pub use encoder::{EncodeError, EncodingConfig, LoopCount, Picture};
pub use frame::{
    BufferError, BufferInfo, Frame, ImportError, MemoryBuffer, PixelBuffer, PixelFormat,
    PixelGuard, import_picture,
};
pub use mux::{AnimationAccumulator, AssembledContainer, MuxError, WebPDemuxer, assemble};
pub use pipeline::{PipelineError, encode_animation};
pub use timing::{TimingLimits, decimate_fps};
