//! Animated WebP assembly and inspection.
//!
//! - **Accumulate** ([`AnimationAccumulator`]): encode pictures one by one on
//!   an absolute timeline.
//! - **Assemble** ([`assemble`]): write the queued frames as one looping
//!   animated WebP file.
//! - **Demux** ([`WebPDemuxer`]): parse a WebP file at the chunk level and
//!   read frame metadata without decoding pixels.

mod anim;
mod assemble;
mod demux;
mod error;

pub use anim::AnimationAccumulator;
pub use assemble::{AssembledContainer, assemble};
pub use demux::{BlendMethod, DemuxFrame, DisposeMethod, WebPDemuxer};
pub use error::MuxError;
