//! Error types for mux/demux operations.

use alloc::string::String;
use thiserror::Error;

use crate::encoder::EncodeError;

/// Errors of the animation accumulator, the container assembler and the
/// demuxer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MuxError {
    /// The data is not a valid WebP file.
    #[error("Invalid WebP format: {0}")]
    InvalidFormat(String),

    /// The data ends inside a header or chunk.
    #[error("Unexpected end of data")]
    UnexpectedEof,

    /// Canvas dimensions are zero or too large.
    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions {
        /// The invalid width.
        width: u32,
        /// The invalid height.
        height: u32,
    },

    /// A picture does not match the animation canvas.
    #[error("Frame is {width}x{height} but the canvas is {canvas_width}x{canvas_height}")]
    FrameDimensionMismatch {
        /// Picture width.
        width: u32,
        /// Picture height.
        height: u32,
        /// Canvas width.
        canvas_width: u32,
        /// Canvas height.
        canvas_height: u32,
    },

    /// A timestamp is earlier than the previous frame's.
    #[error("Timestamp {timestamp_ms} ms is before the previous frame at {previous_ms} ms")]
    TimestampOutOfOrder {
        /// The rejected timestamp.
        timestamp_ms: u32,
        /// Timestamp of the last queued frame.
        previous_ms: u32,
    },

    /// An error occurred during encoding.
    #[error("Encoding error: {0}")]
    EncodeError(#[from] EncodeError),

    /// No frames were added before assembly.
    #[error("No frames to assemble")]
    NoFrames,
}
