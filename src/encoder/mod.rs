//! Lossy WebP frame encoder.
//!
//! Pictures are compressed as VP8 keyframes; translucent pictures also get a
//! losslessly coded alpha plane.

mod alpha;
mod api;
mod arithmetic;
mod config;
mod picture;
mod quantize;
mod vec_writer;
mod vp8;
mod vp8l;
mod yuv;

pub use api::EncodeError;
pub use config::{EncodingConfig, LoopCount};
pub use picture::Picture;

pub(crate) use api::{chunk_size, encode_picture, write_chunk};
pub(crate) use vec_writer::VecWriter;
pub(crate) use vp8::MAX_DIMENSION;
