//! Codec building blocks shared by the lossy encoder

pub(crate) mod prediction;
/// DCT/WHT transform functions
pub(crate) mod transform;
pub(crate) mod types;
