//! Lossless (VP8L) coding, limited to what alpha planes need.

pub(crate) mod backward_refs;
pub(crate) mod bitwriter;
pub(crate) mod huffman;
