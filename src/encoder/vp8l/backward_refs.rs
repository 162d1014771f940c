//! Backward references for single-channel (alpha) images.
//!
//! Alpha planes of sticker frames are dominated by long horizontal runs and
//! rows repeating the row above, so two candidate distances (previous pixel,
//! row above) are matched greedily instead of through a hash chain.

use alloc::vec::Vec;

/// Maximum copy length a single reference may carry.
pub(crate) const MAX_LENGTH: usize = 4096;
/// Shorter matches cost more than the literals they replace.
pub(crate) const MIN_LENGTH: usize = 3;

/// Number of length prefix codes after the 256 literals.
pub(crate) const NUM_LENGTH_CODES: usize = 24;
pub(crate) const NUM_LITERAL_CODES: usize = 256;
pub(crate) const NUM_DISTANCE_CODES: usize = 40;

/// Reverse lookup table: given (yoffset * 16 + 8 - xoffset), get distance code.
/// Only valid for xoffset in [0, 8] and yoffset in [0, 7].
#[rustfmt::skip]
const PLANE_TO_CODE_LUT: [u8; 128] = [
    96,  73,  55,  39,  23, 13, 5,  1,  255, 255, 255, 255, 255, 255, 255, 255,
    101, 78,  58,  42,  26, 16, 8,  2,  0,   3,   9,   17,  27,  43,  59,  79,
    102, 86,  62,  46,  32, 20, 10, 6,  4,   7,   11,  21,  33,  47,  63,  87,
    105, 90,  70,  52,  37, 28, 18, 14, 12,  15,  19,  29,  38,  53,  71,  91,
    110, 99,  82,  66,  48, 35, 30, 24, 22,  25,  31,  36,  49,  67,  83,  100,
    115, 108, 94,  76,  64, 50, 44, 40, 34,  41,  45,  51,  65,  77,  95,  109,
    118, 113, 103, 92,  80, 68, 60, 56, 54,  57,  61,  69,  81,  93,  104, 114,
    119, 116, 111, 106, 97, 88, 84, 74, 72,  75,  85,  89,  98,  107, 112, 117
];

/// Convert a linear distance to the 1-based distance code, preferring the
/// short codes of the 2D neighbourhood.
pub(crate) fn distance_to_plane_code(xsize: usize, dist: usize) -> u32 {
    let yoffset = dist / xsize;
    let xoffset = dist - yoffset * xsize;

    if xoffset <= 8 && yoffset < 8 {
        u32::from(PLANE_TO_CODE_LUT[yoffset * 16 + 8 - xoffset]) + 1
    } else if xsize > 8 && xoffset > xsize - 8 && yoffset < 7 {
        u32::from(PLANE_TO_CODE_LUT[(yoffset + 1) * 16 + 8 + (xsize - xoffset)]) + 1
    } else {
        (dist + 120) as u32
    }
}

/// Prefix coding shared by lengths and distance codes: returns the prefix
/// symbol, the number of extra bits and their value.
pub(crate) fn prefix_encode(value: u32) -> (u8, u8, u32) {
    debug_assert!(value >= 1);
    let v = value - 1;
    if v < 4 {
        return (v as u8, 0, 0);
    }
    let highest_bit = 31 - v.leading_zeros();
    let second_highest_bit = (v >> (highest_bit - 1)) & 1;
    let extra_bits_count = highest_bit - 1;
    let extra_bits_value = v & ((1 << extra_bits_count) - 1);
    (
        (2 * highest_bit + second_highest_bit) as u8,
        extra_bits_count as u8,
        extra_bits_value,
    )
}

/// Literal value or LZ77 backward reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PixOrCopy {
    Literal(u8),
    Copy {
        len: u16,
        /// distance code (1-based)
        dist: u32,
    },
}

/// Greedy longest match against the previous pixel and the row above.
pub(crate) fn compute_backward_refs(values: &[u8], width: usize) -> Vec<PixOrCopy> {
    let n = values.len();
    let mut refs = Vec::with_capacity(n / 8 + 1);
    let candidates = [1, width];

    let mut pos = 0;
    while pos < n {
        let mut best_len = 0;
        let mut best_dist = 0;
        for &dist in &candidates {
            if dist == 0 || pos < dist {
                continue;
            }
            let len = values[pos..]
                .iter()
                .zip(&values[pos - dist..])
                .take(MAX_LENGTH)
                .take_while(|(a, b)| a == b)
                .count();
            if len > best_len {
                best_len = len;
                best_dist = dist;
            }
        }

        if best_len >= MIN_LENGTH {
            refs.push(PixOrCopy::Copy {
                len: best_len as u16,
                dist: distance_to_plane_code(width, best_dist),
            });
            pos += best_len;
        } else {
            refs.push(PixOrCopy::Literal(values[pos]));
            pos += 1;
        }
    }
    refs
}
