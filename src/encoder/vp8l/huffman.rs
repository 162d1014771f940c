//! Canonical prefix codes for the VP8L alpha stream.
//!
//! Builds length-limited Huffman codes from symbol histograms and writes them
//! either as a "simple" code (one or two symbols below 256) or as a normal
//! code whose lengths are themselves run-length coded.

use alloc::boxed::Box;
use alloc::collections::BinaryHeap;
use alloc::vec;
use alloc::vec::Vec;
use core::cmp::Ordering;

use super::bitwriter::BitWriter;

/// Maximum Huffman code length (15 bits).
const MAX_CODE_LENGTH: u8 = 15;

/// The code-length alphabet may use at most 7 bit codes.
const MAX_CODE_LENGTH_CODE_LENGTH: u8 = 7;

/// Code length alphabet for encoding Huffman trees.
const CODE_LENGTH_CODES: usize = 19;

/// Order in which code length codes are written.
const CODE_LENGTH_CODE_ORDER: [usize; CODE_LENGTH_CODES] = [
    17, 18, 0, 1, 2, 3, 4, 5, 16, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15,
];

/// Huffman code (code word and length).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct HuffmanCode {
    /// Bit-reversed so it can be written LSB-first.
    pub(crate) code: u16,
    pub(crate) length: u8,
}

/// Build Huffman code lengths from symbol frequencies.
///
/// When the tree is deeper than `max_len` the smallest counts are raised
/// (by doubling a floor) and the tree is rebuilt until it fits.
pub(crate) fn build_huffman_lengths(freq: &[u32], max_len: u8) -> Vec<u8> {
    let mut lengths = vec![0u8; freq.len()];

    let non_zero: Vec<(usize, u32)> = freq
        .iter()
        .enumerate()
        .filter(|&(_, &f)| f > 0)
        .map(|(i, &f)| (i, f))
        .collect();

    match non_zero.len() {
        0 => return lengths,
        1 | 2 => {
            for &(sym, _) in &non_zero {
                lengths[sym] = 1;
            }
            return lengths;
        }
        _ => {}
    }

    let mut count_min = 1u32;
    while !generate_tree_with_min_count(&non_zero, count_min, max_len, &mut lengths) {
        count_min = count_min.saturating_mul(2);
    }
    lengths
}

/// One Huffman pass where every count is at least `count_min`.
///
/// Nodes of equal weight merge the highest symbol first, internal nodes
/// last. Returns false if any code exceeds `tree_depth_limit`.
fn generate_tree_with_min_count(
    non_zero: &[(usize, u32)],
    count_min: u32,
    tree_depth_limit: u8,
    lengths: &mut [u8],
) -> bool {
    lengths.fill(0);

    #[derive(Eq, PartialEq)]
    struct Node {
        weight: u64,
        /// leaf nodes = symbol index, internal nodes = -1
        value: i32,
        symbol: Option<usize>,
        children: Option<(Box<Node>, Box<Node>)>,
    }

    impl Ord for Node {
        fn cmp(&self, other: &Self) -> Ordering {
            // min-heap on weight out of a max-heap
            other
                .weight
                .cmp(&self.weight)
                .then(self.value.cmp(&other.value))
        }
    }

    impl PartialOrd for Node {
        fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
            Some(self.cmp(other))
        }
    }

    let mut heap: BinaryHeap<Node> = non_zero
        .iter()
        .map(|&(sym, f)| Node {
            weight: u64::from(f.max(count_min)),
            value: sym as i32,
            symbol: Some(sym),
            children: None,
        })
        .collect();

    while heap.len() > 1 {
        let (Some(a), Some(b)) = (heap.pop(), heap.pop()) else {
            break;
        };
        heap.push(Node {
            weight: a.weight + b.weight,
            value: -1,
            symbol: None,
            children: Some((Box::new(a), Box::new(b))),
        });
    }

    fn collect_depths(node: &Node, depth: u8, lengths: &mut [u8], max_depth: &mut u8) {
        if let Some(sym) = node.symbol {
            lengths[sym] = depth.max(1);
            *max_depth = (*max_depth).max(depth);
        } else if let Some((left, right)) = &node.children {
            collect_depths(left, depth + 1, lengths, max_depth);
            collect_depths(right, depth + 1, lengths, max_depth);
        }
    }

    let Some(root) = heap.pop() else {
        return true;
    };
    let mut max_depth = 0u8;
    collect_depths(&root, 0, lengths, &mut max_depth);
    max_depth <= tree_depth_limit
}

/// Build canonical Huffman codes from code lengths.
/// Codes are bit-reversed for the LSB-first bitstream.
pub(crate) fn build_huffman_codes(lengths: &[u8]) -> Vec<HuffmanCode> {
    let mut codes = vec![HuffmanCode::default(); lengths.len()];

    let mut length_counts = [0u32; MAX_CODE_LENGTH as usize + 1];
    for &len in lengths {
        if len > 0 {
            length_counts[usize::from(len)] += 1;
        }
    }

    let mut next_code = [0u32; MAX_CODE_LENGTH as usize + 1];
    let mut code = 0u32;
    for bits in 1..=MAX_CODE_LENGTH as usize {
        code = (code + length_counts[bits - 1]) << 1;
        next_code[bits] = code;
    }

    for (symbol, &len) in lengths.iter().enumerate() {
        if len > 0 {
            codes[symbol] = HuffmanCode {
                code: reverse_bits(u32::from(len), next_code[usize::from(len)]) as u16,
                length: len,
            };
            next_code[usize::from(len)] += 1;
        }
    }

    codes
}

/// Reverse the low `num_bits` bits (max 16).
fn reverse_bits(num_bits: u32, bits: u32) -> u32 {
    const REVERSED_BITS: [u8; 16] = [
        0x0, 0x8, 0x4, 0xc, 0x2, 0xa, 0x6, 0xe, 0x1, 0x9, 0x5, 0xd, 0x3, 0xb, 0x7, 0xf,
    ];

    let mut retval = 0u32;
    let mut b = bits;
    let mut i = 0;
    while i < num_bits {
        i += 4;
        retval |= u32::from(REVERSED_BITS[(b & 0xf) as usize]) << (16 - i);
        b >>= 4;
    }
    retval >> (16 - num_bits)
}

/// A prefix code that has been written to the stream and can now code
/// symbols.
pub(crate) struct PrefixCode {
    codes: Vec<HuffmanCode>,
}

impl PrefixCode {
    /// Writes the code best suited to `histogram` and returns it.
    ///
    /// An empty histogram is written as the one-symbol code for 0.
    pub(crate) fn write(w: &mut BitWriter, histogram: &[u32]) -> Self {
        let mut used: Vec<usize> = histogram
            .iter()
            .enumerate()
            .filter(|&(_, &f)| f > 0)
            .map(|(i, _)| i)
            .collect();
        if used.is_empty() {
            used.push(0);
        }

        let mut codes = vec![HuffmanCode::default(); histogram.len()];
        if used.len() <= 2 && used.iter().all(|&sym| sym < 256) {
            write_simple_tree(w, &used);
            if let [first, second] = used[..] {
                codes[first] = HuffmanCode { code: 0, length: 1 };
                codes[second] = HuffmanCode { code: 1, length: 1 };
            }
            return Self { codes };
        }

        let lengths = build_huffman_lengths(histogram, MAX_CODE_LENGTH);
        write_huffman_tree_complex(w, &lengths);
        if used.len() > 1 {
            codes = build_huffman_codes(&lengths);
        }
        Self { codes }
    }

    /// Writes one symbol. Codes with a single symbol take no bits.
    #[inline]
    pub(crate) fn write_symbol(&self, w: &mut BitWriter, symbol: usize) {
        let code = self.codes[symbol];
        w.write_bits(u64::from(code.code), code.length);
    }
}

/// Simple code: one or two symbols, each below 256.
fn write_simple_tree(w: &mut BitWriter, symbols: &[usize]) {
    debug_assert!(!symbols.is_empty() && symbols.len() <= 2);
    w.write_bit(true);
    w.write_bit(symbols.len() == 2);

    let first = symbols[0];
    // symbols 0 and 1 fit in a single bit
    let first_is_8bit = first > 1;
    w.write_bit(first_is_8bit);
    w.write_bits(first as u64, if first_is_8bit { 8 } else { 1 });

    if let Some(&second) = symbols.get(1) {
        w.write_bits(second as u64, 8);
    }
}

/// Token for the run-length coded list of code lengths.
#[derive(Clone, Copy, Default)]
struct HuffmanTreeToken {
    /// 0-15 for code lengths, 16 = repeat previous, 17/18 = repeat zeros
    code: u8,
    extra_bits: u8,
}

/// Write a normal Huffman tree: run-length coded code lengths, themselves
/// coded with a small prefix code.
fn write_huffman_tree_complex(w: &mut BitWriter, lengths: &[u8]) {
    let n = lengths.len();

    w.write_bit(false);

    let mut tokens = Vec::with_capacity(n);
    // a decoder starts with 8 as the length repeated by code 16
    let mut prev_value = 8u8;
    let mut i = 0;
    while i < n {
        let value = lengths[i];
        let mut k = i + 1;
        while k < n && lengths[k] == value {
            k += 1;
        }
        let runs = k - i;

        if value == 0 {
            code_repeated_zeros(runs, &mut tokens);
        } else {
            code_repeated_values(runs, &mut tokens, value, prev_value);
            prev_value = value;
        }
        i += runs;
    }

    let mut histogram = [0u32; CODE_LENGTH_CODES];
    for token in &tokens {
        histogram[usize::from(token.code)] += 1;
    }

    let mut code_length_bitdepth = [0u8; CODE_LENGTH_CODES];
    code_length_bitdepth
        .copy_from_slice(&build_huffman_lengths(&histogram, MAX_CODE_LENGTH_CODE_LENGTH));
    let mut code_length_codes = build_huffman_codes(&code_length_bitdepth);

    // trailing zeros in transmission order are implied
    let mut codes_to_store = CODE_LENGTH_CODES;
    while codes_to_store > 4
        && code_length_bitdepth[CODE_LENGTH_CODE_ORDER[codes_to_store - 1]] == 0
    {
        codes_to_store -= 1;
    }

    w.write_bits((codes_to_store - 4) as u64, 4);
    for &order_idx in &CODE_LENGTH_CODE_ORDER[..codes_to_store] {
        w.write_bits(u64::from(code_length_bitdepth[order_idx]), 3);
    }

    // a single code length symbol is read with zero bits
    let symbol_count = code_length_bitdepth.iter().filter(|&&d| d != 0).count();
    if symbol_count <= 1 {
        code_length_bitdepth.fill(0);
        code_length_codes.fill(HuffmanCode::default());
    }

    let num_tokens = tokens.len();
    let mut trimmed_length = num_tokens;
    let mut trailing_zero_bits = 0u32;
    for token in tokens.iter().rev() {
        let ix = usize::from(token.code);
        if ix != 0 && ix != 17 && ix != 18 {
            break;
        }
        trimmed_length -= 1;
        trailing_zero_bits += u32::from(code_length_bitdepth[ix]);
        if ix == 17 {
            trailing_zero_bits += 3;
        } else if ix == 18 {
            trailing_zero_bits += 7;
        }
    }

    let write_trimmed_length = trimmed_length > 1 && trailing_zero_bits > 12;
    let length = if write_trimmed_length {
        trimmed_length
    } else {
        num_tokens
    };

    w.write_bit(write_trimmed_length);
    if write_trimmed_length {
        if trimmed_length == 2 {
            // nbitpairs = 1, trimmed_length - 2 = 0
            w.write_bits(0, 3 + 2);
        } else {
            let nbits = 32 - ((trimmed_length - 2) as u32).leading_zeros();
            let nbitpairs = (nbits as usize).div_ceil(2);
            w.write_bits((nbitpairs - 1) as u64, 3);
            w.write_bits((trimmed_length - 2) as u64, (nbitpairs * 2) as u8);
        }
    }

    for token in &tokens[..length] {
        let ix = usize::from(token.code);
        let code = code_length_codes[ix];
        w.write_bits(u64::from(code.code), code.length);
        match ix {
            16 => w.write_bits(u64::from(token.extra_bits), 2),
            17 => w.write_bits(u64::from(token.extra_bits), 3),
            18 => w.write_bits(u64::from(token.extra_bits), 7),
            _ => {}
        }
    }
}

/// Zero runs use codes 0, 17 (3-10 zeros) and 18 (11-138 zeros).
fn code_repeated_zeros(mut repetitions: usize, tokens: &mut Vec<HuffmanTreeToken>) {
    while repetitions >= 1 {
        if repetitions < 3 {
            for _ in 0..repetitions {
                tokens.push(HuffmanTreeToken::default());
            }
            break;
        } else if repetitions < 11 {
            tokens.push(HuffmanTreeToken {
                code: 17,
                extra_bits: (repetitions - 3) as u8,
            });
            break;
        } else if repetitions < 139 {
            tokens.push(HuffmanTreeToken {
                code: 18,
                extra_bits: (repetitions - 11) as u8,
            });
            break;
        } else {
            tokens.push(HuffmanTreeToken {
                code: 18,
                extra_bits: 0x7f,
            });
            repetitions -= 138;
        }
    }
}

/// Non-zero runs use the length itself and code 16 (repeat previous 3-6
/// times).
fn code_repeated_values(
    mut repetitions: usize,
    tokens: &mut Vec<HuffmanTreeToken>,
    value: u8,
    prev_value: u8,
) {
    if value != prev_value {
        tokens.push(HuffmanTreeToken {
            code: value,
            extra_bits: 0,
        });
        repetitions -= 1;
    }
    while repetitions >= 1 {
        if repetitions < 3 {
            for _ in 0..repetitions {
                tokens.push(HuffmanTreeToken {
                    code: value,
                    extra_bits: 0,
                });
            }
            break;
        } else if repetitions < 7 {
            tokens.push(HuffmanTreeToken {
                code: 16,
                extra_bits: (repetitions - 3) as u8,
            });
            break;
        } else {
            tokens.push(HuffmanTreeToken {
                code: 16,
                extra_bits: 3,
            });
            repetitions -= 6;
        }
    }
}
