//! Coefficient tokenization.
//!
//! Tokens are recorded while macroblocks are encoded and emitted only once
//! the frame's probability table is final.

use alloc::vec::Vec;

use crate::common::types::{
    COEFF_BANDS, NUM_BANDS, NUM_CTX, NUM_PROBAS, NUM_TYPES, PROB_DCT_CAT3, PROB_DCT_CAT4,
    PROB_DCT_CAT5, PROB_DCT_CAT6, TokenProbTables,
};
use crate::encoder::arithmetic::ArithmeticEncoder;

use super::stats::{ProbaStats, TokenType};

/// Flag indicating a token has a constant (embedded) probability.
const FIXED_PROBA_BIT: u16 = 1 << 14;

/// Flat index of `probs[type][band][ctx][0]`; add the node (0-10).
#[inline]
fn token_id(coeff_type: usize, band: usize, ctx: usize) -> u16 {
    debug_assert!(coeff_type < NUM_TYPES);
    debug_assert!(band < NUM_BANDS);
    debug_assert!(ctx < NUM_CTX);
    (NUM_PROBAS * (ctx + NUM_CTX * (band + NUM_BANDS * coeff_type))) as u16
}

/// Deferred bit decisions for the token partition.
///
/// Each token is a u16:
/// - bit 15: bit value
/// - bit 14: FIXED_PROBA_BIT
/// - bits 0-13: flat probability index, or the probability itself when fixed
pub(crate) struct TokenBuffer {
    tokens: Vec<u16>,
}

impl TokenBuffer {
    pub(crate) fn with_estimated_capacity(num_macroblocks: usize) -> Self {
        Self {
            tokens: Vec::with_capacity(num_macroblocks * 64),
        }
    }

    #[inline]
    fn add_token(&mut self, stats: &mut ProbaStats, bit: bool, id: u16, node: [usize; 4]) {
        debug_assert!(id < FIXED_PROBA_BIT);
        self.tokens.push((u16::from(bit) << 15) | id);
        let [t, b, c, p] = node;
        stats.record(t, b, c, p, bit);
    }

    #[inline]
    fn add_constant_token(&mut self, bit: bool, proba: u8) {
        self.tokens
            .push((u16::from(bit) << 15) | FIXED_PROBA_BIT | u16::from(proba));
    }

    fn add_extra_bits(&mut self, value: u32, probas: &[u8]) {
        let nbits = probas.len();
        for (i, &prob) in probas.iter().enumerate() {
            self.add_constant_token((value >> (nbits - 1 - i)) & 1 != 0, prob);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Emit all tokens, looking dynamic ones up in `probas`.
    pub(crate) fn emit_tokens(&self, encoder: &mut ArithmeticEncoder, probas: &TokenProbTables) {
        for &token in &self.tokens {
            let bit = (token >> 15) != 0;
            if (token & FIXED_PROBA_BIT) != 0 {
                encoder.write_bool(bit, (token & 0xff) as u8);
            } else {
                let idx = usize::from(token & 0x3fff);
                let p = idx % NUM_PROBAS;
                let rest = idx / NUM_PROBAS;
                let c = rest % NUM_CTX;
                let rest = rest / NUM_CTX;
                let b = rest % NUM_BANDS;
                let t = rest / NUM_BANDS;
                encoder.write_bool(bit, probas[t][b][c][p]);
            }
        }
    }

    /// Record tokens for one block of quantized coefficients in zigzag order.
    ///
    /// Returns whether the block had any non-zero coefficient, which becomes
    /// the context for its right and lower neighbours.
    pub(crate) fn record_coeff_tokens(
        &mut self,
        stats: &mut ProbaStats,
        coeffs: &[i32; 16],
        token_type: TokenType,
        first_coeff: usize,
        initial_ctx: usize,
    ) -> bool {
        let t = token_type as usize;
        let last = coeffs[first_coeff..]
            .iter()
            .rposition(|&c| c != 0)
            .map(|i| i + first_coeff);

        let mut n = first_coeff;
        let mut band = COEFF_BANDS[n];
        let mut ctx = initial_ctx;

        // node 0: anything at all?
        self.add_token(stats, last.is_some(), token_id(t, band, ctx), [t, band, ctx, 0]);
        let Some(last) = last else {
            return false;
        };

        while n < 16 {
            let c = coeffs[n];
            n += 1;
            let v = c.unsigned_abs();
            let base_id = token_id(t, band, ctx);

            // node 1: non-zero?
            self.add_token(stats, v != 0, base_id + 1, [t, band, ctx, 1]);
            if v == 0 {
                band = COEFF_BANDS[n];
                ctx = 0;
                continue;
            }

            // node 2: |coeff| > 1?
            self.add_token(stats, v > 1, base_id + 2, [t, band, ctx, 2]);
            let next_ctx = if v > 1 {
                self.record_magnitude(stats, v, [t, band, ctx], base_id);
                2
            } else {
                1
            };

            self.add_constant_token(c < 0, 128);

            if n == 16 {
                return true;
            }
            band = COEFF_BANDS[n];
            ctx = next_ctx;
            // node 0 at the next position: more to come?
            let more = n <= last;
            self.add_token(stats, more, token_id(t, band, ctx), [t, band, ctx, 0]);
            if !more {
                return true;
            }
        }

        true
    }

    /// Record the token tree below node 2 for |coeff| > 1, and the category
    /// extra bits.
    fn record_magnitude(&mut self, stats: &mut ProbaStats, v: u32, node: [usize; 3], base_id: u16) {
        let [t, b, c] = node;

        self.add_token(stats, v > 4, base_id + 3, [t, b, c, 3]);
        if v <= 4 {
            self.add_token(stats, v != 2, base_id + 4, [t, b, c, 4]);
            if v != 2 {
                self.add_token(stats, v == 4, base_id + 5, [t, b, c, 5]);
            }
            return;
        }

        self.add_token(stats, v > 10, base_id + 6, [t, b, c, 6]);
        if v <= 10 {
            self.add_token(stats, v > 6, base_id + 7, [t, b, c, 7]);
            if v <= 6 {
                // cat1: 5 or 6
                self.add_constant_token(v == 6, 159);
            } else {
                // cat2: 7 to 10
                self.add_constant_token(v >= 9, 165);
                self.add_constant_token(v & 1 == 0, 145);
            }
            return;
        }

        let residue = v - 3;
        let (bit8, bit_9_or_10, base, probas): (bool, bool, u32, &[u8]) = if residue < (8 << 1) {
            (false, false, 8, &PROB_DCT_CAT3)
        } else if residue < (8 << 2) {
            (false, true, 8 << 1, &PROB_DCT_CAT4)
        } else if residue < (8 << 3) {
            (true, false, 8 << 2, &PROB_DCT_CAT5)
        } else {
            (true, true, 8 << 3, &PROB_DCT_CAT6)
        };
        self.add_token(stats, bit8, base_id + 8, [t, b, c, 8]);
        // cat3/cat4 split on node 9, cat5/cat6 on node 10
        let node = if bit8 { 10 } else { 9 };
        self.add_token(stats, bit_9_or_10, base_id + node as u16, [t, b, c, node]);
        self.add_extra_bits(residue - base, probas);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::COEFF_PROBS;

    fn count_dynamic(buf: &TokenBuffer) -> usize {
        buf.tokens.iter().filter(|&&t| t & FIXED_PROBA_BIT == 0).count()
    }

    #[test]
    fn test_empty_block_is_one_token() {
        let mut buf = TokenBuffer::with_estimated_capacity(1);
        let mut stats = ProbaStats::new();
        let nz = buf.record_coeff_tokens(&mut stats, &[0; 16], TokenType::Chroma, 0, 0);
        assert!(!nz);
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn test_single_one_at_start() {
        let mut buf = TokenBuffer::with_estimated_capacity(1);
        let mut stats = ProbaStats::new();
        let mut coeffs = [0; 16];
        coeffs[0] = -1;
        assert!(buf.record_coeff_tokens(&mut stats, &coeffs, TokenType::I16DC, 0, 0));
        // not-eob, non-zero, not-greater-than-one, sign, eob
        assert_eq!(buf.len(), 5);
        assert_eq!(count_dynamic(&buf), 4);
    }

    #[test]
    fn test_first_coeff_one_skips_dc() {
        let mut buf = TokenBuffer::with_estimated_capacity(1);
        let mut stats = ProbaStats::new();
        let mut coeffs = [0; 16];
        // ignored: Y1 blocks start at position 1
        coeffs[0] = 9;
        assert!(!buf.record_coeff_tokens(&mut stats, &coeffs, TokenType::I16AC, 1, 2));
    }

    #[test]
    fn test_large_values_use_category_bits() {
        let mut buf = TokenBuffer::with_estimated_capacity(1);
        let mut stats = ProbaStats::new();
        let mut coeffs = [0; 16];
        coeffs[15] = 2047;
        assert!(buf.record_coeff_tokens(&mut stats, &coeffs, TokenType::Chroma, 0, 1));
        let fixed = buf.len() - count_dynamic(&buf);
        // 11 cat6 extra bits and the sign
        assert_eq!(fixed, 12);
    }

    #[test]
    fn test_emit_is_deterministic() {
        let mut buf = TokenBuffer::with_estimated_capacity(1);
        let mut stats = ProbaStats::new();
        let coeffs = [3, -2, 0, 0, 7, 0, 0, 0, 0, 0, 15, 0, 0, 0, 0, 1];
        buf.record_coeff_tokens(&mut stats, &coeffs, TokenType::Chroma, 0, 0);
        let mut a = ArithmeticEncoder::new();
        buf.emit_tokens(&mut a, &COEFF_PROBS);
        let mut b = ArithmeticEncoder::new();
        buf.emit_tokens(&mut b, &COEFF_PROBS);
        assert_eq!(a.flush_and_get_buffer(), b.flush_and_get_buffer());
    }
}
