//! Token statistics and the probability updates they justify.

use crate::common::types::{
    COEFF_PROBS, COEFF_UPDATE_PROBS, ENTROPY_COST, NUM_BANDS, NUM_CTX, NUM_PROBAS, NUM_TYPES,
    TokenProbTables,
};

/// Coefficient families, indexed as the token probability tables are.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TokenType {
    /// Y1 blocks whose DC went to the Y2 block (first = 1)
    I16AC = 0,
    /// the Y2 block itself
    I16DC = 1,
    Chroma = 2,
}

/// Per-node counts of zeros and ones seen while recording tokens.
#[derive(Clone, Default)]
pub(crate) struct ProbaStats {
    /// \[type\]\[band\]\[context\]\[node\] -> (zeros, ones)
    counts: [[[[(u32, u32); NUM_PROBAS]; NUM_CTX]; NUM_BANDS]; NUM_TYPES],
}

impl ProbaStats {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn record(&mut self, t: usize, b: usize, c: usize, p: usize, bit: bool) {
        let (zeros, ones) = &mut self.counts[t][b][c][p];
        if bit {
            *ones += 1;
        } else {
            *zeros += 1;
        }
    }

    /// Probability of a zero bit that best fits the recorded counts.
    fn calc_proba(zeros: u32, total: u32) -> u8 {
        let p = (255 * u64::from(zeros) + u64::from(total / 2)) / u64::from(total);
        p.clamp(1, 255) as u8
    }

    /// Builds the table to code tokens with, starting from the decoder
    /// defaults and replacing every entry whose update pays for its own
    /// signalling.
    ///
    /// The second value lists which entries differ from the defaults.
    pub(crate) fn updated_probabilities(&self) -> (TokenProbTables, UpdateMask) {
        let mut probs = COEFF_PROBS;
        let mut mask = UpdateMask::default();

        for t in 0..NUM_TYPES {
            for b in 0..NUM_BANDS {
                for c in 0..NUM_CTX {
                    for p in 0..NUM_PROBAS {
                        let (zeros, ones) = self.counts[t][b][c][p];
                        let total = zeros + ones;
                        if total == 0 {
                            continue;
                        }
                        let old_proba = COEFF_PROBS[t][b][c][p];
                        let update_proba = COEFF_UPDATE_PROBS[t][b][c][p];
                        let new_proba = Self::calc_proba(zeros, total);
                        if new_proba == old_proba {
                            continue;
                        }

                        let old_cost = branch_cost(zeros, ones, old_proba)
                            + bit_cost(false, update_proba);
                        let new_cost = branch_cost(zeros, ones, new_proba)
                            + bit_cost(true, update_proba)
                            + 8 * 256;
                        if new_cost < old_cost {
                            probs[t][b][c][p] = new_proba;
                            mask.0[t][b][c][p] = true;
                        }
                    }
                }
            }
        }

        (probs, mask)
    }
}

/// Which token probabilities get an explicit update in the frame header.
#[derive(Clone, Default)]
pub(crate) struct UpdateMask([[[[bool; NUM_PROBAS]; NUM_CTX]; NUM_BANDS]; NUM_TYPES]);

impl UpdateMask {
    pub(crate) fn is_set(&self, t: usize, b: usize, c: usize, p: usize) -> bool {
        self.0[t][b][c][p]
    }
}

/// Cost of one bit in 1/256 bit units.
#[inline]
fn bit_cost(bit: bool, proba: u8) -> i64 {
    let idx = if bit { 255 - proba } else { proba };
    i64::from(ENTROPY_COST[usize::from(idx)])
}

fn branch_cost(zeros: u32, ones: u32, proba: u8) -> i64 {
    i64::from(zeros) * bit_cost(false, proba) + i64::from(ones) * bit_cost(true, proba)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_counts_keeps_defaults() {
        let stats = ProbaStats::new();
        let (probs, mask) = stats.updated_probabilities();
        assert_eq!(probs, COEFF_PROBS);
        assert!(!mask.is_set(0, 0, 0, 0));
    }

    #[test]
    fn test_skewed_counts_trigger_update() {
        let mut stats = ProbaStats::new();
        // the default for this node is far from "always one"
        let default = COEFF_PROBS[2][1][0][1];
        for _ in 0..5000 {
            stats.record(2, 1, 0, 1, true);
        }
        let (probs, mask) = stats.updated_probabilities();
        assert!(mask.is_set(2, 1, 0, 1));
        assert_eq!(probs[2][1][0][1], 1);
        assert_ne!(default, 1);
    }

    #[test]
    fn test_few_counts_do_not_pay_for_update() {
        let mut stats = ProbaStats::new();
        stats.record(1, 0, 0, 0, false);
        let (probs, mask) = stats.updated_probabilities();
        assert!(!mask.is_set(1, 0, 0, 0));
        assert_eq!(probs[1][0][0][0], COEFF_PROBS[1][0][0][0]);
    }

    #[test]
    fn test_proba_rounding() {
        assert_eq!(ProbaStats::calc_proba(0, 10), 1);
        assert_eq!(ProbaStats::calc_proba(10, 10), 255);
        assert_eq!(ProbaStats::calc_proba(5, 10), 128);
    }
}
