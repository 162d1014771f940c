//! Quantization matrices and the quality-to-quantizer mapping.
//!
//! Every frame uses a single segment, so one set of three matrices (Y1, Y2,
//! UV) covers the whole picture.

use crate::common::types::{AC_QUANT, DC_QUANT, MAX_LEVEL};

/// Fixed-point precision for quantization
pub(crate) const QFIX: u32 = 17;

#[inline]
pub(crate) const fn quantization_bias(b: u32) -> u32 {
    ((b << QFIX) + 128) >> 8
}

/// Quantization division: (coeff * iq + bias) >> QFIX
#[inline]
pub(crate) fn quantdiv(coeff: u32, iq: u32, bias: u32) -> i32 {
    ((u64::from(coeff) * u64::from(iq) + u64::from(bias)) >> QFIX) as i32
}

/// Which coefficient family a matrix serves. Each has its own rounding bias.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum MatrixType {
    /// luma AC (and DC when no Y2 block exists)
    Y1,
    /// the Walsh-Hadamard transformed luma DCs
    Y2,
    /// chroma
    UV,
}

#[derive(Clone, Debug)]
pub(crate) struct VP8Matrix {
    /// Quantizer steps for each coefficient position
    pub(crate) q: [u16; 16],
    /// Reciprocals (1 << QFIX) / q
    iq: [u32; 16],
    bias: [u32; 16],
    /// coefficients at or below this quantize to 0
    zthresh: [u32; 16],
}

impl VP8Matrix {
    pub(crate) fn new(q_dc: u16, q_ac: u16, matrix_type: MatrixType) -> Self {
        let (dc_bias, ac_bias) = match matrix_type {
            MatrixType::Y1 => (96, 110),
            MatrixType::Y2 => (96, 108),
            MatrixType::UV => (110, 115),
        };

        let mut m = Self {
            q: [q_ac; 16],
            iq: [0; 16],
            bias: [0; 16],
            zthresh: [0; 16],
        };
        m.q[0] = q_dc;

        for i in 0..16 {
            let bias = if i == 0 { dc_bias } else { ac_bias };
            m.iq[i] = ((1u64 << QFIX) / u64::from(m.q[i])) as u32;
            m.bias[i] = quantization_bias(bias);
            m.zthresh[i] = ((1 << QFIX) - 1 - m.bias[i]) / m.iq[i];
        }
        m
    }

    #[inline]
    fn quantize_coeff(&self, coeff: i32, pos: usize) -> i32 {
        let abs_coeff = coeff.unsigned_abs();
        if abs_coeff <= self.zthresh[pos] {
            return 0;
        }
        let level = quantdiv(abs_coeff, self.iq[pos], self.bias[pos]).min(MAX_LEVEL as i32);
        if coeff < 0 { -level } else { level }
    }

    /// Quantize a 4x4 block in place, starting at coefficient `first`.
    ///
    /// Positions below `first` are zeroed; Y1 blocks that hand their DC to
    /// the Y2 block pass `first = 1`.
    pub(crate) fn quantize(&self, coeffs: &mut [i32; 16], first: usize) {
        for (pos, coeff) in coeffs.iter_mut().enumerate() {
            *coeff = if pos < first {
                0
            } else {
                self.quantize_coeff(*coeff, pos)
            };
        }
    }

    /// Dequantize an entire 4x4 block of coefficients in place
    #[inline]
    pub(crate) fn dequantize_block(&self, coeffs: &mut [i32; 16]) {
        for (pos, coeff) in coeffs.iter_mut().enumerate() {
            *coeff *= i32::from(self.q[pos]);
        }
    }
}

/// Convert user-facing quality (0-100) to compression factor.
/// Q75 is the knee of the piecewise mapping, which gives jpeg-like behaviour.
fn quality_to_compression(quality: u8) -> f64 {
    let c = f64::from(quality.min(100)) / 100.0;
    let linear_c = if c < 0.75 {
        c * (2.0 / 3.0)
    } else {
        2.0 * c - 1.0
    };
    // file size roughly scales as the cube of the quantizer
    linear_c.cbrt()
}

/// Convert user-facing quality (0-100) to the quantizer index (0-127).
pub(crate) fn quality_to_quant_index(quality: u8) -> u8 {
    let c = quality_to_compression(quality);
    let q = (127.0 * (1.0 - c)).round() as i32;
    q.clamp(0, 127) as u8
}

/// The three matrices plus the frame-level values derived from the same
/// quantizer index.
#[derive(Clone, Debug)]
pub(crate) struct SegmentQuant {
    pub(crate) quant_index: u8,
    pub(crate) y1: VP8Matrix,
    pub(crate) y2: VP8Matrix,
    pub(crate) uv: VP8Matrix,
}

impl SegmentQuant {
    pub(crate) fn from_quality(quality: u8) -> Self {
        Self::from_index(quality_to_quant_index(quality))
    }

    pub(crate) fn from_index(quant_index: u8) -> Self {
        let q = usize::from(quant_index.min(127));
        let dc = DC_QUANT[q];
        let ac = AC_QUANT[q];
        Self {
            quant_index: q as u8,
            y1: VP8Matrix::new(dc, ac, MatrixType::Y1),
            y2: VP8Matrix::new(dc * 2, (u32::from(ac) * 155 / 100).max(8) as u16, MatrixType::Y2),
            uv: VP8Matrix::new(dc.min(132), ac, MatrixType::UV),
        }
    }

    /// Simple loop filter level for this quantizer, at the default mid
    /// filtering strength.
    pub(crate) fn filter_level(&self) -> u8 {
        let qstep = u32::from(AC_QUANT[usize::from(self.quant_index)] >> 2);
        (qstep * 5 * 60 / 256).min(63) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_mapping_endpoints() {
        assert_eq!(quality_to_quant_index(100), 0);
        assert_eq!(quality_to_quant_index(0), 127);
        // higher quality never means a coarser quantizer
        let mut prev = 127;
        for q in 0..=100 {
            let idx = quality_to_quant_index(q);
            assert!(idx <= prev, "quality {q}");
            prev = idx;
        }
    }

    #[test]
    fn test_quantize_dequantize_is_close() {
        let quant = SegmentQuant::from_quality(90);
        let mut block = [0i32; 16];
        block[0] = 400;
        block[5] = -120;
        let orig = block;
        quant.uv.quantize(&mut block, 0);
        quant.uv.dequantize_block(&mut block);
        for (a, b) in orig.iter().zip(block.iter()) {
            let step = i32::from(quant.uv.q[0].max(quant.uv.q[1]));
            assert!((a - b).abs() <= step, "{a} vs {b}");
        }
    }

    #[test]
    fn test_first_coefficient_skipped() {
        let quant = SegmentQuant::from_quality(50);
        let mut block = [1000i32; 16];
        quant.y1.quantize(&mut block, 1);
        assert_eq!(block[0], 0);
        assert!(block[1] > 0);
    }

    #[test]
    fn test_small_values_quantize_to_zero() {
        let m = VP8Matrix::new(40, 40, MatrixType::Y1);
        let mut block = [5i32; 16];
        m.quantize(&mut block, 0);
        assert_eq!(block, [0; 16]);
    }

    #[test]
    fn test_y2_ac_floor() {
        let quant = SegmentQuant::from_index(0);
        assert!(quant.y2.q[1] >= 8);
        assert_eq!(quant.y2.q[0], DC_QUANT[0] * 2);
    }
}
