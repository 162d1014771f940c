//! Lossy VP8 keyframe encoder.
//!
//! Every macroblock is predicted as a whole (16x16 luma, 8x8 chroma) with
//! the luma DCs carried by a second-order Y2 block. Tokens are buffered
//! during the macroblock pass so the frame header can carry probability
//! updates fitted to this frame.

use alloc::vec;
use alloc::vec::Vec;

use imgref::ImgRef;
use rgb::RGBA8;

use crate::common::prediction::IntraMode;
use crate::encoder::api::EncodeError;
use crate::encoder::quantize::SegmentQuant;
use crate::encoder::yuv::{YuvPlanes, convert_image_yuv};

mod header;
mod prediction;
mod residuals;
mod stats;

use residuals::TokenBuffer;
use stats::{ProbaStats, TokenType};

/// Largest dimension a VP8 frame header can carry.
pub(crate) const MAX_DIMENSION: usize = 16383;

// non-zero flags of the blocks bordering the current macroblock, which
// select the first token context of each block
#[derive(Clone, Copy, Default)]
struct Complexity {
    y2: u8,
    y: [u8; 4],
    u: [u8; 2],
    v: [u8; 2],
}

#[derive(Clone, Copy, Default)]
struct MacroblockInfo {
    luma_mode: IntraMode,
    chroma_mode: IntraMode,
    coeffs_skipped: bool,
}

/// Quantized coefficients of one macroblock, zigzag order.
#[derive(Clone, Default)]
struct QuantizedMbCoeffs {
    y2_zigzag: [i32; 16],
    y1_zigzag: [[i32; 16]; 16],
    u_zigzag: [[i32; 16]; 4],
    v_zigzag: [[i32; 16]; 4],
}

impl QuantizedMbCoeffs {
    fn is_all_zero(&self) -> bool {
        let zero = |b: &[i32; 16]| b.iter().all(|&c| c == 0);
        zero(&self.y2_zigzag)
            && self.y1_zigzag.iter().all(zero)
            && self.u_zigzag.iter().all(zero)
            && self.v_zigzag.iter().all(zero)
    }
}

struct Vp8Encoder<'a> {
    planes: &'a YuvPlanes,
    width: u16,
    height: u16,
    quant: SegmentQuant,
    /// 0 restricts every macroblock to DC prediction
    method: u8,

    // what the decoder will reconstruct, used for prediction
    recon_y: Vec<u8>,
    recon_u: Vec<u8>,
    recon_v: Vec<u8>,

    mb_info: Vec<MacroblockInfo>,
    token_buffer: TokenBuffer,
    proba_stats: ProbaStats,

    top_complexity: Vec<Complexity>,
    left_complexity: Complexity,
}

impl<'a> Vp8Encoder<'a> {
    fn new(planes: &'a YuvPlanes, width: u16, height: u16, quality: u8, method: u8) -> Self {
        let num_mbs = planes.mb_width * planes.mb_height;
        Self {
            planes,
            width,
            height,
            quant: SegmentQuant::from_quality(quality),
            method,
            recon_y: vec![0; planes.y.len()],
            recon_u: vec![0; planes.u.len()],
            recon_v: vec![0; planes.v.len()],
            mb_info: Vec::with_capacity(num_mbs),
            token_buffer: TokenBuffer::with_estimated_capacity(num_mbs),
            proba_stats: ProbaStats::new(),
            top_complexity: vec![Complexity::default(); planes.mb_width],
            left_complexity: Complexity::default(),
        }
    }

    fn encode_macroblocks(&mut self) {
        for mby in 0..self.planes.mb_height {
            self.left_complexity = Complexity::default();
            for mbx in 0..self.planes.mb_width {
                let info = self.encode_macroblock(mbx, mby);
                self.mb_info.push(info);
            }
        }
    }

    fn encode_macroblock(&mut self, mbx: usize, mby: usize) -> MacroblockInfo {
        let mut coeffs = QuantizedMbCoeffs::default();

        let (luma_mode, mut luma_ws) = self.pick_luma_mode(mbx, mby);
        self.transform_luma(mbx, mby, &mut luma_ws, &mut coeffs);

        let (chroma_mode, mut u_ws, mut v_ws) = self.pick_chroma_mode(mbx, mby);
        coeffs.u_zigzag = self.transform_chroma(mbx, mby, 0, &mut u_ws);
        coeffs.v_zigzag = self.transform_chroma(mbx, mby, 1, &mut v_ws);

        let coeffs_skipped = coeffs.is_all_zero();
        if coeffs_skipped {
            // skipped macroblocks reset the contexts they border, Y2 included
            self.top_complexity[mbx] = Complexity::default();
            self.left_complexity = Complexity::default();
        } else {
            self.record_tokens(mbx, &coeffs);
        }

        MacroblockInfo {
            luma_mode,
            chroma_mode,
            coeffs_skipped,
        }
    }

    fn record_tokens(&mut self, mbx: usize, coeffs: &QuantizedMbCoeffs) {
        let top = &mut self.top_complexity[mbx];
        let left = &mut self.left_complexity;
        let tokens = &mut self.token_buffer;
        let stats = &mut self.proba_stats;

        let ctx = usize::from(top.y2 + left.y2);
        let nz = tokens.record_coeff_tokens(stats, &coeffs.y2_zigzag, TokenType::I16DC, 0, ctx);
        top.y2 = u8::from(nz);
        left.y2 = u8::from(nz);

        for (k, block) in coeffs.y1_zigzag.iter().enumerate() {
            let (x, y) = (k % 4, k / 4);
            let ctx = usize::from(top.y[x] + left.y[y]);
            let nz = tokens.record_coeff_tokens(stats, block, TokenType::I16AC, 1, ctx);
            top.y[x] = u8::from(nz);
            left.y[y] = u8::from(nz);
        }

        for (blocks, top_nz, left_nz) in [
            (&coeffs.u_zigzag, &mut top.u, &mut left.u),
            (&coeffs.v_zigzag, &mut top.v, &mut left.v),
        ] {
            for (k, block) in blocks.iter().enumerate() {
                let (x, y) = (k % 2, k / 2);
                let ctx = usize::from(top_nz[x] + left_nz[y]);
                let nz = tokens.record_coeff_tokens(stats, block, TokenType::Chroma, 0, ctx);
                top_nz[x] = u8::from(nz);
                left_nz[y] = u8::from(nz);
            }
        }
    }
}

/// Encodes one picture as a VP8 keyframe bitstream (the payload of a
/// `VP8 ` chunk).
pub(crate) fn encode_frame_lossy(
    img: ImgRef<'_, RGBA8>,
    quality: u8,
    method: u8,
) -> Result<Vec<u8>, EncodeError> {
    let (w, h) = (img.width(), img.height());
    if w == 0 || h == 0 || w > MAX_DIMENSION || h > MAX_DIMENSION {
        return Err(EncodeError::InvalidDimensions {
            width: w as u32,
            height: h as u32,
        });
    }

    let planes = convert_image_yuv(img);
    let mut encoder = Vp8Encoder::new(&planes, w as u16, h as u16, quality, method);
    encoder.encode_macroblocks();
    encoder.write_frame()
}

#[cfg(test)]
mod tests {
    use super::*;
    use imgref::Img;

    fn gradient(width: usize, height: usize) -> Img<Vec<RGBA8>> {
        let mut pixels = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                pixels.push(RGBA8::new((x * 7) as u8, (y * 5) as u8, ((x + y) * 3) as u8, 255));
            }
        }
        Img::new(pixels, width, height)
    }

    #[test]
    fn test_frame_header_fields() {
        let img = gradient(33, 20);
        let data = encode_frame_lossy(img.as_ref(), 75, 4).unwrap();
        // keyframe, shown
        assert_eq!(data[0] & 1, 0);
        assert_ne!(data[0] & 0x10, 0);
        assert_eq!(&data[3..6], &[0x9d, 0x01, 0x2a]);
        assert_eq!(u16::from_le_bytes([data[6], data[7]]), 33);
        assert_eq!(u16::from_le_bytes([data[8], data[9]]), 20);
        let first_partition =
            (u32::from(data[0]) | u32::from(data[1]) << 8 | u32::from(data[2]) << 16) >> 5;
        assert!(10 + first_partition as usize <= data.len());
    }

    #[test]
    fn test_rejects_oversized() {
        let img = Img::new(vec![RGBA8::default(); 16384], 16384, 1);
        assert!(matches!(
            encode_frame_lossy(img.as_ref(), 75, 4),
            Err(EncodeError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_flat_image_skips_macroblocks() {
        let img = Img::new(vec![RGBA8::new(128, 128, 128, 255); 64 * 64], 64, 64);
        let planes = convert_image_yuv(img.as_ref());
        let mut encoder = Vp8Encoder::new(&planes, 64, 64, 75, 4);
        encoder.encode_macroblocks();
        assert_eq!(encoder.mb_info.len(), 16);
        assert!(encoder.mb_info.iter().skip(1).any(|mb| mb.coeffs_skipped));
    }

    #[test]
    fn test_lower_quality_is_smaller() {
        let img = gradient(64, 64);
        let high = encode_frame_lossy(img.as_ref(), 95, 4).unwrap();
        let low = encode_frame_lossy(img.as_ref(), 10, 4).unwrap();
        assert!(low.len() < high.len(), "{} vs {}", low.len(), high.len());
    }

    #[test]
    fn test_method_zero_uses_dc_only() {
        let img = gradient(32, 32);
        let planes = convert_image_yuv(img.as_ref());
        let mut encoder = Vp8Encoder::new(&planes, 32, 32, 75, 0);
        encoder.encode_macroblocks();
        assert!(encoder.mb_info.iter().all(|mb| mb.luma_mode == IntraMode::DC
            && mb.chroma_mode == IntraMode::DC));
    }
}
