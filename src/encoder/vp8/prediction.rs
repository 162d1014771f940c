//! Mode choice, forward transform, quantization and reconstruction of one
//! macroblock.

use crate::common::prediction::{
    CHROMA_BLOCK_SIZE, CHROMA_STRIDE, IntraMode, LUMA_BLOCK_SIZE, LUMA_STRIDE, create_border,
    predict,
};
use crate::common::transform;
use crate::common::types::ZIGZAG;

use super::QuantizedMbCoeffs;

fn to_zigzag(natural: &[i32; 16]) -> [i32; 16] {
    core::array::from_fn(|n| natural[ZIGZAG[n]])
}

fn from_zigzag(zigzag: &[i32; 16]) -> [i32; 16] {
    let mut natural = [0; 16];
    for (n, &level) in zigzag.iter().enumerate() {
        natural[ZIGZAG[n]] = level;
    }
    natural
}

/// Squared error between a source block and the block area of a work buffer.
fn block_sse(src: &[u8], src_stride: usize, x0: usize, y0: usize, ws: &[u8], size: usize, stride: usize) -> u64 {
    let mut sse = 0u64;
    for y in 0..size {
        let src_row = &src[(y0 + y) * src_stride + x0..][..size];
        let pred_row = &ws[(y + 1) * stride + 1..][..size];
        for (&s, &p) in src_row.iter().zip(pred_row) {
            let diff = i32::from(s) - i32::from(p);
            sse += (diff * diff) as u64;
        }
    }
    sse
}

/// Residual of the 4x4 sub-block at (`sx`, `sy`) inside a work buffer.
#[allow(clippy::too_many_arguments)]
fn residual_4x4(
    src: &[u8],
    src_stride: usize,
    x0: usize,
    y0: usize,
    ws: &[u8],
    stride: usize,
    sx: usize,
    sy: usize,
) -> [i32; 16] {
    let mut block = [0i32; 16];
    for y in 0..4 {
        for x in 0..4 {
            let s = src[(y0 + sy * 4 + y) * src_stride + x0 + sx * 4 + x];
            let p = ws[(sy * 4 + y + 1) * stride + sx * 4 + x + 1];
            block[y * 4 + x] = i32::from(s) - i32::from(p);
        }
    }
    block
}

/// Adds an inverse-transformed residual back onto the prediction.
fn add_residue(ws: &mut [u8], stride: usize, sx: usize, sy: usize, residue: &[i32; 16]) {
    for y in 0..4 {
        let row = &mut ws[(sy * 4 + y + 1) * stride + sx * 4 + 1..][..4];
        for (x, px) in row.iter_mut().enumerate() {
            *px = (i32::from(*px) + residue[y * 4 + x]).clamp(0, 255) as u8;
        }
    }
}

fn store_block(plane: &mut [u8], plane_stride: usize, x0: usize, y0: usize, ws: &[u8], size: usize, stride: usize) {
    for y in 0..size {
        plane[(y0 + y) * plane_stride + x0..][..size].copy_from_slice(&ws[(y + 1) * stride + 1..][..size]);
    }
}

impl super::Vp8Encoder<'_> {
    fn candidate_modes(&self) -> &'static [IntraMode] {
        if self.method == 0 {
            &[IntraMode::DC]
        } else {
            &IntraMode::ALL
        }
    }

    /// Picks the 16x16 luma mode with the smallest prediction error and
    /// returns it with the predicted work buffer.
    pub(super) fn pick_luma_mode(&self, mbx: usize, mby: usize) -> (IntraMode, [u8; LUMA_BLOCK_SIZE]) {
        let stride = self.planes.luma_stride();
        let border: [u8; LUMA_BLOCK_SIZE] =
            create_border(&self.recon_y, stride, mbx, mby, 16, LUMA_STRIDE);

        let mut best: Option<(u64, IntraMode, [u8; LUMA_BLOCK_SIZE])> = None;
        for &mode in self.candidate_modes() {
            let mut ws = border;
            predict(&mut ws, mode, 16, LUMA_STRIDE, mby > 0, mbx > 0);
            let sse = block_sse(&self.planes.y, stride, mbx * 16, mby * 16, &ws, 16, LUMA_STRIDE);
            if best.as_ref().is_none_or(|(best_sse, ..)| sse < *best_sse) {
                best = Some((sse, mode, ws));
            }
        }
        let (_, mode, ws) = best.unwrap_or((0, IntraMode::DC, border));
        (mode, ws)
    }

    /// Picks one chroma mode for both U and V by their combined error.
    pub(super) fn pick_chroma_mode(
        &self,
        mbx: usize,
        mby: usize,
    ) -> (IntraMode, [u8; CHROMA_BLOCK_SIZE], [u8; CHROMA_BLOCK_SIZE]) {
        let stride = self.planes.chroma_stride();
        let border_u: [u8; CHROMA_BLOCK_SIZE] =
            create_border(&self.recon_u, stride, mbx, mby, 8, CHROMA_STRIDE);
        let border_v: [u8; CHROMA_BLOCK_SIZE] =
            create_border(&self.recon_v, stride, mbx, mby, 8, CHROMA_STRIDE);

        let mut best = (u64::MAX, IntraMode::DC, border_u, border_v);
        for &mode in self.candidate_modes() {
            let mut ws_u = border_u;
            let mut ws_v = border_v;
            predict(&mut ws_u, mode, 8, CHROMA_STRIDE, mby > 0, mbx > 0);
            predict(&mut ws_v, mode, 8, CHROMA_STRIDE, mby > 0, mbx > 0);
            let sse = block_sse(&self.planes.u, stride, mbx * 8, mby * 8, &ws_u, 8, CHROMA_STRIDE)
                + block_sse(&self.planes.v, stride, mbx * 8, mby * 8, &ws_v, 8, CHROMA_STRIDE);
            if sse < best.0 {
                best = (sse, mode, ws_u, ws_v);
            }
        }
        (best.1, best.2, best.3)
    }

    /// Transforms and quantizes the luma residual, then reconstructs the
    /// macroblock exactly as a decoder will and stores it.
    pub(super) fn transform_luma(
        &mut self,
        mbx: usize,
        mby: usize,
        ws: &mut [u8; LUMA_BLOCK_SIZE],
        coeffs: &mut QuantizedMbCoeffs,
    ) {
        let stride = self.planes.luma_stride();
        let (x0, y0) = (mbx * 16, mby * 16);

        let mut dcs = [0i32; 16];
        let mut blocks = [[0i32; 16]; 16];
        for (k, block) in blocks.iter_mut().enumerate() {
            let (sx, sy) = (k % 4, k / 4);
            *block = residual_4x4(&self.planes.y, stride, x0, y0, ws, LUMA_STRIDE, sx, sy);
            transform::dct4x4(block);
            dcs[k] = block[0];
        }

        transform::wht4x4(&mut dcs);
        self.quant.y2.quantize(&mut dcs, 0);
        coeffs.y2_zigzag = to_zigzag(&dcs);

        // the decoder's view of the DCs
        let mut recon_dcs = dcs;
        self.quant.y2.dequantize_block(&mut recon_dcs);
        transform::iwht4x4(&mut recon_dcs);

        for (k, block) in blocks.iter_mut().enumerate() {
            self.quant.y1.quantize(block, 1);
            coeffs.y1_zigzag[k] = to_zigzag(block);

            let mut residue = from_zigzag(&coeffs.y1_zigzag[k]);
            self.quant.y1.dequantize_block(&mut residue);
            residue[0] = recon_dcs[k];
            transform::idct4x4(&mut residue);
            add_residue(ws, LUMA_STRIDE, k % 4, k / 4, &residue);
        }

        store_block(&mut self.recon_y, stride, x0, y0, ws, 16, LUMA_STRIDE);
    }

    /// Same as [`Self::transform_luma`] for one chroma plane. `plane` is 0
    /// for U and 1 for V.
    pub(super) fn transform_chroma(
        &mut self,
        mbx: usize,
        mby: usize,
        plane: usize,
        ws: &mut [u8; CHROMA_BLOCK_SIZE],
    ) -> [[i32; 16]; 4] {
        let stride = self.planes.chroma_stride();
        let (x0, y0) = (mbx * 8, mby * 8);
        let planes = self.planes;
        let src = if plane == 0 { &planes.u } else { &planes.v };

        let mut out = [[0i32; 16]; 4];
        for (k, zigzag) in out.iter_mut().enumerate() {
            let (sx, sy) = (k % 2, k / 2);
            let mut block = residual_4x4(src, stride, x0, y0, ws, CHROMA_STRIDE, sx, sy);
            transform::dct4x4(&mut block);
            self.quant.uv.quantize(&mut block, 0);
            *zigzag = to_zigzag(&block);

            self.quant.uv.dequantize_block(&mut block);
            transform::idct4x4(&mut block);
            add_residue(ws, CHROMA_STRIDE, sx, sy, &block);
        }

        let recon = if plane == 0 { &mut self.recon_u } else { &mut self.recon_v };
        store_block(recon, stride, x0, y0, ws, 8, CHROMA_STRIDE);
        out
    }
}
