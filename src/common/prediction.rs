//! Whole-block intra prediction over bordered work buffers.
//!
//! A work buffer holds one row of top border, one column of left border and
//! the block itself. Row 0 / column 0 are the borders, the block starts at
//! (1, 1).

/// Luma work buffer stride: 1 border pixel + 16 luma pixels, padded
pub(crate) const LUMA_STRIDE: usize = 32;
/// Luma work buffer size: 17 rows (1 border + 16)
pub(crate) const LUMA_BLOCK_SIZE: usize = LUMA_STRIDE * (1 + 16);

/// Chroma work buffer stride
pub(crate) const CHROMA_STRIDE: usize = 32;
/// Chroma work buffer size: 9 rows (1 border + 8)
pub(crate) const CHROMA_BLOCK_SIZE: usize = CHROMA_STRIDE * (8 + 1);

/// The four whole-block prediction modes. Discriminants are the bitstream
/// values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum IntraMode {
    #[default]
    DC = 0,
    V = 1,
    H = 2,
    TM = 3,
}

impl IntraMode {
    pub(crate) const ALL: [IntraMode; 4] = [IntraMode::DC, IntraMode::V, IntraMode::H, IntraMode::TM];
}

/// Creates a work buffer for a `size`x`size` block at block coordinates
/// (`bx`, `by`) of an already reconstructed plane.
///
/// Missing neighbours take the fixed values a decoder assumes: 127 above,
/// 129 to the left, and for the corner 127 on the first row, 129 on the
/// first column.
pub(crate) fn create_border<const N: usize>(
    plane: &[u8],
    plane_stride: usize,
    bx: usize,
    by: usize,
    size: usize,
    stride: usize,
) -> [u8; N] {
    let mut ws = [0u8; N];
    let x0 = bx * size;
    let y0 = by * size;

    // above
    if by == 0 {
        ws[1..=size].fill(127);
    } else {
        let row = (y0 - 1) * plane_stride + x0;
        ws[1..=size].copy_from_slice(&plane[row..row + size]);
    }

    // left
    for y in 0..size {
        ws[(y + 1) * stride] = if bx == 0 {
            129
        } else {
            plane[(y0 + y) * plane_stride + x0 - 1]
        };
    }

    ws[0] = if by == 0 {
        127
    } else if bx == 0 {
        129
    } else {
        plane[(y0 - 1) * plane_stride + x0 - 1]
    };

    ws
}

pub(crate) fn predict_vpred(a: &mut [u8], size: usize, stride: usize) {
    // copy the top row to the rows below it
    let (above, curr) = a.split_at_mut(stride);
    let above_slice = &above[1..][..size];

    for curr_chunk in curr.chunks_exact_mut(stride).take(size) {
        curr_chunk[1..][..size].copy_from_slice(above_slice);
    }
}

pub(crate) fn predict_hpred(a: &mut [u8], size: usize, stride: usize) {
    for chunk in a.chunks_exact_mut(stride).skip(1).take(size) {
        let left = chunk[0];
        chunk[1..][..size].fill(left);
    }
}

pub(crate) fn predict_dcpred(a: &mut [u8], size: usize, stride: usize, above: bool, left: bool) {
    let mut sum = 0u32;
    let mut shf = if size == 8 { 2u32 } else { 3u32 };

    if left {
        for y in 0usize..size {
            sum += u32::from(a[(y + 1) * stride]);
        }
        shf += 1;
    }

    if above {
        sum += a[1..=size].iter().map(|&p| u32::from(p)).sum::<u32>();
        shf += 1;
    }

    let dcval = if !left && !above {
        128u8
    } else {
        ((sum + (1 << (shf - 1))) >> shf) as u8
    };

    for y in 0usize..size {
        a[1 + stride * (y + 1)..][..size].fill(dcval);
    }
}

/// X_ij = L_i + A_j - P, clamped to a byte.
pub(crate) fn predict_tmpred(a: &mut [u8], size: usize, stride: usize) {
    let p = i32::from(a[0]);
    let (above, rows) = a.split_at_mut(stride);

    for row in rows.chunks_exact_mut(stride).take(size) {
        let left_minus_p = i32::from(row[0]) - p;
        row[1..][..size]
            .iter_mut()
            .zip(&above[1..])
            .for_each(|(cur, &abv)| *cur = (left_minus_p + i32::from(abv)).clamp(0, 255) as u8);
    }
}

/// Fills the block area of `ws` with the prediction for `mode`.
pub(crate) fn predict(ws: &mut [u8], mode: IntraMode, size: usize, stride: usize, above: bool, left: bool) {
    match mode {
        IntraMode::DC => predict_dcpred(ws, size, stride, above, left),
        IntraMode::V => predict_vpred(ws, size, stride),
        IntraMode::H => predict_hpred(ws, size, stride),
        IntraMode::TM => predict_tmpred(ws, size, stride),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_at(ws: &[u8], stride: usize, x: usize, y: usize) -> u8 {
        ws[(y + 1) * stride + x + 1]
    }

    #[test]
    fn test_missing_edges_use_fixed_values() {
        let plane = [0u8; 16 * 16];
        let ws: [u8; LUMA_BLOCK_SIZE] = create_border(&plane, 16, 0, 0, 16, LUMA_STRIDE);
        assert_eq!(ws[0], 127);
        assert!(ws[1..=16].iter().all(|&p| p == 127));
        assert!((0..16).all(|y| ws[(y + 1) * LUMA_STRIDE] == 129));
    }

    #[test]
    fn test_corner_on_first_column() {
        let plane = [50u8; 8 * 16];
        let ws: [u8; CHROMA_BLOCK_SIZE] = create_border(&plane, 8, 0, 1, 8, CHROMA_STRIDE);
        assert_eq!(ws[0], 129);
        assert_eq!(ws[1], 50);
        assert_eq!(ws[CHROMA_STRIDE], 129);
    }

    #[test]
    fn test_dc_without_neighbours_is_128() {
        let mut ws = [0u8; CHROMA_BLOCK_SIZE];
        predict_dcpred(&mut ws, 8, CHROMA_STRIDE, false, false);
        assert!((0..8).all(|y| (0..8).all(|x| block_at(&ws, CHROMA_STRIDE, x, y) == 128)));
    }

    #[test]
    fn test_tm_clamps() {
        let mut ws = [0u8; CHROMA_BLOCK_SIZE];
        ws[0] = 10;
        ws[1..=8].fill(250);
        for y in 0..8 {
            ws[(y + 1) * CHROMA_STRIDE] = 200;
        }
        predict_tmpred(&mut ws, 8, CHROMA_STRIDE);
        assert_eq!(block_at(&ws, CHROMA_STRIDE, 3, 3), 255);
    }

    #[test]
    fn test_vertical_and_horizontal() {
        let mut ws = [0u8; CHROMA_BLOCK_SIZE];
        for i in 0..8 {
            ws[1 + i] = i as u8;
            ws[(i + 1) * CHROMA_STRIDE] = 100 + i as u8;
        }
        let mut v = ws;
        predict(&mut v, IntraMode::V, 8, CHROMA_STRIDE, true, true);
        assert_eq!(block_at(&v, CHROMA_STRIDE, 5, 7), 5);
        let mut h = ws;
        predict(&mut h, IntraMode::H, 8, CHROMA_STRIDE, true, true);
        assert_eq!(block_at(&h, CHROMA_STRIDE, 5, 7), 107);
    }
}
