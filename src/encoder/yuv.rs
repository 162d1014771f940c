//! RGBA to YUV 4:2:0 conversion for the lossy encoder.
//!
//! The planes are padded out to whole macroblocks by repeating the last
//! row and column of the picture.

use alloc::vec;
use alloc::vec::Vec;

use imgref::ImgRef;
use rgb::RGBA8;

// values come from libwebp
// Y = 0.2568 * R + 0.5041 * G + 0.0979 * B + 16
// U = -0.1482 * R - 0.2910 * G + 0.4392 * B + 128
// V = 0.4392 * R - 0.3678 * G - 0.0714 * B + 128
// converted to 16 bit fixed point
const YUV_FIX: i32 = 16;
const YUV_HALF: i32 = 1 << (YUV_FIX - 1);

/// Macroblock-aligned luma and chroma planes of one frame.
#[derive(Clone, Debug)]
pub(crate) struct YuvPlanes {
    pub(crate) y: Vec<u8>,
    pub(crate) u: Vec<u8>,
    pub(crate) v: Vec<u8>,
    pub(crate) mb_width: usize,
    pub(crate) mb_height: usize,
}

impl YuvPlanes {
    pub(crate) fn luma_stride(&self) -> usize {
        self.mb_width * 16
    }

    pub(crate) fn chroma_stride(&self) -> usize {
        self.mb_width * 8
    }
}

fn rgb_to_y(px: RGBA8) -> u8 {
    let luma = 16839 * i32::from(px.r) + 33059 * i32::from(px.g) + 6420 * i32::from(px.b);
    ((luma + YUV_HALF + (16 << YUV_FIX)) >> YUV_FIX) as u8
}

fn rgb_to_u_raw(px: RGBA8) -> i32 {
    -9719 * i32::from(px.r) - 19081 * i32::from(px.g) + 28800 * i32::from(px.b) + (128 << YUV_FIX)
}

fn rgb_to_v_raw(px: RGBA8) -> i32 {
    28800 * i32::from(px.r) - 24116 * i32::from(px.g) - 4684 * i32::from(px.b) + (128 << YUV_FIX)
}

// rounding matches libwebp's VP8ClipUV with YUV_HALF << 2
fn average_chroma(raw: [i32; 4]) -> u8 {
    ((raw.iter().sum::<i32>() + (YUV_HALF << 2)) >> (YUV_FIX + 2)).clamp(0, 255) as u8
}

/// Converts a picture to macroblock-padded YUV 4:2:0.
///
/// The picture must be at least 1x1.
pub(crate) fn convert_image_yuv(img: ImgRef<'_, RGBA8>) -> YuvPlanes {
    let width = img.width();
    let height = img.height();
    let mb_width = width.div_ceil(16);
    let mb_height = height.div_ceil(16);
    let luma_width = 16 * mb_width;
    let luma_height = 16 * mb_height;
    let chroma_width = 8 * mb_width;
    let chroma_height = 8 * mb_height;

    let pixel = |x: usize, y: usize| -> RGBA8 {
        let row = &img.buf()[y.min(height - 1) * img.stride()..];
        row[x.min(width - 1)]
    };

    let mut y_bytes = vec![0u8; luma_width * luma_height];
    for (y, out_row) in y_bytes.chunks_exact_mut(luma_width).enumerate() {
        for (x, out) in out_row.iter_mut().enumerate() {
            *out = rgb_to_y(pixel(x, y));
        }
    }

    let mut u_bytes = vec![0u8; chroma_width * chroma_height];
    let mut v_bytes = vec![0u8; chroma_width * chroma_height];
    for cy in 0..chroma_height {
        for cx in 0..chroma_width {
            let quad = [
                pixel(2 * cx, 2 * cy),
                pixel(2 * cx + 1, 2 * cy),
                pixel(2 * cx, 2 * cy + 1),
                pixel(2 * cx + 1, 2 * cy + 1),
            ];
            u_bytes[cy * chroma_width + cx] = average_chroma(quad.map(rgb_to_u_raw));
            v_bytes[cy * chroma_width + cx] = average_chroma(quad.map(rgb_to_v_raw));
        }
    }

    YuvPlanes {
        y: y_bytes,
        u: u_bytes,
        v: v_bytes,
        mb_width,
        mb_height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imgref::Img;

    #[test]
    fn test_primary_colors() {
        assert_eq!(rgb_to_y(RGBA8::new(0, 0, 0, 255)), 16);
        assert_eq!(rgb_to_y(RGBA8::new(255, 255, 255, 255)), 235);
        let white = RGBA8::new(255, 255, 255, 255);
        assert_eq!(average_chroma([rgb_to_u_raw(white); 4]), 128);
        assert_eq!(average_chroma([rgb_to_v_raw(white); 4]), 128);
    }

    #[test]
    fn test_planes_padded_to_macroblocks() {
        let pixels = vec![RGBA8::new(10, 200, 30, 255); 17 * 3];
        let img = Img::new(pixels, 17, 3);
        let planes = convert_image_yuv(img.as_ref());
        assert_eq!(planes.mb_width, 2);
        assert_eq!(planes.mb_height, 1);
        assert_eq!(planes.y.len(), 32 * 16);
        assert_eq!(planes.u.len(), 16 * 8);
        // flat input stays flat across the padding
        assert!(planes.y.iter().all(|&y| y == planes.y[0]));
        assert!(planes.v.iter().all(|&v| v == planes.v[0]));
    }

    #[test]
    fn test_edge_replication() {
        // left column dark, right column bright; padding repeats the bright one
        let mut pixels = vec![RGBA8::new(0, 0, 0, 255); 2 * 2];
        pixels[1] = RGBA8::new(255, 255, 255, 255);
        pixels[3] = RGBA8::new(255, 255, 255, 255);
        let img = Img::new(pixels, 2, 2);
        let planes = convert_image_yuv(img.as_ref());
        assert_eq!(planes.y[0], 16);
        assert_eq!(planes.y[1], 235);
        assert_eq!(planes.y[15], 235);
        assert_eq!(planes.y[15 * 16], 16);
    }
}
