//! Encoder-ready pixels.

use alloc::collections::TryReserveError;
use alloc::vec::Vec;

use imgref::{ImgRef, ImgVec};
use rgb::RGBA8;

/// An owned RGBA picture at the animation's canvas size.
///
/// Pixels are packed (stride equals width) and stored as direct color.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Picture {
    img: ImgVec<RGBA8>,
}

impl Picture {
    /// Copies the top-left `width x height` region of a byte view whose rows
    /// hold 4 bytes (R, G, B, A) per pixel.
    ///
    /// Allocation failure is reported instead of aborting.
    pub fn try_from_rgba_bytes(
        src: ImgRef<'_, u8>,
        width: usize,
        height: usize,
    ) -> Result<Self, TryReserveError> {
        debug_assert!(width * 4 <= src.width() && height <= src.height());
        let mut pixels = Vec::new();
        pixels.try_reserve_exact(width * height)?;
        for row in src.rows().take(height) {
            pixels.extend(
                row[..width * 4]
                    .chunks_exact(4)
                    .map(|px| RGBA8::new(px[0], px[1], px[2], px[3])),
            );
        }
        Ok(Self {
            img: ImgVec::new(pixels, width, height),
        })
    }

    /// Wraps packed pixels. Returns `None` when the length does not match.
    pub fn from_pixels(pixels: Vec<RGBA8>, width: usize, height: usize) -> Option<Self> {
        (width.checked_mul(height)? == pixels.len()).then(|| Self {
            img: ImgVec::new(pixels, width, height),
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> usize {
        self.img.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> usize {
        self.img.height()
    }

    /// Borrowed view of the pixels.
    pub fn as_img(&self) -> ImgRef<'_, RGBA8> {
        self.img.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use imgref::Img;

    #[test]
    fn test_byte_rows_are_unpacked() {
        // 1x2 pixels in rows padded to 8 bytes
        let bytes = [1, 2, 3, 4, 0, 0, 0, 0, 5, 6, 7, 8, 0, 0, 0, 0];
        let src = Img::new_stride(&bytes[..], 8, 2, 8);
        let picture = Picture::try_from_rgba_bytes(src, 1, 2).unwrap();
        let pixels: Vec<RGBA8> = picture.as_img().pixels().collect();
        assert_eq!(pixels, [RGBA8::new(1, 2, 3, 4), RGBA8::new(5, 6, 7, 8)]);
    }

    #[test]
    fn test_from_pixels_checks_length() {
        assert!(Picture::from_pixels(vec![RGBA8::default(); 6], 3, 2).is_some());
        assert!(Picture::from_pixels(vec![RGBA8::default(); 5], 3, 2).is_none());
    }
}
