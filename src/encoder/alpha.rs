//! `ALPH` chunk payloads.
//!
//! The alpha plane is stored losslessly as a VP8L image stream without the
//! VP8L header, the values travelling in the green channel.

use alloc::vec::Vec;

use imgref::ImgRef;
use rgb::RGBA8;

use super::vp8l::backward_refs::{
    NUM_DISTANCE_CODES, NUM_LENGTH_CODES, NUM_LITERAL_CODES, PixOrCopy, compute_backward_refs,
    prefix_encode,
};
use super::vp8l::bitwriter::BitWriter;
use super::vp8l::huffman::PrefixCode;

/// Header byte: preprocessing (bits 4-5) and filter (bits 2-3) unused,
/// compression method 1 (lossless).
const ALPHA_HEADER: u8 = 1;

/// Whether any pixel is not fully opaque.
pub(crate) fn has_alpha(img: ImgRef<'_, RGBA8>) -> bool {
    img.pixels().any(|px| px.a != 255)
}

/// Encodes the alpha channel of `img` as an `ALPH` chunk payload.
pub(crate) fn encode_alpha_plane(img: ImgRef<'_, RGBA8>) -> Vec<u8> {
    let width = img.width();
    let alpha: Vec<u8> = img.pixels().map(|px| px.a).collect();
    let refs = compute_backward_refs(&alpha, width);

    let mut green = [0u32; NUM_LITERAL_CODES + NUM_LENGTH_CODES];
    let mut distance = [0u32; NUM_DISTANCE_CODES];
    for r in &refs {
        match *r {
            PixOrCopy::Literal(v) => green[usize::from(v)] += 1,
            PixOrCopy::Copy { len, dist } => {
                let (len_code, ..) = prefix_encode(u32::from(len));
                green[NUM_LITERAL_CODES + usize::from(len_code)] += 1;
                let (dist_code, ..) = prefix_encode(dist);
                distance[usize::from(dist_code)] += 1;
            }
        }
    }

    let mut w = BitWriter::with_capacity(refs.len() + 64);
    // no transforms, no color cache, a single prefix code group
    w.write_bit(false);
    w.write_bit(false);
    w.write_bit(false);

    let unused = [0u32; NUM_LITERAL_CODES];
    let green_code = PrefixCode::write(&mut w, &green);
    // red, blue and alpha are always zero
    for _ in 0..3 {
        PrefixCode::write(&mut w, &unused);
    }
    let distance_code = PrefixCode::write(&mut w, &distance);

    for r in &refs {
        match *r {
            PixOrCopy::Literal(v) => green_code.write_symbol(&mut w, usize::from(v)),
            PixOrCopy::Copy { len, dist } => {
                let (code, n_bits, bits) = prefix_encode(u32::from(len));
                green_code.write_symbol(&mut w, NUM_LITERAL_CODES + usize::from(code));
                w.write_bits(u64::from(bits), n_bits);

                let (code, n_bits, bits) = prefix_encode(dist);
                distance_code.write_symbol(&mut w, usize::from(code));
                w.write_bits(u64::from(bits), n_bits);
            }
        }
    }

    let stream = w.finish();
    let mut out = Vec::with_capacity(stream.len() + 1);
    out.push(ALPHA_HEADER);
    out.extend_from_slice(&stream);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use imgref::Img;

    #[test]
    fn test_opaque_detection() {
        let mut img = Img::new(vec![RGBA8::new(1, 2, 3, 255); 16], 4, 4);
        assert!(!has_alpha(img.as_ref()));
        img.buf_mut()[9].a = 254;
        assert!(has_alpha(img.as_ref()));
    }

    #[test]
    fn test_header_byte() {
        let img = Img::new(vec![RGBA8::new(0, 0, 0, 0); 64], 8, 8);
        let payload = encode_alpha_plane(img.as_ref());
        assert_eq!(payload[0], 1);
    }

    #[test]
    fn test_uniform_plane_is_tiny() {
        let img = Img::new(vec![RGBA8::new(0, 0, 0, 128); 128 * 128], 128, 128);
        let payload = encode_alpha_plane(img.as_ref());
        assert!(payload.len() < 32, "{} bytes", payload.len());
    }

    #[test]
    fn test_gradient_uses_complex_code() {
        let pixels: Vec<RGBA8> = (0..64 * 64)
            .map(|i| RGBA8::new(0, 0, 0, ((i * 37) % 251) as u8))
            .collect();
        let img = Img::new(pixels, 64, 64);
        let payload = encode_alpha_plane(img.as_ref());
        // three zero header bits, then a normal (non-simple) green code
        assert_eq!(payload[1] & 0b1111, 0);
        assert_eq!(payload, encode_alpha_plane(img.as_ref()));
    }
}
