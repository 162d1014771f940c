//! Frame encoding entry point and RIFF chunk helpers.

use alloc::vec::Vec;
use thiserror::Error;

use super::alpha::{encode_alpha_plane, has_alpha};
use super::config::EncodingConfig;
use super::picture::Picture;
use super::vec_writer::VecWriter;
use super::vp8::encode_frame_lossy;

/// Error that can occur during encoding.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EncodeError {
    /// The image dimensions are not allowed by the WebP format.
    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions {
        /// The rejected width.
        width: u32,
        /// The rejected height.
        height: u32,
    },

    /// A configuration field is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// The first VP8 partition exceeds what its 19 bit size field can
    /// describe.
    #[error("First partition too large: {0} bytes")]
    PartitionOverflow(usize),
}

/// Compressed payloads of one frame.
#[derive(Debug, Clone)]
pub(crate) struct EncodedFrame {
    /// `VP8 ` chunk payload.
    pub(crate) bitstream: Vec<u8>,
    /// `ALPH` chunk payload, absent for fully opaque frames.
    pub(crate) alpha_data: Option<Vec<u8>>,
}

/// Encodes one picture with the run's fixed settings.
pub(crate) fn encode_picture(
    picture: &Picture,
    config: &EncodingConfig,
) -> Result<EncodedFrame, EncodeError> {
    config.validate()?;
    let img = picture.as_img();
    let bitstream = encode_frame_lossy(img, config.quality, config.method)?;
    let alpha_data = has_alpha(img).then(|| encode_alpha_plane(img));
    log::debug!(
        "encoded {}x{} frame: {} bytes VP8, {} bytes alpha",
        picture.width(),
        picture.height(),
        bitstream.len(),
        alpha_data.as_ref().map_or(0, Vec::len)
    );
    Ok(EncodedFrame {
        bitstream,
        alpha_data,
    })
}

/// Size of a chunk including its 8 byte header and padding.
pub(crate) const fn chunk_size(inner_bytes: usize) -> u32 {
    if inner_bytes % 2 == 1 {
        (inner_bytes + 1) as u32 + 8
    } else {
        inner_bytes as u32 + 8
    }
}

pub(crate) fn write_chunk(w: &mut Vec<u8>, name: &[u8; 4], data: &[u8]) {
    w.write_all(name);
    w.write_u32_le(data.len() as u32);
    w.write_all(data);
    if data.len() % 2 == 1 {
        w.push(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use rgb::RGBA8;

    #[test]
    fn test_chunk_padding() {
        let mut out = Vec::new();
        write_chunk(&mut out, b"ALPH", &[1, 2, 3]);
        assert_eq!(out, [b'A', b'L', b'P', b'H', 3, 0, 0, 0, 1, 2, 3, 0]);
        assert_eq!(chunk_size(3) as usize, out.len());
        assert_eq!(chunk_size(4), 12);
    }

    #[test]
    fn test_opaque_picture_has_no_alpha_chunk() {
        let picture = Picture::from_pixels(vec![RGBA8::new(9, 9, 9, 255); 64], 8, 8).unwrap();
        let encoded = encode_picture(&picture, &EncodingConfig::new()).unwrap();
        assert!(encoded.alpha_data.is_none());
        assert_eq!(&encoded.bitstream[3..6], &[0x9d, 0x01, 0x2a]);
    }

    #[test]
    fn test_translucent_picture_has_alpha_chunk() {
        let picture = Picture::from_pixels(vec![RGBA8::new(9, 9, 9, 100); 64], 8, 8).unwrap();
        let encoded = encode_picture(&picture, &EncodingConfig::new()).unwrap();
        assert_eq!(encoded.alpha_data.map(|a| a[0]), Some(1));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let picture = Picture::from_pixels(vec![RGBA8::default(); 4], 2, 2).unwrap();
        let mut config = EncodingConfig::new();
        config.quality = 101;
        assert!(matches!(
            encode_picture(&picture, &config),
            Err(EncodeError::InvalidConfig(_))
        ));
    }
}
