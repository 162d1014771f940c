//! VP8 bitstream header encoding.
//!
//! Writes the uncompressed frame tag, the compressed frame header and the
//! per-macroblock mode headers, then lays out both partitions.

use alloc::vec::Vec;

use crate::common::prediction::IntraMode;
use crate::common::types::{
    COEFF_UPDATE_PROBS, KEYFRAME_UV_MODE_PROBS, KEYFRAME_YMODE_PROBS, TokenProbTables,
};
use crate::encoder::api::EncodeError;
use crate::encoder::arithmetic::ArithmeticEncoder;
use crate::encoder::vec_writer::VecWriter;

use super::MacroblockInfo;
use super::stats::UpdateMask;

/// The first partition size is a 19 bit field.
const MAX_PARTITION0_SIZE: usize = (1 << 19) - 1;

impl super::Vp8Encoder<'_> {
    /// Probability that a macroblock is not skipped.
    fn skip_probability(&self) -> u8 {
        let total = self.mb_info.len();
        let skipped = self.mb_info.iter().filter(|mb| mb.coeffs_skipped).count();
        if skipped == 0 || total == 0 {
            return 255;
        }
        ((total - skipped) * 255 / total).clamp(1, 255) as u8
    }

    pub(super) fn write_frame(&self) -> Result<Vec<u8>, EncodeError> {
        let (probs, mask) = self.proba_stats.updated_probabilities();
        let prob_skip = self.skip_probability();

        let mut encoder = ArithmeticEncoder::with_capacity(self.mb_info.len() * 2 + 64);
        self.encode_compressed_frame_header(&mut encoder, &probs, &mask, prob_skip);
        for info in &self.mb_info {
            write_macroblock_header(&mut encoder, info, prob_skip);
        }
        let first_partition = encoder.flush_and_get_buffer();
        if first_partition.len() > MAX_PARTITION0_SIZE {
            return Err(EncodeError::PartitionOverflow(first_partition.len()));
        }

        let mut tokens = ArithmeticEncoder::with_capacity(self.token_buffer.len() / 4);
        self.token_buffer.emit_tokens(&mut tokens, &probs);
        let token_partition = tokens.flush_and_get_buffer();

        let mut writer = Vec::with_capacity(10 + first_partition.len() + token_partition.len());
        self.write_uncompressed_frame_header(&mut writer, first_partition.len() as u32);
        writer.write_all(&first_partition);
        writer.write_all(&token_partition);
        Ok(writer)
    }

    fn write_uncompressed_frame_header(&self, writer: &mut Vec<u8>, partition_size: u32) {
        let for_display = 1;
        let version = 0;
        let keyframe_bit = 0;
        let tag = (partition_size << 5) | (for_display << 4) | (version << 1) | keyframe_bit;
        writer.write_u24_le(tag);

        let magic_bytes_buffer: [u8; 3] = [0x9d, 0x01, 0x2a];
        writer.write_all(&magic_bytes_buffer);

        // no upscaling, so the top two bits stay clear
        writer.write_u16_le(self.width & 0x3FFF);
        writer.write_u16_le(self.height & 0x3FFF);
    }

    fn encode_compressed_frame_header(
        &self,
        encoder: &mut ArithmeticEncoder,
        probs: &TokenProbTables,
        mask: &UpdateMask,
        prob_skip: u8,
    ) {
        // color space and clamping type
        encoder.write_literal(1, 0);
        encoder.write_literal(1, 0);

        // no segmentation
        encoder.write_flag(false);

        // normal loop filter
        encoder.write_flag(false);
        encoder.write_literal(6, self.quant.filter_level());
        // sharpness
        encoder.write_literal(3, 0);
        // no loop filter deltas
        encoder.write_flag(false);

        // one token partition
        encoder.write_literal(2, 0);

        encoder.write_literal(7, self.quant.quant_index);
        // ydc, y2dc, y2ac, uvdc, uvac deltas all absent
        for _ in 0..5 {
            encoder.write_flag(false);
        }

        // refresh entropy probs
        encoder.write_literal(1, 0);

        for (t, is) in COEFF_UPDATE_PROBS.iter().enumerate() {
            for (b, js) in is.iter().enumerate() {
                for (c, ks) in js.iter().enumerate() {
                    for (p, &update_prob) in ks.iter().enumerate() {
                        if mask.is_set(t, b, c, p) {
                            encoder.write_bool(true, update_prob);
                            encoder.write_literal(8, probs[t][b][c][p]);
                        } else {
                            encoder.write_bool(false, update_prob);
                        }
                    }
                }
            }
        }

        // mb_no_coeff_skip
        encoder.write_literal(1, 1);
        encoder.write_literal(8, prob_skip);
    }
}

fn write_macroblock_header(encoder: &mut ArithmeticEncoder, info: &MacroblockInfo, prob_skip: u8) {
    encoder.write_bool(info.coeffs_skipped, prob_skip);

    // keyframe luma tree, whole-block branch
    let [p0, p1, p2, p3] = KEYFRAME_YMODE_PROBS;
    encoder.write_bool(true, p0);
    match info.luma_mode {
        IntraMode::DC | IntraMode::V => {
            encoder.write_bool(false, p1);
            encoder.write_bool(info.luma_mode == IntraMode::V, p2);
        }
        IntraMode::H | IntraMode::TM => {
            encoder.write_bool(true, p1);
            encoder.write_bool(info.luma_mode == IntraMode::TM, p3);
        }
    }

    let [c0, c1, c2] = KEYFRAME_UV_MODE_PROBS;
    match info.chroma_mode {
        IntraMode::DC => encoder.write_bool(false, c0),
        IntraMode::V => {
            encoder.write_bool(true, c0);
            encoder.write_bool(false, c1);
        }
        mode => {
            encoder.write_bool(true, c0);
            encoder.write_bool(true, c1);
            encoder.write_bool(mode == IntraMode::TM, c2);
        }
    }
}
