//! Boolean entropy coder used by every VP8 partition.

use alloc::vec::Vec;

pub(crate) struct ArithmeticEncoder {
    /// the entropy values that have been encoded so far
    writer: Vec<u8>,
    /// value of the current bytes being encoded
    bottom: u32,
    /// the range for the next bit, must be between 128 and 255 inclusive
    range: u32,
    /// number of bits that have been encoded in the current byte
    bit_num: i32,
}

impl ArithmeticEncoder {
    #[cfg(test)]
    pub(crate) fn new() -> Self {
        Self::with_capacity(0)
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            writer: Vec::with_capacity(capacity),
            bottom: 0,
            range: 255,
            bit_num: 24,
        }
    }

    // 0xFF + 1 rolls over into the previous byte
    fn add_one_to_output(&mut self) {
        let mut i = self.writer.len();
        while i > 0 {
            i -= 1;
            if self.writer[i] < 255 {
                self.writer[i] += 1;
                return;
            }
            self.writer[i] = 0;
        }
        self.writer.insert(0, 1);
    }

    pub(crate) fn write_flag(&mut self, flag_bool: bool) {
        self.write_bool(flag_bool, 128);
    }

    pub(crate) fn write_bool(&mut self, bool_to_write: bool, probability: u8) {
        let split = 1 + (((self.range - 1) * u32::from(probability)) >> 8);

        if bool_to_write {
            self.bottom = self.bottom.wrapping_add(split);
            self.range -= split;
        } else {
            self.range = split;
        }

        while self.range < 128 {
            self.range <<= 1;

            if self.bottom & (1 << 31) != 0 {
                self.add_one_to_output();
            }
            self.bottom <<= 1;

            self.bit_num -= 1;
            if self.bit_num == 0 {
                self.writer.push((self.bottom >> 24) as u8);
                // only keep low 3 bytes
                self.bottom &= (1 << 24) - 1;
                self.bit_num = 8;
            }
        }
    }

    /// Writes `num_bits` of `value`, most significant first, at even odds.
    pub(crate) fn write_literal(&mut self, num_bits: u8, value: u8) {
        for bit in (0..num_bits).rev() {
            self.write_flag((1 << bit) & value > 0);
        }
    }

    /// Flushes any remaining bits to the writer and consumes the encoder altogether
    pub(crate) fn flush_and_get_buffer(mut self) -> Vec<u8> {
        let mut c = self.bit_num;
        let mut v = self.bottom;
        if self.bottom & (1 << (32 - self.bit_num)) != 0 {
            self.add_one_to_output();
        }
        v <<= c & 0b111;
        c = (c >> 3) - 1;
        while c >= 0 {
            v <<= 8;
            c -= 1;
        }
        for _ in 0..4 {
            self.writer.push((v >> 24) as u8);
            v <<= 8;
        }
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic_encoder_short() {
        let mut encoder = ArithmeticEncoder::new();
        encoder.write_flag(false);
        encoder.write_bool(true, 10);
        encoder.write_bool(false, 250);
        encoder.write_literal(1, 1);
        encoder.write_literal(3, 5);
        encoder.write_literal(8, 64);
        encoder.write_literal(8, 185);
        let bytes = encoder.flush_and_get_buffer();
        assert_eq!(&[104, 101, 107, 128], &*bytes);
    }

    #[test]
    fn test_tm_luma_mode_bits() {
        // TM_PRED walks the keyframe luma tree right three times
        let mut encoder = ArithmeticEncoder::new();
        encoder.write_bool(true, 145);
        encoder.write_bool(true, 156);
        encoder.write_bool(true, 128);
        let write_buffer = encoder.flush_and_get_buffer();
        assert_eq!(&[233, 64, 0, 0], &*write_buffer);
    }

    #[test]
    fn test_empty_flush_is_four_bytes() {
        let encoder = ArithmeticEncoder::with_capacity(16);
        assert_eq!(encoder.flush_and_get_buffer(), [0, 0, 0, 0]);
    }
}
