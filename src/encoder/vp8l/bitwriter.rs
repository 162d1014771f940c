//! VP8L bit writer.
//!
//! Writes bits in LSB-first order as required by VP8L format.

use alloc::vec::Vec;

/// VP8L bit writer - writes bits LSB-first.
pub(crate) struct BitWriter {
    buffer: Vec<u8>,
    /// Pending bits not yet flushed to `buffer`.
    bits: u64,
    used: u8,
}

impl BitWriter {
    pub(crate) fn with_capacity(cap: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(cap),
            bits: 0,
            used: 0,
        }
    }

    /// Write `n_bits` from `value` (LSB-first).
    #[inline]
    pub(crate) fn write_bits(&mut self, value: u64, n_bits: u8) {
        debug_assert!(n_bits <= 32);
        debug_assert!(n_bits == 0 || (value >> n_bits) == 0);

        self.bits |= value << self.used;
        self.used += n_bits;

        while self.used >= 8 {
            self.buffer.push(self.bits as u8);
            self.bits >>= 8;
            self.used -= 8;
        }
    }

    #[inline]
    pub(crate) fn write_bit(&mut self, bit: bool) {
        self.write_bits(u64::from(bit), 1);
    }

    /// Pads the last partial byte with zeros and returns the stream.
    pub(crate) fn finish(mut self) -> Vec<u8> {
        if self.used > 0 {
            self.buffer.push(self.bits as u8);
        }
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_bits() {
        let mut w = BitWriter::with_capacity(1);
        // LSB first: 0b101 goes in bits 0-2, 0b11 in bits 3-4, 0b111 in bits 5-7
        w.write_bits(0b101, 3);
        w.write_bits(0b11, 2);
        w.write_bits(0b111, 3);
        assert_eq!(w.finish(), [0xFD]);
    }

    #[test]
    fn test_partial_byte_is_padded() {
        let mut w = BitWriter::with_capacity(2);
        w.write_bits(0x12, 8);
        w.write_bit(true);
        w.write_bits(0, 2);
        w.write_bit(true);
        assert_eq!(w.finish(), [0x12, 0b1001]);
    }

    #[test]
    fn test_write_14_bits() {
        let mut w = BitWriter::with_capacity(2);
        w.write_bits(1023, 14);
        assert_eq!(w.finish(), [0xFF, 0x03]);
    }
}
