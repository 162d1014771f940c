//! Little-endian writes into a growing byte buffer.

use alloc::vec::Vec;

/// Extension trait for writing container fields to a `Vec<u8>`.
pub(crate) trait VecWriter {
    /// Append a slice to the buffer.
    fn write_all(&mut self, data: &[u8]);

    /// Write a u16 in little-endian.
    fn write_u16_le(&mut self, v: u16);

    /// Write the low 3 bytes of `v` in little-endian.
    fn write_u24_le(&mut self, v: u32);

    /// Write a u32 in little-endian.
    fn write_u32_le(&mut self, v: u32);
}

impl VecWriter for Vec<u8> {
    #[inline]
    fn write_all(&mut self, data: &[u8]) {
        self.extend_from_slice(data);
    }

    #[inline]
    fn write_u16_le(&mut self, v: u16) {
        self.extend_from_slice(&v.to_le_bytes());
    }

    #[inline]
    fn write_u24_le(&mut self, v: u32) {
        debug_assert!(v < 1 << 24);
        let bytes = v.to_le_bytes();
        self.extend_from_slice(&bytes[..3]);
    }

    #[inline]
    fn write_u32_le(&mut self, v: u32) {
        self.extend_from_slice(&v.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_widths() {
        let mut out = Vec::new();
        out.write_u16_le(0x0102);
        out.write_u24_le(0x030405);
        out.write_u32_le(0x06070809);
        assert_eq!(out, [2, 1, 5, 4, 3, 9, 8, 7, 6]);
    }
}
