//! Position-tracking reads of little-endian fields from a byte slice.

use byteorder_lite::{ByteOrder, LittleEndian};
use core::fmt;

use crate::mux::MuxError;

/// A reader that wraps a byte slice and tracks the current position.
///
/// Every read past the end fails with [`MuxError::UnexpectedEof`] and leaves
/// the position unchanged.
#[derive(Clone)]
pub(crate) struct SliceReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceReader<'a> {
    #[inline]
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    #[cfg(test)]
    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    /// Seek to a position from the start.
    #[inline]
    pub(crate) fn seek_from_start(&mut self, pos: usize) -> Result<(), MuxError> {
        if pos > self.data.len() {
            return Err(MuxError::UnexpectedEof);
        }
        self.pos = pos;
        Ok(())
    }

    /// Skip `n` bytes.
    #[inline]
    pub(crate) fn skip(&mut self, n: usize) -> Result<(), MuxError> {
        let pos = self.pos.checked_add(n).ok_or(MuxError::UnexpectedEof)?;
        self.seek_from_start(pos)
    }

    /// Take a slice of n bytes from the current position and advance
    /// position.
    #[inline]
    pub(crate) fn take_slice(&mut self, n: usize) -> Result<&'a [u8], MuxError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or(MuxError::UnexpectedEof)?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    #[inline]
    pub(crate) fn read_fourcc(&mut self) -> Result<[u8; 4], MuxError> {
        let mut fourcc = [0u8; 4];
        fourcc.copy_from_slice(self.take_slice(4)?);
        Ok(fourcc)
    }

    #[inline]
    pub(crate) fn read_u8(&mut self) -> Result<u8, MuxError> {
        Ok(self.take_slice(1)?[0])
    }

    #[inline]
    pub(crate) fn read_u16_le(&mut self) -> Result<u16, MuxError> {
        Ok(LittleEndian::read_u16(self.take_slice(2)?))
    }

    /// Read a u24 in little-endian byte order (as u32).
    #[inline]
    pub(crate) fn read_u24_le(&mut self) -> Result<u32, MuxError> {
        Ok(LittleEndian::read_u24(self.take_slice(3)?))
    }

    #[inline]
    pub(crate) fn read_u32_le(&mut self) -> Result<u32, MuxError> {
        Ok(LittleEndian::read_u32(self.take_slice(4)?))
    }
}

impl fmt::Debug for SliceReader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SliceReader")
            .field("len", &self.data.len())
            .field("pos", &self.pos)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_advance() {
        let data = [b'A', b'N', b'I', b'M', 1, 2, 3, 4, 5, 6];
        let mut r = SliceReader::new(&data);
        assert_eq!(&r.read_fourcc().unwrap(), b"ANIM");
        assert_eq!(r.read_u24_le().unwrap(), 0x030201);
        assert_eq!(r.read_u8().unwrap(), 4);
        assert_eq!(r.read_u16_le().unwrap(), 0x0605);
        assert_eq!(r.position(), 10);
    }

    #[test]
    fn test_short_read_keeps_position() {
        let data = [1, 2, 3];
        let mut r = SliceReader::new(&data);
        assert!(matches!(r.read_u32_le(), Err(MuxError::UnexpectedEof)));
        assert_eq!(r.position(), 0);
        assert!(r.skip(4).is_err());
        r.skip(3).unwrap();
        assert!(r.read_u8().is_err());
    }
}
