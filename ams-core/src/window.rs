//! Bounds-checked view over caller-supplied frame bytes

use crate::error::DecodeError;
use std::ops::Range;

/// Immutable view over the bytes of one read.
///
/// Every accessor checks against the declared length, so a parser working
/// through a `RawFrame` cannot read past what the caller handed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFrame<'a> {
    bytes: &'a [u8],
}

impl<'a> RawFrame<'a> {
    /// View the first `length` bytes of `buf` (clamped to the buffer size)
    pub fn new(buf: &'a [u8], length: usize) -> Self {
        Self {
            bytes: &buf[..length.min(buf.len())],
        }
    }

    /// Declared length of the view
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Byte at `offset`
    pub fn byte(&self, offset: usize) -> Result<u8, DecodeError> {
        self.bytes
            .get(offset)
            .copied()
            .ok_or(DecodeError::OutOfBounds {
                offset,
                length: self.len(),
            })
    }

    /// Big-endian u16 starting at `offset`
    pub fn u16_be(&self, offset: usize) -> Result<u16, DecodeError> {
        let bytes = self.slice(offset..offset + 2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Little-endian u16 starting at `offset`
    pub fn u16_le(&self, offset: usize) -> Result<u16, DecodeError> {
        let bytes = self.slice(offset..offset + 2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Sub-slice for `range`
    pub fn slice(&self, range: Range<usize>) -> Result<&'a [u8], DecodeError> {
        if range.start > range.end {
            return Err(DecodeError::OutOfBounds {
                offset: range.start,
                length: self.len(),
            });
        }
        self.bytes.get(range.clone()).ok_or(DecodeError::OutOfBounds {
            offset: range.end,
            length: self.len(),
        })
    }

    /// Shorter view over the first `length` bytes
    pub fn truncate(&self, length: usize) -> Result<RawFrame<'a>, DecodeError> {
        Ok(RawFrame {
            bytes: self.slice(0..length)?,
        })
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_length_is_clamped() {
        let data = [1u8, 2, 3];
        assert_eq!(RawFrame::new(&data, 10).len(), 3);
        assert_eq!(RawFrame::new(&data, 2).len(), 2);
    }

    #[test]
    fn test_reads_stop_at_declared_length() {
        let data = [0x7E, 0xA0, 0x0F, 0x02];
        let frame = RawFrame::new(&data, 3);
        assert_eq!(frame.byte(2).unwrap(), 0x0F);
        assert_eq!(
            frame.byte(3),
            Err(DecodeError::OutOfBounds { offset: 3, length: 3 })
        );
        assert_eq!(frame.u16_be(1).unwrap(), 0xA00F);
        assert_eq!(frame.u16_le(1).unwrap(), 0x0FA0);
        assert!(frame.u16_be(2).is_err());
    }

    #[test]
    fn test_slice_and_truncate() {
        let data = [1u8, 2, 3, 4, 5];
        let frame = RawFrame::new(&data, data.len());
        assert_eq!(frame.slice(1..3).unwrap(), &[2, 3]);
        assert!(frame.slice(4..6).is_err());
        #[allow(clippy::reversed_empty_ranges)]
        let reversed = frame.slice(3..1);
        assert!(reversed.is_err());
        let short = frame.truncate(2).unwrap();
        assert_eq!(short.as_bytes(), &[1, 2]);
        assert!(frame.truncate(6).is_err());
    }
}
