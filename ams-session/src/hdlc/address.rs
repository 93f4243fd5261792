//! HDLC address fields

use ams_core::{AmsError, AmsResult, DecodeError, RawFrame};
use std::fmt;
use std::ops::Range;

/// Longest address field a type-3 frame may carry
pub const MAX_ADDRESS_LENGTH: usize = 4;

const ONE_BYTE_UPPER_BOUND: u16 = 0x7F;
const TWO_BYTE_UPPER_BOUND: u16 = 0x3FFF;

/// Locate one address field starting at `start`.
///
/// The field runs up to and including the first byte whose low-order bit is
/// set. The field must end before `limit` and be at most
/// [`MAX_ADDRESS_LENGTH`] bytes long.
pub fn scan_address(frame: RawFrame<'_>, start: usize, limit: usize) -> Result<Range<usize>, DecodeError> {
    let limit = limit.min(frame.len());
    for end in start..limit.min(start + MAX_ADDRESS_LENGTH) {
        if frame.byte(end)? & 0x01 == 0x01 {
            return Ok(start..end + 1);
        }
    }
    Err(DecodeError::MalformedFrame(format!(
        "address field at offset {} is not terminated",
        start
    )))
}

/// HDLC address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HdlcAddress {
    byte_length: usize,
    logical_id: u16,
    physical_id: u16,
}

impl HdlcAddress {
    /// Create a one-byte address with logical ID only
    pub fn new(logical_id: u16) -> AmsResult<Self> {
        if logical_id > ONE_BYTE_UPPER_BOUND {
            return Err(AmsError::InvalidData(format!(
                "One byte address exceeded upper bound of 0x{:02X}",
                ONE_BYTE_UPPER_BOUND
            )));
        }
        Ok(Self {
            byte_length: 1,
            logical_id,
            physical_id: 0,
        })
    }

    /// Create an address with logical and physical ID
    pub fn new_with_physical(logical_id: u16, physical_id: u16) -> AmsResult<Self> {
        let logical_size = Self::address_size_of(logical_id)?;
        let physical_size = Self::address_size_of(physical_id)?;
        let byte_length = if physical_id == 0 {
            logical_size
        } else {
            logical_size.max(physical_size) * 2
        };

        Ok(Self {
            byte_length,
            logical_id,
            physical_id,
        })
    }

    fn address_size_of(address: u16) -> AmsResult<usize> {
        if address <= ONE_BYTE_UPPER_BOUND {
            Ok(1)
        } else if address <= TWO_BYTE_UPPER_BOUND {
            Ok(2)
        } else {
            Err(AmsError::InvalidData(format!(
                "Address 0x{:X} is out of upper bound 0x{:X}",
                address, TWO_BYTE_UPPER_BOUND
            )))
        }
    }

    pub fn logical_id(&self) -> u16 {
        self.logical_id
    }

    pub fn physical_id(&self) -> u16 {
        self.physical_id
    }

    pub fn byte_length(&self) -> usize {
        self.byte_length
    }

    /// Encode address to wire bytes, stop bit on the last byte
    pub fn encode(&self) -> Vec<u8> {
        let upper_length = self.byte_length.div_ceil(2);
        let lower_length = self.byte_length / 2;

        let mut result = vec![0u8; self.byte_length];

        for (i, slot) in result.iter_mut().take(upper_length).enumerate() {
            let shift = 7 * (upper_length - i - 1);
            *slot = (((self.logical_id >> shift) & 0x7F) << 1) as u8;
        }

        for i in 0..lower_length {
            let shift = 7 * (lower_length - i - 1);
            result[upper_length + i] = (((self.physical_id >> shift) & 0x7F) << 1) as u8;
        }

        result[self.byte_length - 1] |= 1;
        result
    }

    /// Decode a 1, 2 or 4 byte address field
    pub fn decode(data: &[u8]) -> AmsResult<Self> {
        let (logical, physical) = match *data {
            [a] => ((a >> 1) as u16, 0),
            [a, b] => ((a >> 1) as u16, (b >> 1) as u16),
            [a, b, c, d] => (
                ((a >> 1) as u16) << 7 | (b >> 1) as u16,
                ((c >> 1) as u16) << 7 | (d >> 1) as u16,
            ),
            _ => {
                return Err(AmsError::InvalidData(format!(
                    "HdlcAddress has an invalid byte length of {}",
                    data.len()
                )));
            }
        };

        Ok(Self {
            byte_length: data.len(),
            logical_id: logical,
            physical_id: physical,
        })
    }
}

impl fmt::Display for HdlcAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ld_length = self.byte_length.div_ceil(2) * 2;
        let ph_length = (self.byte_length / 2) * 2;

        write!(f, "{:0width$X}", self.logical_id, width = ld_length)?;

        if ph_length > 0 && self.physical_id != 0 {
            write!(f, "-{:0width$X}", self.physical_id, width = ph_length)?;
        }

        Ok(())
    }
}
