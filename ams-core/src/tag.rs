//! Leading-byte tags of the framing families seen on a meter port

use serde::{Deserialize, Serialize};
use std::fmt;

/// Framing family identified by the first byte of a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum DataTag {
    /// Boundary-flag delimited HDLC frame
    Hdlc = 0x7E,
    /// Logical link control prefix
    Llc = 0xE6,
    /// DLMS data notification sent directly
    Dlms = 0x0F,
    /// ASCII P1 telegram
    Dsmr = 0x2F,
    /// M-Bus long frame
    Mbus = 0x68,
    /// General block transfer
    Gbt = 0xE0,
    /// General GCM ciphered APDU
    Gcm = 0xDB,
    /// Set normal response mode
    Snrm = 0x81,
    /// Association request
    Aarq = 0x60,
    /// Association response
    Aare = 0x61,
    /// Get response
    GetResponse = 0xC4,
}

impl DataTag {
    /// Every known tag
    pub const ALL: [DataTag; 11] = [
        DataTag::Hdlc,
        DataTag::Llc,
        DataTag::Dlms,
        DataTag::Dsmr,
        DataTag::Mbus,
        DataTag::Gbt,
        DataTag::Gcm,
        DataTag::Snrm,
        DataTag::Aarq,
        DataTag::Aare,
        DataTag::GetResponse,
    ];

    /// Tag for a leading byte, if it names a known family
    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|tag| tag.byte() == byte)
    }

    /// Wire value of the tag
    pub fn byte(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            DataTag::Hdlc => "hdlc",
            DataTag::Llc => "llc",
            DataTag::Dlms => "dlms",
            DataTag::Dsmr => "dsmr",
            DataTag::Mbus => "mbus",
            DataTag::Gbt => "gbt",
            DataTag::Gcm => "gcm",
            DataTag::Snrm => "snrm",
            DataTag::Aarq => "aarq",
            DataTag::Aare => "aare",
            DataTag::GetResponse => "get_response",
        }
    }
}

impl fmt::Display for DataTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:02X})", self.name(), self.byte())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_byte() {
        assert_eq!(DataTag::from_byte(0x7E), Some(DataTag::Hdlc));
        assert_eq!(DataTag::from_byte(0xDB), Some(DataTag::Gcm));
        assert_eq!(DataTag::from_byte(0xC4), Some(DataTag::GetResponse));
        assert_eq!(DataTag::from_byte(0x00), None);
    }

    #[test]
    fn test_bytes_are_unique() {
        for tag in DataTag::ALL {
            assert_eq!(DataTag::from_byte(tag.byte()), Some(tag));
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(DataTag::Hdlc.to_string(), "hdlc(0x7E)");
    }
}
