//! Frame Check Sequence (CRC16/X25) calculation shared by header and footer checks

/// FCS calculation constants
const INITIAL_FCS: u16 = 0xFFFF;
const GOOD_FCS: u16 = 0xF0B8;
const KEY: u16 = 0x8408; // Bit-reversed 1021

/// Precomputed FCS table
static FCS_TABLE: once_cell::sync::Lazy<[u16; 256]> = once_cell::sync::Lazy::new(|| {
    let mut table = [0u16; 256];
    for (b, slot) in table.iter_mut().enumerate() {
        let mut v = b as u16;
        for _ in 0..8 {
            if (v & 1) == 1 {
                v = (v >> 1) ^ KEY;
            } else {
                v >>= 1;
            }
        }
        *slot = v;
    }
    table
});

/// Frame Check Sequence calculator
#[derive(Debug, Clone)]
pub struct FcsCalc {
    fcs_value: u16,
}

impl FcsCalc {
    /// Create a new FCS calculator
    pub fn new() -> Self {
        Self {
            fcs_value: INITIAL_FCS,
        }
    }

    /// Update the FCS value with a single byte
    pub fn update(&mut self, data: u8) {
        self.fcs_value =
            (self.fcs_value >> 8) ^ FCS_TABLE[((self.fcs_value ^ data as u16) & 0xFF) as usize];
    }

    /// Update the FCS value with multiple bytes
    pub fn update_bytes(&mut self, data: &[u8]) {
        for &byte in data {
            self.update(byte);
        }
    }

    /// Final checksum value, as carried on the wire (little-endian)
    pub fn checksum(&self) -> u16 {
        self.fcs_value ^ 0xFFFF
    }

    /// Get the FCS value as bytes in wire order
    pub fn fcs_value_bytes(&self) -> [u8; 2] {
        self.checksum().to_le_bytes()
    }

    /// True when the calculator has run over data followed by its own FCS
    pub fn is_good_residue(&self) -> bool {
        self.fcs_value == GOOD_FCS
    }
}

impl Default for FcsCalc {
    fn default() -> Self {
        Self::new()
    }
}

/// CRC16/X25 over `data`
pub fn crc16_x25(data: &[u8]) -> u16 {
    let mut calc = FcsCalc::new();
    calc.update_bytes(data);
    calc.checksum()
}
