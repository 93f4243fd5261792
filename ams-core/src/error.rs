use thiserror::Error;

/// Main error type for AMS gateway operations
#[derive(Error, Debug)]
pub enum AmsError {
    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),

    #[error("Timeout")]
    Timeout,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
}

/// Result type alias for AMS gateway operations
pub type AmsResult<T> = Result<T, AmsError>;

/// Broad class of a decode failure, used to pick the recovery action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The frame itself is invalid. Drop it and resynchronize on the next
    /// boundary flag; any open dialogue stays untouched.
    Structural,
    /// The in-flight dialogue is lost. Reset reassembly state, then
    /// resynchronize.
    Internal,
}

/// Failures reported by a link-layer parser.
///
/// "Need more bytes" and "not this framing family" are not failures and
/// are reported through the parser outcome instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Decoder failure: {0}")]
    Fail(String),

    #[error("Boundary flag missing")]
    BoundaryFlagMissing,

    #[error("Header checksum mismatch: frame carries 0x{expected:04X}, computed 0x{computed:04X}")]
    HeaderChecksum { expected: u16, computed: u16 },

    #[error("Footer checksum mismatch: frame carries 0x{expected:04X}, computed 0x{computed:04X}")]
    FooterChecksum { expected: u16, computed: u16 },

    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    #[error("Reassembly buffer overflow: {required} bytes exceed capacity of {capacity}")]
    ReassemblyOverflow { capacity: usize, required: usize },

    #[error("Read past end of frame: offset {offset}, length {length}")]
    OutOfBounds { offset: usize, length: usize },
}

impl DecodeError {
    /// Recovery class of this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            DecodeError::BoundaryFlagMissing
            | DecodeError::HeaderChecksum { .. }
            | DecodeError::FooterChecksum { .. }
            | DecodeError::MalformedFrame(_) => ErrorCategory::Structural,
            DecodeError::Fail(_)
            | DecodeError::ReassemblyOverflow { .. }
            | DecodeError::OutOfBounds { .. } => ErrorCategory::Internal,
        }
    }

    /// Whether the error abandons any open reassembly dialogue
    pub fn is_dialogue_fatal(&self) -> bool {
        self.category() == ErrorCategory::Internal
    }

    /// Numeric status code as reported by the meter firmware status page
    pub fn status_code(&self) -> i32 {
        match self {
            DecodeError::Fail(_) | DecodeError::OutOfBounds { .. } => -1,
            DecodeError::BoundaryFlagMissing | DecodeError::MalformedFrame(_) => -3,
            DecodeError::HeaderChecksum { .. } => -4,
            DecodeError::FooterChecksum { .. } => -5,
            DecodeError::ReassemblyOverflow { .. } => -8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(DecodeError::BoundaryFlagMissing.category(), ErrorCategory::Structural);
        assert_eq!(
            DecodeError::HeaderChecksum { expected: 1, computed: 2 }.category(),
            ErrorCategory::Structural
        );
        assert!(DecodeError::ReassemblyOverflow { capacity: 8, required: 9 }.is_dialogue_fatal());
        assert!(!DecodeError::MalformedFrame("short".to_string()).is_dialogue_fatal());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(DecodeError::Fail("x".to_string()).status_code(), -1);
        assert_eq!(DecodeError::BoundaryFlagMissing.status_code(), -3);
        assert_eq!(DecodeError::HeaderChecksum { expected: 0, computed: 1 }.status_code(), -4);
        assert_eq!(DecodeError::FooterChecksum { expected: 0, computed: 1 }.status_code(), -5);
    }

    #[test]
    fn test_decode_error_converts() {
        let err: AmsError = DecodeError::BoundaryFlagMissing.into();
        assert!(matches!(err, AmsError::Decode(DecodeError::BoundaryFlagMissing)));
        assert_eq!(err.to_string(), "Decode error: Boundary flag missing");
    }
}
