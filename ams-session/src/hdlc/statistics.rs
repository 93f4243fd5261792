//! Decoder statistics collection

use ams_core::DecodeError;

/// Link-layer decoder statistics
///
/// Updated by the parser on every call; query at any time for the status
/// page or logs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecoderStatistics {
    /// Frames that validated and were taken into a message or dialogue
    pub frames_received: u64,
    /// Frames dropped, counted once whether deframing or reassembly failed
    pub frames_rejected: u64,
    /// Missing opening or closing flag
    pub boundary_errors: u64,
    /// Number of HCS (Header Check Sequence) errors
    pub hcs_errors: u64,
    /// Number of FCS (Frame Check Sequence) errors
    pub fcs_errors: u64,
    /// Non-terminal segments buffered
    pub segments_received: u64,
    /// Multi-frame messages completed
    pub messages_reassembled: u64,
    /// Dialogues abandoned because the reassembly buffer was full
    pub overflows: u64,
    /// Dialogues abandoned by the session watchdog
    pub sessions_expired: u64,
}

impl DecoderStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_frames_received(&mut self) {
        self.frames_received += 1;
    }

    pub fn increment_segments_received(&mut self) {
        self.segments_received += 1;
    }

    pub fn increment_messages_reassembled(&mut self) {
        self.messages_reassembled += 1;
    }

    pub fn increment_sessions_expired(&mut self) {
        self.sessions_expired += 1;
    }

    /// Count a rejected frame against its error kind
    pub fn record_error(&mut self, error: &DecodeError) {
        self.frames_rejected += 1;
        match error {
            DecodeError::BoundaryFlagMissing => self.boundary_errors += 1,
            DecodeError::HeaderChecksum { .. } => self.hcs_errors += 1,
            DecodeError::FooterChecksum { .. } => self.fcs_errors += 1,
            DecodeError::ReassemblyOverflow { .. } => self.overflows += 1,
            _ => {}
        }
    }

    /// Get error rate as a percentage
    ///
    /// Returns 0.0 if nothing has been seen yet.
    pub fn error_rate(&self) -> f64 {
        let total = self.frames_received + self.frames_rejected;
        if total == 0 {
            0.0
        } else {
            (self.frames_rejected as f64 / total as f64) * 100.0
        }
    }
}
