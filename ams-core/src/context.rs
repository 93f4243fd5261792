//! Per-call decode context

use crate::tag::DataTag;
use std::time::SystemTime;

/// Length of a DLMS system title
pub const SYSTEM_TITLE_LENGTH: usize = 8;

/// State carried through one decode attempt.
///
/// On entry `length` is the number of readable bytes in the buffer. Parsers
/// shrink it as header and footer bytes are stripped; on success it holds
/// the payload length.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseContext {
    /// Framing family of the outermost layer that accepted the buffer
    pub frame_type: Option<DataTag>,
    /// Readable bytes on entry, payload bytes on success
    pub length: usize,
    /// Input bytes occupied by the frame that was just parsed
    pub consumed: usize,
    /// When the bytes arrived at the gateway
    pub timestamp: Option<SystemTime>,
    /// Meter system title, filled in by layers that carry one
    pub system_title: [u8; SYSTEM_TITLE_LENGTH],
}

impl ParseContext {
    /// Context for a buffer holding `length` readable bytes
    pub fn new(length: usize) -> Self {
        Self {
            length,
            ..Self::default()
        }
    }

    /// Context stamped with the arrival time of the bytes
    pub fn received_at(length: usize, timestamp: SystemTime) -> Self {
        Self {
            length,
            timestamp: Some(timestamp),
            ..Self::default()
        }
    }

    /// True when a layer has set a non-zero system title
    pub fn has_system_title(&self) -> bool {
        self.system_title.iter().any(|&b| b != 0)
    }
}
