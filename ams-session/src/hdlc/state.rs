//! HDLC parser state

/// Dialogue state of one HDLC parser
///
/// # State Transitions
/// ```text
/// Idle -> Accumulating (segment with "more fragments" set)
/// Accumulating -> Accumulating (further non-terminal segment)
/// Accumulating -> Idle (terminal segment flushed, overflow, reset, watchdog)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParserState {
    /// No dialogue open; unsegmented frames are returned in place
    #[default]
    Idle,
    /// Buffering non-terminal segments of one dialogue
    Accumulating,
}

impl ParserState {
    pub fn is_accumulating(&self) -> bool {
        matches!(self, ParserState::Accumulating)
    }

    /// Get human-readable state name
    pub fn as_str(&self) -> &'static str {
        match self {
            ParserState::Idle => "Idle",
            ParserState::Accumulating => "Accumulating",
        }
    }
}
