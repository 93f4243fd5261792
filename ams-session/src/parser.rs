//! Parser capability shared by every framing family

use crate::hdlc::state::ParserState;
use crate::hdlc::statistics::DecoderStatistics;
use ams_core::{DecodeError, ParseContext};

/// Non-error result of one parse call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseOutcome {
    /// More bytes are needed; retry with a superset of the same buffer
    Incomplete,
    /// The buffer does not belong to this family; try the next parser
    UnknownData,
    /// A non-terminal segment was buffered; `sequence` segments so far
    Intermediate { sequence: u16 },
    /// One complete payload sits at `buf[offset..offset + ctx.length]`
    Payload { offset: usize },
    /// A multi-frame message was written to `buf[..ctx.length]`
    Reassembled,
}

impl ParseOutcome {
    /// Numeric status code as reported by the meter firmware status page
    pub fn status_code(&self) -> i32 {
        match self {
            ParseOutcome::Reassembled => 0,
            ParseOutcome::Payload { offset } => i32::try_from(*offset).unwrap_or(i32::MAX),
            ParseOutcome::Incomplete => -2,
            ParseOutcome::Intermediate { .. } => -6,
            ParseOutcome::UnknownData => -9,
        }
    }
}

/// Result of one parse call
pub type ParseResult = Result<ParseOutcome, DecodeError>;

/// Numeric status code for a parse result
pub fn status_code(result: &ParseResult) -> i32 {
    match result {
        Ok(outcome) => outcome.status_code(),
        Err(error) => error.status_code(),
    }
}

/// A framing-family parser.
///
/// `parse` is synchronous and never blocks. `ctx.length` holds the number of
/// readable bytes of `buf` on entry.
pub trait DataParser: Send {
    fn parse(&mut self, buf: &mut [u8], ctx: &mut ParseContext) -> ParseResult;

    /// Abandon any state carried between calls
    fn reset(&mut self) {}

    fn name(&self) -> &'static str;

    /// Whether the parser is holding part of a multi-frame message
    fn state(&self) -> ParserState {
        ParserState::Idle
    }

    fn statistics(&self) -> Option<&DecoderStatistics> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(status_code(&Ok(ParseOutcome::Reassembled)), 0);
        assert_eq!(status_code(&Ok(ParseOutcome::Payload { offset: 9 })), 9);
        assert_eq!(status_code(&Ok(ParseOutcome::Incomplete)), -2);
        assert_eq!(status_code(&Ok(ParseOutcome::Intermediate { sequence: 1 })), -6);
        assert_eq!(status_code(&Ok(ParseOutcome::UnknownData)), -9);
        assert_eq!(status_code(&Err(DecodeError::BoundaryFlagMissing)), -3);
    }
}
