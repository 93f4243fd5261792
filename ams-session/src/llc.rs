//! Logical link control prefix parser

use crate::hdlc::frame::{LLC_PREFIX_LENGTH, LLC_REQUEST, LLC_RESPONSE};
use crate::parser::{DataParser, ParseOutcome, ParseResult};
use ams_core::{DataTag, ParseContext};

/// Strips the `E6 E6 00` / `E6 E7 00` prefix in front of a DLMS APDU
#[derive(Debug, Default)]
pub struct LlcParser;

impl LlcParser {
    pub fn new() -> Self {
        Self
    }
}

impl DataParser for LlcParser {
    fn parse(&mut self, buf: &mut [u8], ctx: &mut ParseContext) -> ParseResult {
        let available = &buf[..ctx.length.min(buf.len())];
        let Some(prefix) = available.get(..LLC_PREFIX_LENGTH) else {
            return Ok(ParseOutcome::Incomplete);
        };
        if prefix != LLC_REQUEST && prefix != LLC_RESPONSE {
            return Ok(ParseOutcome::UnknownData);
        }

        if ctx.frame_type.is_none() {
            ctx.frame_type = Some(DataTag::Llc);
            ctx.consumed = available.len();
        }
        ctx.length = available.len() - LLC_PREFIX_LENGTH;
        Ok(ParseOutcome::Payload {
            offset: LLC_PREFIX_LENGTH,
        })
    }

    fn name(&self) -> &'static str {
        "llc"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_response_prefix() {
        let mut buf = [0xE6, 0xE7, 0x00, 0x0F, 0x40];
        let mut ctx = ParseContext::new(buf.len());
        let result = LlcParser::new().parse(&mut buf, &mut ctx);
        assert_eq!(result, Ok(ParseOutcome::Payload { offset: 3 }));
        assert_eq!(ctx.length, 2);
        assert_eq!(ctx.consumed, 5);
        assert_eq!(ctx.frame_type, Some(DataTag::Llc));
    }

    #[test]
    fn test_inner_layer_keeps_outer_framing() {
        let mut buf = [0xE6, 0xE6, 0x00, 0x0F];
        let mut ctx = ParseContext::new(buf.len());
        ctx.frame_type = Some(DataTag::Hdlc);
        ctx.consumed = 20;
        LlcParser::new().parse(&mut buf, &mut ctx).unwrap();
        assert_eq!(ctx.frame_type, Some(DataTag::Hdlc));
        assert_eq!(ctx.consumed, 20);
        assert_eq!(ctx.length, 1);
    }

    #[test]
    fn test_short_and_foreign_input() {
        let mut buf = [0xE6, 0xE7];
        let mut ctx = ParseContext::new(buf.len());
        assert_eq!(LlcParser::new().parse(&mut buf, &mut ctx), Ok(ParseOutcome::Incomplete));

        let mut buf = [0xE6, 0x01, 0x00];
        let mut ctx = ParseContext::new(buf.len());
        assert_eq!(LlcParser::new().parse(&mut buf, &mut ctx), Ok(ParseOutcome::UnknownData));
    }
}
