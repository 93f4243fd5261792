//! Tag dispatch across framing families

use crate::hdlc::parser::HdlcParser;
use crate::hdlc::reassembly::DEFAULT_REASSEMBLY_CAPACITY;
use crate::hdlc::state::ParserState;
use crate::hdlc::statistics::DecoderStatistics;
use crate::llc::LlcParser;
use crate::parser::{DataParser, ParseOutcome};
use ams_core::{DataTag, DecodeError, ParseContext};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Most layers one buffer is unwrapped through (e.g. HDLC, LLC)
const MAX_LAYERS: usize = 4;

const MBUS_START: u8 = 0x68;

/// Framing family of the buffer's leading bytes.
///
/// Pure classification: nothing is consumed and `None` only means "no known
/// family", never an error.
pub fn classify(buf: &[u8]) -> Option<DataTag> {
    let tag = DataTag::from_byte(*buf.first()?)?;
    if tag == DataTag::Mbus && buf.len() >= 4 && (buf[3] != MBUS_START || buf[1] != buf[2]) {
        return None;
    }
    Some(tag)
}

/// Result of running a buffer through the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    /// A complete payload sits at `buf[offset..offset + ctx.length]`
    Message {
        offset: usize,
        /// Outermost framing that accepted the buffer
        frame: DataTag,
        /// Family of the payload itself, when recognizable
        payload_tag: Option<DataTag>,
    },
    /// More bytes are needed
    Incomplete,
    /// A segment was buffered; the message is not complete yet
    Intermediate { sequence: u16 },
    /// No registered parser accepts the buffer
    Unrecognized,
}

/// Tag-keyed set of parsers, one per framing family.
///
/// `decode` routes the buffer to the parser registered for its leading tag
/// and keeps descending into the payload while the payload's own tag has a
/// parser, so an HDLC frame carrying an LLC prefix comes out as the bare
/// APDU. HDLC is only accepted as the outermost layer.
pub struct ParserChain {
    parsers: HashMap<DataTag, Box<dyn DataParser>>,
}

impl ParserChain {
    /// Chain with no parsers registered
    pub fn new() -> Self {
        Self {
            parsers: HashMap::new(),
        }
    }

    /// HDLC and LLC parsers with the given reassembly limits
    pub fn with_defaults(reassembly_capacity: usize, session_timeout: Option<Duration>) -> Self {
        let mut hdlc = HdlcParser::with_capacity(reassembly_capacity);
        hdlc.set_session_timeout(session_timeout);

        let mut chain = Self::new();
        chain.register(DataTag::Hdlc, Box::new(hdlc));
        chain.register(DataTag::Llc, Box::new(LlcParser::new()));
        chain
    }

    /// Register `parser` for `tag`, returning the parser it replaces
    pub fn register(&mut self, tag: DataTag, parser: Box<dyn DataParser>) -> Option<Box<dyn DataParser>> {
        self.parsers.insert(tag, parser)
    }

    pub fn is_registered(&self, tag: DataTag) -> bool {
        self.parsers.contains_key(&tag)
    }

    /// Abandon state in every parser
    pub fn reset(&mut self) {
        for parser in self.parsers.values_mut() {
            parser.reset();
        }
    }

    /// `Accumulating` while any registered parser holds part of a message
    pub fn state(&self) -> ParserState {
        if self.parsers.values().any(|parser| parser.state().is_accumulating()) {
            ParserState::Accumulating
        } else {
            ParserState::Idle
        }
    }

    pub fn statistics(&self, tag: DataTag) -> Option<&DecoderStatistics> {
        self.parsers.get(&tag).and_then(|parser| parser.statistics())
    }

    /// Decode the first `ctx.length` bytes of `buf`.
    ///
    /// On [`Decoded::Message`], `ctx.consumed` is the number of input bytes
    /// the message occupied.
    pub fn decode(&mut self, buf: &mut [u8], ctx: &mut ParseContext) -> Result<Decoded, DecodeError> {
        ctx.frame_type = None;
        ctx.consumed = 0;
        ctx.length = ctx.length.min(buf.len());

        let mut offset = 0;
        let mut outer = None;
        for depth in 0..MAX_LAYERS {
            // The window runs to the end of `buf` so a reassembled message
            // may use the spare room; `ctx.length` bounds what is readable.
            let length = buf.len();
            let window = buf
                .get_mut(offset..)
                .ok_or(DecodeError::OutOfBounds { offset, length })?;

            let Some(tag) = window.get(..ctx.length).and_then(classify) else {
                break;
            };
            if depth > 0 && tag == DataTag::Hdlc {
                break;
            }
            let Some(parser) = self.parsers.get_mut(&tag) else {
                log::trace!("No parser registered for {}", tag);
                break;
            };

            match parser.parse(window, ctx)? {
                ParseOutcome::Payload { offset: start } => {
                    outer.get_or_insert(tag);
                    offset += start;
                    if start == 0 {
                        break;
                    }
                }
                ParseOutcome::Reassembled => {
                    outer.get_or_insert(tag);
                }
                // Inner layers only refine a payload that is already complete.
                _ if depth > 0 => break,
                ParseOutcome::Incomplete => return Ok(Decoded::Incomplete),
                ParseOutcome::Intermediate { sequence } => {
                    return Ok(Decoded::Intermediate { sequence });
                }
                ParseOutcome::UnknownData => break,
            }
        }

        let Some(frame) = outer else {
            return Ok(Decoded::Unrecognized);
        };
        let payload_tag = buf.get(offset..offset + ctx.length).and_then(classify);
        Ok(Decoded::Message {
            offset,
            frame,
            payload_tag,
        })
    }
}

impl Default for ParserChain {
    fn default() -> Self {
        Self::with_defaults(DEFAULT_REASSEMBLY_CAPACITY, None)
    }
}

impl fmt::Debug for ParserChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<_> = self.parsers.keys().collect();
        tags.sort_by_key(|tag| tag.byte());
        f.debug_struct("ParserChain").field("parsers", &tags).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hdlc::frame::encode_frame;

    fn hdlc(payload: &[u8], segmented: bool) -> Vec<u8> {
        encode_frame(&[0x03], &[0x21], 0x13, payload, segmented).unwrap()
    }

    fn decode(chain: &mut ParserChain, data: &[u8]) -> (Result<Decoded, DecodeError>, ParseContext, Vec<u8>) {
        let mut buf = data.to_vec();
        buf.resize(512, 0);
        let mut ctx = ParseContext::new(data.len());
        let result = chain.decode(&mut buf, &mut ctx);
        (result, ctx, buf)
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(&[0x7E, 0xA0]), Some(DataTag::Hdlc));
        assert_eq!(classify(&[0xE6]), Some(DataTag::Llc));
        assert_eq!(classify(&[0xDB, 0x08]), Some(DataTag::Gcm));
        assert_eq!(classify(&[]), None);
        assert_eq!(classify(&[0x00, 0x7E]), None);
    }

    #[test]
    fn test_classify_mbus_long_frame() {
        assert_eq!(classify(&[0x68]), Some(DataTag::Mbus));
        assert_eq!(classify(&[0x68, 0x05, 0x05, 0x68]), Some(DataTag::Mbus));
        assert_eq!(classify(&[0x68, 0x05, 0x05, 0x00]), None);
        assert_eq!(classify(&[0x68, 0x05, 0x06, 0x68]), None);
    }

    #[test]
    fn test_hdlc_with_llc_unwraps_to_apdu() {
        let mut chain = ParserChain::default();
        let frame = hdlc(&[0xE6, 0xE7, 0x00, 0x0F, 0x01, 0x02], false);
        let (result, ctx, buf) = decode(&mut chain, &frame);
        assert_eq!(
            result,
            Ok(Decoded::Message {
                offset: 11,
                frame: DataTag::Hdlc,
                payload_tag: Some(DataTag::Dlms),
            })
        );
        assert_eq!(ctx.length, 3);
        assert_eq!(ctx.consumed, frame.len());
        assert_eq!(&buf[11..14], &[0x0F, 0x01, 0x02]);
    }

    #[test]
    fn test_hdlc_without_llc() {
        let mut chain = ParserChain::default();
        let frame = hdlc(&[0xDB, 0x08, 0x01], false);
        let (result, ctx, _) = decode(&mut chain, &frame);
        assert_eq!(
            result,
            Ok(Decoded::Message {
                offset: 8,
                frame: DataTag::Hdlc,
                payload_tag: Some(DataTag::Gcm),
            })
        );
        assert_eq!(ctx.length, 3);
    }

    #[test]
    fn test_segmented_through_chain() {
        let mut chain = ParserChain::default();
        let (result, _, _) = decode(&mut chain, &hdlc(&[0xE6, 0xE7, 0x00, 0x0F, 0x01], true));
        assert_eq!(result, Ok(Decoded::Intermediate { sequence: 1 }));

        let last = hdlc(&[0x00, 0x00, 0x00, 0x02, 0x03], false);
        let (result, ctx, buf) = decode(&mut chain, &last);
        assert_eq!(
            result,
            Ok(Decoded::Message {
                offset: 0,
                frame: DataTag::Hdlc,
                payload_tag: Some(DataTag::Dlms),
            })
        );
        assert_eq!(&buf[..ctx.length], &[0x0F, 0x01, 0x02, 0x03]);
        assert_eq!(ctx.consumed, last.len());
    }

    #[test]
    fn test_bare_llc() {
        let mut chain = ParserChain::default();
        let (result, ctx, _) = decode(&mut chain, &[0xE6, 0xE7, 0x00, 0x0F, 0x01]);
        assert_eq!(
            result,
            Ok(Decoded::Message {
                offset: 3,
                frame: DataTag::Llc,
                payload_tag: Some(DataTag::Dlms),
            })
        );
        assert_eq!(ctx.consumed, 5);
    }

    #[test]
    fn test_unrecognized() {
        let mut chain = ParserChain::default();
        assert_eq!(decode(&mut chain, &[0x00, 0x01]).0, Ok(Decoded::Unrecognized));
        assert_eq!(decode(&mut chain, &[0x68, 0x03, 0x03, 0x68]).0, Ok(Decoded::Unrecognized));
        assert_eq!(decode(&mut chain, &[]).0, Ok(Decoded::Unrecognized));
        assert!(!chain.is_registered(DataTag::Mbus));
    }

    #[test]
    fn test_incomplete_and_errors_pass_through() {
        let mut chain = ParserChain::default();
        let frame = hdlc(&[0xE6, 0xE7, 0x00, 0x0F], false);
        assert_eq!(decode(&mut chain, &frame[..6]).0, Ok(Decoded::Incomplete));

        let mut corrupt = frame.clone();
        let last = corrupt.len() - 1;
        corrupt[last] = 0x7F;
        assert_eq!(decode(&mut chain, &corrupt).0, Err(DecodeError::BoundaryFlagMissing));
        assert_eq!(chain.statistics(DataTag::Hdlc).unwrap().boundary_errors, 1);
        assert!(chain.statistics(DataTag::Llc).is_none());
    }

    #[test]
    fn test_reset_drops_open_dialogue() {
        let mut chain = ParserChain::default();
        assert_eq!(chain.state(), ParserState::Idle);
        decode(&mut chain, &hdlc(&[0xE6, 0xE7, 0x00, 0x0F], true)).0.unwrap();
        assert_eq!(chain.state(), ParserState::Accumulating);
        chain.reset();
        assert_eq!(chain.state(), ParserState::Idle);
        let (result, _, _) = decode(&mut chain, &hdlc(&[0xE6, 0xE7, 0x00, 0x0F], false));
        assert!(matches!(result, Ok(Decoded::Message { offset: 11, .. })));
    }

    #[test]
    fn test_register_replaces() {
        let mut chain = ParserChain::new();
        assert!(chain.register(DataTag::Llc, Box::new(LlcParser::new())).is_none());
        let replaced = chain.register(DataTag::Llc, Box::new(LlcParser::new()));
        assert_eq!(replaced.map(|p| p.name()), Some("llc"));
        assert_eq!(format!("{:?}", chain), "ParserChain { parsers: [Llc] }");
    }
}
