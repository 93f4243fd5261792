//! Link layer for AMS meter ports
//!
//! Turns an arbitrarily fragmented byte stream read from a meter's output
//! port into complete, validated application-layer messages.
//!
//! - [`dispatcher`] classifies a buffer by its leading tag byte and routes it
//!   to the parser registered for that framing family
//! - [`hdlc`] deframes type-3 HDLC frames, checks both checksums, skips the
//!   variable-length addresses and reassembles segmented dialogues
//! - [`llc`] strips the logical link control prefix in front of an APDU
//!
//! Parsing is synchronous and never blocks; waiting for more bytes is left
//! to the caller's read loop.

pub mod dispatcher;
pub mod hdlc;
pub mod llc;
pub mod parser;

pub use dispatcher::{Decoded, ParserChain, classify};
pub use hdlc::{
    DecoderStatistics, Deframed, HdlcAddress, HdlcParser, ParserState, ReassemblySession,
    encode_frame,
};
pub use llc::LlcParser;
pub use parser::{DataParser, ParseOutcome, ParseResult, status_code};
