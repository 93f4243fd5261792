//! Caller loop turning a meter stream into complete messages

use crate::config::DecoderConfig;
use crate::stream::StreamAccessor;
use ams_core::{AmsError, AmsResult, DataTag, DecodeError, ErrorCategory, ParseContext};
use ams_session::hdlc::{FLAG, MAX_FRAME_LENGTH};
use ams_session::{Decoded, DecoderStatistics, ParserChain, ParserState};
use bytes::{Buf, Bytes, BytesMut};
use std::time::SystemTime;

/// One complete application-layer message read from the meter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeterMessage {
    /// Outermost framing the message arrived in
    pub frame: DataTag,
    /// Family of the payload, when recognizable
    pub payload_tag: Option<DataTag>,
    /// Payload with every link-layer wrapper removed
    pub payload: Bytes,
    /// When the final byte of the message was decoded
    pub timestamp: SystemTime,
}

/// What one decode attempt over the pending bytes produced
enum Step {
    Message(MeterMessage),
    NeedMore,
    Continue,
}

/// Reads a meter stream and yields decoded messages.
///
/// Owns one stream and one [`ParserChain`], so exactly one reassembly
/// session exists per physical link. Bytes that cannot start a valid frame
/// are skipped up to the next HDLC flag.
pub struct MeterReader<S> {
    stream: S,
    chain: ParserChain,
    /// Bytes read but not yet consumed by a frame
    pending: BytesMut,
    /// Decode buffer; parsers may rewrite it in place
    scratch: Vec<u8>,
    read_buf: Vec<u8>,
    buffer_size: usize,
    output_capacity: usize,
}

impl<S> MeterReader<S>
where
    S: StreamAccessor,
{
    /// Create a reader over `stream`
    ///
    /// # Arguments
    /// * `stream` - Meter input, already opened
    /// * `chain` - Parsers to decode with; one chain per physical link
    /// * `buffer_size` - Most unconsumed bytes held at once, raised to
    ///   [`MAX_FRAME_LENGTH`] so any legal frame fits
    /// * `output_capacity` - Largest message the chain can reassemble
    pub fn new(stream: S, chain: ParserChain, buffer_size: usize, output_capacity: usize) -> Self {
        let buffer_size = buffer_size.max(MAX_FRAME_LENGTH);
        Self {
            stream,
            chain,
            pending: BytesMut::with_capacity(buffer_size),
            scratch: Vec::new(),
            read_buf: vec![0u8; buffer_size],
            buffer_size,
            output_capacity,
        }
    }

    pub fn from_config(stream: S, config: &DecoderConfig) -> Self {
        let chain =
            ParserChain::with_defaults(config.reassembly_capacity, config.session_timeout());
        Self::new(stream, chain, config.buffer_size, config.reassembly_capacity)
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }

    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Dialogue state of the decoder
    pub fn state(&self) -> ParserState {
        self.chain.state()
    }

    /// Counters of the HDLC parser
    pub fn statistics(&self) -> Option<&DecoderStatistics> {
        self.chain.statistics(DataTag::Hdlc)
    }

    /// Bytes read from the stream but not yet consumed
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Wait for the next complete message.
    ///
    /// Returns [`AmsError::Timeout`] when the stream's read timeout expires;
    /// buffered bytes and any open dialogue are kept, so the call can simply
    /// be retried. End of stream is a [`AmsError::Connection`] error.
    pub async fn next_message(&mut self) -> AmsResult<MeterMessage> {
        loop {
            if !self.pending.is_empty() {
                match self.decode_pending() {
                    Step::Message(message) => return Ok(message),
                    Step::Continue => continue,
                    Step::NeedMore => {}
                }
            }
            self.fill().await?;
        }
    }

    async fn fill(&mut self) -> AmsResult<()> {
        let free = self.buffer_size.saturating_sub(self.pending.len()).max(1);
        if self.read_buf.len() < free {
            self.read_buf.resize(free, 0);
        }

        let n = self.stream.read(&mut self.read_buf[..free]).await?;
        if n == 0 {
            return Err(AmsError::Connection(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "Meter stream closed",
            )));
        }
        log::trace!("Read {} bytes from meter stream", n);
        self.pending.extend_from_slice(&self.read_buf[..n]);
        Ok(())
    }

    fn decode_pending(&mut self) -> Step {
        let available = self.pending.len();
        let size = available.max(self.output_capacity);
        if self.scratch.len() < size {
            self.scratch.resize(size, 0);
        }
        self.scratch[..available].copy_from_slice(&self.pending);

        let now = SystemTime::now();
        let mut ctx = ParseContext::received_at(available, now);
        match self.chain.decode(&mut self.scratch[..size], &mut ctx) {
            Ok(Decoded::Message {
                offset,
                frame,
                payload_tag,
            }) => {
                let Some(payload) = self.scratch.get(offset..offset + ctx.length) else {
                    log::error!(
                        "Payload {}..{} outside the decode buffer",
                        offset,
                        offset + ctx.length
                    );
                    self.chain.reset();
                    self.resynchronize();
                    return Step::Continue;
                };
                let message = MeterMessage {
                    frame,
                    payload_tag,
                    payload: Bytes::copy_from_slice(payload),
                    timestamp: now,
                };
                self.pending.advance(ctx.consumed.clamp(1, available));
                log::debug!(
                    "Decoded {} byte message from {} framing",
                    message.payload.len(),
                    frame
                );
                Step::Message(message)
            }
            Ok(Decoded::Incomplete) => {
                if available >= self.buffer_size {
                    log::warn!(
                        "Read window full ({} bytes) without a complete frame",
                        available
                    );
                    self.resynchronize();
                    return Step::Continue;
                }
                Step::NeedMore
            }
            Ok(Decoded::Intermediate { sequence }) => {
                log::trace!("Segment {} buffered", sequence);
                self.pending.advance(ctx.consumed.clamp(1, available));
                Step::Continue
            }
            Ok(Decoded::Unrecognized) => {
                log::debug!(
                    "Skipping unrecognized data starting with 0x{:02X}",
                    self.pending[0]
                );
                self.resynchronize();
                Step::Continue
            }
            Err(error) => {
                self.handle_error(&error, ctx.consumed.min(available));
                Step::Continue
            }
        }
    }

    /// Log `error` by category and skip past the offending bytes.
    ///
    /// `consumed` is non-zero when the frame itself validated and only
    /// reassembly failed; exactly that frame is dropped then.
    fn handle_error(&mut self, error: &DecodeError, consumed: usize) {
        match error.category() {
            ErrorCategory::Structural => {
                log::warn!("Dropping invalid frame: {}", error);
            }
            ErrorCategory::Internal => {
                log::error!(
                    "Decoder failure in state {}, resetting link state: {}",
                    self.chain.state().as_str(),
                    error
                );
                self.chain.reset();
            }
        }
        if consumed > 0 {
            self.pending.advance(consumed);
        } else {
            self.resynchronize();
        }
    }

    /// Drop the leading byte and everything up to the next flag
    fn resynchronize(&mut self) {
        let skip = self
            .pending
            .iter()
            .skip(1)
            .position(|&b| b == FLAG)
            .map_or(self.pending.len(), |position| position + 1);
        self.pending.advance(skip);
    }
}

impl<S> std::fmt::Debug for MeterReader<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeterReader")
            .field("chain", &self.chain)
            .field("pending", &self.pending.len())
            .field("buffer_size", &self.buffer_size)
            .finish()
    }
}
