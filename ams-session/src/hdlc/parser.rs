//! HDLC frame parser with segment reassembly

use crate::hdlc::address::HdlcAddress;
use crate::hdlc::frame::{Deframed, LLC_PREFIX_LENGTH, deframe};
use crate::hdlc::reassembly::{DEFAULT_REASSEMBLY_CAPACITY, ReassemblySession};
use crate::hdlc::state::ParserState;
use crate::hdlc::statistics::DecoderStatistics;
use crate::parser::{DataParser, ParseOutcome, ParseResult};
use ams_core::{DataTag, DecodeError, ParseContext, RawFrame};
use std::ops::Range;
use std::time::Duration;

/// Deframes type-3 HDLC frames and reassembles segmented dialogues.
///
/// One parser instance serves one physical link: the reassembly session it
/// owns is the only state carried from one call to the next.
///
/// Outcomes of [`DataParser::parse`]:
/// - unsegmented frame with no open dialogue: [`ParseOutcome::Payload`],
///   the payload is left in place and `ctx.length` is its length
/// - "more fragments" set: the payload minus its link-control prefix is
///   buffered and [`ParseOutcome::Intermediate`] is returned
/// - "more fragments" clear while a dialogue is open: the whole message is
///   copied to the start of `buf` and [`ParseOutcome::Reassembled`] is
///   returned
///
/// `ctx.consumed` is set to the frame length whenever a frame validates.
#[derive(Debug)]
pub struct HdlcParser {
    session: ReassemblySession,
    session_timeout: Option<Duration>,
    statistics: DecoderStatistics,
}

impl HdlcParser {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REASSEMBLY_CAPACITY)
    }

    /// Parser whose reassembly buffer holds at most `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            session: ReassemblySession::new(capacity),
            session_timeout: None,
            statistics: DecoderStatistics::new(),
        }
    }

    /// Abandon an open dialogue that has been idle for longer than `timeout`
    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = Some(timeout);
        self
    }

    pub fn set_session_timeout(&mut self, timeout: Option<Duration>) {
        self.session_timeout = timeout;
    }

    pub fn state(&self) -> ParserState {
        if self.session.is_open() {
            ParserState::Accumulating
        } else {
            ParserState::Idle
        }
    }

    pub fn session(&self) -> &ReassemblySession {
        &self.session
    }

    fn expire_stale_session(&mut self) {
        if let Some(timeout) = self.session_timeout {
            if self.session.is_stale(timeout) {
                log::warn!(
                    "Abandoning HDLC dialogue after {:?} without a segment ({} bytes, {} segments)",
                    timeout,
                    self.session.len(),
                    self.session.sequence()
                );
                self.session.reset();
                self.statistics.increment_sessions_expired();
            }
        }
    }

    fn parse_frame(&mut self, buf: &mut [u8], ctx: &mut ParseContext) -> ParseResult {
        let available = ctx.length.min(buf.len());
        let frame = match deframe(RawFrame::new(buf, available))? {
            Deframed::Incomplete => return Ok(ParseOutcome::Incomplete),
            Deframed::UnknownData => return Ok(ParseOutcome::UnknownData),
            Deframed::Frame(frame) => frame,
        };

        ctx.frame_type = Some(DataTag::Hdlc);
        ctx.consumed = frame.frame_length();
        let payload = frame.payload();
        if log::log_enabled!(log::Level::Trace) {
            log::trace!(
                "HDLC frame {} -> {}, control 0x{:02X}, {} payload bytes",
                describe_address(buf, frame.header.source()),
                describe_address(buf, frame.header.destination()),
                frame.header.control(),
                payload.len()
            );
        }

        if frame.header.is_segmented() {
            let segment = match link_control_stripped(buf, payload) {
                Ok(segment) => segment,
                Err(error) => {
                    self.session.reset();
                    return Err(error);
                }
            };
            if !self.session.is_open() {
                self.session.open()?;
                log::debug!("Opened HDLC dialogue");
            }
            let sequence = self.session.append(segment)?;
            self.statistics.increment_segments_received();
            ctx.length = self.session.len();
            log::trace!(
                "Buffered HDLC segment {} ({} bytes accumulated)",
                sequence,
                ctx.length
            );
            return Ok(ParseOutcome::Intermediate { sequence });
        }

        if !self.session.is_open() {
            // Terminal segment with nothing buffered: a plain single frame.
            ctx.length = payload.len();
            return Ok(ParseOutcome::Payload {
                offset: payload.start,
            });
        }

        let segment = match link_control_stripped(buf, payload) {
            Ok(segment) => segment,
            Err(error) => {
                self.session.reset();
                return Err(error);
            }
        };
        self.session.append(segment)?;
        let segments = self.session.sequence();
        let message = self.session.finish()?;

        let output_length = buf.len();
        let output = buf.get_mut(..message.len()).ok_or_else(|| {
            DecodeError::Fail(format!(
                "reassembled message of {} bytes does not fit the {} byte output buffer",
                message.len(),
                output_length
            ))
        })?;
        output.copy_from_slice(&message);
        ctx.length = message.len();
        self.statistics.increment_messages_reassembled();
        log::debug!(
            "Reassembled HDLC message of {} bytes from {} segments",
            message.len(),
            segments
        );
        Ok(ParseOutcome::Reassembled)
    }
}

impl Default for HdlcParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DataParser for HdlcParser {
    fn parse(&mut self, buf: &mut [u8], ctx: &mut ParseContext) -> ParseResult {
        self.expire_stale_session();

        let result = self.parse_frame(buf, ctx);
        match &result {
            Ok(
                ParseOutcome::Payload { .. }
                | ParseOutcome::Intermediate { .. }
                | ParseOutcome::Reassembled,
            ) => self.statistics.increment_frames_received(),
            Ok(_) => {}
            // Errors are returned to the caller, which logs them by category.
            Err(error) => {
                self.statistics.record_error(error);
                if error.is_dialogue_fatal() && self.session.is_open() {
                    log::debug!(
                        "Dropping HDLC dialogue of {} bytes after {} segments",
                        self.session.len(),
                        self.session.sequence()
                    );
                    self.session.reset();
                }
            }
        }
        result
    }

    fn reset(&mut self) {
        if self.session.is_open() {
            log::debug!("Resetting HDLC parser in state {}", self.state().as_str());
        }
        self.session.reset();
    }

    fn state(&self) -> ParserState {
        HdlcParser::state(self)
    }

    fn name(&self) -> &'static str {
        "hdlc"
    }

    fn statistics(&self) -> Option<&DecoderStatistics> {
        Some(&self.statistics)
    }
}

/// Printable form of an address field, `?` when it is not 1, 2 or 4 bytes
fn describe_address(buf: &[u8], field: Range<usize>) -> String {
    buf.get(field)
        .and_then(|bytes| HdlcAddress::decode(bytes).ok())
        .map_or_else(|| "?".to_string(), |address| address.to_string())
}

/// Segment payload with its link-control prefix removed
fn link_control_stripped(buf: &[u8], payload: Range<usize>) -> Result<&[u8], DecodeError> {
    let length = payload.len();
    buf.get(payload)
        .and_then(|p| p.get(LLC_PREFIX_LENGTH..))
        .ok_or_else(|| {
            DecodeError::MalformedFrame(format!(
                "segment payload of {} bytes is shorter than the link-control prefix",
                length
            ))
        })
}
