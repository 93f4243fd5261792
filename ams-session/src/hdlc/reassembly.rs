//! Segment reassembly for multi-frame dialogues

use ams_core::DecodeError;
use bytes::{Bytes, BytesMut};
use std::time::{Duration, Instant};

/// Reassembly buffer size used when none is configured
pub const DEFAULT_REASSEMBLY_CAPACITY: usize = 1024;

/// Buffer, cursor and sequence counter for one physical link.
///
/// The buffer is allocated when a dialogue opens and released when it
/// completes or is abandoned. Appending is only possible while open and
/// opening is only possible while closed; the accumulated length never
/// exceeds the capacity fixed at construction.
///
/// # State Management
/// - Closed: no buffer, sequence 0, no activity timestamp
/// - Open: buffer allocated, sequence counts appended segments
///
/// # Overflow
/// A segment that does not fit is never truncated and the buffer is never
/// grown. The dialogue is dropped and the caller gets
/// [`DecodeError::ReassemblyOverflow`].
#[derive(Debug)]
pub struct ReassemblySession {
    buffer: Option<BytesMut>,
    capacity: usize,
    sequence: u16,
    last_activity: Option<Instant>,
}

impl ReassemblySession {
    /// Create a closed session
    ///
    /// # Arguments
    /// * `capacity` - Upper bound on one reassembled message, in bytes
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: None,
            capacity,
            sequence: 0,
            last_activity: None,
        }
    }

    /// Start a dialogue
    ///
    /// # Errors
    /// [`DecodeError::Fail`] when a dialogue is already open.
    pub fn open(&mut self) -> Result<(), DecodeError> {
        if self.buffer.is_some() {
            return Err(DecodeError::Fail(
                "reassembly session is already open".to_string(),
            ));
        }
        self.buffer = Some(BytesMut::with_capacity(self.capacity));
        self.sequence = 0;
        self.last_activity = Some(Instant::now());
        Ok(())
    }

    /// Append one segment at the cursor
    ///
    /// # Arguments
    /// * `segment` - Segment payload with its link-control prefix removed
    ///
    /// # Returns
    /// Index of the segment within the dialogue, starting at 1
    ///
    /// # Errors
    /// - [`DecodeError::Fail`] when no dialogue is open
    /// - [`DecodeError::ReassemblyOverflow`] when the segment does not fit;
    ///   the dialogue is dropped
    pub fn append(&mut self, segment: &[u8]) -> Result<u16, DecodeError> {
        let Some(buffer) = self.buffer.as_mut() else {
            return Err(DecodeError::Fail(
                "segment appended without an open dialogue".to_string(),
            ));
        };

        let required = buffer.len() + segment.len();
        if required > self.capacity {
            self.reset();
            return Err(DecodeError::ReassemblyOverflow {
                capacity: self.capacity,
                required,
            });
        }

        buffer.extend_from_slice(segment);
        self.sequence = self.sequence.saturating_add(1);
        self.last_activity = Some(Instant::now());
        Ok(self.sequence)
    }

    /// Close the dialogue and hand out the accumulated message
    ///
    /// # Errors
    /// [`DecodeError::Fail`] when no dialogue is open.
    pub fn finish(&mut self) -> Result<Bytes, DecodeError> {
        let buffer = self.buffer.take().ok_or_else(|| {
            DecodeError::Fail("no open dialogue to finish".to_string())
        })?;
        self.sequence = 0;
        self.last_activity = None;
        Ok(buffer.freeze())
    }

    /// Drop any open dialogue
    pub fn reset(&mut self) {
        self.buffer = None;
        self.sequence = 0;
        self.last_activity = None;
    }

    /// Whether a dialogue is in progress
    pub fn is_open(&self) -> bool {
        self.buffer.is_some()
    }

    /// Write cursor (bytes accumulated so far)
    pub fn len(&self) -> usize {
        self.buffer.as_ref().map_or(0, |b| b.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Segments appended in the current dialogue
    pub fn sequence(&self) -> u16 {
        self.sequence
    }

    /// Capacity fixed at construction
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True when a dialogue is open and nothing has arrived for `timeout`
    pub fn is_stale(&self, timeout: Duration) -> bool {
        self.last_activity
            .is_some_and(|last| last.elapsed() >= timeout)
    }
}

impl Default for ReassemblySession {
    fn default() -> Self {
        Self::new(DEFAULT_REASSEMBLY_CAPACITY)
    }
}
