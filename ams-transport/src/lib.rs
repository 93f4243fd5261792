//! Transport layer for AMS meter ports
//!
//! This crate reads the push-only output port of a smart meter (serial, or
//! any async reader such as a socket bridge or a capture file), loads the
//! gateway configuration, and drives the decoder in a read loop that
//! resynchronizes on corrupted input.

pub mod config;
pub mod reader;
pub mod serial;
pub mod stream;

pub use config::{DecoderConfig, GatewayConfig, ParityConfig, SerialConfig};
pub use reader::{MeterMessage, MeterReader};
pub use serial::{SerialSettings, SerialTransport};
pub use stream::{IoStream, StreamAccessor, TransportLayer};
