//! AMS - link layer of a smart meter gateway
//!
//! Reads the push-only output port of an AMS smart meter and turns the
//! fragmented byte stream into complete, checksum-validated DLMS messages.
//!
//! # Architecture
//!
//! This library is organized as a workspace with multiple crates:
//!
//! - `ams-core`: Error taxonomy, parse context, tag set, CRC16/X25
//! - `ams-session`: Tag dispatch, HDLC deframing and segment reassembly, LLC
//! - `ams-transport`: Serial and generic stream input, configuration, reader loop
//!
//! # Usage
//!
//! ```no_run
//! use ams::transport::{GatewayConfig, MeterReader, SerialTransport, TransportLayer};
//!
//! # async fn run() -> ams::AmsResult<()> {
//! let config = GatewayConfig::load("ams-gateway.toml")?;
//! let mut port = SerialTransport::new(config.serial.to_settings()?);
//! port.open().await?;
//!
//! let mut reader = MeterReader::from_config(port, &config.decoder);
//! loop {
//!     let message = reader.next_message().await?;
//!     println!("{:?}: {} bytes", message.payload_tag, message.payload.len());
//! }
//! # }
//! ```

// Re-export core types
pub use ams_core::{AmsError, AmsResult, DataTag, DecodeError, ErrorCategory, ParseContext};

// Re-export decoder API
pub mod session {
    pub use ams_session::*;
}

// Re-export transport API
pub mod transport {
    pub use ams_transport::*;
}
