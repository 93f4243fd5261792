//! Core types and utilities for AMS meter link-layer decoding
//!
//! This crate provides the error taxonomy, the per-call parse context, the
//! framing-family tags, and the checksum and byte-window helpers shared by
//! every parser.

pub mod context;
pub mod error;
pub mod fcs;
pub mod tag;
pub mod window;

pub use context::{ParseContext, SYSTEM_TITLE_LENGTH};
pub use error::{AmsError, AmsResult, DecodeError, ErrorCategory};
pub use fcs::{FcsCalc, crc16_x25};
pub use tag::DataTag;
pub use window::RawFrame;
