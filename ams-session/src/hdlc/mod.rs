//! HDLC link layer: deframing, checksums, addressing and segment reassembly

pub mod address;
pub mod frame;
pub mod parser;
pub mod reassembly;
pub mod state;
pub mod statistics;

pub use address::{HdlcAddress, MAX_ADDRESS_LENGTH, scan_address};
pub use frame::{
    Deframed, FLAG, FrameFooter, FrameHeader, LLC_PREFIX_LENGTH, LLC_REQUEST, LLC_RESPONSE,
    MAX_FRAME_LENGTH, MIN_FRAME_LENGTH, ValidatedFrame, deframe, encode_frame,
};
pub use parser::HdlcParser;
pub use reassembly::{DEFAULT_REASSEMBLY_CAPACITY, ReassemblySession};
pub use state::ParserState;
pub use statistics::DecoderStatistics;
