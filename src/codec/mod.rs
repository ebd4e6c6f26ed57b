//! Framing layer for the serial link
//!
//! - **cobs**: stateless COBS encode/decode against a configurable marker
//! - **assembler**: per-connection state machine turning a byte stream into
//!   decoded frames
//!
//! Packet interpretation happens one layer up, in `protocol`.

pub mod assembler;
pub mod cobs;

pub use assembler::{AssemblerState, FrameAssembler};
