//! hsk-link - COBS-framed packet link for housekeeping boards
//!
//! Layers, bottom up:
//! - `transport`: byte I/O (serial port)
//! - `codec`: COBS with a configurable marker, byte-at-a-time frame assembly
//! - `protocol`: packets, checksum, dispatch, known devices, error log
//! - `session`: ties one transport to one protocol state

pub mod codec;
pub mod config;
pub mod constants;
pub mod error;
pub mod handler;
pub mod logging;
pub mod protocol;
pub mod session;
pub mod transport;

pub use config::{Config, LinkConfig};
pub use error::{Error, FrameError, PacketError, Result};
pub use handler::{CommandHandler, ConsoleHandler};
pub use protocol::{Command, Dispatcher, Packet};
pub use session::{Event, Session, SessionId};
pub use transport::{SerialTransport, Transport};
