//! Housekeeping packet protocol
//!
//! Everything above the framing layer:
//! - `Packet`/`Header` parsing and serialization
//! - additive checksum
//! - protocol vocabulary (addresses, commands, error codes)
//! - dispatch of validated packets to command handlers, with the per-session
//!   device set and error log

pub mod checksum;
mod command;
mod devices;
mod dispatcher;
mod error_log;
mod packet;

pub use command::{address, Command, Priority, RemoteError};
pub use devices::KnownDevices;
pub use dispatcher::{Dispatch, Dispatcher};
pub use error_log::{ErrorEntry, ErrorLog, OverflowPolicy};
pub use packet::{ErrorReport, Header, Packet, PriorityChange};
