//! Centralized error types for the link
//!
//! - `FrameError`: framing faults recovered by the frame assembler
//! - `PacketError`: packet validation and construction faults
//! - `Error`: everything else; use `Result<T>` as shorthand for
//!   `std::result::Result<T, Error>`.

use crate::protocol::Header;
use std::path::PathBuf;
use std::time::Duration;

/// Faults detected while turning raw bytes into frames
///
/// All of them are recovered locally: the assembler drops the partial frame
/// and goes back to idle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// Buffer reached capacity before a marker arrived
    #[error("frame overflow: no marker within {capacity} bytes")]
    Overflow { capacity: usize },

    /// A COBS code byte is inconsistent with the frame length
    #[error("malformed frame: bad code group at offset {offset}")]
    Malformed { offset: usize },

    /// A partial frame stopped receiving bytes
    #[error("stale frame: {len} bytes discarded after {elapsed:?} without data")]
    Stale { len: usize, elapsed: Duration },
}

/// Faults detected while validating or building a packet
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PacketError {
    /// Decoded frame cannot hold a header
    #[error("packet too short: {len} bytes")]
    TooShort { len: usize },

    /// Destination is neither this device nor broadcast
    #[error("unknown destination {} (from {}, cmd {})", .header.dst, .header.src, .header.cmd)]
    UnknownDestination { header: Header },

    /// Decoded size disagrees with the header's `len` field
    #[error("length mismatch: header declares {expected} bytes, frame has {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// Additive checksum does not sum to zero
    #[error(
        "checksum mismatch from {} (cmd {}, len {}): received {received}, residue {residue}",
        .header.src, .header.cmd, .header.len
    )]
    ChecksumMismatch {
        header: Header,
        received: u8,
        residue: u8,
    },

    /// Payload does not fit the one-byte length field
    #[error("payload too large: {len} bytes (max {max})")]
    PayloadTooLarge { len: usize, max: usize },

    /// Broadcast address used as a packet source
    #[error("broadcast address is not a valid source")]
    BroadcastSource,
}

/// All link errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // === Transport ===
    /// Failed to open serial port
    #[error("cannot open serial port {port}")]
    SerialOpen {
        port: String,
        #[source]
        source: std::io::Error,
    },
    /// Transport reported disconnection
    #[error("transport disconnected")]
    Disconnected,
    /// Transport write or read failed
    #[error("transport I/O error")]
    Io(#[from] std::io::Error),

    // === Protocol ===
    #[error(transparent)]
    Packet(#[from] PacketError),

    // === Config ===
    /// Failed to read or write the config file
    #[error("cannot access config file {}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Config file is not valid TOML for `Config`
    #[error("invalid config file {}: {reason}", .path.display())]
    ConfigParse { path: PathBuf, reason: String },
    /// Invalid config value
    #[error("invalid {field}: {reason}")]
    ConfigValidation { field: &'static str, reason: String },

    // === Detection ===
    /// No device found matching configuration
    #[error("no device found")]
    NoDeviceFound,
    /// Multiple devices found matching configuration
    #[error("multiple devices found ({count})")]
    MultipleDevicesFound { count: usize },

    // === Runtime ===
    /// Tokio runtime creation failed
    #[error("failed to create runtime")]
    Runtime {
        #[source]
        source: std::io::Error,
    },
}

/// Alias for Result with the link `Error`
pub type Result<T> = std::result::Result<T, Error>;
