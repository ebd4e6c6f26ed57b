//! Addressed housekeeping packets
//!
//! Wire layout (decoded, before COBS):
//!
//! ```text
//! ┌──────┬──────┬──────┬──────┬──────────────┬──────────┐
//! │ dst  │ src  │ cmd  │ len  │ payload      │ checksum │
//! │ (1B) │ (1B) │ (1B) │ (1B) │ (len bytes)  │ (1B)     │
//! └──────┴──────┴──────┴──────┴──────────────┴──────────┘
//! ```
//!
//! Headers and packets are read and written field by field with explicit
//! bounds checks; a truncated buffer is an error, never an overread.

use super::checksum;
use super::command::{Command, Priority, RemoteError};
use crate::constants::{BROADCAST_ADDRESS, CHECKSUM_LEN, HEADER_LEN, MAX_PAYLOAD_LEN};
use crate::error::PacketError;
use bytes::Bytes;

/// Packet header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Destination of packet
    pub dst: u8,
    /// Source of packet
    pub src: u8,
    /// Command (or response) type
    pub cmd: u8,
    /// Payload bytes following the header
    pub len: u8,
}

impl Header {
    /// Read the header from the start of a decoded frame
    pub fn parse(bytes: &[u8]) -> Result<Self, PacketError> {
        match bytes {
            [dst, src, cmd, len, ..] => Ok(Self {
                dst: *dst,
                src: *src,
                cmd: *cmd,
                len: *len,
            }),
            _ => Err(PacketError::TooShort { len: bytes.len() }),
        }
    }

    pub fn to_bytes(self) -> [u8; HEADER_LEN] {
        [self.dst, self.src, self.cmd, self.len]
    }

    pub fn command(self) -> Command {
        Command::from(self.cmd)
    }

    /// Decoded size of the whole packet this header announces
    pub fn packet_len(self) -> usize {
        HEADER_LEN + self.len as usize + CHECKSUM_LEN
    }
}

/// A complete packet: header, payload and checksum byte
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    header: Header,
    payload: Bytes,
    checksum: u8,
}

impl Packet {
    /// Build an outgoing packet with a correct checksum
    pub fn new(
        dst: u8,
        src: u8,
        cmd: impl Into<u8>,
        payload: impl Into<Bytes>,
    ) -> Result<Self, PacketError> {
        let payload = payload.into();
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(PacketError::PayloadTooLarge {
                len: payload.len(),
                max: MAX_PAYLOAD_LEN,
            });
        }
        if src == BROADCAST_ADDRESS {
            return Err(PacketError::BroadcastSource);
        }

        let header = Header {
            dst,
            src,
            cmd: cmd.into(),
            len: payload.len() as u8,
        };
        let checksum = {
            let sum = checksum::compute(&header.to_bytes());
            sum.wrapping_sub(checksum::residue(&payload))
        };

        Ok(Self {
            header,
            payload,
            checksum,
        })
    }

    /// Broadcast ping, answered by every board
    pub fn ping(src: u8) -> Result<Self, PacketError> {
        Self::new(BROADCAST_ADDRESS, src, Command::PingPong, Bytes::new())
    }

    /// Broadcast reset of every downstream board
    pub fn reset_all(src: u8) -> Result<Self, PacketError> {
        Self::new(BROADCAST_ADDRESS, src, Command::Reset, Bytes::new())
    }

    /// Error report about a packet this device could not handle
    pub fn error_report(dst: u8, src: u8, report: ErrorReport) -> Result<Self, PacketError> {
        Self::new(dst, src, Command::Error, report.to_bytes().to_vec())
    }

    /// Replace the checksum byte (link reliability testing)
    pub fn with_checksum(mut self, checksum: u8) -> Self {
        self.checksum = checksum;
        self
    }

    /// Interpret a decoded frame as a packet
    ///
    /// Checks the structure only; checksum verification is separate.
    pub fn parse(frame: impl Into<Bytes>) -> Result<Self, PacketError> {
        let frame = frame.into();
        let header = Header::parse(&frame)?;

        let expected = header.packet_len();
        if frame.len() != expected {
            return Err(PacketError::LengthMismatch {
                expected,
                actual: frame.len(),
            });
        }

        Ok(Self {
            header,
            payload: frame.slice(HEADER_LEN..expected - CHECKSUM_LEN),
            checksum: frame[expected - CHECKSUM_LEN],
        })
    }

    pub fn header(&self) -> Header {
        self.header
    }

    pub fn dst(&self) -> u8 {
        self.header.dst
    }

    pub fn src(&self) -> u8 {
        self.header.src
    }

    pub fn command(&self) -> Command {
        self.header.command()
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn checksum(&self) -> u8 {
        self.checksum
    }

    pub fn is_broadcast(&self) -> bool {
        self.header.dst == BROADCAST_ADDRESS
    }

    /// Sum of every byte including the checksum (zero when intact)
    pub fn residue(&self) -> u8 {
        checksum::residue(&self.header.to_bytes())
            .wrapping_add(checksum::residue(&self.payload))
            .wrapping_add(self.checksum)
    }

    pub fn verify(&self) -> bool {
        self.residue() == 0
    }

    /// Serialize to the decoded wire layout
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.header.packet_len());
        out.extend_from_slice(&self.header.to_bytes());
        out.extend_from_slice(&self.payload);
        out.push(self.checksum);
        out
    }
}

/// Payload of an error-report packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorReport {
    /// Source of the original packet that caused the error
    pub src: u8,
    /// Destination of the original packet that caused the error
    pub dst: u8,
    /// Command which caused the error
    pub cmd: u8,
    /// Error that occurred
    pub error: RemoteError,
}

impl ErrorReport {
    pub const LEN: usize = 4;

    pub fn parse(payload: &[u8]) -> Option<Self> {
        match payload {
            [src, dst, cmd, error, ..] => Some(Self {
                src: *src,
                dst: *dst,
                cmd: *cmd,
                error: RemoteError::from(*error),
            }),
            _ => None,
        }
    }

    pub fn to_bytes(self) -> [u8; Self::LEN] {
        [self.src, self.dst, self.cmd, self.error.into()]
    }
}

/// Payload of a set-priority acknowledgement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityChange {
    /// Command whose priority was set
    pub command: u8,
    pub priority: Priority,
}

impl PriorityChange {
    pub fn parse(payload: &[u8]) -> Option<Self> {
        match payload {
            [command, priority, ..] => Some(Self {
                command: *command,
                priority: Priority::from(*priority),
            }),
            _ => None,
        }
    }
}
