//! Packet dispatcher
//!
//! Validates decoded frames as addressed packets and routes them to command
//! handlers. Owns the per-session protocol state: the set of known devices
//! and the error log.
//!
//! Validation order:
//! 1. at least a header → `TooShort`
//! 2. destination is this device or broadcast → `UnknownDestination`
//! 3. decoded size matches the header → `LengthMismatch`
//! 4. checksum sums to zero → `ChecksumMismatch`
//! 5. source is not the broadcast address → `BroadcastSource`
//!
//! Nothing is routed and no state changes unless all five pass.

use super::devices::KnownDevices;
use super::error_log::{ErrorEntry, ErrorLog, OverflowPolicy};
use super::packet::{ErrorReport, Header, Packet};
use super::Command;
use crate::config::LinkConfig;
use crate::constants::{BROADCAST_ADDRESS, DEFAULT_ERROR_LOG_CAPACITY};
use crate::error::PacketError;
use crate::handler::CommandHandler;
use crate::session::SessionId;
use bytes::Bytes;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Result of routing a valid packet
#[derive(Debug)]
pub enum Dispatch {
    /// A handler took the packet; `reply` is what it asked to send back
    Handled {
        packet: Packet,
        reply: Option<Packet>,
    },
    /// No handler registered for this command
    Unhandled(Packet),
}

impl Dispatch {
    pub fn packet(&self) -> &Packet {
        match self {
            Self::Handled { packet, .. } | Self::Unhandled(packet) => packet,
        }
    }
}

/// Routes validated packets by command code
pub struct Dispatcher {
    local_address: u8,
    known_devices: KnownDevices,
    error_log: ErrorLog,
    handlers: HashMap<u8, Box<dyn CommandHandler>>,
    fallback: Option<Box<dyn CommandHandler>>,
}

impl Dispatcher {
    /// Create a dispatcher for the device at `local_address`
    pub fn new(local_address: u8) -> Self {
        Self {
            local_address,
            known_devices: KnownDevices::new(),
            error_log: ErrorLog::new(DEFAULT_ERROR_LOG_CAPACITY, OverflowPolicy::default()),
            handlers: HashMap::new(),
            fallback: None,
        }
    }

    /// Create a dispatcher with the address and error log from `config`
    pub fn from_config(config: &LinkConfig) -> Self {
        Self::new(config.local_address).with_error_log(ErrorLog::new(
            config.error_log_capacity,
            config.error_log_overflow,
        ))
    }

    /// Replace the error log (capacity and overflow policy)
    pub fn with_error_log(mut self, error_log: ErrorLog) -> Self {
        self.error_log = error_log;
        self
    }

    /// Route packets carrying `cmd` to `handler`
    pub fn with_handler(
        mut self,
        cmd: impl Into<u8>,
        handler: impl CommandHandler + 'static,
    ) -> Self {
        self.handlers.insert(cmd.into(), Box::new(handler));
        self
    }

    /// Route packets without a dedicated handler to `handler`
    pub fn with_fallback(mut self, handler: impl CommandHandler + 'static) -> Self {
        self.fallback = Some(Box::new(handler));
        self
    }

    pub fn local_address(&self) -> u8 {
        self.local_address
    }

    pub fn known_devices(&self) -> &KnownDevices {
        &self.known_devices
    }

    pub fn error_log(&self) -> &ErrorLog {
        &self.error_log
    }

    /// Validate a decoded frame and route it
    pub fn dispatch(&mut self, session: SessionId, frame: Bytes) -> Result<Dispatch, PacketError> {
        let header = Header::parse(&frame)?;

        if header.dst != self.local_address && header.dst != BROADCAST_ADDRESS {
            return Err(PacketError::UnknownDestination { header });
        }

        let packet = Packet::parse(frame)?;

        if !packet.verify() {
            return Err(PacketError::ChecksumMismatch {
                header,
                received: packet.checksum(),
                residue: packet.residue(),
            });
        }

        if header.src == BROADCAST_ADDRESS {
            return Err(PacketError::BroadcastSource);
        }

        if self.known_devices.insert(header.src) {
            debug!(%session, device = header.src, "New device on link");
        }

        if packet.command() == Command::Error {
            self.log_error_report(&packet);
        }

        let handler = match self.handlers.get_mut(&header.cmd) {
            Some(handler) => Some(handler),
            None => self.fallback.as_mut(),
        };

        match handler {
            Some(handler) => {
                let reply = handler.handle(session, &packet);
                Ok(Dispatch::Handled { packet, reply })
            }
            None => Ok(Dispatch::Unhandled(packet)),
        }
    }

    fn log_error_report(&mut self, packet: &Packet) {
        let Some(report) = ErrorReport::parse(packet.payload()) else {
            warn!(
                src = packet.src(),
                len = packet.payload().len(),
                "Error report too short to log"
            );
            return;
        };

        let stored = self.error_log.push(ErrorEntry {
            reporter: packet.src(),
            report,
        });
        if !stored {
            debug!(src = packet.src(), "Error log full, report dropped");
        }
    }
}
