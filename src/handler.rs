//! Command handlers
//!
//! A handler receives every validated packet routed to it, together with the
//! id of the session it arrived on. Returning a packet sends it back over the
//! same session (replies, error reports).
//!
//! Closures `FnMut(SessionId, &Packet) -> Option<Packet>` are handlers too.

use crate::logging::HexBytes;
use crate::protocol::{Command, ErrorReport, Packet, PriorityChange};
use crate::session::SessionId;
use tracing::info;

/// Consumer of routed packets
pub trait CommandHandler {
    /// Handle one packet; the returned packet, if any, is sent on `session`
    fn handle(&mut self, session: SessionId, packet: &Packet) -> Option<Packet>;
}

impl<F> CommandHandler for F
where
    F: FnMut(SessionId, &Packet) -> Option<Packet>,
{
    fn handle(&mut self, session: SessionId, packet: &Packet) -> Option<Packet> {
        self(session, packet)
    }
}

/// Handler that reports every packet through `tracing`
///
/// Payloads are shown raw: board-specific conversions (temperatures,
/// pressures, flows) are left to dedicated handlers.
#[derive(Debug, Default)]
pub struct ConsoleHandler;

impl ConsoleHandler {
    pub fn new() -> Self {
        Self
    }
}

impl CommandHandler for ConsoleHandler {
    fn handle(&mut self, session: SessionId, packet: &Packet) -> Option<Packet> {
        let header = packet.header();
        let command = packet.command();

        match command {
            Command::PingPong => info!(
                %session,
                src = header.src,
                dst = header.dst,
                len = header.len,
                "Pong from device #{}",
                header.src
            ),
            Command::SetPriority => match PriorityChange::parse(packet.payload()) {
                Some(change) => info!(
                    %session,
                    "Device #{} changed command #{} to priority {:?}",
                    header.src,
                    change.command,
                    change.priority
                ),
                None => info!(%session, "Device #{} acknowledged priority change", header.src),
            },
            Command::MapDevices => info!(
                %session,
                "Device #{} has attached devices: {:?}",
                header.src,
                packet.payload().as_ref()
            ),
            cmd if cmd.is_priority_request() && header.len == 0 => info!(
                %session,
                "Device #{} did not have any data of this priority",
                header.src
            ),
            Command::Error => match ErrorReport::parse(packet.payload()) {
                Some(report) => info!(
                    %session,
                    "Device #{} reported {} for cmd {} ({} -> {})",
                    header.src,
                    report.error,
                    report.cmd,
                    report.src,
                    report.dst
                ),
                None => info!(
                    %session,
                    data = %HexBytes(packet.payload()),
                    "Device #{} sent a short error report",
                    header.src
                ),
            },
            _ => info!(
                %session,
                src = header.src,
                dst = header.dst,
                len = header.len,
                data = %HexBytes(packet.payload()),
                "{}",
                command
            ),
        }

        None
    }
}
