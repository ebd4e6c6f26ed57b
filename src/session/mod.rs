//! Link session - one transport, one protocol state
//!
//! The session handles:
//! - Pulling bytes from the transport, one per poll
//! - Frame assembly and packet dispatch
//! - Sending handler replies and outbound packets
//! - Statistics tracking
//!
//! The session does NOT handle:
//! - Transport lifecycle (that's the caller's responsibility)
//! - Reconnection logic (handled by the binary)
//! - Operator reactions to errors, such as a broadcast reset

mod stats;

pub use stats::{LinkStats, StatsSnapshot};

use crate::codec::{cobs, AssemblerState, FrameAssembler};
use crate::config::LinkConfig;
use crate::error::{Error, FrameError, PacketError, Result};
use crate::logging::HexBytes;
use crate::protocol::{Dispatch, Dispatcher, ErrorLog, KnownDevices, Packet};
use crate::transport::Transport;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

static NEXT_SESSION_ID: AtomicU32 = AtomicU32::new(1);

/// Process-unique session identifier, handed to every command handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u32);

impl SessionId {
    /// Allocate a fresh identifier
    pub fn next() -> Self {
        Self(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Outcome of a poll that produced something
#[derive(Debug)]
pub enum Event {
    /// Valid packet taken by a handler
    Packet(Packet),
    /// Valid packet with no handler for its command
    Unhandled(Packet),
    /// Partial or corrupt frame dropped by the assembler
    Frame(FrameError),
    /// Decoded frame rejected by the dispatcher
    Rejected(PacketError),
}

/// Session over a single transport
///
/// # Example
///
/// ```ignore
/// let dispatcher = Dispatcher::from_config(&config.link).with_fallback(ConsoleHandler::new());
/// let mut session = Session::new(transport, &config.link, dispatcher);
/// session.ping_all()?;
/// session.run(&shutdown, |_, event| println!("{:?}", event))?;
/// ```
pub struct Session<T: Transport> {
    id: SessionId,
    transport: T,
    assembler: FrameAssembler,
    dispatcher: Dispatcher,
    marker: u8,
    local_address: u8,
    stats: Arc<LinkStats>,
    encode_buf: Vec<u8>,
}

impl<T: Transport> Session<T> {
    /// Create a session; `dispatcher` must serve `config.local_address`
    pub fn new(transport: T, config: &LinkConfig, dispatcher: Dispatcher) -> Self {
        debug_assert_eq!(
            dispatcher.local_address(),
            config.local_address,
            "dispatcher and link config disagree on the local address"
        );
        let id = SessionId::next();
        debug!(session = %id, local = dispatcher.local_address(), "Session created");

        Self {
            id,
            transport,
            assembler: FrameAssembler::new(
                config.marker,
                config.max_packet_len,
                config.stale_timeout(),
            ),
            local_address: dispatcher.local_address(),
            dispatcher,
            marker: config.marker,
            stats: Arc::new(LinkStats::new()),
            encode_buf: Vec::with_capacity(cobs::max_encoded_len(config.max_packet_len)),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn local_address(&self) -> u8 {
        self.local_address
    }

    /// Shared handle to the session counters
    pub fn stats(&self) -> Arc<LinkStats> {
        self.stats.clone()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn known_devices(&self) -> &KnownDevices {
        self.dispatcher.known_devices()
    }

    pub fn error_log(&self) -> &ErrorLog {
        self.dispatcher.error_log()
    }

    pub fn assembler_state(&self) -> AssemblerState {
        self.assembler.state()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Poll once using the current time
    pub fn poll(&mut self) -> Result<Option<Event>> {
        self.poll_at(Instant::now())
    }

    /// Read at most one byte and advance the receive pipeline
    ///
    /// Receive-side faults come back as events; only a lost transport or a
    /// failed reply write is an error.
    pub fn poll_at(&mut self, now: Instant) -> Result<Option<Event>> {
        if !self.transport.is_connected() {
            return Err(Error::Disconnected);
        }

        let byte = self.transport.read_byte();
        if byte.is_some() {
            self.stats.add_rx(1);
        }

        let frame = match self.assembler.poll(byte, now) {
            None => return Ok(None),
            Some(Err(e)) => {
                self.stats.record_frame_error(&e);
                return Ok(Some(Event::Frame(e)));
            }
            Some(Ok(frame)) => frame,
        };

        self.stats.add_frame();
        debug!(session = %self.id, bytes = %HexBytes(&frame), "Frame decoded");

        match self.dispatcher.dispatch(self.id, frame) {
            Ok(Dispatch::Handled { packet, reply }) => {
                self.stats.add_packet(true);
                if let Some(reply) = reply {
                    self.send(&reply)?;
                }
                Ok(Some(Event::Packet(packet)))
            }
            Ok(Dispatch::Unhandled(packet)) => {
                self.stats.add_packet(false);
                Ok(Some(Event::Unhandled(packet)))
            }
            Err(e) => {
                self.stats.record_packet_error(&e);
                Ok(Some(Event::Rejected(e)))
            }
        }
    }

    /// Encode and write one packet
    ///
    /// The checksum is sent as stored in `packet`, so an overridden checksum
    /// goes out unchanged.
    pub fn send(&mut self, packet: &Packet) -> Result<()> {
        let len = cobs::encode_into(&packet.to_bytes(), self.marker, &mut self.encode_buf);
        debug!(
            session = %self.id,
            dst = packet.dst(),
            cmd = %packet.command(),
            bytes = %HexBytes(&self.encode_buf),
            "Sending packet"
        );
        self.transport.write(&self.encode_buf)?;
        self.stats.add_tx(len);
        Ok(())
    }

    /// Broadcast a ping; every board answers with a pong
    pub fn ping_all(&mut self) -> Result<()> {
        let packet = Packet::ping(self.local_address)?;
        self.send(&packet)
    }

    /// Broadcast a reset to every board
    pub fn reset_all(&mut self) -> Result<()> {
        let packet = Packet::reset_all(self.local_address)?;
        self.send(&packet)
    }

    /// Poll until shutdown or disconnect, handing every event to `on_event`
    ///
    /// Returns `Ok(())` on shutdown or transport disconnect; the caller
    /// checks the shutdown flag to tell them apart. Write failures are errors.
    pub fn run<F>(&mut self, shutdown: &AtomicBool, mut on_event: F) -> Result<()>
    where
        F: FnMut(&mut Self, Event),
    {
        while !shutdown.load(Ordering::Relaxed) {
            match self.poll() {
                Ok(Some(event)) => on_event(self, event),
                Ok(None) => {}
                Err(Error::Disconnected) => {
                    info!(session = %self.id, "Transport disconnected");
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{address, Command};
    use bytes::Bytes;
    use std::collections::VecDeque;
    use std::io;
    use std::time::Duration;

    const LOCAL: u8 = address::SFC;

    #[derive(Default)]
    struct MockTransport {
        input: VecDeque<u8>,
        written: Vec<u8>,
        disconnected: bool,
    }

    impl MockTransport {
        fn with_input(bytes: &[u8]) -> Self {
            Self {
                input: bytes.iter().copied().collect(),
                ..Self::default()
            }
        }
    }

    impl Transport for MockTransport {
        fn read_byte(&mut self) -> Option<u8> {
            self.input.pop_front()
        }

        fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
            self.written.extend_from_slice(bytes);
            Ok(())
        }

        fn is_connected(&self) -> bool {
            !(self.disconnected && self.input.is_empty())
        }
    }

    fn wire(packet: &Packet, config: &LinkConfig) -> Vec<u8> {
        cobs::encode(&packet.to_bytes(), config.marker)
    }

    fn session(input: &[u8]) -> Session<MockTransport> {
        let config = LinkConfig::default();
        Session::new(
            MockTransport::with_input(input),
            &config,
            Dispatcher::from_config(&config),
        )
    }

    fn drain(session: &mut Session<MockTransport>) -> Vec<Event> {
        let mut events = Vec::new();
        let now = Instant::now();
        while !session.transport().input.is_empty() {
            if let Some(event) = session.poll_at(now).unwrap() {
                events.push(event);
            }
        }
        events
    }

    #[test]
    fn test_session_ids_unique() {
        let a = SessionId::next();
        let b = SessionId::next();
        assert_ne!(a, b);
        assert_eq!(format!("{}", a), format!("#{}", a.get()));
    }

    #[test]
    fn test_poll_yields_unhandled_packet() {
        let config = LinkConfig::default();
        let packet = Packet::new(LOCAL, 3, Command::PingPong, Bytes::new()).unwrap();
        let mut session = session(&wire(&packet, &config));

        let events = drain(&mut session);

        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], Event::Unhandled(p) if *p == packet));
        assert_eq!(session.known_devices().as_slice(), &[3]);
        assert_eq!(session.stats().snapshot().packets, 1);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "local address")]
    fn test_new_rejects_mismatched_dispatcher() {
        let config = LinkConfig::default();
        let _ = Session::new(MockTransport::default(), &config, Dispatcher::new(address::DCT_HSK));
    }

    #[test]
    fn test_poll_idle_returns_none() {
        let mut session = session(&[]);
        assert!(session.poll().unwrap().is_none());
        assert_eq!(session.assembler_state(), AssemblerState::Idle);
    }

    #[test]
    fn test_poll_reports_rejection() {
        let config = LinkConfig::default();
        let packet = Packet::new(9, 3, Command::PingPong, Bytes::new()).unwrap();
        let mut session = session(&wire(&packet, &config));

        let events = drain(&mut session);

        assert!(matches!(
            events.as_slice(),
            [Event::Rejected(PacketError::UnknownDestination { .. })]
        ));
        assert_eq!(session.stats().snapshot().bad_destination, 1);
    }

    #[test]
    fn test_stale_prefix_reported() {
        let config = LinkConfig::default();
        let mut session = session(&[1, 2, 3]);
        let start = Instant::now();
        for _ in 0..3 {
            assert!(session.poll_at(start).unwrap().is_none());
        }

        let later = start + config.stale_timeout() + Duration::from_millis(1);
        let event = session.poll_at(later).unwrap();

        assert!(matches!(event, Some(Event::Frame(FrameError::Stale { len: 3, .. }))));
        assert_eq!(session.assembler_state(), AssemblerState::Idle);
    }

    #[test]
    fn test_reply_is_sent() {
        let config = LinkConfig::default();
        let dispatcher = Dispatcher::from_config(&config).with_handler(
            Command::PingPong,
            |_session: SessionId, packet: &Packet| -> Option<Packet> {
                Packet::new(packet.src(), LOCAL, Command::PingPong, Bytes::new()).ok()
            },
        );
        let ping = Packet::new(LOCAL, 2, Command::PingPong, Bytes::new()).unwrap();
        let mut session = Session::new(
            MockTransport::with_input(&wire(&ping, &config)),
            &config,
            dispatcher,
        );

        let events = drain(&mut session);

        assert!(matches!(events.as_slice(), [Event::Packet(_)]));
        let reply = cobs::decode(&session.transport().written, config.marker).unwrap();
        assert_eq!(reply, vec![2, LOCAL, 0, 0, 2]);
    }

    #[test]
    fn test_send_writes_encoded_frame() {
        let config = LinkConfig::default();
        let mut session = session(&[]);

        session.ping_all().unwrap();

        let written = &session.transport().written;
        assert_eq!(written.last(), Some(&config.marker));
        assert_eq!(
            cobs::decode(written, config.marker).unwrap(),
            vec![255, LOCAL, 0, 0, 5]
        );
        assert_eq!(session.stats().snapshot().tx_bytes, written.len() as u64);
    }

    #[test]
    fn test_send_keeps_checksum_override() {
        let config = LinkConfig::default();
        let mut session = session(&[]);
        let packet = Packet::new(3, LOCAL, 2u8, vec![7]).unwrap().with_checksum(0);

        session.send(&packet).unwrap();

        let decoded = cobs::decode(&session.transport().written, config.marker).unwrap();
        assert_eq!(decoded.last(), Some(&0));
    }

    #[test]
    fn test_poll_disconnected() {
        let mut session = session(&[]);
        session.transport_mut().disconnected = true;
        assert!(matches!(session.poll(), Err(Error::Disconnected)));
    }

    #[test]
    fn test_run_stops_on_disconnect() {
        let config = LinkConfig::default();
        let packet = Packet::new(LOCAL, 5, 3u8, vec![1, 2]).unwrap();
        let mut session = session(&wire(&packet, &config));
        session.transport_mut().disconnected = true;
        let shutdown = AtomicBool::new(false);

        let mut seen = 0;
        session.run(&shutdown, |_, _| seen += 1).unwrap();

        assert_eq!(seen, 1);
    }

    #[test]
    fn test_run_honours_shutdown() {
        let mut session = session(&[]);
        let shutdown = AtomicBool::new(true);
        session.run(&shutdown, |_, _| panic!("no events expected")).unwrap();
    }
}
