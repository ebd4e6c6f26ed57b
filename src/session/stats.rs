//! Traffic and error counters for a link session
//!
//! Thread-safe counters, lock-free atomics only: the session updates them
//! from its polling thread while the binary reads them from another.

use crate::error::{FrameError, PacketError};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Link counters (fully lock-free)
#[derive(Debug, Default)]
pub struct LinkStats {
    /// Bytes read from the transport
    rx_bytes: AtomicU64,
    /// Encoded bytes written to the transport
    tx_bytes: AtomicU64,
    /// Frames decoded by the assembler
    frames: AtomicU64,
    /// Packets that passed validation
    packets: AtomicU64,
    /// Valid packets with no handler
    unhandled: AtomicU64,
    /// Packets sent
    sent: AtomicU64,

    stale: AtomicU64,
    overflow: AtomicU64,
    malformed: AtomicU64,

    too_short: AtomicU64,
    bad_destination: AtomicU64,
    length_mismatch: AtomicU64,
    checksum: AtomicU64,
    broadcast_source: AtomicU64,
}

impl LinkStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add_rx(&self, bytes: usize) {
        self.rx_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_tx(&self, bytes: usize) {
        self.tx_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_frame(&self) {
        self.frames.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_packet(&self, handled: bool) {
        self.packets.fetch_add(1, Ordering::Relaxed);
        if !handled {
            self.unhandled.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_frame_error(&self, error: &FrameError) {
        let counter = match error {
            FrameError::Stale { .. } => &self.stale,
            FrameError::Overflow { .. } => &self.overflow,
            FrameError::Malformed { .. } => &self.malformed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_packet_error(&self, error: &PacketError) {
        let counter = match error {
            PacketError::TooShort { .. } => &self.too_short,
            PacketError::UnknownDestination { .. } => &self.bad_destination,
            PacketError::LengthMismatch { .. } => &self.length_mismatch,
            PacketError::ChecksumMismatch { .. } => &self.checksum,
            PacketError::BroadcastSource => &self.broadcast_source,
            // Only raised when building outgoing packets
            PacketError::PayloadTooLarge { .. } => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Consistent-enough copy of every counter
    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        StatsSnapshot {
            rx_bytes: load(&self.rx_bytes),
            tx_bytes: load(&self.tx_bytes),
            frames: load(&self.frames),
            packets: load(&self.packets),
            unhandled: load(&self.unhandled),
            sent: load(&self.sent),
            stale: load(&self.stale),
            overflow: load(&self.overflow),
            malformed: load(&self.malformed),
            too_short: load(&self.too_short),
            bad_destination: load(&self.bad_destination),
            length_mismatch: load(&self.length_mismatch),
            checksum: load(&self.checksum),
            broadcast_source: load(&self.broadcast_source),
        }
    }
}

/// Point-in-time copy of `LinkStats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub frames: u64,
    pub packets: u64,
    pub unhandled: u64,
    pub sent: u64,
    pub stale: u64,
    pub overflow: u64,
    pub malformed: u64,
    pub too_short: u64,
    pub bad_destination: u64,
    pub length_mismatch: u64,
    pub checksum: u64,
    pub broadcast_source: u64,
}

impl StatsSnapshot {
    /// Frames dropped by the assembler
    pub fn frame_errors(&self) -> u64 {
        self.stale + self.overflow + self.malformed
    }

    /// Frames rejected by the dispatcher
    pub fn packet_errors(&self) -> u64 {
        self.too_short
            + self.bad_destination
            + self.length_mismatch
            + self.checksum
            + self.broadcast_source
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "rx {} B, tx {} B, {} frames, {} packets ({} unhandled), {} sent",
            self.rx_bytes, self.tx_bytes, self.frames, self.packets, self.unhandled, self.sent
        )?;
        writeln!(
            f,
            "framing: {} stale, {} overflow, {} malformed",
            self.stale, self.overflow, self.malformed
        )?;
        write!(
            f,
            "packets: {} too short, {} bad destination, {} length mismatch, {} checksum, {} broadcast source",
            self.too_short,
            self.bad_destination,
            self.length_mismatch,
            self.checksum,
            self.broadcast_source
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Header;
    use std::time::Duration;

    #[test]
    fn test_byte_counters() {
        let stats = LinkStats::new();
        stats.add_rx(5);
        stats.add_rx(3);
        stats.add_tx(10);

        let snap = stats.snapshot();
        assert_eq!(snap.rx_bytes, 8);
        assert_eq!(snap.tx_bytes, 10);
        assert_eq!(snap.sent, 1);
    }

    #[test]
    fn test_error_counters() {
        let stats = LinkStats::new();
        stats.record_frame_error(&FrameError::Overflow { capacity: 262 });
        stats.record_frame_error(&FrameError::Stale {
            len: 3,
            elapsed: Duration::from_millis(300),
        });
        stats.record_packet_error(&PacketError::UnknownDestination {
            header: Header {
                dst: 7,
                src: 1,
                cmd: 0,
                len: 0,
            },
        });
        stats.record_packet_error(&PacketError::BroadcastSource);
        stats.record_packet_error(&PacketError::PayloadTooLarge { len: 300, max: 255 });

        let snap = stats.snapshot();
        assert_eq!(snap.overflow, 1);
        assert_eq!(snap.stale, 1);
        assert_eq!(snap.frame_errors(), 2);
        assert_eq!(snap.bad_destination, 1);
        assert_eq!(snap.broadcast_source, 1);
        assert_eq!(snap.packet_errors(), 2);
    }

    #[test]
    fn test_unhandled_counted_as_packet() {
        let stats = LinkStats::new();
        stats.add_packet(true);
        stats.add_packet(false);

        let snap = stats.snapshot();
        assert_eq!(snap.packets, 2);
        assert_eq!(snap.unhandled, 1);
    }

    #[test]
    fn test_snapshot_display() {
        let stats = LinkStats::new();
        stats.add_rx(42);
        let text = stats.snapshot().to_string();
        assert!(text.starts_with("rx 42 B"));
        assert_eq!(text.lines().count(), 3);
    }
}
