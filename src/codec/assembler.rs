//! Frame assembler for a marker-delimited byte stream
//!
//! Accumulates bytes one at a time and emits decoded frames when the marker
//! arrives. A partial frame that stops receiving bytes for longer than the
//! stale timeout is discarded, so a sender that dies mid-frame cannot leave
//! the receiver waiting forever or glue its bytes onto the next frame.

use super::cobs;
use crate::error::FrameError;
use crate::logging::HexBytes;
use bytes::{Bytes, BytesMut};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Assembler state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerState {
    /// No bytes buffered since the last completed frame
    Idle,
    /// At least one byte buffered
    Accumulating,
}

/// Byte-at-a-time frame assembler
///
/// The clock is passed in on every call so tests can drive time without
/// sleeping; callers use `Instant::now()`.
pub struct FrameAssembler {
    marker: u8,
    buffer: Vec<u8>,
    decode_buf: BytesMut,
    /// Maximum encoded bytes held before a marker (terminator excluded)
    capacity: usize,
    stale_timeout: Duration,
    /// Arrival time of the last non-marker byte
    last_byte_at: Option<Instant>,
}

impl FrameAssembler {
    /// Create an assembler for packets of at most `max_packet_len` decoded bytes
    pub fn new(marker: u8, max_packet_len: usize, stale_timeout: Duration) -> Self {
        let capacity = cobs::max_encoded_len(max_packet_len) - 1;
        Self {
            marker,
            buffer: Vec::with_capacity(capacity),
            decode_buf: BytesMut::with_capacity(max_packet_len),
            capacity,
            stale_timeout,
            last_byte_at: None,
        }
    }

    pub fn state(&self) -> AssemblerState {
        if self.buffer.is_empty() {
            AssemblerState::Idle
        } else {
            AssemblerState::Accumulating
        }
    }

    /// Encoded bytes accepted before an overflow is declared
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of bytes currently buffered
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Drop any partial frame
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.last_byte_at = None;
    }

    /// Advance the state machine by one poll
    ///
    /// `byte` is what the transport yielded this poll (at most one byte).
    /// Returns a decoded frame, a recovered framing fault, or nothing.
    pub fn poll(&mut self, byte: Option<u8>, now: Instant) -> Option<Result<Bytes, FrameError>> {
        if let Some(stale) = self.check_stale(now) {
            // The byte still belongs to the stream; start a fresh frame with it
            if let Some(byte) = byte {
                if byte != self.marker {
                    self.push(byte, now);
                }
            }
            return Some(Err(stale));
        }

        let byte = byte?;

        if byte == self.marker {
            return self.complete();
        }

        if self.buffer.len() >= self.capacity {
            debug!(
                capacity = self.capacity,
                "Frame overflow, discarding buffer"
            );
            self.reset();
            return Some(Err(FrameError::Overflow {
                capacity: self.capacity,
            }));
        }

        self.push(byte, now);
        None
    }

    /// Check for a stalled partial frame without feeding a byte
    pub fn tick(&mut self, now: Instant) -> Option<FrameError> {
        self.check_stale(now)
    }

    fn push(&mut self, byte: u8, now: Instant) {
        self.buffer.push(byte);
        self.last_byte_at = Some(now);
    }

    fn check_stale(&mut self, now: Instant) -> Option<FrameError> {
        let last = self.last_byte_at?;
        if self.buffer.is_empty() {
            return None;
        }

        let elapsed = now.saturating_duration_since(last);
        if elapsed <= self.stale_timeout {
            return None;
        }

        warn!(
            len = self.buffer.len(),
            bytes = %HexBytes(&self.buffer),
            "Incomplete packet received"
        );
        let len = self.buffer.len();
        self.reset();
        Some(FrameError::Stale { len, elapsed })
    }

    fn complete(&mut self) -> Option<Result<Bytes, FrameError>> {
        if self.buffer.is_empty() {
            // Back-to-back markers carry no frame
            return None;
        }

        self.decode_buf.clear();
        let result = cobs::decode_into(&self.buffer, self.marker, &mut self.decode_buf);
        self.reset();

        match result {
            Ok(_) => Some(Ok(self.decode_buf.split().freeze())),
            Err(e) => {
                debug!("Discarding frame: {}", e);
                Some(Err(e))
            }
        }
    }
}
