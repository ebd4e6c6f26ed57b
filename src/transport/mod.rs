//! Transport abstraction for byte-level I/O
//!
//! Separates I/O concerns from protocol logic:
//! - **Transport**: how bytes flow (serial port, test doubles...)
//! - **Codec/Protocol**: how frames and packets are built (handled separately)
//!
//! # Adding a new transport
//!
//! 1. Create `transport/my_transport.rs`
//! 2. Implement the `Transport` trait
//! 3. Add `pub mod my_transport;` here
//! 4. No other changes needed

pub mod serial;

pub use serial::SerialTransport;

use std::io;

/// Byte-level link to the boards
///
/// A transport abstracts the device. It handles:
/// - Reading at most one byte per call, without blocking indefinitely
/// - Writing complete encoded frames
/// - Tracking whether the device is still there
///
/// A transport does NOT handle:
/// - Message framing (that's the frame assembler's job)
/// - Packet validation or routing (that's the dispatcher's job)
/// - Reconnection logic (that's the caller's job)
pub trait Transport {
    /// Next received byte, or `None` if nothing arrived within the
    /// transport's bounded wait
    fn read_byte(&mut self) -> Option<u8>;

    /// Write all bytes to the link
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// False once the device has gone away
    fn is_connected(&self) -> bool;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn read_byte(&mut self) -> Option<u8> {
        (**self).read_byte()
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write(bytes)
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}
