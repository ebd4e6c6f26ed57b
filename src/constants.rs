//! Link-wide constants
//!
//! Centralized constants to avoid duplication and ensure consistency.
//! Values marked as defaults can be overridden through `LinkConfig`.

// =============================================================================
// Framing
// =============================================================================

/// Default frame marker (must match the firmware's packet marker)
pub const DEFAULT_MARKER: u8 = 218;

/// Longest literal run a single COBS code group can carry
pub const COBS_MAX_RUN: usize = 254;

/// Time without a new byte before a partial frame is discarded (milliseconds)
pub const DEFAULT_STALE_TIMEOUT_MS: u64 = 250;

// =============================================================================
// Packet layout
// =============================================================================

/// Header size: dst, src, cmd, len
pub const HEADER_LEN: usize = 4;

/// Trailing checksum size
pub const CHECKSUM_LEN: usize = 1;

/// Largest payload the one-byte `len` field can describe
pub const MAX_PAYLOAD_LEN: usize = 255;

/// Largest decoded packet: header + payload + checksum
pub const MAX_PACKET_LEN: usize = HEADER_LEN + MAX_PAYLOAD_LEN + CHECKSUM_LEN;

/// Smallest decoded packet: header + checksum
pub const MIN_PACKET_LEN: usize = HEADER_LEN + CHECKSUM_LEN;

// =============================================================================
// Addressing
// =============================================================================

/// Destination meaning "every board"; illegal as a source
pub const BROADCAST_ADDRESS: u8 = 255;

/// Default address of this computer (science flight computer)
pub const DEFAULT_LOCAL_ADDRESS: u8 = 252;

// =============================================================================
// Error log
// =============================================================================

/// Default number of error reports kept per session
pub const DEFAULT_ERROR_LOG_CAPACITY: usize = 254;

// =============================================================================
// Serial
// =============================================================================

/// Default baud rate of the housekeeping link
pub const DEFAULT_BAUD_RATE: u32 = 1_152_000;

/// Read timeout of the serial port (milliseconds)
pub const SERIAL_READ_TIMEOUT_MS: u64 = 1;

/// Consecutive zero-byte reads before assuming port disconnected
pub const SERIAL_DISCONNECT_THRESHOLD: u32 = 10;

/// Default USB vendor ID (TI Stellaris/Tiva ICDI)
pub const DEFAULT_DEVICE_VID: u16 = 0x1CBE;

/// Default USB product ID (Tiva C LaunchPad)
pub const DEFAULT_DEVICE_PID: u16 = 0x00FD;

// =============================================================================
// Timing - CLI
// =============================================================================

/// Default time to listen for replies after a one-shot send (milliseconds)
pub const DEFAULT_LISTEN_MS: u64 = 1000;
