//! Logging setup and helpers
//!
//! The library only emits `tracing` events; the binary installs the
//! subscriber with `init_tracing`.

use std::fmt;

/// Initialize tracing output
///
/// Call early in main() before any logging occurs.
/// Set `verbose` to true for debug-level output (per-frame detail).
pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = if verbose { "debug" } else { "info" };

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_file(false)
                .compact(),
        )
        .with(tracing_subscriber::EnvFilter::new(level))
        .try_init();
}

/// Space-separated hex dump for log fields
///
/// ```ignore
/// debug!(bytes = %HexBytes(&frame), "Frame decoded");
/// ```
pub struct HexBytes<'a>(pub &'a [u8]);

impl fmt::Display for HexBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for HexBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_bytes_display() {
        assert_eq!(HexBytes(&[0x01, 0xfc, 0x00, 0xda]).to_string(), "01 fc 00 da");
        assert_eq!(HexBytes(&[]).to_string(), "");
    }

    #[test]
    fn test_hex_bytes_debug() {
        assert_eq!(format!("{:?}", HexBytes(&[0xff])), "[ff]");
    }

    #[test]
    fn test_init_tracing_twice() {
        init_tracing(false);
        init_tracing(true);
    }
}
