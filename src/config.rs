//! Configuration management
//!
//! Config is a TOML file (`hsk-link.toml` in the working directory unless a
//! path is given). Every section falls back to defaults for missing fields.

use crate::constants::{
    BROADCAST_ADDRESS, DEFAULT_BAUD_RATE, DEFAULT_DEVICE_PID, DEFAULT_DEVICE_VID,
    DEFAULT_ERROR_LOG_CAPACITY, DEFAULT_LOCAL_ADDRESS, DEFAULT_MARKER, DEFAULT_STALE_TIMEOUT_MS,
    MAX_PACKET_LEN, MIN_PACKET_LEN,
};
use crate::error::{Error, Result};
use crate::protocol::OverflowPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Config file looked up when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "hsk-link.toml";

// =============================================================================
// Device Configuration
// =============================================================================

/// USB device detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Display name for the device
    pub name: String,
    /// USB Vendor ID
    pub vid: u16,
    /// List of accepted USB Product IDs
    pub pid_list: Vec<u16>,
    /// Platform-specific port name hints (optional)
    pub name_hint: PlatformNameHint,
}

/// Platform-specific port name hints for device detection fallback
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformNameHint {
    /// Windows port name pattern (e.g., "COM")
    pub windows: Option<String>,
    /// macOS port name pattern (e.g., "usbmodem")
    pub macos: Option<String>,
    /// Linux port name pattern (e.g., "ttyACM")
    pub linux: Option<String>,
}

impl PlatformNameHint {
    /// Returns the hint for the current platform
    pub fn current(&self) -> Option<&str> {
        #[cfg(windows)]
        {
            self.windows.as_deref()
        }
        #[cfg(target_os = "macos")]
        {
            self.macos.as_deref()
        }
        #[cfg(target_os = "linux")]
        {
            self.linux.as_deref()
        }
        #[cfg(not(any(windows, target_os = "macos", target_os = "linux")))]
        {
            None
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: "Tiva C LaunchPad".to_string(),
            vid: DEFAULT_DEVICE_VID,
            pid_list: vec![DEFAULT_DEVICE_PID],
            name_hint: PlatformNameHint {
                windows: None,
                macos: Some("usbmodem".to_string()),
                linux: Some("ttyACM".to_string()),
            },
        }
    }
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub serial: SerialConfig,
    pub device: DeviceConfig,
    pub link: LinkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Serial port name (empty = auto-detect using `[device]`)
    pub port: String,
    pub baud_rate: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

// =============================================================================
// Link Configuration
// =============================================================================

/// Protocol parameters shared by both ends of the link
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Frame delimiter (must match the firmware)
    pub marker: u8,
    /// Address of this device; packets for other destinations are rejected
    pub local_address: u8,
    /// Silence after which a partial frame is discarded
    pub stale_timeout_ms: u64,
    /// Largest decoded packet accepted (header + payload + checksum)
    pub max_packet_len: usize,
    /// Error reports kept per session
    pub error_log_capacity: usize,
    /// Behavior when the error log is full
    pub error_log_overflow: OverflowPolicy,
    /// Broadcast a reset when a packet for an unknown destination arrives
    pub reset_on_bad_destination: bool,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER,
            local_address: DEFAULT_LOCAL_ADDRESS,
            stale_timeout_ms: DEFAULT_STALE_TIMEOUT_MS,
            max_packet_len: MAX_PACKET_LEN,
            error_log_capacity: DEFAULT_ERROR_LOG_CAPACITY,
            error_log_overflow: OverflowPolicy::Wrap,
            reset_on_bad_destination: false,
        }
    }
}

impl LinkConfig {
    pub fn stale_timeout(&self) -> Duration {
        Duration::from_millis(self.stale_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if !(MIN_PACKET_LEN..=MAX_PACKET_LEN).contains(&self.max_packet_len) {
            return Err(Error::ConfigValidation {
                field: "max_packet_len",
                reason: format!(
                    "{} is outside {}..={}",
                    self.max_packet_len, MIN_PACKET_LEN, MAX_PACKET_LEN
                ),
            });
        }
        if self.stale_timeout_ms == 0 {
            return Err(Error::ConfigValidation {
                field: "stale_timeout_ms",
                reason: "must be greater than zero".into(),
            });
        }
        if self.local_address == BROADCAST_ADDRESS {
            return Err(Error::ConfigValidation {
                field: "local_address",
                reason: format!("{} is the broadcast address", BROADCAST_ADDRESS),
            });
        }
        if self.error_log_capacity == 0 {
            return Err(Error::ConfigValidation {
                field: "error_log_capacity",
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.serial.baud_rate == 0 {
            return Err(Error::ConfigValidation {
                field: "baud_rate",
                reason: "must be greater than zero".into(),
            });
        }
        self.link.validate()
    }
}

/// Resolve the config file path (explicit path or default file name)
pub fn config_path(path: Option<&Path>) -> PathBuf {
    path.map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// Load and validate config
///
/// A missing file yields defaults; an unreadable or invalid one is an error.
pub fn load(path: Option<&Path>) -> Result<Config> {
    let path = config_path(path);

    if !path.exists() {
        debug!("No config at {:?}, using defaults", path);
        let config = Config::default();
        config.validate()?;
        return Ok(config);
    }

    let content = fs::read_to_string(&path).map_err(|e| Error::ConfigRead {
        path: path.clone(),
        source: e,
    })?;
    let config: Config = toml::from_str(&content).map_err(|e| Error::ConfigParse {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    config.validate()?;
    Ok(config)
}

/// Save config to file
pub fn save(config: &Config, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config).map_err(|e| Error::ConfigParse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    fs::write(path, content).map_err(|e| Error::ConfigRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Default values tests
    // =========================================================================

    #[test]
    fn test_default_link_config_values() {
        let config = LinkConfig::default();

        assert_eq!(config.marker, 218);
        assert_eq!(config.local_address, 252);
        assert_eq!(config.stale_timeout(), Duration::from_millis(250));
        assert_eq!(config.max_packet_len, 260);
        assert_eq!(config.error_log_capacity, 254);
        assert_eq!(config.error_log_overflow, OverflowPolicy::Wrap);
        assert!(!config.reset_on_bad_destination);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_serial_config_values() {
        let config = SerialConfig::default();
        assert_eq!(config.port, "");
        assert_eq!(config.baud_rate, 1_152_000);
    }

    #[test]
    fn test_default_device_config() {
        let config = DeviceConfig::default();
        assert_eq!(config.vid, 0x1CBE);
        assert_eq!(config.pid_list, vec![0x00FD]);
    }

    // =========================================================================
    // Validation tests
    // =========================================================================

    #[test]
    fn test_validate_rejects_broadcast_local_address() {
        let config = LinkConfig {
            local_address: 255,
            ..LinkConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::ConfigValidation {
                field: "local_address",
                ..
            })
        ));
    }

    #[test]
    fn test_validate_packet_len_bounds() {
        for len in [0, 4, 261] {
            let config = LinkConfig {
                max_packet_len: len,
                ..LinkConfig::default()
            };
            assert!(config.validate().is_err(), "len {}", len);
        }
        let config = LinkConfig {
            max_packet_len: 5,
            ..LinkConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_timeout() {
        let config = LinkConfig {
            stale_timeout_ms: 0,
            ..LinkConfig::default()
        };
        assert!(config.validate().is_err());
    }

    // =========================================================================
    // Serialization tests
    // =========================================================================

    #[test]
    fn test_overflow_policy_toml() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            policy: OverflowPolicy,
        }

        let wrap = toml::to_string(&Wrapper {
            policy: OverflowPolicy::Wrap,
        })
        .unwrap();
        assert!(wrap.contains("policy = \"wrap\""));

        let reject: Wrapper = toml::from_str("policy = \"reject\"").unwrap();
        assert_eq!(reject.policy, OverflowPolicy::Reject);
    }

    #[test]
    fn test_config_partial_link_section() {
        let partial_toml = r#"
[link]
marker = 0
local_address = 1
"#;

        let config: Config = toml::from_str(partial_toml).unwrap();

        assert_eq!(config.link.marker, 0);
        assert_eq!(config.link.local_address, 1);
        // Rest should be defaults
        assert_eq!(config.link.stale_timeout_ms, 250);
        assert_eq!(config.serial.baud_rate, 1_152_000);
    }

    #[test]
    fn test_config_empty_file() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.link.marker, 218);
        assert_eq!(config.serial.port, "");
    }

    #[test]
    fn test_save_load_roundtrip() {
        let path = std::env::temp_dir().join(format!("hsk-link-test-{}.toml", std::process::id()));
        let mut config = Config::default();
        config.serial.port = "/dev/ttyACM3".into();
        config.link.error_log_overflow = OverflowPolicy::Reject;

        save(&config, &path).unwrap();
        let restored = load(Some(&path)).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(restored.serial.port, "/dev/ttyACM3");
        assert_eq!(restored.link.error_log_overflow, OverflowPolicy::Reject);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("hsk-link-does-not-exist.toml");
        let config = load(Some(&path)).unwrap();
        assert_eq!(config.link.local_address, 252);
    }

    #[test]
    fn test_load_invalid_file() {
        let path = std::env::temp_dir().join(format!("hsk-link-bad-{}.toml", std::process::id()));
        fs::write(&path, "[link]\nmarker = \"nope\"\n").unwrap();
        let result = load(Some(&path));
        let _ = fs::remove_file(&path);
        assert!(matches!(result, Err(Error::ConfigParse { .. })));
    }
}
