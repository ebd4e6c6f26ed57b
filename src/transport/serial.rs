//! Serial transport for the housekeeping link
//!
//! One implementation for every platform, on top of the `serialport` crate.
//! Reads are bounded by a short port timeout, so `read_byte` never blocks
//! the poll loop for long.
//!
//! The transport reports disconnection when:
//! - A read fails with anything other than a timeout
//! - Too many consecutive zero-byte reads occur (port gone)
//! - A write fails

use super::Transport;
use crate::config::DeviceConfig;
use crate::constants::{SERIAL_DISCONNECT_THRESHOLD, SERIAL_READ_TIMEOUT_MS};
use crate::error::{Error, Result};
use serialport::{SerialPortInfo, SerialPortType};
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::time::Duration;
use tracing::{debug, warn};

/// Bytes pulled from the OS per read call
const READ_CHUNK: usize = 256;

/// Serial transport for the housekeeping boards
///
/// # Example
///
/// ```ignore
/// // Auto-detect device using the configured preset
/// let port = SerialTransport::detect(&config.device)?;
/// let transport = SerialTransport::open(&port, config.serial.baud_rate)?;
///
/// // Or specify port directly
/// let transport = SerialTransport::open("/dev/ttyACM0", 1_152_000)?;
/// ```
pub struct SerialTransport {
    port_name: String,
    port: Box<dyn serialport::SerialPort>,
    /// Bytes read from the OS but not yet handed out
    pending: VecDeque<u8>,
    consecutive_empty: u32,
    connected: bool,
}

impl SerialTransport {
    /// Open a serial port in raw 8N1 mode
    pub fn open(port_name: &str, baud_rate: u32) -> Result<Self> {
        let port = serialport::new(port_name, baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(Duration::from_millis(SERIAL_READ_TIMEOUT_MS))
            .open()
            .map_err(|e| Error::SerialOpen {
                port: port_name.to_string(),
                source: io::Error::other(e.to_string()),
            })?;

        // Drop whatever the board sent before we were listening
        if let Err(e) = port.clear(serialport::ClearBuffer::Input) {
            debug!("Could not flush input of {}: {}", port_name, e);
        }

        Ok(Self {
            port_name: port_name.to_string(),
            port,
            pending: VecDeque::with_capacity(READ_CHUNK),
            consecutive_empty: 0,
            connected: true,
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Detect a USB device matching the given configuration
    ///
    /// Searches available serial ports for a device matching the VID/PID
    /// specified in the config. Falls back to name pattern matching if
    /// VID/PID info is not available.
    ///
    /// # Errors
    ///
    /// - `NoDeviceFound` - No matching device found
    /// - `MultipleDevicesFound` - More than one matching device found
    pub fn detect(config: &DeviceConfig) -> Result<String> {
        let ports = Self::list();
        let matching: Vec<_> = ports.iter().filter(|p| matches_device(p, config)).collect();

        match matching.len() {
            0 => Err(Error::NoDeviceFound),
            1 => Ok(matching[0].port_name.clone()),
            n => Err(Error::MultipleDevicesFound { count: n }),
        }
    }

    /// Serial ports currently present on the system
    pub fn list() -> Vec<SerialPortInfo> {
        serialport::available_ports().unwrap_or_default()
    }

    fn fill(&mut self) {
        let mut buf = [0u8; READ_CHUNK];
        match self.port.read(&mut buf) {
            Ok(n) if n > 0 => {
                self.consecutive_empty = 0;
                self.pending.extend(&buf[..n]);
            }
            Ok(_) => {
                // Zero bytes read - could be normal or port gone
                self.consecutive_empty += 1;
                if self.consecutive_empty > SERIAL_DISCONNECT_THRESHOLD {
                    warn!("{}: no data and no timeout, assuming disconnect", self.port_name);
                    self.connected = false;
                }
            }
            Err(ref e) if e.kind() == io::ErrorKind::TimedOut => {
                self.consecutive_empty = 0;
            }
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => {
                warn!("{}: read failed: {}", self.port_name, e);
                self.connected = false;
            }
        }
    }
}

/// Check if a serial port matches the device configuration
fn matches_device(port: &SerialPortInfo, config: &DeviceConfig) -> bool {
    match &port.port_type {
        SerialPortType::UsbPort(usb) => usb.vid == config.vid && config.pid_list.contains(&usb.pid),
        _ => {
            // Fallback: name pattern matching if available
            config
                .name_hint
                .current()
                .map(|hint| port.port_name.contains(hint))
                .unwrap_or(false)
        }
    }
}

impl Transport for SerialTransport {
    fn read_byte(&mut self) -> Option<u8> {
        if self.pending.is_empty() && self.connected {
            self.fill();
        }
        self.pending.pop_front()
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        let result = self.port.write_all(bytes).and_then(|_| self.port.flush());
        if let Err(ref e) = result {
            warn!("{}: write failed: {}", self.port_name, e);
            self.connected = false;
        }
        result
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
