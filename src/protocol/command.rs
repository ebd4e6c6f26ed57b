//! Housekeeping protocol vocabulary
//!
//! Board addresses, command codes, priority levels and the error codes the
//! boards report back. Codes not listed here are board-specific and pass
//! through as `Command::Other`.

use std::fmt;

/// Well-known board addresses
pub mod address {
    /// Main housekeeping board
    pub const MAIN_HSK: u8 = 1;
    /// Magnet housekeeping board
    pub const MAGNET_HSK: u8 = 2;
    /// DCT housekeeping board
    pub const DCT_HSK: u8 = 3;
    /// DCT temperature sensor board #1
    pub const DCT_TEMP1: u8 = 4;
    /// DCT temperature sensor board #2
    pub const DCT_TEMP2: u8 = 5;
    /// Science flight computer
    pub const SFC: u8 = 252;
    /// Every board; illegal as a source
    pub const BROADCAST: u8 = crate::constants::BROADCAST_ADDRESS;
}

/// Command (or response) code carried in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    PingPong,
    SetPriority,
    IntSensorRead,
    MapDevices,
    HeaterControl,
    TestHeaterControl,
    AutoPriorityPeriod,
    PacketCount,
    TestMode,
    SendLowPriority,
    SendMedPriority,
    SendHiPriority,
    SendAll,
    Reset,
    Error,
    /// Board-specific command
    Other(u8),
}

impl Command {
    pub fn code(self) -> u8 {
        match self {
            Self::PingPong => 0,
            Self::SetPriority => 1,
            Self::IntSensorRead => 2,
            Self::MapDevices => 3,
            Self::HeaterControl => 4,
            Self::TestHeaterControl => 5,
            Self::AutoPriorityPeriod => 6,
            Self::PacketCount => 7,
            Self::TestMode => 249,
            Self::SendLowPriority => 250,
            Self::SendMedPriority => 251,
            Self::SendHiPriority => 252,
            Self::SendAll => 253,
            Self::Reset => 254,
            Self::Error => 255,
            Self::Other(code) => code,
        }
    }

    /// Priority-class data request (low, medium or high)
    pub fn is_priority_request(self) -> bool {
        matches!(
            self,
            Self::SendLowPriority | Self::SendMedPriority | Self::SendHiPriority
        )
    }
}

impl From<u8> for Command {
    fn from(code: u8) -> Self {
        match code {
            0 => Self::PingPong,
            1 => Self::SetPriority,
            2 => Self::IntSensorRead,
            3 => Self::MapDevices,
            4 => Self::HeaterControl,
            5 => Self::TestHeaterControl,
            6 => Self::AutoPriorityPeriod,
            7 => Self::PacketCount,
            249 => Self::TestMode,
            250 => Self::SendLowPriority,
            251 => Self::SendMedPriority,
            252 => Self::SendHiPriority,
            253 => Self::SendAll,
            254 => Self::Reset,
            255 => Self::Error,
            other => Self::Other(other),
        }
    }
}

impl From<Command> for u8 {
    fn from(cmd: Command) -> Self {
        cmd.code()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(code) => write!(f, "cmd {}", code),
            known => write!(f, "{:?} ({})", known, known.code()),
        }
    }
}

/// Priority level assigned to a command on a board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    None,
    Low,
    Medium,
    High,
    Unknown(u8),
}

impl From<u8> for Priority {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::None,
            1 => Self::Low,
            2 => Self::Medium,
            3 => Self::High,
            other => Self::Unknown(other),
        }
    }
}

/// Error code reported by a board (signed byte on the wire)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteError {
    /// Packet received for an unknown destination
    BadDest,
    /// Packet contained an unknown command
    BadCommand,
    /// Packet was the wrong length for the command
    BadLen,
    /// Packet's command arguments were invalid
    BadArgs,
    Other(u8),
}

impl RemoteError {
    /// Signed value as defined by the firmware
    pub fn value(self) -> i8 {
        match self {
            Self::BadDest => -1,
            Self::BadCommand => -2,
            Self::BadLen => -3,
            Self::BadArgs => -4,
            Self::Other(byte) => byte as i8,
        }
    }
}

impl From<u8> for RemoteError {
    fn from(byte: u8) -> Self {
        match byte as i8 {
            -1 => Self::BadDest,
            -2 => Self::BadCommand,
            -3 => Self::BadLen,
            -4 => Self::BadArgs,
            _ => Self::Other(byte),
        }
    }
}

impl From<RemoteError> for u8 {
    fn from(err: RemoteError) -> Self {
        err.value() as u8
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BadDest => "EBADDEST",
            Self::BadCommand => "EBADCOMMAND",
            Self::BadLen => "EBADLEN",
            Self::BadArgs => "EBADARGS",
            Self::Other(_) => "error",
        };
        write!(f, "{} ({})", name, self.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_codes_roundtrip() {
        for code in 0..=255u8 {
            assert_eq!(Command::from(code).code(), code);
        }
    }

    #[test]
    fn test_known_commands() {
        assert_eq!(Command::from(0), Command::PingPong);
        assert_eq!(Command::from(3), Command::MapDevices);
        assert_eq!(Command::from(254), Command::Reset);
        assert_eq!(Command::from(255), Command::Error);
        assert_eq!(Command::from(42), Command::Other(42));
    }

    #[test]
    fn test_priority_request() {
        assert!(Command::SendMedPriority.is_priority_request());
        assert!(!Command::SendAll.is_priority_request());
    }

    #[test]
    fn test_remote_error_signed_values() {
        assert_eq!(RemoteError::from(0xFF), RemoteError::BadDest);
        assert_eq!(RemoteError::from(0xFC), RemoteError::BadArgs);
        assert_eq!(u8::from(RemoteError::BadLen), 0xFD);
        assert_eq!(RemoteError::from(7).value(), 7);
        assert_eq!(RemoteError::BadCommand.to_string(), "EBADCOMMAND (-2)");
    }

    #[test]
    fn test_priority_from_byte() {
        assert_eq!(Priority::from(3), Priority::High);
        assert_eq!(Priority::from(9), Priority::Unknown(9));
    }
}
