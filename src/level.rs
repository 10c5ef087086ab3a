// Log levels, ordered by ascending severity

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Log level (DEBUG is the least severe, FATAL the most)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Level {
    /// Verbose diagnostics
    Debug = 0,
    /// Normal operation
    Info = 1,
    /// Significant normal condition
    Notice = 2,
    /// Something looks wrong but the operation continues
    Warn = 3,
    /// An operation failed
    Error = 4,
    /// The process cannot continue
    Fatal = 5,
}

impl Level {
    /// Get level as u8 (0-5)
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Get level name as upper-case static string
    pub const fn as_str(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Notice => "NOTICE",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
        }
    }

    /// Create from u8 value (returns None if invalid)
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Level::Debug),
            1 => Some(Level::Info),
            2 => Some(Level::Notice),
            3 => Some(Level::Warn),
            4 => Some(Level::Error),
            5 => Some(Level::Fatal),
            _ => None,
        }
    }
}

impl Default for Level {
    /// Default threshold accepts everything.
    fn default() -> Self {
        Level::Debug
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Level {
    type Err = crate::Error;

    /// Parse from a case-insensitive level name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Level::Debug),
            "INFO" => Ok(Level::Info),
            "NOTICE" => Ok(Level::Notice),
            "WARN" => Ok(Level::Warn),
            "ERROR" => Ok(Level::Error),
            "FATAL" => Ok(Level::Fatal),
            _ => Err(crate::Error::InvalidArgument("unknown log level name")),
        }
    }
}
