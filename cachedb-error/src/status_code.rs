use std::fmt;

use num_enum::TryFromPrimitive;
#[cfg(feature = "serde_repr")]
use serde_repr::{Deserialize_repr, Serialize_repr};
#[cfg(feature = "strum")]
use strum_macros::{AsRefStr, EnumIter};

/// Numeric category of every error the storage core can return.
///
/// The thousands digit groups the codes:
///
/// | range | meaning                                         |
/// |-------|-------------------------------------------------|
/// | 1xxx  | caller mistakes and internal faults             |
/// | 2xxx  | keys and values                                 |
/// | 3xxx  | memory and table state                          |
/// | 4xxx  | serialized ziplist / intset blobs and type tags |
/// | 5xxx  | startup (configuration, logging)                |
///
/// Codes travel as plain `u32` to whatever server embeds the core;
/// `TryFrom<u32>` comes from `num_enum`.
#[cfg_attr(feature = "strum", derive(AsRefStr, EnumIter))]
#[cfg_attr(feature = "serde_repr", derive(Serialize_repr, Deserialize_repr))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u32)]
#[non_exhaustive]
pub enum StatusCode {
    Internal = 1000,
    InvalidArgs = 1001,
    Unsupported = 1002,

    NotFound = 2000,
    AlreadyExists = 2001,
    WrongType = 2002,
    IndexOutOfBounds = 2003,
    InvalidRange = 2004,
    NotAnInteger = 2005,

    OutOfMemory = 3000,
    MaxMemoryReached = 3001,
    /// A resize was refused because the table is still migrating buckets.
    RehashInProgress = 3002,

    CorruptedData = 4000,
    InvalidEncoding = 4001,
    TruncatedBlob = 4002,

    InvalidConfig = 5000,
    ConfigSourceFailed = 5001,
    LoggingInitFailed = 5002,
}

/// Severity at which an error should be logged. Mirrors the `tracing`
/// levels without depending on `tracing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

////////////////////////////////////////////////////////////////////////////////
// Inherent methods
////////////////////////////////////////////////////////////////////////////////

impl StatusCode {
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// `None` for numbers that are not a known code.
    pub fn from_u32(v: u32) -> Option<Self> {
        Self::try_from(v).ok()
    }

    /// The same call may succeed later without any change by the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::MaxMemoryReached | Self::RehashInProgress)
    }

    /// The process or the data it holds can no longer be trusted.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            Self::Internal | Self::OutOfMemory | Self::CorruptedData
        )
    }

    pub fn log_level(&self) -> LogLevel {
        match self.code() / 1000 {
            _ if self.is_critical() => LogLevel::Error,
            2 if matches!(self, Self::NotFound | Self::AlreadyExists) => LogLevel::Debug,
            1 | 2 => LogLevel::Info,
            _ => LogLevel::Warn,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Trait impls
////////////////////////////////////////////////////////////////////////////////

impl From<StatusCode> for u32 {
    fn from(c: StatusCode) -> Self {
        c.code()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        #[cfg(feature = "strum")]
        {
            write!(f, "{} ({})", self.as_ref(), self.code())
        }
        #[cfg(not(feature = "strum"))]
        {
            write!(f, "{:?} ({})", self, self.code())
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_u32() {
        assert_eq!(StatusCode::from_u32(2000), Some(StatusCode::NotFound));
        assert_eq!(
            StatusCode::from_u32(u32::from(StatusCode::TruncatedBlob)),
            Some(StatusCode::TruncatedBlob)
        );
        assert_eq!(StatusCode::from_u32(9999), None);
    }

    #[test]
    fn test_log_levels() {
        assert_eq!(StatusCode::OutOfMemory.log_level(), LogLevel::Error);
        assert_eq!(StatusCode::CorruptedData.log_level(), LogLevel::Error);
        assert_eq!(StatusCode::NotFound.log_level(), LogLevel::Debug);
        assert_eq!(StatusCode::WrongType.log_level(), LogLevel::Info);
        assert_eq!(StatusCode::InvalidArgs.log_level(), LogLevel::Info);
        assert_eq!(StatusCode::InvalidConfig.log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_retryable_is_never_critical() {
        for code in [StatusCode::MaxMemoryReached, StatusCode::RehashInProgress] {
            assert!(code.is_retryable());
            assert!(!code.is_critical());
        }
        assert!(!StatusCode::NotFound.is_retryable());
    }

    #[test]
    fn test_display_contains_code() {
        let s = StatusCode::InvalidEncoding.to_string();
        assert!(s.contains("4001"), "got {s}");
    }
}
