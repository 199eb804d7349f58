use std::any::Any;

pub use cachedb_error::{CacheResult, StackError, StorageError};
use cachedb_error::{ErrorExt, StatusCode};
use thiserror::Error;

/// Failures of the dynamic byte buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SdsError {
    #[error("Cannot allocate {requested} bytes for sds")]
    AllocationFailed { requested: usize },

    #[error("Separator must not be empty")]
    EmptySeparator,
}

/// Failures of the hash table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DictError {
    #[error("Key already exists")]
    KeyExists,

    #[error("Cannot resize while rehashing")]
    Rehashing,

    #[error("Requested size {requested} is smaller than {used} stored entries")]
    TooSmall { used: usize, requested: usize },

    #[error("Table already has {size} buckets")]
    SameSize { size: usize },

    #[error("Resizing is disabled by policy")]
    ResizeDisabled,

    #[error("Cannot allocate {buckets} buckets")]
    AllocationFailed { buckets: usize },
}

/// Errors while loading an integer set from its serialized form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntSetError {
    #[error("Intset blob truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("Invalid intset encoding width {0}")]
    InvalidEncoding(u32),

    #[error("Intset elements not strictly ascending at position {0}")]
    NotSorted(usize),
}

/// Errors while loading or walking a ziplist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ZipListError {
    #[error("Ziplist blob truncated at offset {offset}")]
    Truncated { offset: usize },

    #[error("Corrupted ziplist at offset {offset}: {reason}")]
    Corrupted { offset: usize, reason: &'static str },
}

/// Errors while parsing score or lexicographic range bounds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("min or max is not a float: '{0}'")]
    InvalidScore(String),

    #[error("min or max not valid string range item: '{0}'")]
    InvalidLexBound(String),
}

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Source(#[from] config::ConfigError),

    #[error("Invalid value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Logging initialization errors.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log filter directive '{directive}': {reason}")]
    InvalidDirective { directive: String, reason: String },

    #[error("Cannot prepare log directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("A global subscriber is already installed: {0}")]
    AlreadyInitialized(String),
}

////////////////////////////////////////////////////////////////////////////////
// ErrorExt impls
////////////////////////////////////////////////////////////////////////////////

impl ErrorExt for SdsError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::AllocationFailed { .. } => StatusCode::OutOfMemory,
            Self::EmptySeparator => StatusCode::InvalidArgs,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl ErrorExt for DictError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::KeyExists => StatusCode::AlreadyExists,
            Self::Rehashing => StatusCode::RehashInProgress,
            Self::TooSmall { .. } | Self::SameSize { .. } => StatusCode::InvalidArgs,
            Self::ResizeDisabled => StatusCode::Unsupported,
            Self::AllocationFailed { .. } => StatusCode::OutOfMemory,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl ErrorExt for IntSetError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Truncated { .. } => StatusCode::TruncatedBlob,
            Self::InvalidEncoding(_) => StatusCode::InvalidEncoding,
            Self::NotSorted(_) => StatusCode::CorruptedData,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl ErrorExt for ZipListError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Truncated { .. } => StatusCode::TruncatedBlob,
            Self::Corrupted { .. } => StatusCode::CorruptedData,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl ErrorExt for RangeError {
    fn status_code(&self) -> StatusCode {
        StatusCode::InvalidRange
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl ErrorExt for ConfigError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Source(_) => StatusCode::ConfigSourceFailed,
            Self::Invalid { .. } => StatusCode::InvalidConfig,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl ErrorExt for LoggingError {
    fn status_code(&self) -> StatusCode {
        StatusCode::LoggingInitFailed
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
