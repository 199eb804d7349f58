use std::any::Any;

use crate::{ErrorExt, StatusCode};

/// Errors raised at the keyspace level.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StorageError {
    #[error("Key not found: {key}")]
    KeyNotFound { key: String },
    #[error("Key already exists: {key}")]
    KeyExists { key: String },
    #[error("Wrong type for key '{key}': expected {expected}, got {actual}")]
    WrongType {
        key: String,
        expected: String,
        actual: String,
    },
    #[error("Index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: i64, len: usize },
    #[error("Value is not an integer or out of range")]
    NotAnInteger,
    #[error("Corrupted {what}: {reason}")]
    CorruptedData { what: String, reason: String },
    #[error("Command not allowed when used memory > 'maxmemory'")]
    MaxMemoryReached,
}

impl ErrorExt for StorageError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::KeyNotFound { .. } => StatusCode::NotFound,
            Self::KeyExists { .. } => StatusCode::AlreadyExists,
            Self::WrongType { .. } => StatusCode::WrongType,
            Self::IndexOutOfBounds { .. } => StatusCode::IndexOutOfBounds,
            Self::NotAnInteger => StatusCode::NotAnInteger,
            Self::CorruptedData { .. } => StatusCode::CorruptedData,
            Self::MaxMemoryReached => StatusCode::MaxMemoryReached,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        let mut tags = vec![
            ("error_type", self.type_name()),
            ("status_code", self.status_code().to_string()),
        ];
        if let Self::WrongType { expected, .. } = self {
            tags.push(("expected_type", expected.clone()));
        }
        tags
    }
}
