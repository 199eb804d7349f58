use std::{fmt, panic::Location, sync::Arc};

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::{ErrorExt, LogLevel, StatusCode};

/// Root error of a failed operation plus the notes attached on the way out,
/// innermost first.
///
/// Cloning is cheap: the root is shared.
#[derive(Clone)]
pub struct StackError {
    root: Arc<dyn ErrorExt>,
    frames: Vec<ErrorContext>,
}

/// One note added by [`StackError::context`].
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub message: String,
    /// Where `context` was called.
    pub location: &'static Location<'static>,
}

/// What an embedding server sends back to its client.
#[cfg(feature = "serde")]
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u32,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub trace: Vec<String>,
}

////////////////////////////////////////////////////////////////////////////////
// Inherent methods
////////////////////////////////////////////////////////////////////////////////

impl StackError {
    pub fn new<E: ErrorExt>(err: E) -> Self {
        Self {
            root: Arc::new(err),
            frames: Vec::new(),
        }
    }

    #[track_caller]
    pub fn context(
        mut self,
        msg: impl Into<String>,
    ) -> Self {
        self.frames.push(ErrorContext {
            message: msg.into(),
            location: Location::caller(),
        });
        self
    }

    /// Code of the root error; contexts never change it.
    pub fn status_code(&self) -> StatusCode {
        self.root.status_code()
    }

    pub fn client_message(&self) -> String {
        self.root.client_message()
    }

    pub fn root(&self) -> &dyn ErrorExt {
        &*self.root
    }

    pub fn contexts(&self) -> &[ErrorContext] {
        &self.frames
    }

    pub fn downcast_ref<T: ErrorExt>(&self) -> Option<&T> {
        self.root.as_any().downcast_ref()
    }

    pub fn log_level(&self) -> LogLevel {
        self.status_code().log_level()
    }

    /// Multi-line form for logs: the root, then every context with its
    /// source location, outermost last.
    pub fn report(&self) -> String {
        let mut out = format!("[{}] {}", self.status_code(), self.root);
        for frame in &self.frames {
            out.push_str(&format!(
                "\n  while {} at {}:{}",
                frame.message,
                frame.location.file(),
                frame.location.line()
            ));
        }
        out
    }

    /// Context messages are only included in debug builds.
    #[cfg(feature = "serde")]
    pub fn to_response(&self) -> ErrorResponse {
        let trace = if cfg!(debug_assertions) {
            self.frames.iter().map(|f| f.message.clone()).collect()
        } else {
            Vec::new()
        };
        ErrorResponse {
            code: self.status_code().code(),
            message: self.client_message(),
            trace,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Trait impls
////////////////////////////////////////////////////////////////////////////////

impl fmt::Debug for StackError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.report())
    }
}

/// Outermost context first, then the root: `a: b: root`.
impl fmt::Display for StackError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        for frame in self.frames.iter().rev() {
            write!(f, "{}: ", frame.message)?;
        }
        write!(f, "{}", self.root)
    }
}

impl std::error::Error for StackError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&*self.root)
    }
}

impl<E: ErrorExt> From<E> for StackError {
    fn from(e: E) -> Self {
        StackError::new(e)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
