use std::{any::Any, error::Error};

use crate::StatusCode;

/// Implemented by every error enum of the storage core so it can be lifted
/// into a [`StackError`](crate::StackError) with `?`.
pub trait ErrorExt: Error + Send + Sync + 'static {
    fn status_code(&self) -> StatusCode {
        StatusCode::Internal
    }

    fn as_any(&self) -> &dyn Any;

    /// Display text, except for critical codes which collapse into a
    /// generic message.
    fn client_message(&self) -> String {
        if self.status_code().is_critical() {
            "ERR internal error".to_string()
        } else {
            self.to_string()
        }
    }

    /// Key/value pairs for whoever counts errors.
    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        vec![
            ("error_type", self.type_name()),
            ("status_code", self.status_code().code().to_string()),
        ]
    }

    /// Last path segment of the concrete type name.
    fn type_name(&self) -> String {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("bucket {0} points outside the table")]
    struct BadBucket(usize);

    impl ErrorExt for BadBucket {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[derive(Debug, thiserror::Error)]
    #[error("no such key: {0}")]
    struct NoKey(&'static str);

    impl ErrorExt for NoKey {
        fn status_code(&self) -> StatusCode {
            StatusCode::NotFound
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    /// Internal details stay out of client replies.
    #[test]
    fn test_critical_errors_are_hidden() {
        let e = BadBucket(17);
        assert_eq!(e.status_code(), StatusCode::Internal);
        assert_eq!(e.client_message(), "ERR internal error");
    }

    #[test]
    fn test_client_errors_show_display() {
        assert_eq!(NoKey("k").client_message(), "no such key: k");
    }

    #[test]
    fn test_metrics_tags() {
        let e = NoKey("t");
        assert_eq!(e.type_name(), "NoKey");
        let tags = e.metrics_tags();
        assert!(tags.contains(&("status_code", "2000".to_string())));
        assert!(tags.contains(&("error_type", "NoKey".to_string())));
    }
}
