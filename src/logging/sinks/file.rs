use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{layer::Layer, registry::LookupSpan};

use crate::logging::{config::LoggingConfig, formatter};

/// Daily rolling, non-blocking file layer. Events still queued are flushed
/// when the returned guard is dropped.
pub fn layer<S>(config: &LoggingConfig) -> (Box<dyn Layer<S> + Send + Sync>, WorkerGuard)
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let appender = rolling::daily(&config.file.dir, &config.file.prefix);
    let (writer, guard) = non_blocking(appender);
    let layer = formatter::build_formatter(config.file.format, writer, &config.console, false);
    (layer, guard)
}
