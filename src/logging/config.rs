use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use tracing_subscriber::EnvFilter;

use crate::error::LoggingError;

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Event layout written by a sink.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

/// Console sink options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub enabled: bool,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub with_target: bool,
    pub with_thread_ids: bool,
    pub with_line_numbers: bool,
}

/// Daily rolling file sink options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub enabled: bool,
    pub format: LogFormat,
    pub dir: PathBuf,
    /// Files are named `<prefix>.YYYY-MM-DD`.
    pub prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level for every target.
    pub level: String,
    /// Full `EnvFilter` directive; takes precedence over `level`.
    pub directive: Option<String>,
    pub console: ConsoleConfig,
    pub file: FileConfig,
}

impl LoggingConfig {
    /// Directive handed to `EnvFilter` when `RUST_LOG` is not set.
    pub fn build_filter_directive(&self) -> String {
        match &self.directive {
            Some(d) => d.clone(),
            None => self.level.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), LoggingError> {
        if self.directive.is_none() && !LEVELS.contains(&self.level.to_ascii_lowercase().as_str()) {
            return Err(LoggingError::InvalidDirective {
                directive: self.level.clone(),
                reason: format!("level must be one of {}", LEVELS.join(", ")),
            });
        }
        let directive = self.build_filter_directive();
        EnvFilter::try_new(&directive).map_err(|e| LoggingError::InvalidDirective {
            directive,
            reason: e.to_string(),
        })?;
        Ok(())
    }

    /// Creates the log directory when the file sink is on.
    pub fn ensure_log_dir(&self) -> Result<(), LoggingError> {
        if self.file.enabled {
            std::fs::create_dir_all(&self.file.dir)?;
        }
        Ok(())
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        ConsoleConfig {
            enabled: true,
            format: LogFormat::Compact,
            with_ansi: true,
            with_target: true,
            with_thread_ids: false,
            with_line_numbers: false,
        }
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        FileConfig {
            enabled: false,
            format: LogFormat::Json,
            dir: PathBuf::from("logs"),
            prefix: "cachedb.log".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            directive: None,
            console: ConsoleConfig::default(),
            file: FileConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_overrides_level() {
        let mut cfg = LoggingConfig::default();
        assert_eq!(cfg.build_filter_directive(), "info");
        cfg.directive = Some("cachedb::database=trace,warn".into());
        assert_eq!(cfg.build_filter_directive(), "cachedb::database=trace,warn");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_unknown_level_rejected() {
        let cfg = LoggingConfig {
            level: "loud".into(),
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(LoggingError::InvalidDirective { .. })
        ));
    }

    #[test]
    fn test_log_dir_created_only_for_file_sink() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested/logs");
        let mut cfg = LoggingConfig::default();
        cfg.file.dir = dir.clone();
        cfg.ensure_log_dir().unwrap();
        assert!(!dir.exists());

        cfg.file.enabled = true;
        cfg.ensure_log_dir().unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn test_format_names() {
        assert_eq!(LogFormat::Json.to_string(), "json");
        let cfg: LoggingConfig =
            serde_json::from_str(r#"{"console": {"format": "pretty"}}"#).unwrap();
        assert_eq!(cfg.console.format, LogFormat::Pretty);
        assert!(cfg.console.enabled);
    }
}
