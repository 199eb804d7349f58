use std::path::Path;

use cachedb_error::{CacheResult, ResultExt};

use super::Settings;
use crate::{database::Db, logging::{init_logging, LoggingHandle}};

/// Everything an embedding server needs after startup.
pub struct Engine {
    pub settings: Settings,
    pub db: Db,
    pub logging: Option<LoggingHandle>,
}

/// Loads settings, installs the hash seed and optionally the global log
/// subscriber, then creates an empty keyspace.
pub fn bootstrap(
    path: Option<&Path>,
    with_logging: bool,
) -> CacheResult<Engine> {
    let settings = Settings::load_from(path).with_context(|| match path {
        Some(p) => format!("loading settings from {}", p.display()),
        None => "loading settings from the environment".to_string(),
    })?;
    settings.apply();

    let logging = if with_logging {
        Some(init_logging(settings.logging.clone()).context("initializing logging")?)
    } else {
        None
    };

    let db = Db::with_config(settings.engine.clone(), settings.encoding.clone());
    tracing::info!(
        hash_seed = settings.engine.hash_seed,
        policy = %settings.engine.maxmemory_policy,
        "keyspace ready"
    );

    Ok(Engine {
        settings,
        db,
        logging,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use cachedb_error::StatusCode;
    use serial_test::serial;

    use super::*;
    use crate::error::ConfigError;

    #[test]
    #[serial]
    fn test_bootstrap_without_logging() {
        let engine = bootstrap(None, false).unwrap();
        assert!(engine.logging.is_none());
        assert!(engine.db.is_empty());
        assert_eq!(engine.db.engine_config(), &engine.settings.engine);
    }

    /// A bad file keeps its path in the context chain.
    #[test]
    #[serial]
    fn test_bootstrap_reports_invalid_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[encoding]\nset_max_intset_entries = 0").unwrap();

        let err = match bootstrap(Some(file.path()), false) {
            Err(e) => e,
            Ok(_) => panic!("zero threshold accepted"),
        };
        assert_eq!(err.status_code(), StatusCode::InvalidConfig);
        assert!(err.contexts()[0].message.starts_with("loading settings from"));
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::Invalid { field: "encoding.set_max_intset_entries", .. })
        ));
    }
}
