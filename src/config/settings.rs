use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::{
    database::{
        db::MaxmemoryPolicy,
        dict::{set_hash_seed, ResizePolicy},
        object::EncodingConfig,
    },
    error::ConfigError,
    logging::LoggingConfig,
};

/// Keyspace behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seed of the string hash function.
    pub hash_seed: u64,
    /// Spend part of every cron tick on incremental rehashing.
    pub active_rehashing: bool,
    /// Milliseconds of rehashing per cron tick.
    pub rehash_budget_ms: u64,
    pub resize_policy: ResizePolicy,
    /// Volatile keys sampled per active expire round.
    pub active_expire_samples: usize,
    pub maxmemory_policy: MaxmemoryPolicy,
    /// Keys sampled by `volatile-ttl` eviction.
    pub maxmemory_samples: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            hash_seed: 5381,
            active_rehashing: true,
            rehash_budget_ms: 1,
            resize_policy: ResizePolicy::Enable,
            active_expire_samples: 10,
            maxmemory_policy: MaxmemoryPolicy::NoEviction,
            maxmemory_samples: 5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub engine: EngineConfig,
    pub encoding: EncodingConfig,
    pub logging: LoggingConfig,
}

impl Settings {
    /// Defaults, overridden by environment variables such as
    /// `CACHEDB_ENGINE__HASH_SEED`.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Defaults, then the TOML file at `path` if given, then the
    /// environment.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder().add_source(Config::try_from(&Settings::default())?);
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }
        let settings: Settings = builder
            .add_source(
                Environment::with_prefix("CACHEDB")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parses a TOML document on top of the defaults.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let enc = &self.encoding;
        let positive = [
            ("encoding.hash_max_ziplist_entries", enc.hash_max_ziplist_entries),
            ("encoding.hash_max_ziplist_value", enc.hash_max_ziplist_value),
            ("encoding.list_max_ziplist_entries", enc.list_max_ziplist_entries),
            ("encoding.list_max_ziplist_value", enc.list_max_ziplist_value),
            ("encoding.set_max_intset_entries", enc.set_max_intset_entries),
            ("encoding.zset_max_ziplist_entries", enc.zset_max_ziplist_entries),
            ("encoding.zset_max_ziplist_value", enc.zset_max_ziplist_value),
            ("engine.rehash_budget_ms", self.engine.rehash_budget_ms as usize),
            ("engine.maxmemory_samples", self.engine.maxmemory_samples),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be positive".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Installs process-wide state derived from the settings. Call once at
    /// startup, before any table is created.
    pub fn apply(&self) {
        set_hash_seed(self.engine.hash_seed);
    }
}
