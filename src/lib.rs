/// Layered settings (defaults, TOML file, environment) and startup.
pub mod config;
/// Data structures and the keyspace (Dict, ZipList, IntSet, SkipList, Sds).
pub mod database;
/// Error enums of the core structures.
pub mod error;
/// `tracing` subscriber setup (filter, console and file sinks).
pub mod logging;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

pub use config::{bootstrap, Engine, EngineConfig, Settings};
pub use database::{
    Db, Dict, EncodingConfig, HashValue, IntSet, LinkedList, ListValue, ObjectEncoding, Sds,
    SetValue, SkipList, Value, ZSetValue, ZipList,
};
pub use error::{
    CacheResult, ConfigError, DictError, IntSetError, LoggingError, RangeError, SdsError,
    StackError, StorageError, ZipListError,
};
pub use logging::{init_logging, LoggingConfig, LoggingHandle};
