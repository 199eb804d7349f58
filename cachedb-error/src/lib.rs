//! Status codes and the context-carrying error type shared by the cachedb
//! storage core.

pub mod context;
pub mod ext;
pub mod stack;
pub mod status_code;
pub mod types;

pub use context::*;
pub use ext::*;
pub use stack::*;
pub use status_code::*;
pub use types::*;

/// Result of an operation that crosses a module boundary.
pub type CacheResult<T> = Result<T, StackError>;
