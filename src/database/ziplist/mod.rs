pub mod encoding;
pub mod ziplist_base;

pub use ziplist_base::*;
