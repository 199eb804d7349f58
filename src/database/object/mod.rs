//! Typed values stored in the keyspace and the encoding each one picks.
//!
//! Small collections start in a compact encoding (ziplist or intset) and are
//! converted once to the full structure when they outgrow the thresholds in
//! [`EncodingConfig`]. Conversion never goes back.

pub mod encoding;
pub mod hash;
pub mod list;
pub mod rdb_type;
pub mod set;
pub mod value;
pub mod zset;

pub use encoding::*;
pub use hash::*;
pub use list::*;
pub use rdb_type::*;
pub use set::*;
pub use value::*;
pub use zset::*;
