//! Skip list backing large sorted sets.
//!
//! - `skiplist_base`: the list itself, ordered by (score, member) with
//!   per-level spans for rank queries.
//! - `range`: score and lexicographic range bounds.
//! - `safety`: invariant validation and level statistics.

pub mod range;
pub mod safety;
pub mod skiplist_base;

pub use range::*;
pub use safety::*;
pub use skiplist_base::*;
