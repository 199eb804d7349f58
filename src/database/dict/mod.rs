pub mod dict_base;
pub mod hash;
pub mod iter;
pub mod stats;

pub use dict_base::*;
pub use hash::*;
pub use iter::*;
pub use stats::*;
