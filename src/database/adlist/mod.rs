pub mod adlist_base;

pub use adlist_base::*;
