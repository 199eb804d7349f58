//! The keyspace: a dict of typed values plus a dict of expiry times, with
//! lazy and active expiry, random eviction and periodic housekeeping.

pub mod db_base;
pub mod policy;

pub use db_base::*;
pub use policy::*;
