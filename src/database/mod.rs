//! Storage core: the byte string, the containers built on it, the typed
//! values and the keyspace that ties them together.

pub mod adlist;
pub mod db;
pub mod dict;
pub mod intset;
pub mod object;
pub mod oom;
pub mod sds;
pub mod skiplist;
pub mod ziplist;

pub use adlist::LinkedList;
pub use db::{Db, DbStats, MaxmemoryPolicy};
pub use dict::{Dict, ResizePolicy};
pub use intset::IntSet;
pub use object::{EncodingConfig, HashValue, ListValue, ObjectEncoding, SetValue, Value, ZSetValue};
pub use sds::Sds;
pub use skiplist::{LexRange, ScoreRange, SkipList};
pub use ziplist::{Where, ZipList};
