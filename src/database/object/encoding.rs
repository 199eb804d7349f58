use std::hash::Hash;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString, IntoStaticStr};

use crate::database::dict::{Dict, ResizePolicy};

/// Internal representation of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum ObjectEncoding {
    Raw,
    Int,
    Ziplist,
    #[strum(serialize = "linkedlist")]
    LinkedList,
    Intset,
    Hashtable,
    Skiplist,
}

/// Size limits of the compact encodings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingConfig {
    pub hash_max_ziplist_entries: usize,
    pub hash_max_ziplist_value: usize,
    pub list_max_ziplist_entries: usize,
    pub list_max_ziplist_value: usize,
    pub set_max_intset_entries: usize,
    pub zset_max_ziplist_entries: usize,
    pub zset_max_ziplist_value: usize,
    /// Resize policy of the hash tables created by conversions. Runtime
    /// state owned by the keyspace, never read from configuration.
    #[serde(skip)]
    pub resize_policy: ResizePolicy,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        EncodingConfig {
            hash_max_ziplist_entries: 512,
            hash_max_ziplist_value: 64,
            list_max_ziplist_entries: 512,
            list_max_ziplist_value: 64,
            set_max_intset_entries: 512,
            zset_max_ziplist_entries: 128,
            zset_max_ziplist_value: 64,
            resize_policy: ResizePolicy::Enable,
        }
    }
}

impl EncodingConfig {
    /// Empty table for a converted container, under the current policy.
    pub fn new_dict<K, V>(&self) -> Dict<K, V>
    where
        K: Hash + Eq,
    {
        let mut d = Dict::new();
        d.set_resize_policy(self.resize_policy);
        d
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_encoding_names() {
        assert_eq!(ObjectEncoding::LinkedList.to_string(), "linkedlist");
        assert_eq!(ObjectEncoding::Skiplist.to_string(), "skiplist");
        assert_eq!(ObjectEncoding::from_str("intset").unwrap(), ObjectEncoding::Intset);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let cfg: EncodingConfig = serde_json::from_str(r#"{"zset_max_ziplist_entries": 4}"#).unwrap();
        assert_eq!(cfg.zset_max_ziplist_entries, 4);
        assert_eq!(cfg.hash_max_ziplist_entries, 512);
    }
}
