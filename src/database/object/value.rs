use std::borrow::Cow;

use cachedb_error::StorageError;

use super::{HashValue, ListValue, ObjectEncoding, RdbType, SetValue, ZSetValue};
use crate::database::{dict::ResizePolicy, sds::Sds, ziplist::encoding::parse_canonical_i64};

/// A value stored under a key.
#[derive(Debug)]
pub enum Value {
    Str(Sds),
    List(ListValue),
    Set(SetValue),
    ZSet(ZSetValue),
    Hash(HashValue),
}

////////////////////////////////////////////////////////////////////////////////
// Inherent methods
////////////////////////////////////////////////////////////////////////////////

impl Value {
    /// Name reported by `TYPE`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::ZSet(_) => "zset",
            Value::Hash(_) => "hash",
        }
    }

    pub fn encoding(&self) -> ObjectEncoding {
        match self {
            Value::Str(s) => {
                if parse_canonical_i64(s.as_bytes()).is_some() {
                    ObjectEncoding::Int
                } else {
                    ObjectEncoding::Raw
                }
            }
            Value::List(l) => l.encoding(),
            Value::Set(s) => s.encoding(),
            Value::ZSet(z) => z.encoding(),
            Value::Hash(h) => h.encoding(),
        }
    }

    /// Snapshot type tag for the current encoding.
    pub fn rdb_type(&self) -> RdbType {
        match self {
            Value::Str(_) => RdbType::String,
            Value::List(ListValue::Ziplist(_)) => RdbType::ListZiplist,
            Value::List(_) => RdbType::List,
            Value::Set(SetValue::Intset(_)) => RdbType::SetIntset,
            Value::Set(_) => RdbType::Set,
            Value::ZSet(ZSetValue::Ziplist(_)) => RdbType::ZSetZiplist,
            Value::ZSet(_) => RdbType::ZSet,
            Value::Hash(HashValue::Ziplist(_)) => RdbType::HashZiplist,
            Value::Hash(_) => RdbType::Hash,
        }
    }

    /// Applies `policy` to every hash table the value owns. Compact
    /// encodings and lists own none.
    pub fn set_resize_policy(
        &mut self,
        policy: ResizePolicy,
    ) {
        match self {
            Value::Set(SetValue::Hashtable(d)) => d.set_resize_policy(policy),
            Value::ZSet(ZSetValue::SkipList { dict, .. }) => dict.set_resize_policy(policy),
            Value::Hash(HashValue::Hashtable(d)) => d.set_resize_policy(policy),
            _ => {}
        }
    }

    /// Serialized bytes of a compact encoding, `None` for full encodings
    /// and strings.
    pub fn compact_blob(&self) -> Option<Cow<'_, [u8]>> {
        match self {
            Value::List(ListValue::Ziplist(zl))
            | Value::ZSet(ZSetValue::Ziplist(zl))
            | Value::Hash(HashValue::Ziplist(zl)) => Some(Cow::Borrowed(zl.as_bytes())),
            Value::Set(SetValue::Intset(is)) => Some(Cow::Owned(is.to_blob())),
            _ => None,
        }
    }

    pub fn as_str(
        &self,
        key: &[u8],
    ) -> Result<&Sds, StorageError> {
        match self {
            Value::Str(s) => Ok(s),
            other => Err(other.wrong_type(key, "string")),
        }
    }

    pub fn as_list_mut(
        &mut self,
        key: &[u8],
    ) -> Result<&mut ListValue, StorageError> {
        match self {
            Value::List(l) => Ok(l),
            other => Err(other.wrong_type(key, "list")),
        }
    }

    pub fn as_set_mut(
        &mut self,
        key: &[u8],
    ) -> Result<&mut SetValue, StorageError> {
        match self {
            Value::Set(s) => Ok(s),
            other => Err(other.wrong_type(key, "set")),
        }
    }

    pub fn as_zset_mut(
        &mut self,
        key: &[u8],
    ) -> Result<&mut ZSetValue, StorageError> {
        match self {
            Value::ZSet(z) => Ok(z),
            other => Err(other.wrong_type(key, "zset")),
        }
    }

    pub fn as_hash_mut(
        &mut self,
        key: &[u8],
    ) -> Result<&mut HashValue, StorageError> {
        match self {
            Value::Hash(h) => Ok(h),
            other => Err(other.wrong_type(key, "hash")),
        }
    }

    fn wrong_type(
        &self,
        key: &[u8],
        expected: &str,
    ) -> StorageError {
        StorageError::WrongType {
            key: String::from_utf8_lossy(key).into_owned(),
            expected: expected.to_string(),
            actual: self.type_name().to_string(),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Trait impls
////////////////////////////////////////////////////////////////////////////////

impl From<Sds> for Value {
    fn from(s: Sds) -> Self {
        Value::Str(s)
    }
}

impl From<ListValue> for Value {
    fn from(l: ListValue) -> Self {
        Value::List(l)
    }
}

impl From<SetValue> for Value {
    fn from(s: SetValue) -> Self {
        Value::Set(s)
    }
}

impl From<ZSetValue> for Value {
    fn from(z: ZSetValue) -> Self {
        Value::ZSet(z)
    }
}

impl From<HashValue> for Value {
    fn from(h: HashValue) -> Self {
        Value::Hash(h)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
