use tracing::debug;

use super::{EncodingConfig, ObjectEncoding};
use crate::database::{dict::Dict, intset::IntSet, sds::Sds, ziplist::encoding::parse_canonical_i64};

/// Set value: an intset while every member is an integer and the set is
/// small, a hash table with unit values otherwise.
#[derive(Debug)]
pub enum SetValue {
    Intset(IntSet),
    Hashtable(Dict<Sds, ()>),
}

impl SetValue {
    /// Empty set in the encoding best suited to hold `first`.
    pub fn for_member(
        first: &[u8],
        cfg: &EncodingConfig,
    ) -> Self {
        if parse_canonical_i64(first).is_some() {
            SetValue::Intset(IntSet::new())
        } else {
            SetValue::Hashtable(cfg.new_dict())
        }
    }

    pub fn encoding(&self) -> ObjectEncoding {
        match self {
            SetValue::Intset(_) => ObjectEncoding::Intset,
            SetValue::Hashtable(_) => ObjectEncoding::Hashtable,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SetValue::Intset(is) => is.len(),
            SetValue::Hashtable(d) => d.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Adds `member`. Returns `true` if it was not already present.
    pub fn add(
        &mut self,
        member: &[u8],
        cfg: &EncodingConfig,
    ) -> bool {
        if let SetValue::Intset(is) = self {
            match parse_canonical_i64(member) {
                Some(v) => {
                    if !is.add(v) {
                        return false;
                    }
                    if is.len() > cfg.set_max_intset_entries {
                        self.convert(cfg);
                    }
                    return true;
                }
                None => self.convert(cfg),
            }
        }
        match self {
            SetValue::Hashtable(d) => d.add(Sds::new(member), ()).is_ok(),
            SetValue::Intset(_) => false,
        }
    }

    /// Removes `member`. Returns `true` if it was present.
    pub fn remove(
        &mut self,
        member: &[u8],
    ) -> bool {
        match self {
            SetValue::Intset(is) => parse_canonical_i64(member).is_some_and(|v| is.remove(v)),
            SetValue::Hashtable(d) => d.delete(member),
        }
    }

    pub fn contains(
        &self,
        member: &[u8],
    ) -> bool {
        match self {
            SetValue::Intset(is) => parse_canonical_i64(member).is_some_and(|v| is.contains(v)),
            SetValue::Hashtable(d) => d.contains_key(member),
        }
    }

    /// A random member, `None` when empty.
    pub fn random_member(
        &mut self,
        rng: &mut fastrand::Rng,
    ) -> Option<Sds> {
        match self {
            SetValue::Intset(is) => is.random(rng).map(Sds::from_i64),
            SetValue::Hashtable(d) => {
                let id = d.random_key()?;
                d.key(id).cloned()
            }
        }
    }

    /// Every member, integers rendered in decimal.
    pub fn members(&self) -> Vec<Sds> {
        match self {
            SetValue::Intset(is) => is.iter().map(Sds::from_i64).collect(),
            SetValue::Hashtable(d) => d.iter().map(|(k, _)| k.clone()).collect(),
        }
    }

    /// Converts to a hash table. No-op if already converted.
    pub fn convert(
        &mut self,
        cfg: &EncodingConfig,
    ) {
        if let SetValue::Intset(is) = self {
            let mut d = cfg.new_dict();
            // Sized up front so the copy does not rehash.
            if let Err(e) = d.expand(is.len()) {
                debug!(error = %e, "set conversion could not presize table");
            }
            for v in is.iter() {
                d.replace(Sds::from_i64(v), ());
            }
            debug!(len = d.len(), "set converted to hashtable");
            *self = SetValue::Hashtable(d);
        }
    }
}
