use tracing::debug;

use super::{EncodingConfig, ObjectEncoding};
use crate::database::{
    dict::Dict,
    sds::Sds,
    ziplist::{Where, ZipList},
};

/// Hash value: a ziplist of `field, value` pairs while small, a dict after.
#[derive(Debug)]
pub enum HashValue {
    Ziplist(ZipList),
    Hashtable(Dict<Sds, Sds>),
}

impl HashValue {
    pub fn new() -> Self {
        HashValue::Ziplist(ZipList::new())
    }

    pub fn encoding(&self) -> ObjectEncoding {
        match self {
            HashValue::Ziplist(_) => ObjectEncoding::Ziplist,
            HashValue::Hashtable(_) => ObjectEncoding::Hashtable,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            HashValue::Ziplist(zl) => zl.len() / 2,
            HashValue::Hashtable(d) => d.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sets `field` to `value`. Returns `true` if the field is new.
    pub fn set(
        &mut self,
        field: &[u8],
        value: &[u8],
        cfg: &EncodingConfig,
    ) -> bool {
        if matches!(self, HashValue::Ziplist(_))
            && (field.len() > cfg.hash_max_ziplist_value || value.len() > cfg.hash_max_ziplist_value)
        {
            self.convert(cfg);
        }
        match self {
            HashValue::Ziplist(zl) => {
                if let Some(fp) = find_field(zl, field) {
                    if let Some(vp) = zl.next(fp) {
                        zl.delete(vp);
                        zl.insert_before(vp, value);
                        return false;
                    }
                }
                zl.push(field, Where::Tail);
                zl.push(value, Where::Tail);
                if zl.len() / 2 > cfg.hash_max_ziplist_entries {
                    self.convert(cfg);
                }
                true
            }
            HashValue::Hashtable(d) => d.replace(Sds::new(field), Sds::new(value)),
        }
    }

    pub fn get(
        &self,
        field: &[u8],
    ) -> Option<Sds> {
        match self {
            HashValue::Ziplist(zl) => {
                let vp = zl.next(find_field(zl, field)?)?;
                zl.get(vp).map(|v| v.to_sds())
            }
            HashValue::Hashtable(d) => d.get(field).cloned(),
        }
    }

    /// Removes `field`. Returns `true` if it was present.
    pub fn delete(
        &mut self,
        field: &[u8],
    ) -> bool {
        match self {
            HashValue::Ziplist(zl) => match find_field(zl, field) {
                Some(fp) => {
                    zl.delete(fp);
                    zl.delete(fp);
                    true
                }
                None => false,
            },
            HashValue::Hashtable(d) => d.delete(field),
        }
    }

    pub fn exists(
        &self,
        field: &[u8],
    ) -> bool {
        match self {
            HashValue::Ziplist(zl) => find_field(zl, field).is_some(),
            HashValue::Hashtable(d) => d.contains_key(field),
        }
    }

    /// Every `(field, value)` pair. Ziplist order is insertion order; the
    /// dict order is unspecified.
    pub fn entries(&self) -> Vec<(Sds, Sds)> {
        match self {
            HashValue::Ziplist(zl) => {
                let mut out = Vec::with_capacity(zl.len() / 2);
                let mut it = zl.iter();
                while let (Some(f), Some(v)) = (it.next(), it.next()) {
                    out.push((f.to_sds(), v.to_sds()));
                }
                out
            }
            HashValue::Hashtable(d) => d.iter().map(|(f, v)| (f.clone(), v.clone())).collect(),
        }
    }

    /// Converts to a dict. No-op if already converted.
    pub fn convert(
        &mut self,
        cfg: &EncodingConfig,
    ) {
        if let HashValue::Ziplist(_) = self {
            let mut d = cfg.new_dict();
            for (f, v) in self.entries() {
                d.replace(f, v);
            }
            debug!(len = d.len(), "hash converted to hashtable");
            *self = HashValue::Hashtable(d);
        }
    }
}

impl Default for HashValue {
    fn default() -> Self {
        Self::new()
    }
}

/// Offset of `field`, looking only at field positions.
fn find_field(
    zl: &ZipList,
    field: &[u8],
) -> Option<usize> {
    zl.find(zl.head()?, field, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn both_encodings() -> Vec<HashValue> {
        let cfg = EncodingConfig::default();
        let mut small = HashValue::new();
        small.set(b"name", b"ada", &cfg);
        small.set(b"age", b"36", &cfg);
        let mut big = HashValue::new();
        big.set(b"name", b"ada", &cfg);
        big.set(b"age", b"36", &cfg);
        big.convert(&cfg);
        vec![small, big]
    }

    #[test]
    fn test_set_get_overwrite() {
        let cfg = EncodingConfig::default();
        for mut h in both_encodings() {
            assert_eq!(h.get(b"name").unwrap().as_bytes(), b"ada");
            assert_eq!(h.get(b"age").unwrap().as_bytes(), b"36");
            assert!(!h.set(b"age", b"37", &cfg));
            assert_eq!(h.get(b"age").unwrap().as_bytes(), b"37");
            assert!(h.set(b"city", b"london", &cfg));
            assert_eq!(h.len(), 3);
        }
    }

    #[test]
    fn test_values_are_not_matched_as_fields() {
        let cfg = EncodingConfig::default();
        let mut h = HashValue::new();
        h.set(b"a", b"b", &cfg);
        assert!(!h.exists(b"b"));
        assert!(h.set(b"b", b"a", &cfg));
        assert_eq!(h.get(b"b").unwrap().as_bytes(), b"a");
    }

    #[test]
    fn test_delete_and_exists() {
        for mut h in both_encodings() {
            assert!(h.exists(b"name"));
            assert!(h.delete(b"name"));
            assert!(!h.delete(b"name"));
            assert!(!h.exists(b"name"));
            assert_eq!(h.len(), 1);
            assert_eq!(h.get(b"age").unwrap().as_bytes(), b"36");
        }
    }

    #[test]
    fn test_entries() {
        for h in both_encodings() {
            let mut e = h.entries();
            e.sort();
            assert_eq!(e, vec![
                (Sds::new("age"), Sds::new("36")),
                (Sds::new("name"), Sds::new("ada"))
            ]);
        }
    }

    #[test]
    fn test_conversion_thresholds() {
        let cfg = EncodingConfig {
            hash_max_ziplist_entries: 2,
            hash_max_ziplist_value: 8,
            ..Default::default()
        };
        let mut h = HashValue::new();
        h.set(b"a", b"1", &cfg);
        h.set(b"b", b"2", &cfg);
        assert_eq!(h.encoding(), ObjectEncoding::Ziplist);
        h.set(b"c", b"3", &cfg);
        assert_eq!(h.encoding(), ObjectEncoding::Hashtable);
        assert_eq!(h.len(), 3);

        let mut wide = HashValue::new();
        wide.set(b"f", b"a value longer than eight", &cfg);
        assert_eq!(wide.encoding(), ObjectEncoding::Hashtable);
        assert_eq!(wide.get(b"f").unwrap().as_bytes(), b"a value longer than eight");
    }
}
