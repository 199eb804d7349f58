use std::{
    cell::Cell,
    hash::{BuildHasher, Hash},
    rc::Rc,
};

use super::{Dict, EntryId};

/// Borrowing iterator over `(&K, &V)`, table 0 first, then table 1 while
/// rehashing.
pub struct DictIter<'a, K, V, S> {
    dict: &'a Dict<K, V, S>,
    table: usize,
    bucket: usize,
    entry: Option<EntryId>,
    remaining: usize,
}

/// Detached iterator over entry handles.
///
/// It holds no borrow of the table, so entries may be added or deleted
/// between calls to [`next`](SafeIter::next). Deleting the entry just
/// returned is always safe. While any `SafeIter` is alive the table does not
/// rehash, so no entry moves between buckets under the cursor.
#[derive(Debug)]
pub struct SafeIter {
    _guard: IterGuard,
    table: usize,
    index: isize,
    entry: Option<EntryId>,
    next_entry: Option<EntryId>,
}

/// Registers a live safe iterator in the table's counter.
#[derive(Debug)]
struct IterGuard(Rc<Cell<usize>>);

impl<'a, K, V, S> DictIter<'a, K, V, S> {
    pub(super) fn new(dict: &'a Dict<K, V, S>) -> Self
    where
        K: Hash + Eq,
        S: BuildHasher,
    {
        DictIter {
            dict,
            table: 0,
            bucket: 0,
            entry: None,
            remaining: dict.len(),
        }
    }
}

impl SafeIter {
    pub(super) fn new(counter: Rc<Cell<usize>>) -> Self {
        SafeIter {
            _guard: IterGuard::new(counter),
            table: 0,
            index: -1,
            entry: None,
            next_entry: None,
        }
    }

    /// Next entry of `dict`, or `None` once both tables are exhausted.
    ///
    /// `dict` must be the table this iterator was created from.
    pub fn next<K, V, S>(
        &mut self,
        dict: &Dict<K, V, S>,
    ) -> Option<EntryId>
    where
        K: Hash + Eq,
        S: BuildHasher,
    {
        loop {
            match self.entry {
                None => {
                    self.index += 1;
                    if self.index as usize >= dict.ht[self.table].size() {
                        if dict.is_rehashing() && self.table == 0 {
                            self.table = 1;
                            self.index = 0;
                        } else {
                            return None;
                        }
                    }
                    if self.index as usize >= dict.ht[self.table].size() {
                        return None;
                    }
                    self.entry = dict.ht[self.table].buckets[self.index as usize];
                }
                Some(_) => self.entry = self.next_entry,
            }

            if let Some(id) = self.entry {
                match dict.entries.get(id) {
                    Some(e) => {
                        // Saved now, since the caller may delete `id`.
                        self.next_entry = e.next;
                        return Some(id);
                    }
                    // The rest of this chain went away with its head.
                    None => self.entry = None,
                }
            }
        }
    }
}

impl IterGuard {
    fn new(counter: Rc<Cell<usize>>) -> Self {
        counter.set(counter.get() + 1);
        IterGuard(counter)
    }
}

impl Drop for IterGuard {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

impl<'a, K, V, S> Iterator for DictIter<'a, K, V, S> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(id) = self.entry {
                let e = &self.dict.entries[id];
                self.entry = e.next;
                self.remaining -= 1;
                return Some((&e.key, &e.val));
            }

            if self.bucket >= self.dict.ht[self.table].size() {
                if self.table == 0 && self.dict.rehash_idx != -1 {
                    self.table = 1;
                    self.bucket = 0;
                    continue;
                }
                return None;
            }

            self.entry = self.dict.ht[self.table].buckets[self.bucket];
            self.bucket += 1;
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V, S> ExactSizeIterator for DictIter<'_, K, V, S> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iter_visits_both_tables() {
        let mut d = Dict::new();
        for i in 0..5u32 {
            d.add(i, i).unwrap();
        }
        assert!(d.is_rehashing());
        let mut keys: Vec<u32> = d.iter().map(|(k, _)| *k).collect();
        keys.sort();
        assert_eq!(keys, vec![0, 1, 2, 3, 4]);
        assert_eq!(d.iter().len(), 5);
    }

    #[test]
    fn test_safe_iter_counter_is_released() {
        let d: Dict<u8, u8> = Dict::new();
        let a = d.safe_iter();
        let b = d.safe_iter();
        assert_eq!(d.safe_iterators(), 2);
        drop(a);
        assert_eq!(d.safe_iterators(), 1);
        drop(b);
        assert_eq!(d.safe_iterators(), 0);
    }

    #[test]
    fn test_safe_iter_on_empty_table() {
        let d: Dict<u8, u8> = Dict::new();
        let mut it = d.safe_iter();
        assert!(it.next(&d).is_none());
        assert!(it.next(&d).is_none());
    }

    /// Keys added mid-iteration are either visited or not, but nothing
    /// present from the start is lost.
    #[test]
    fn test_safe_iter_with_inserts() {
        let mut d = Dict::new();
        for i in 0..32u32 {
            d.add(i, ()).unwrap();
        }
        let mut it = d.safe_iter();
        let mut seen = Vec::new();
        let mut extra = 1000u32;
        while let Some(id) = it.next(&d) {
            seen.push(*d.key(id).unwrap());
            d.add(extra, ()).unwrap();
            extra += 1;
        }
        for i in 0..32 {
            assert!(seen.contains(&i));
        }
    }
}
