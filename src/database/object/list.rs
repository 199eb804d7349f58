use tracing::debug;

use super::{EncodingConfig, ObjectEncoding};
use crate::database::{
    adlist::LinkedList,
    sds::Sds,
    ziplist::{Where, ZipList},
};

/// List value: a ziplist while small, a linked list of buffers after.
#[derive(Debug, Clone)]
pub enum ListValue {
    Ziplist(ZipList),
    Linked(LinkedList<Sds>),
}

impl ListValue {
    pub fn new() -> Self {
        ListValue::Ziplist(ZipList::new())
    }

    pub fn encoding(&self) -> ObjectEncoding {
        match self {
            ListValue::Ziplist(_) => ObjectEncoding::Ziplist,
            ListValue::Linked(_) => ObjectEncoding::LinkedList,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ListValue::Ziplist(zl) => zl.len(),
            ListValue::Linked(l) => l.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pushes `value` at one end, converting first if it is too long for the
    /// compact form and afterwards if the list grew past the entry limit.
    pub fn push(
        &mut self,
        value: &[u8],
        side: Where,
        cfg: &EncodingConfig,
    ) {
        self.try_conversion_for(value, cfg);
        match self {
            ListValue::Ziplist(zl) => zl.push(value, side),
            ListValue::Linked(l) => match side {
                Where::Head => {
                    l.add_head(Sds::new(value));
                }
                Where::Tail => {
                    l.add_tail(Sds::new(value));
                }
            },
        }
        self.try_conversion_for_len(cfg);
    }

    pub fn pop(
        &mut self,
        side: Where,
    ) -> Option<Sds> {
        match self {
            ListValue::Ziplist(zl) => {
                let p = match side {
                    Where::Head => zl.index(0)?,
                    Where::Tail => zl.index(-1)?,
                };
                let value = zl.get(p)?.to_sds();
                zl.delete(p);
                Some(value)
            }
            ListValue::Linked(l) => match side {
                Where::Head => l.pop_head(),
                Where::Tail => l.pop_tail(),
            },
        }
    }

    /// Element at `index`; negative values count from the tail.
    pub fn index(
        &self,
        index: i64,
    ) -> Option<Sds> {
        match self {
            ListValue::Ziplist(zl) => {
                let p = zl.index(isize::try_from(index).ok()?)?;
                zl.get(p).map(|v| v.to_sds())
            }
            ListValue::Linked(l) => l.index(index).and_then(|id| l.value(id)).cloned(),
        }
    }

    /// Overwrites the element at `index`. Returns `false` when out of range.
    pub fn set(
        &mut self,
        index: i64,
        value: &[u8],
        cfg: &EncodingConfig,
    ) -> bool {
        self.try_conversion_for(value, cfg);
        match self {
            ListValue::Ziplist(zl) => {
                let Some(p) = isize::try_from(index).ok().and_then(|i| zl.index(i)) else {
                    return false;
                };
                zl.delete(p);
                zl.insert_before(p, value);
                true
            }
            ListValue::Linked(l) => match l.index(index).and_then(|id| l.value_mut(id)) {
                Some(slot) => {
                    *slot = Sds::new(value);
                    true
                }
                None => false,
            },
        }
    }

    /// Elements between `start` and `stop` inclusive. Negative indexes count
    /// from the tail; out-of-range ends are clamped.
    pub fn range(
        &self,
        start: i64,
        stop: i64,
    ) -> Vec<Sds> {
        let Some((start, stop)) = normalize_range(start, stop, self.len()) else {
            return Vec::new();
        };
        let count = stop - start + 1;
        match self {
            ListValue::Ziplist(zl) => {
                let mut out = Vec::with_capacity(count);
                let mut p = zl.index(start as isize);
                while let Some(pos) = p {
                    if out.len() == count {
                        break;
                    }
                    if let Some(v) = zl.get(pos) {
                        out.push(v.to_sds());
                    }
                    p = zl.next(pos);
                }
                out
            }
            ListValue::Linked(l) => l.iter().skip(start).take(count).cloned().collect(),
        }
    }

    /// Inserts `value` before or after the first element equal to `pivot`.
    /// Returns the new length, or `None` if the pivot is absent.
    pub fn insert(
        &mut self,
        pivot: &[u8],
        value: &[u8],
        after: bool,
        cfg: &EncodingConfig,
    ) -> Option<usize> {
        self.try_conversion_for(value, cfg);
        match self {
            ListValue::Ziplist(zl) => {
                let head = zl.head()?;
                let p = zl.find(head, pivot, 0)?;
                if after {
                    match zl.next(p) {
                        Some(next) => zl.insert_before(next, value),
                        None => zl.push(value, Where::Tail),
                    }
                } else {
                    zl.insert_before(p, value);
                }
            }
            ListValue::Linked(l) => {
                let id = l.search_key(|v| v.as_bytes() == pivot)?;
                l.insert_node(id, Sds::new(value), after)?;
            }
        }
        self.try_conversion_for_len(cfg);
        Some(self.len())
    }

    /// Removes elements equal to `value`: the first `count` from the head if
    /// `count > 0`, the last `-count` from the tail if negative, all of them
    /// if zero. Returns how many were removed.
    pub fn remove(
        &mut self,
        count: i64,
        value: &[u8],
    ) -> usize {
        let limit = if count == 0 {
            usize::MAX
        } else {
            count.unsigned_abs() as usize
        };
        let from_tail = count < 0;
        let mut removed = 0;

        match self {
            ListValue::Ziplist(zl) => {
                let mut p = if from_tail { zl.tail() } else { zl.head() };
                while let Some(pos) = p {
                    if removed == limit {
                        break;
                    }
                    if zl.compare(pos, value) {
                        if from_tail {
                            // Entries before `pos` keep their offsets.
                            p = zl.prev(pos);
                            zl.delete(pos);
                        } else {
                            p = zl.delete(pos);
                        }
                        removed += 1;
                    } else {
                        p = if from_tail { zl.prev(pos) } else { zl.next(pos) };
                    }
                }
            }
            ListValue::Linked(l) => {
                let mut p = if from_tail { l.last() } else { l.first() };
                while let Some(id) = p {
                    if removed == limit {
                        break;
                    }
                    p = if from_tail { l.prev_node(id) } else { l.next_node(id) };
                    if l.value(id).is_some_and(|v| v.as_bytes() == value) {
                        l.del_node(id);
                        removed += 1;
                    }
                }
            }
        }
        removed
    }

    pub fn to_vec(&self) -> Vec<Sds> {
        self.range(0, -1)
    }

    /// Converts to a linked list. No-op if already converted.
    pub fn convert(&mut self) {
        if let ListValue::Ziplist(zl) = self {
            let list: LinkedList<Sds> = zl.iter().map(|v| v.to_sds()).collect();
            debug!(len = list.len(), "list converted to linkedlist");
            *self = ListValue::Linked(list);
        }
    }

    fn try_conversion_for(
        &mut self,
        value: &[u8],
        cfg: &EncodingConfig,
    ) {
        if matches!(self, ListValue::Ziplist(_)) && value.len() > cfg.list_max_ziplist_value {
            self.convert();
        }
    }

    fn try_conversion_for_len(
        &mut self,
        cfg: &EncodingConfig,
    ) {
        if matches!(self, ListValue::Ziplist(_)) && self.len() > cfg.list_max_ziplist_entries {
            self.convert();
        }
    }
}

impl Default for ListValue {
    fn default() -> Self {
        Self::new()
    }
}

/// Clamps `start..=stop` against `len`, `None` when the range is empty.
pub(crate) fn normalize_range(
    start: i64,
    stop: i64,
    len: usize,
) -> Option<(usize, usize)> {
    let len = len as i64;
    let mut start = if start < 0 { start + len } else { start };
    let mut stop = if stop < 0 { stop + len } else { stop };
    if start < 0 {
        start = 0;
    }
    if start > stop || start >= len {
        return None;
    }
    if stop >= len {
        stop = len - 1;
    }
    Some((start as usize, stop as usize))
}
