//! `ZipList` stores a short sequence of strings and integers in one
//! contiguous byte buffer.
//!
//! Layout: `[zlbytes u32][zltail u32][zllen u16][entry ...][0xFF]`, header
//! fields little-endian. `zltail` is the offset of the last entry so that
//! pushes and pops at the tail need no walk. `zllen` saturates at
//! `u16::MAX`; past that the length is found by walking.
//!
//! Entries are addressed by their byte offset in the buffer. An offset is
//! only valid until the next mutation.

use std::{borrow::Cow, fmt};

use super::encoding::{
    decode_header, decode_int, encode_int, encode_prevlen, encode_prevlen_large,
    encode_str_header, int_payload_size, is_str_encoding, prevlen_size_for, try_int_encoding,
    EntryHeader, ZIP_END,
};
use crate::{
    database::{oom, sds::Sds},
    error::ZipListError,
};

/// `zlbytes` + `zltail` + `zllen`.
pub const ZIPLIST_HEADER_SIZE: usize = 10;

const ZLBYTES_OFFSET: usize = 0;
const ZLTAIL_OFFSET: usize = 4;
const ZLLEN_OFFSET: usize = 8;

/// Which end of the list a push goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Where {
    Head,
    Tail,
}

/// Value stored in an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZipValue<'a> {
    Str(&'a [u8]),
    Int(i64),
}

#[derive(Clone, PartialEq, Eq)]
pub struct ZipList {
    buf: Vec<u8>,
}

/// Iterator over entry values from head to tail.
pub struct ZipIter<'a> {
    zl: &'a ZipList,
    pos: Option<usize>,
}

////////////////////////////////////////////////////////////////////////////////
// Inherent methods
////////////////////////////////////////////////////////////////////////////////

impl<'a> ZipValue<'a> {
    /// Bytes of the value; integers are rendered in decimal.
    pub fn to_bytes(&self) -> Cow<'a, [u8]> {
        match *self {
            ZipValue::Str(s) => Cow::Borrowed(s),
            ZipValue::Int(v) => Cow::Owned(v.to_string().into_bytes()),
        }
    }

    pub fn to_sds(&self) -> Sds {
        match *self {
            ZipValue::Str(s) => Sds::new(s),
            ZipValue::Int(v) => Sds::from_i64(v),
        }
    }

    /// Numeric view of the value, parsing strings as floats.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            ZipValue::Int(v) => Some(v as f64),
            ZipValue::Str(s) => std::str::from_utf8(s).ok()?.parse().ok(),
        }
    }
}

impl ZipList {
    pub fn new() -> Self {
        let mut buf = vec![0u8; ZIPLIST_HEADER_SIZE + 1];
        buf[ZIPLIST_HEADER_SIZE] = ZIP_END;
        let mut zl = ZipList { buf };
        zl.set_total_bytes();
        zl.set_tail_offset(ZIPLIST_HEADER_SIZE);
        zl
    }

    /// Loads a list from its serialized bytes after checking every entry.
    pub fn from_blob(blob: &[u8]) -> Result<Self, ZipListError> {
        let zl = ZipList { buf: blob.to_vec() };
        zl.validate()?;
        Ok(zl)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Total size in bytes, header and end marker included.
    #[inline]
    pub fn blob_len(&self) -> usize {
        self.buf.len()
    }

    /// Number of entries. Walks the list when the header count saturated.
    pub fn len(&self) -> usize {
        let stored = self.header_count();
        if stored < u16::MAX {
            return stored as usize;
        }
        self.iter().count()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf[ZIPLIST_HEADER_SIZE] == ZIP_END
    }

    /// Offset of the first entry, `None` when empty.
    pub fn head(&self) -> Option<usize> {
        (!self.is_empty()).then_some(ZIPLIST_HEADER_SIZE)
    }

    /// Offset of the last entry, `None` when empty.
    pub fn tail(&self) -> Option<usize> {
        (!self.is_empty()).then(|| self.tail_offset())
    }

    /// Appends `value` at the chosen end.
    pub fn push(
        &mut self,
        value: &[u8],
        side: Where,
    ) {
        let p = match side {
            Where::Head => ZIPLIST_HEADER_SIZE,
            Where::Tail => self.end_offset(),
        };
        self.insert_at(p, value);
    }

    /// Inserts `value` in front of the entry at `pos`. Passing the offset
    /// right after the last entry appends.
    pub fn insert_before(
        &mut self,
        pos: usize,
        value: &[u8],
    ) {
        self.insert_at(pos, value);
    }

    /// Entry at `index`; negative values count from the tail, `-1` being
    /// the last entry.
    pub fn index(
        &self,
        index: isize,
    ) -> Option<usize> {
        if index < 0 {
            let mut remaining = index.unsigned_abs() - 1;
            let mut p = self.tail()?;
            while remaining > 0 {
                let prevlen = self.header(p).prevlen;
                if prevlen == 0 {
                    return None;
                }
                p -= prevlen;
                remaining -= 1;
            }
            Some(p)
        } else {
            let mut remaining = index as usize;
            let mut p = ZIPLIST_HEADER_SIZE;
            while remaining > 0 && self.buf[p] != ZIP_END {
                p += self.raw_len(p);
                remaining -= 1;
            }
            (self.buf[p] != ZIP_END).then_some(p)
        }
    }

    /// Entry following `pos`.
    pub fn next(
        &self,
        pos: usize,
    ) -> Option<usize> {
        if self.buf[pos] == ZIP_END {
            return None;
        }
        let p = pos + self.raw_len(pos);
        (self.buf[p] != ZIP_END).then_some(p)
    }

    /// Entry preceding `pos`. From the end marker this is the tail entry.
    pub fn prev(
        &self,
        pos: usize,
    ) -> Option<usize> {
        if self.buf[pos] == ZIP_END {
            return self.tail();
        }
        if pos == ZIPLIST_HEADER_SIZE {
            return None;
        }
        Some(pos - self.header(pos).prevlen)
    }

    /// Value stored at `pos`.
    pub fn get(
        &self,
        pos: usize,
    ) -> Option<ZipValue<'_>> {
        if self.buf.get(pos).map_or(true, |&b| b == ZIP_END) {
            return None;
        }
        let h = self.header(pos);
        let data = pos + h.header_size();
        Some(if h.is_str() {
            ZipValue::Str(&self.buf[data..data + h.len])
        } else {
            ZipValue::Int(decode_int(&self.buf, data, h.encoding))
        })
    }

    /// Removes the entry at `pos`. Returns the offset of the entry that took
    /// its place, `None` when it was the last one.
    pub fn delete(
        &mut self,
        pos: usize,
    ) -> Option<usize> {
        self.delete_at(pos, 1);
        (self.buf[pos] != ZIP_END).then_some(pos)
    }

    /// Removes up to `num` entries starting at `index`.
    pub fn delete_range(
        &mut self,
        index: isize,
        num: usize,
    ) {
        if let Some(p) = self.index(index) {
            self.delete_at(p, num);
        }
    }

    /// Whether the entry at `pos` holds `value`. Integer entries match the
    /// canonical decimal spelling of their value.
    pub fn compare(
        &self,
        pos: usize,
        value: &[u8],
    ) -> bool {
        match self.get(pos) {
            Some(ZipValue::Str(s)) => s == value,
            Some(ZipValue::Int(v)) => try_int_encoding(value).is_some_and(|(parsed, _)| parsed == v),
            None => false,
        }
    }

    /// First entry from `pos` onwards equal to `target`, comparing only
    /// every `skip + 1`-th entry.
    pub fn find(
        &self,
        pos: usize,
        target: &[u8],
        skip: usize,
    ) -> Option<usize> {
        // `None` until needed, then whether the target parses as an integer.
        let mut target_int: Option<Option<i64>> = None;
        let mut skip_left = 0;
        let mut p = pos;

        while self.buf[p] != ZIP_END {
            let h = self.header(p);
            let data = p + h.header_size();
            if skip_left == 0 {
                if h.is_str() {
                    if h.len == target.len() && &self.buf[data..data + h.len] == target {
                        return Some(p);
                    }
                } else {
                    let wanted = *target_int
                        .get_or_insert_with(|| try_int_encoding(target).map(|(v, _)| v));
                    if wanted == Some(decode_int(&self.buf, data, h.encoding)) {
                        return Some(p);
                    }
                }
                skip_left = skip;
            } else {
                skip_left -= 1;
            }
            p = data + h.len;
        }
        None
    }

    pub fn iter(&self) -> ZipIter<'_> {
        ZipIter {
            zl: self,
            pos: self.head(),
        }
    }

    /// Human readable dump of the header and every entry.
    pub fn repr(&self) -> String {
        use std::fmt::Write;

        let mut out = String::new();
        let _ = writeln!(
            out,
            "{{total bytes {}}} {{num entries {}}} {{tail offset {}}}",
            self.buf.len(),
            self.header_count(),
            self.tail_offset()
        );
        let mut pos = self.head();
        let mut index = 0;
        while let Some(p) = pos {
            let h = self.header(p);
            let value = self.get(p).map(|v| v.to_bytes().into_owned()).unwrap_or_default();
            let _ = writeln!(
                out,
                "{{ [{index}] addr {p}, hdr+entry len {}, hdr len {}, prevrawlen {}, \
                 prevrawlensize {}, payload {}, value {:?} }}",
                h.raw_len(),
                h.header_size(),
                h.prevlen,
                h.prevlen_size,
                h.len,
                String::from_utf8_lossy(&value)
            );
            index += 1;
            pos = self.next(p);
        }
        out.push_str("{end}");
        out
    }

    /// Walks the whole buffer checking the header, each entry's bounds and
    /// encoding, the prevlen chain and the end marker.
    pub fn validate(&self) -> Result<(), ZipListError> {
        let buf = &self.buf;
        if buf.len() < ZIPLIST_HEADER_SIZE + 1 {
            return Err(ZipListError::Truncated { offset: buf.len() });
        }
        if self.read_u32(ZLBYTES_OFFSET) as usize != buf.len() {
            return Err(ZipListError::Corrupted {
                offset: ZLBYTES_OFFSET,
                reason: "total bytes does not match buffer size",
            });
        }
        if buf[buf.len() - 1] != ZIP_END {
            return Err(ZipListError::Corrupted {
                offset: buf.len() - 1,
                reason: "missing end marker",
            });
        }

        let mut p = ZIPLIST_HEADER_SIZE;
        let mut prev_raw = 0;
        let mut last = ZIPLIST_HEADER_SIZE;
        let mut count = 0usize;
        while p < buf.len() && buf[p] != ZIP_END {
            let h = decode_header(buf, p)?;
            if h.prevlen != prev_raw {
                return Err(ZipListError::Corrupted {
                    offset: p,
                    reason: "prevlen does not match previous entry",
                });
            }
            let end = p + h.raw_len();
            if end >= buf.len() {
                return Err(ZipListError::Truncated { offset: p });
            }
            prev_raw = h.raw_len();
            last = p;
            count += 1;
            p = end;
        }
        if p != buf.len() - 1 {
            return Err(ZipListError::Corrupted {
                offset: p,
                reason: "end marker before end of buffer",
            });
        }
        if self.tail_offset() != last {
            return Err(ZipListError::Corrupted {
                offset: ZLTAIL_OFFSET,
                reason: "tail offset does not point at last entry",
            });
        }
        let stored = self.header_count() as usize;
        if stored < u16::MAX as usize && stored != count {
            return Err(ZipListError::Corrupted {
                offset: ZLLEN_OFFSET,
                reason: "entry count mismatch",
            });
        }
        Ok(())
    }

    ////////////////////////////////////////////////////////////////////////////
    // Header access
    ////////////////////////////////////////////////////////////////////////////

    fn read_u32(
        &self,
        at: usize,
    ) -> u32 {
        u32::from_le_bytes([
            self.buf[at],
            self.buf[at + 1],
            self.buf[at + 2],
            self.buf[at + 3],
        ])
    }

    fn write_u32(
        &mut self,
        at: usize,
        v: u32,
    ) {
        self.buf[at..at + 4].copy_from_slice(&v.to_le_bytes());
    }

    #[inline]
    fn tail_offset(&self) -> usize {
        self.read_u32(ZLTAIL_OFFSET) as usize
    }

    fn set_tail_offset(
        &mut self,
        offset: usize,
    ) {
        self.write_u32(ZLTAIL_OFFSET, offset as u32);
    }

    fn set_total_bytes(&mut self) {
        let len = self.buf.len() as u32;
        self.write_u32(ZLBYTES_OFFSET, len);
    }

    fn header_count(&self) -> u16 {
        u16::from_le_bytes([self.buf[ZLLEN_OFFSET], self.buf[ZLLEN_OFFSET + 1]])
    }

    /// Adjusts the stored count unless it already saturated.
    fn incr_count(
        &mut self,
        delta: isize,
    ) {
        let cur = self.header_count();
        if cur < u16::MAX {
            let next = (cur as isize + delta).clamp(0, u16::MAX as isize) as u16;
            self.buf[ZLLEN_OFFSET..ZLLEN_OFFSET + 2].copy_from_slice(&next.to_le_bytes());
        }
    }

    #[inline]
    fn end_offset(&self) -> usize {
        self.buf.len() - 1
    }

    ////////////////////////////////////////////////////////////////////////////
    // Entry access
    ////////////////////////////////////////////////////////////////////////////

    /// Header of an entry in a list whose structure is known to be valid.
    fn header(
        &self,
        p: usize,
    ) -> EntryHeader {
        match decode_header(&self.buf, p) {
            Ok(h) => h,
            Err(e) => unreachable!("ziplist structure broken: {e}"),
        }
    }

    #[inline]
    fn raw_len(
        &self,
        p: usize,
    ) -> usize {
        self.header(p).raw_len()
    }

    ////////////////////////////////////////////////////////////////////////////
    // Mutation
    ////////////////////////////////////////////////////////////////////////////

    fn insert_at(
        &mut self,
        p: usize,
        value: &[u8],
    ) {
        let at_end = self.buf[p] == ZIP_END;

        // Raw length of the entry that will precede the new one.
        let prevlen = if !at_end {
            self.header(p).prevlen
        } else if let Some(tail) = self.tail() {
            self.raw_len(tail)
        } else {
            0
        };

        let int_form = try_int_encoding(value);
        let mut entry = encode_prevlen(prevlen);
        match int_form {
            Some((v, enc)) => {
                entry.push(enc);
                entry.extend_from_slice(&encode_int(v, enc));
            }
            None => {
                entry.extend_from_slice(&encode_str_header(value.len()));
                entry.extend_from_slice(value);
            }
        }
        let reqlen = entry.len();

        // The next entry's prevlen must now describe the new entry.
        let mut force_large = false;
        let mut next_diff: isize = 0;
        let mut old_next_width = 0;
        if !at_end {
            old_next_width = self.header(p).prevlen_size;
            next_diff = prevlen_size_for(reqlen) as isize - old_next_width as isize;
            if next_diff == -4 && reqlen < 4 {
                next_diff = 0;
                force_large = true;
            }
        }

        let new_total = (self.buf.len() as isize + reqlen as isize + next_diff) as usize;
        if new_total > self.buf.len() {
            let additional = new_total - self.buf.len();
            oom::reserve_or_abort(&mut self.buf, additional);
        }

        if at_end {
            self.buf.splice(p..p, entry);
            self.set_tail_offset(p);
        } else {
            let next_field = if force_large {
                encode_prevlen_large(reqlen)
            } else {
                encode_prevlen(reqlen)
            };
            entry.extend_from_slice(&next_field);
            self.buf.splice(p..p + old_next_width, entry);

            let next = p + reqlen;
            let next_is_tail = self.buf[next + self.raw_len(next)] == ZIP_END;
            let mut tail = self.tail_offset() + reqlen;
            if !next_is_tail {
                tail = (tail as isize + next_diff) as usize;
            }
            self.set_tail_offset(tail);
        }
        self.set_total_bytes();

        if next_diff != 0 {
            self.cascade_update(p + reqlen);
        }
        self.incr_count(1);
    }

    /// Deletes up to `num` consecutive entries starting at `p`.
    fn delete_at(
        &mut self,
        p: usize,
        num: usize,
    ) {
        if self.buf[p] == ZIP_END {
            return;
        }
        let first = self.header(p);
        let mut q = p;
        let mut deleted = 0;
        while deleted < num && self.buf[q] != ZIP_END {
            q += self.raw_len(q);
            deleted += 1;
        }
        let total = q - p;
        if total == 0 {
            return;
        }

        let mut next_diff: isize = 0;
        if self.buf[q] != ZIP_END {
            // The surviving entry at `q` inherits the prevlen of the first
            // deleted one.
            let old_width = self.header(q).prevlen_size;
            let field = encode_prevlen(first.prevlen);
            next_diff = field.len() as isize - old_width as isize;

            let q_is_tail = self.buf[q + self.raw_len(q)] == ZIP_END;
            let mut tail = self.tail_offset() - total;
            if !q_is_tail {
                tail = (tail as isize + next_diff) as usize;
            }
            self.buf.splice(p..q + old_width, field);
            self.set_tail_offset(tail);
        } else {
            self.buf.drain(p..q);
            self.set_tail_offset(p - first.prevlen);
        }
        self.set_total_bytes();
        self.incr_count(-(deleted as isize));

        if next_diff != 0 {
            self.cascade_update(p);
        }
    }

    /// Propagates prevlen growth forward starting at the entry `p`, whose
    /// length just changed. Fields are only ever widened; a field wider than
    /// needed is rewritten in its large form.
    fn cascade_update(
        &mut self,
        mut p: usize,
    ) {
        while self.buf[p] != ZIP_END {
            let cur = self.header(p);
            let raw = cur.raw_len();
            let raw_size = prevlen_size_for(raw);
            let np = p + raw;
            if self.buf[np] == ZIP_END {
                break;
            }
            let next = self.header(np);
            if next.prevlen == raw {
                break;
            }

            if next.prevlen_size < raw_size {
                let extra = raw_size - next.prevlen_size;
                let tail = self.tail_offset();
                if tail != np {
                    self.set_tail_offset(tail + extra);
                }
                oom::reserve_or_abort(&mut self.buf, extra);
                self.buf
                    .splice(np..np + next.prevlen_size, encode_prevlen(raw));
                self.set_total_bytes();
                tracing::trace!(offset = np, extra, "ziplist prevlen widened");
                p = np;
            } else {
                let field = if next.prevlen_size > raw_size {
                    encode_prevlen_large(raw)
                } else {
                    encode_prevlen(raw)
                };
                self.buf[np..np + field.len()].copy_from_slice(&field);
                break;
            }
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Trait impls
////////////////////////////////////////////////////////////////////////////////

impl Default for ZipList {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ZipList {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a> Iterator for ZipIter<'a> {
    type Item = ZipValue<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let p = self.pos?;
        self.pos = self.zl.next(p);
        self.zl.get(p)
    }
}

impl<'a> IntoIterator for &'a ZipList {
    type Item = ZipValue<'a>;
    type IntoIter = ZipIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Whether the entry at `pos` is string encoded.
pub fn entry_is_str(
    zl: &ZipList,
    pos: usize,
) -> bool {
    is_str_encoding(zl.buf[pos + zl.header(pos).prevlen_size])
}

/// Payload size of the entry at `pos`.
pub fn entry_payload_len(
    zl: &ZipList,
    pos: usize,
) -> usize {
    let h = zl.header(pos);
    if h.is_str() {
        h.len
    } else {
        int_payload_size(h.encoding).unwrap_or(0)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
