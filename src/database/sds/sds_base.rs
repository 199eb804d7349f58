use std::{
    borrow::Borrow,
    cmp::Ordering,
    fmt::{self, Display, Write as _},
    hash::{Hash, Hasher},
    ops::Deref,
    str::{from_utf8, Utf8Error},
};

use memchr::{memchr, memmem};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{database::oom, error::SdsError};

/// Above this length `make_room_for` stops doubling and adds a fixed step.
pub const SDS_MAX_PREALLOC: usize = 1024 * 1024;

/// Binary-safe growable byte buffer.
///
/// The allocation is always `len + free + 1` bytes: the payload, spare room
/// handed out by [`Sds::make_room_for`], and one zero byte right after the
/// payload so the content can be handed to code expecting a terminated
/// buffer.
pub struct Sds {
    buf: Vec<u8>,
    len: usize,
}

////////////////////////////////////////////////////////////////////////////////
// Inherent methods
////////////////////////////////////////////////////////////////////////////////

impl Sds {
    /// Copies `bytes` into a new buffer without spare room.
    pub fn new<B: AsRef<[u8]>>(bytes: B) -> Self {
        let bytes = bytes.as_ref();
        let mut buf = Vec::new();
        oom::reserve_or_abort(&mut buf, bytes.len() + 1);
        buf.extend_from_slice(bytes);
        buf.push(0);
        Sds {
            buf,
            len: bytes.len(),
        }
    }

    pub fn empty() -> Self {
        Sds::new(b"")
    }

    /// Takes ownership of `vec` as the payload.
    pub fn from_vec(mut vec: Vec<u8>) -> Self {
        let len = vec.len();
        oom::reserve_or_abort(&mut vec, 1);
        vec.push(0);
        Sds { buf: vec, len }
    }

    pub fn from_i64(value: i64) -> Self {
        let mut s = Sds::empty();
        // Writing into an sds never fails.
        let _ = write!(s, "{value}");
        s
    }

    pub fn from_u64(value: u64) -> Self {
        let mut s = Sds::empty();
        let _ = write!(s, "{value}");
        s
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Spare bytes available without reallocating.
    #[inline]
    pub fn avail(&self) -> usize {
        self.buf.len() - self.len - 1
    }

    /// Total bytes held: payload, spare room and terminator.
    #[inline]
    pub fn alloc_size(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Payload followed by the terminating zero byte.
    #[inline]
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        &self.buf[..=self.len]
    }

    pub fn as_str(&self) -> Result<&str, Utf8Error> {
        from_utf8(self.as_bytes())
    }

    /// Makes sure at least `extra` bytes can be appended without another
    /// allocation. Never shrinks.
    ///
    /// Below [`SDS_MAX_PREALLOC`] the target length is doubled, above it one
    /// more [`SDS_MAX_PREALLOC`] is added.
    pub fn make_room_for(
        &mut self,
        extra: usize,
    ) {
        if let Err(SdsError::AllocationFailed { requested }) = self.try_make_room_for(extra) {
            oom::handle(requested);
        }
    }

    /// Fallible variant of [`Sds::make_room_for`].
    pub fn try_make_room_for(
        &mut self,
        extra: usize,
    ) -> Result<(), SdsError> {
        if self.avail() >= extra {
            return Ok(());
        }
        let target = self
            .len
            .checked_add(extra)
            .ok_or(SdsError::AllocationFailed {
                requested: usize::MAX,
            })?;
        let new_len = if target < SDS_MAX_PREALLOC {
            target.saturating_mul(2)
        } else {
            target.saturating_add(SDS_MAX_PREALLOC)
        };
        let new_alloc = new_len.saturating_add(1);
        let additional = new_alloc - self.buf.len();
        self.buf
            .try_reserve_exact(additional)
            .map_err(|_| SdsError::AllocationFailed {
                requested: new_alloc,
            })?;
        self.buf.resize(new_alloc, 0);
        Ok(())
    }

    /// Drops the spare room so the allocation is exactly `len + 1`.
    pub fn remove_free_space(&mut self) {
        self.buf.truncate(self.len + 1);
        self.buf.shrink_to_fit();
    }

    /// Spare room past the payload, for filling before [`Sds::incr_len`].
    pub fn spare_capacity_mut(&mut self) -> &mut [u8] {
        let end = self.buf.len() - 1;
        &mut self.buf[self.len..end]
    }

    /// Commits `incr` bytes written into the spare room, or drops `-incr`
    /// bytes from the end when negative.
    ///
    /// # Panics
    /// If the adjustment leaves the allocated area.
    pub fn incr_len(
        &mut self,
        incr: isize,
    ) {
        if incr >= 0 {
            assert!(self.avail() >= incr as usize, "incr_len past allocation");
        } else {
            assert!(self.len >= incr.unsigned_abs(), "incr_len below zero");
        }
        self.len = self.len.wrapping_add_signed(incr);
        self.buf[self.len] = 0;
    }

    /// Sets the length to the position of the first zero byte, for buffers
    /// edited through [`Sds::spare_capacity_mut`] or by hand.
    pub fn update_len(&mut self) {
        if let Some(pos) = memchr(0, &self.buf[..self.len]) {
            self.len = pos;
        }
    }

    /// Empties the buffer keeping the allocation.
    pub fn clear(&mut self) {
        self.len = 0;
        self.buf[0] = 0;
    }

    /// Appends raw bytes.
    pub fn append(
        &mut self,
        bytes: &[u8],
    ) {
        self.make_room_for(bytes.len());
        self.buf[self.len..self.len + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();
        self.buf[self.len] = 0;
    }

    pub fn cat_sds(
        &mut self,
        other: &Sds,
    ) {
        self.append(other.as_bytes());
    }

    /// Grows to `target_len`, zero-filling the new bytes. Does nothing when
    /// already that long.
    pub fn grow_zero_filled(
        &mut self,
        target_len: usize,
    ) {
        if target_len <= self.len {
            return;
        }
        self.make_room_for(target_len - self.len);
        self.buf[self.len..=target_len].fill(0);
        self.len = target_len;
    }

    /// Replaces the contents with `bytes`.
    pub fn copy_from(
        &mut self,
        bytes: &[u8],
    ) {
        if self.buf.len() - 1 < bytes.len() {
            self.make_room_for(bytes.len() - self.len);
        }
        self.buf[..bytes.len()].copy_from_slice(bytes);
        self.len = bytes.len();
        self.buf[self.len] = 0;
    }

    /// Strips leading and trailing bytes contained in `charset`.
    pub fn trim(
        &mut self,
        charset: &[u8],
    ) {
        let bytes = self.as_bytes();
        let start = bytes
            .iter()
            .position(|b| !charset.contains(b))
            .unwrap_or(bytes.len());
        let end = bytes
            .iter()
            .rposition(|b| !charset.contains(b))
            .map_or(start, |p| p + 1);
        let new_len = end.saturating_sub(start);
        self.buf.copy_within(start..start + new_len, 0);
        self.len = new_len;
        self.buf[new_len] = 0;
    }

    /// Keeps only the inclusive range `start..=end`.
    ///
    /// Negative indices count from the end (`-1` is the last byte). Indices
    /// are clamped to the buffer; an empty or inverted range empties it.
    pub fn range(
        &mut self,
        start: isize,
        end: isize,
    ) {
        let len = self.len as isize;
        if len == 0 {
            return;
        }
        let mut start = if start < 0 { (len + start).max(0) } else { start };
        let mut end = if end < 0 { (len + end).max(0) } else { end };
        let mut new_len = if start > end { 0 } else { end - start + 1 };
        if new_len != 0 {
            if start >= len {
                new_len = 0;
            } else if end >= len {
                end = len - 1;
                new_len = if start > end { 0 } else { end - start + 1 };
            }
        } else {
            start = 0;
        }
        let (start, new_len) = (start as usize, new_len as usize);
        if start != 0 && new_len != 0 {
            self.buf.copy_within(start..start + new_len, 0);
        }
        self.len = new_len;
        self.buf[new_len] = 0;
    }

    pub fn to_lower(&mut self) {
        let len = self.len;
        self.buf[..len].make_ascii_lowercase();
    }

    pub fn to_upper(&mut self) {
        let len = self.len;
        self.buf[..len].make_ascii_uppercase();
    }

    /// Replaces every byte found in `from` with the byte at the same
    /// position in `to`. Extra bytes of the longer set are ignored.
    pub fn map_chars(
        &mut self,
        from: &[u8],
        to: &[u8],
    ) {
        let pairs = from.len().min(to.len());
        let len = self.len;
        for b in &mut self.buf[..len] {
            if let Some(i) = from[..pairs].iter().position(|f| f == b) {
                *b = to[i];
            }
        }
    }

    /// Splits `bytes` on every occurrence of `sep`. Empty input gives an
    /// empty vector.
    pub fn split_len(
        bytes: &[u8],
        sep: &[u8],
    ) -> Result<Vec<Sds>, SdsError> {
        if sep.is_empty() {
            return Err(SdsError::EmptySeparator);
        }
        if bytes.is_empty() {
            return Ok(Vec::new());
        }
        let mut parts = Vec::new();
        let mut start = 0;
        for pos in memmem::find_iter(bytes, sep) {
            if pos < start {
                continue;
            }
            parts.push(Sds::new(&bytes[start..pos]));
            start = pos + sep.len();
        }
        parts.push(Sds::new(&bytes[start..]));
        Ok(parts)
    }

    pub fn join<S: AsRef<[u8]>>(
        parts: &[S],
        sep: &[u8],
    ) -> Sds {
        let mut out = Sds::empty();
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                out.append(sep);
            }
            out.append(part.as_ref());
        }
        out
    }

    /// Appends a quoted, escaped representation of `bytes`, with
    /// non-printable bytes written as `\xHH`.
    pub fn cat_repr(
        &mut self,
        bytes: &[u8],
    ) {
        self.append(b"\"");
        for &b in bytes {
            match b {
                b'\\' | b'"' => self.append(&[b'\\', b]),
                b'\n' => self.append(b"\\n"),
                b'\r' => self.append(b"\\r"),
                b'\t' => self.append(b"\\t"),
                0x07 => self.append(b"\\a"),
                0x08 => self.append(b"\\b"),
                0x20..=0x7e => self.append(&[b]),
                _ => {
                    let _ = write!(self, "\\x{b:02x}");
                }
            }
        }
        self.append(b"\"");
    }

    #[cfg(debug_assertions)]
    pub fn debug_assert_invariants(&self) {
        assert!(self.len < self.buf.len(), "sds length past allocation");
        assert_eq!(self.buf[self.len], 0, "sds terminator missing");
    }

    #[cfg(not(debug_assertions))]
    #[inline(always)]
    pub fn debug_assert_invariants(&self) {}
}

////////////////////////////////////////////////////////////////////////////////
// Trait impls
////////////////////////////////////////////////////////////////////////////////

impl Default for Sds {
    fn default() -> Self {
        Sds::empty()
    }
}

/// A clone holds exactly the payload, like a fresh `Sds::new`.
impl Clone for Sds {
    fn clone(&self) -> Self {
        Sds::new(self.as_bytes())
    }
}

impl Deref for Sds {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.as_bytes()
    }
}

impl AsRef<[u8]> for Sds {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl Borrow<[u8]> for Sds {
    fn borrow(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl fmt::Write for Sds {
    fn write_str(
        &mut self,
        s: &str,
    ) -> fmt::Result {
        self.append(s.as_bytes());
        Ok(())
    }
}

impl Display for Sds {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(self.as_bytes()))
    }
}

impl fmt::Debug for Sds {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let mut repr = Sds::empty();
        repr.cat_repr(self.as_bytes());
        f.write_str(&String::from_utf8_lossy(repr.as_bytes()))
    }
}

impl Hash for Sds {
    fn hash<H: Hasher>(
        &self,
        state: &mut H,
    ) {
        self.as_bytes().hash(state);
    }
}

impl PartialEq for Sds {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for Sds {}

impl PartialEq<[u8]> for Sds {
    fn eq(
        &self,
        other: &[u8],
    ) -> bool {
        self.as_bytes() == other
    }
}

impl PartialEq<&str> for Sds {
    fn eq(
        &self,
        other: &&str,
    ) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl PartialOrd for Sds {
    fn partial_cmp(
        &self,
        other: &Self,
    ) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Byte-wise comparison; on a common prefix the shorter buffer sorts first.
impl Ord for Sds {
    fn cmp(
        &self,
        other: &Self,
    ) -> Ordering {
        self.as_bytes().cmp(other.as_bytes())
    }
}

impl From<&[u8]> for Sds {
    fn from(slice: &[u8]) -> Self {
        Sds::new(slice)
    }
}

impl From<&str> for Sds {
    fn from(s: &str) -> Self {
        Sds::new(s)
    }
}

impl From<String> for Sds {
    fn from(s: String) -> Self {
        Sds::from_vec(s.into_bytes())
    }
}

impl From<Vec<u8>> for Sds {
    fn from(v: Vec<u8>) -> Self {
        Sds::from_vec(v)
    }
}

impl From<i64> for Sds {
    fn from(v: i64) -> Self {
        Sds::from_i64(v)
    }
}

impl From<Sds> for Vec<u8> {
    fn from(mut s: Sds) -> Self {
        s.buf.truncate(s.len);
        s.buf
    }
}

impl Serialize for Sds {
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(self.as_bytes())
    }
}

impl<'de> Deserialize<'de> for Sds {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes = <Vec<u8>>::deserialize(deserializer)?;
        Ok(Sds::from_vec(bytes))
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
