use std::fmt;

use crate::error::IntSetError;

/// Size of the serialized header: encoding width then element count, both
/// little-endian `u32`.
pub const INTSET_HEADER_LEN: usize = 8;

/// Width in bytes of every element of an [`IntSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Encoding {
    Int16 = 2,
    Int32 = 4,
    Int64 = 8,
}

/// Sorted set of distinct integers packed into one byte array.
///
/// All elements share one width, the smallest that held every value ever
/// inserted. Adding a value that needs more room rewrites the array at the
/// wider width; removing never narrows it again.
#[derive(Clone, PartialEq, Eq)]
pub struct IntSet {
    encoding: Encoding,
    contents: Vec<u8>,
}

/// Iterator over the elements in ascending order.
pub struct IntSetIter<'a> {
    set: &'a IntSet,
    front: usize,
    back: usize,
}

////////////////////////////////////////////////////////////////////////////////
// Inherent methods
////////////////////////////////////////////////////////////////////////////////

impl Encoding {
    /// Smallest encoding able to hold `v`.
    pub fn for_value(v: i64) -> Self {
        if v < i32::MIN as i64 || v > i32::MAX as i64 {
            Encoding::Int64
        } else if v < i16::MIN as i64 || v > i16::MAX as i64 {
            Encoding::Int32
        } else {
            Encoding::Int16
        }
    }

    #[inline]
    pub fn width(self) -> usize {
        self as usize
    }

    fn from_width(width: u32) -> Option<Self> {
        match width {
            2 => Some(Encoding::Int16),
            4 => Some(Encoding::Int32),
            8 => Some(Encoding::Int64),
            _ => None,
        }
    }

    #[inline]
    fn read(
        self,
        bytes: &[u8],
        pos: usize,
    ) -> i64 {
        let at = pos * self.width();
        match self {
            Encoding::Int16 => i16::from_le_bytes([bytes[at], bytes[at + 1]]) as i64,
            Encoding::Int32 => {
                let mut b = [0u8; 4];
                b.copy_from_slice(&bytes[at..at + 4]);
                i32::from_le_bytes(b) as i64
            }
            Encoding::Int64 => {
                let mut b = [0u8; 8];
                b.copy_from_slice(&bytes[at..at + 8]);
                i64::from_le_bytes(b)
            }
        }
    }

    #[inline]
    fn write(
        self,
        bytes: &mut [u8],
        pos: usize,
        value: i64,
    ) {
        let at = pos * self.width();
        match self {
            Encoding::Int16 => bytes[at..at + 2].copy_from_slice(&(value as i16).to_le_bytes()),
            Encoding::Int32 => bytes[at..at + 4].copy_from_slice(&(value as i32).to_le_bytes()),
            Encoding::Int64 => bytes[at..at + 8].copy_from_slice(&value.to_le_bytes()),
        }
    }
}

impl IntSet {
    pub fn new() -> Self {
        IntSet {
            encoding: Encoding::Int16,
            contents: Vec::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.contents.len() / self.encoding.width()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    #[inline]
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Size of the serialized form, header included.
    pub fn blob_len(&self) -> usize {
        INTSET_HEADER_LEN + self.contents.len()
    }

    /// Element at `pos`, `None` when out of range.
    pub fn get(
        &self,
        pos: usize,
    ) -> Option<i64> {
        (pos < self.len()).then(|| self.encoding.read(&self.contents, pos))
    }

    pub fn min(&self) -> Option<i64> {
        self.get(0)
    }

    pub fn max(&self) -> Option<i64> {
        self.len().checked_sub(1).and_then(|p| self.get(p))
    }

    /// Position of `value`: `Ok(pos)` when present, `Err(pos)` with the
    /// insertion point otherwise.
    pub fn search(
        &self,
        value: i64,
    ) -> Result<usize, usize> {
        let len = self.len();
        if len == 0 {
            return Err(0);
        }
        // Values outside the current bounds need no bisection.
        let enc = self.encoding;
        if value > enc.read(&self.contents, len - 1) {
            return Err(len);
        }
        if value < enc.read(&self.contents, 0) {
            return Err(0);
        }

        let (mut lo, mut hi) = (0usize, len);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let cur = enc.read(&self.contents, mid);
            if cur < value {
                lo = mid + 1;
            } else if cur > value {
                hi = mid;
            } else {
                return Ok(mid);
            }
        }
        Err(lo)
    }

    pub fn contains(
        &self,
        value: i64,
    ) -> bool {
        Encoding::for_value(value) <= self.encoding && self.search(value).is_ok()
    }

    /// Inserts `value`; returns `false` if it was already present.
    pub fn add(
        &mut self,
        value: i64,
    ) -> bool {
        if Encoding::for_value(value) > self.encoding {
            self.upgrade_and_add(value);
            return true;
        }
        let pos = match self.search(value) {
            Ok(_) => return false,
            Err(pos) => pos,
        };
        let w = self.encoding.width();
        let old_len = self.contents.len();
        self.contents.resize(old_len + w, 0);
        self.move_tail(pos, pos + 1, old_len);
        self.encoding.write(&mut self.contents, pos, value);
        true
    }

    /// Removes `value`; returns `false` if it was absent.
    pub fn remove(
        &mut self,
        value: i64,
    ) -> bool {
        if Encoding::for_value(value) > self.encoding {
            return false;
        }
        let Ok(pos) = self.search(value) else {
            return false;
        };
        let old_len = self.contents.len();
        self.move_tail(pos + 1, pos, old_len);
        self.contents.truncate(old_len - self.encoding.width());
        true
    }

    /// Uniformly chosen element.
    pub fn random(
        &self,
        rng: &mut fastrand::Rng,
    ) -> Option<i64> {
        if self.is_empty() {
            return None;
        }
        self.get(rng.usize(..self.len()))
    }

    pub fn iter(&self) -> IntSetIter<'_> {
        IntSetIter {
            set: self,
            front: 0,
            back: self.len(),
        }
    }

    /// Elements in the inclusive range `[min, max]`.
    pub fn iter_range(
        &self,
        min: i64,
        max: i64,
    ) -> IntSetIter<'_> {
        if min > max {
            return IntSetIter {
                set: self,
                front: 0,
                back: 0,
            };
        }
        let front = self.search(min).unwrap_or_else(|p| p);
        let back = match self.search(max) {
            Ok(p) => p + 1,
            Err(p) => p,
        };
        IntSetIter {
            set: self,
            front,
            back: back.max(front),
        }
    }

    /// Serialized form: header followed by the little-endian contents.
    pub fn to_blob(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.blob_len());
        out.extend_from_slice(&(self.encoding.width() as u32).to_le_bytes());
        out.extend_from_slice(&(self.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.contents);
        out
    }

    /// Loads a set written by [`IntSet::to_blob`], checking the header and
    /// the ordering of the elements.
    pub fn from_blob(blob: &[u8]) -> Result<Self, IntSetError> {
        if blob.len() < INTSET_HEADER_LEN {
            return Err(IntSetError::Truncated {
                expected: INTSET_HEADER_LEN,
                actual: blob.len(),
            });
        }
        let width = u32::from_le_bytes([blob[0], blob[1], blob[2], blob[3]]);
        let count = u32::from_le_bytes([blob[4], blob[5], blob[6], blob[7]]) as usize;
        let encoding = Encoding::from_width(width).ok_or(IntSetError::InvalidEncoding(width))?;
        let expected = INTSET_HEADER_LEN + count * encoding.width();
        if blob.len() != expected {
            return Err(IntSetError::Truncated {
                expected,
                actual: blob.len(),
            });
        }
        let set = IntSet {
            encoding,
            contents: blob[INTSET_HEADER_LEN..].to_vec(),
        };
        for pos in 1..set.len() {
            if encoding.read(&set.contents, pos - 1) >= encoding.read(&set.contents, pos) {
                return Err(IntSetError::NotSorted(pos));
            }
        }
        Ok(set)
    }

    /// Rewrites the array at the width needed by `value`, which lies
    /// outside the current range and so goes to one of the ends.
    fn upgrade_and_add(
        &mut self,
        value: i64,
    ) {
        let old = self.encoding;
        let new = Encoding::for_value(value);
        let len = self.len();
        let prepend = usize::from(value < 0);

        self.contents.resize((len + 1) * new.width(), 0);
        // Back to front, so wider writes never clobber unread narrow values.
        for pos in (0..len).rev() {
            let v = old.read(&self.contents, pos);
            new.write(&mut self.contents, pos + prepend, v);
        }
        self.encoding = new;
        let slot = if prepend == 1 { 0 } else { len };
        new.write(&mut self.contents, slot, value);
        tracing::trace!(from = ?old, to = ?new, len = len + 1, "intset upgraded");
    }

    /// Moves the elements from position `from` up to the end of the old
    /// contents so they start at position `to`.
    fn move_tail(
        &mut self,
        from: usize,
        to: usize,
        old_len: usize,
    ) {
        let w = self.encoding.width();
        let src = from * w;
        if src < old_len {
            self.contents.copy_within(src..old_len, to * w);
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Trait impls
////////////////////////////////////////////////////////////////////////////////

impl Default for IntSet {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for IntSet {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("IntSet")
            .field("encoding", &self.encoding)
            .field("values", &self.iter().collect::<Vec<_>>())
            .finish()
    }
}

impl FromIterator<i64> for IntSet {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        let mut set = IntSet::new();
        for v in iter {
            set.add(v);
        }
        set
    }
}

impl Iterator for IntSetIter<'_> {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        if self.front >= self.back {
            return None;
        }
        let v = self.set.encoding.read(&self.set.contents, self.front);
        self.front += 1;
        Some(v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.back - self.front;
        (n, Some(n))
    }
}

impl DoubleEndedIterator for IntSetIter<'_> {
    fn next_back(&mut self) -> Option<i64> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        Some(self.set.encoding.read(&self.set.contents, self.back))
    }
}

impl ExactSizeIterator for IntSetIter<'_> {}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
