//! Byte-level encoding of ziplist entries.
//!
//! Every entry is `[prevlen][encoding][payload]`:
//!
//! - `prevlen` is one byte when the previous entry is shorter than 254 bytes,
//!   otherwise `0xFE` followed by a little-endian `u32`;
//! - string encodings keep the length in the header: `00pppppp` up to 63
//!   bytes, `01pppppp qqqqqqqq` (big-endian 14 bits) up to 16383 bytes and
//!   `10000000` followed by a big-endian `u32` beyond;
//! - integer encodings are a single byte: `0xC0` i16, `0xD0` i32, `0xE0`
//!   i64, `0xF0` 24-bit, `0xFE` i8, and `0xF1..=0xFD` an immediate value
//!   0..=12 with no payload. Integer payloads are little-endian.

use crate::error::ZipListError;

/// Marks the end of the list.
pub const ZIP_END: u8 = 0xFF;
/// First byte of a five-byte prevlen field.
pub const ZIP_BIG_PREVLEN: u8 = 0xFE;

pub const ZIP_STR_06B: u8 = 0x00;
pub const ZIP_STR_14B: u8 = 0x40;
pub const ZIP_STR_32B: u8 = 0x80;
const ZIP_STR_MASK: u8 = 0xC0;

pub const ZIP_INT_16B: u8 = 0xC0;
pub const ZIP_INT_32B: u8 = 0xD0;
pub const ZIP_INT_64B: u8 = 0xE0;
pub const ZIP_INT_24B: u8 = 0xF0;
pub const ZIP_INT_8B: u8 = 0xFE;
pub const ZIP_INT_IMM_MIN: u8 = 0xF1;
pub const ZIP_INT_IMM_MAX: u8 = 0xFD;

const INT24_MIN: i64 = -(1 << 23);
const INT24_MAX: i64 = (1 << 23) - 1;

/// Strings this long or longer are never tried as integers.
const MAX_INT_CANDIDATE_LEN: usize = 32;

/// Decoded header of one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryHeader {
    /// Bytes used by the prevlen field (1 or 5).
    pub prevlen_size: usize,
    /// Raw length of the previous entry.
    pub prevlen: usize,
    /// Bytes used by the encoding field (1, 2 or 5).
    pub len_size: usize,
    /// Payload length in bytes.
    pub len: usize,
    /// Encoding byte; for strings only the two type bits are kept.
    pub encoding: u8,
}

impl EntryHeader {
    #[inline]
    pub fn header_size(&self) -> usize {
        self.prevlen_size + self.len_size
    }

    #[inline]
    pub fn raw_len(&self) -> usize {
        self.header_size() + self.len
    }

    #[inline]
    pub fn is_str(&self) -> bool {
        is_str_encoding(self.encoding)
    }
}

#[inline]
pub fn is_str_encoding(enc: u8) -> bool {
    enc & ZIP_STR_MASK != ZIP_STR_MASK
}

/// Bytes needed to store `len` as a prevlen field.
#[inline]
pub fn prevlen_size_for(len: usize) -> usize {
    if len < ZIP_BIG_PREVLEN as usize {
        1
    } else {
        5
    }
}

/// Encodes `len` in its minimal prevlen form.
pub fn encode_prevlen(len: usize) -> Vec<u8> {
    if len < ZIP_BIG_PREVLEN as usize {
        vec![len as u8]
    } else {
        encode_prevlen_large(len)
    }
}

/// Five-byte prevlen form, used even when one byte would do.
pub fn encode_prevlen_large(len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(5);
    out.push(ZIP_BIG_PREVLEN);
    out.extend_from_slice(&(len as u32).to_le_bytes());
    out
}

/// Reads the prevlen field at `p`: `(field size, value)`.
pub fn decode_prevlen(
    buf: &[u8],
    p: usize,
) -> Result<(usize, usize), ZipListError> {
    let first = *buf.get(p).ok_or(ZipListError::Truncated { offset: p })?;
    if first < ZIP_BIG_PREVLEN {
        return Ok((1, first as usize));
    }
    let raw = buf
        .get(p + 1..p + 5)
        .ok_or(ZipListError::Truncated { offset: p })?;
    let len = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize;
    Ok((5, len))
}

/// Payload size of an integer encoding.
pub fn int_payload_size(enc: u8) -> Option<usize> {
    match enc {
        ZIP_INT_8B => Some(1),
        ZIP_INT_16B => Some(2),
        ZIP_INT_24B => Some(3),
        ZIP_INT_32B => Some(4),
        ZIP_INT_64B => Some(8),
        ZIP_INT_IMM_MIN..=ZIP_INT_IMM_MAX => Some(0),
        _ => None,
    }
}

/// Reads the encoding field at `p`: `(encoding, field size, payload len)`.
pub fn decode_encoding(
    buf: &[u8],
    p: usize,
) -> Result<(u8, usize, usize), ZipListError> {
    let b = *buf.get(p).ok_or(ZipListError::Truncated { offset: p })?;
    if !is_str_encoding(b) {
        let size = int_payload_size(b).ok_or(ZipListError::Corrupted {
            offset: p,
            reason: "invalid integer encoding",
        })?;
        return Ok((b, 1, size));
    }
    match b & ZIP_STR_MASK {
        ZIP_STR_06B => Ok((ZIP_STR_06B, 1, (b & 0x3F) as usize)),
        ZIP_STR_14B => {
            let lo = *buf.get(p + 1).ok_or(ZipListError::Truncated { offset: p })?;
            Ok((ZIP_STR_14B, 2, (((b & 0x3F) as usize) << 8) | lo as usize))
        }
        _ => {
            if b != ZIP_STR_32B {
                return Err(ZipListError::Corrupted {
                    offset: p,
                    reason: "invalid string encoding",
                });
            }
            let raw = buf
                .get(p + 1..p + 5)
                .ok_or(ZipListError::Truncated { offset: p })?;
            let len = u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize;
            Ok((ZIP_STR_32B, 5, len))
        }
    }
}

/// Decodes the whole header of the entry starting at `p`.
pub fn decode_header(
    buf: &[u8],
    p: usize,
) -> Result<EntryHeader, ZipListError> {
    let (prevlen_size, prevlen) = decode_prevlen(buf, p)?;
    let (encoding, len_size, len) = decode_encoding(buf, p + prevlen_size)?;
    Ok(EntryHeader {
        prevlen_size,
        prevlen,
        len_size,
        len,
        encoding,
    })
}

/// Header bytes announcing a string of `len` bytes.
pub fn encode_str_header(len: usize) -> Vec<u8> {
    if len <= 0x3F {
        vec![ZIP_STR_06B | len as u8]
    } else if len <= 0x3FFF {
        vec![ZIP_STR_14B | ((len >> 8) as u8 & 0x3F), (len & 0xFF) as u8]
    } else {
        let mut out = vec![ZIP_STR_32B];
        out.extend_from_slice(&(len as u32).to_be_bytes());
        out
    }
}

/// Parses `s` as a canonical decimal `i64`: no sign other than a leading
/// `-`, no leading zeros, no whitespace.
pub fn parse_canonical_i64(s: &[u8]) -> Option<i64> {
    let text = std::str::from_utf8(s).ok()?;
    let v: i64 = text.parse().ok()?;
    (v.to_string().as_bytes() == s).then_some(v)
}

/// Smallest integer encoding for `v`.
pub fn int_encoding_for(v: i64) -> u8 {
    if (0..=12).contains(&v) {
        ZIP_INT_IMM_MIN + v as u8
    } else if i8::try_from(v).is_ok() {
        ZIP_INT_8B
    } else if i16::try_from(v).is_ok() {
        ZIP_INT_16B
    } else if (INT24_MIN..=INT24_MAX).contains(&v) {
        ZIP_INT_24B
    } else if i32::try_from(v).is_ok() {
        ZIP_INT_32B
    } else {
        ZIP_INT_64B
    }
}

/// Returns the integer and its encoding when `s` can be stored as one.
pub fn try_int_encoding(s: &[u8]) -> Option<(i64, u8)> {
    if s.is_empty() || s.len() >= MAX_INT_CANDIDATE_LEN {
        return None;
    }
    parse_canonical_i64(s).map(|v| (v, int_encoding_for(v)))
}

/// Payload bytes of `v` under `enc`.
pub fn encode_int(
    v: i64,
    enc: u8,
) -> Vec<u8> {
    match enc {
        ZIP_INT_8B => (v as i8).to_le_bytes().to_vec(),
        ZIP_INT_16B => (v as i16).to_le_bytes().to_vec(),
        ZIP_INT_24B => (v as i32).to_le_bytes()[..3].to_vec(),
        ZIP_INT_32B => (v as i32).to_le_bytes().to_vec(),
        ZIP_INT_64B => v.to_le_bytes().to_vec(),
        _ => Vec::new(),
    }
}

/// Reads an integer payload of encoding `enc` at `p`.
pub fn decode_int(
    buf: &[u8],
    p: usize,
    enc: u8,
) -> i64 {
    match enc {
        ZIP_INT_8B => buf[p] as i8 as i64,
        ZIP_INT_16B => i16::from_le_bytes([buf[p], buf[p + 1]]) as i64,
        // Place the three bytes high in an i32, then shift back to sign-extend.
        ZIP_INT_24B => (i32::from_le_bytes([0, buf[p], buf[p + 1], buf[p + 2]]) >> 8) as i64,
        ZIP_INT_32B => i32::from_le_bytes([buf[p], buf[p + 1], buf[p + 2], buf[p + 3]]) as i64,
        ZIP_INT_64B => {
            let mut b = [0u8; 8];
            b.copy_from_slice(&buf[p..p + 8]);
            i64::from_le_bytes(b)
        }
        imm => (imm & 0x0F) as i64 - 1,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(b"0", Some((0, 0xF1)))]
    #[case(b"12", Some((12, 0xFD)))]
    #[case(b"13", Some((13, ZIP_INT_8B)))]
    #[case(b"-128", Some((-128, ZIP_INT_8B)))]
    #[case(b"1000", Some((1000, ZIP_INT_16B)))]
    #[case(b"-8388608", Some((-8388608, ZIP_INT_24B)))]
    #[case(b"8388608", Some((8388608, ZIP_INT_32B)))]
    #[case(b"9223372036854775807", Some((i64::MAX, ZIP_INT_64B)))]
    #[case(b"-0", None)]
    #[case(b"+1", None)]
    #[case(b"007", None)]
    #[case(b" 1", None)]
    #[case(b"", None)]
    #[case(b"9223372036854775808", None)]
    fn test_try_int_encoding(
        #[case] input: &[u8],
        #[case] expected: Option<(i64, u8)>,
    ) {
        assert_eq!(try_int_encoding(input), expected);
    }

    #[test]
    fn test_long_numeric_strings_stay_strings() {
        let s = b"00000000000000000000000000000001";
        assert_eq!(s.len(), 32);
        assert_eq!(try_int_encoding(s), None);
    }

    #[test]
    fn test_int_payload_round_trip_each_width() {
        for v in [0, 7, 12, -1, 127, -32768, 70000, -8388608, 8388607, i32::MIN as i64, i64::MIN] {
            let enc = int_encoding_for(v);
            let mut buf = encode_int(v, enc);
            assert_eq!(buf.len(), int_payload_size(enc).unwrap());
            buf.push(ZIP_END);
            assert_eq!(decode_int(&buf, 0, enc), v, "value {v}");
        }
    }

    #[test]
    fn test_prevlen_forms() {
        assert_eq!(encode_prevlen(253), vec![253]);
        assert_eq!(encode_prevlen(254), vec![0xFE, 254, 0, 0, 0]);
        assert_eq!(encode_prevlen_large(3), vec![0xFE, 3, 0, 0, 0]);
        assert_eq!(decode_prevlen(&[0xFE, 0, 1, 0, 0], 0).unwrap(), (5, 256));
        assert!(decode_prevlen(&[0xFE, 0], 0).is_err());
    }

    #[test]
    fn test_str_headers() {
        assert_eq!(encode_str_header(63), vec![0x3F]);
        assert_eq!(encode_str_header(64), vec![0x40, 64]);
        assert_eq!(encode_str_header(16383), vec![0x7F, 0xFF]);
        assert_eq!(encode_str_header(16384), vec![0x80, 0, 0, 0x40, 0]);

        for len in [0usize, 63, 64, 300, 16383, 16384] {
            let hdr = encode_str_header(len);
            let (enc, size, decoded) = decode_encoding(&hdr, 0).unwrap();
            assert!(is_str_encoding(enc));
            assert_eq!((size, decoded), (hdr.len(), len));
        }
    }

    #[test]
    fn test_invalid_encoding_bytes() {
        assert!(matches!(
            decode_encoding(&[0x81], 0),
            Err(ZipListError::Corrupted { .. })
        ));
        assert!(matches!(
            decode_encoding(&[0xC5], 0),
            Err(ZipListError::Corrupted { .. })
        ));
    }
}
