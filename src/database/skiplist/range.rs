use std::cmp::Ordering;

use crate::{database::sds::Sds, error::RangeError};

/// Score interval with optionally exclusive ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreRange {
    pub min: f64,
    pub max: f64,
    pub min_ex: bool,
    pub max_ex: bool,
}

/// One end of a lexicographic range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexBound {
    /// `-`: below every member.
    NegInf,
    /// `+`: above every member.
    PosInf,
    /// `[x`
    Inclusive(Sds),
    /// `(x`
    Exclusive(Sds),
}

/// Lexicographic interval over member bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexRange {
    pub min: LexBound,
    pub max: LexBound,
}

////////////////////////////////////////////////////////////////////////////////
// Inherent methods
////////////////////////////////////////////////////////////////////////////////

impl ScoreRange {
    /// Closed interval `[min, max]`.
    pub fn inclusive(
        min: f64,
        max: f64,
    ) -> Self {
        ScoreRange {
            min,
            max,
            min_ex: false,
            max_ex: false,
        }
    }

    /// Everything from `-inf` to `+inf`.
    pub fn all() -> Self {
        Self::inclusive(f64::NEG_INFINITY, f64::INFINITY)
    }

    /// Parses `min`/`max` arguments: a float, optionally prefixed with `(`
    /// for an exclusive end. `inf`, `+inf` and `-inf` are accepted.
    pub fn parse(
        min: &[u8],
        max: &[u8],
    ) -> Result<Self, RangeError> {
        let (min, min_ex) = parse_score_bound(min)?;
        let (max, max_ex) = parse_score_bound(max)?;
        Ok(ScoreRange {
            min,
            max,
            min_ex,
            max_ex,
        })
    }

    #[inline]
    pub fn value_gte_min(
        &self,
        value: f64,
    ) -> bool {
        if self.min_ex {
            value > self.min
        } else {
            value >= self.min
        }
    }

    #[inline]
    pub fn value_lte_max(
        &self,
        value: f64,
    ) -> bool {
        if self.max_ex {
            value < self.max
        } else {
            value <= self.max
        }
    }

    pub fn contains(
        &self,
        value: f64,
    ) -> bool {
        self.value_gte_min(value) && self.value_lte_max(value)
    }

    /// Whether no score can fall inside the range.
    pub fn is_empty(&self) -> bool {
        self.min > self.max || (self.min == self.max && (self.min_ex || self.max_ex))
    }
}

impl LexBound {
    /// Parses `-`, `+`, `[member` or `(member`.
    pub fn parse(item: &[u8]) -> Result<Self, RangeError> {
        match item.split_first() {
            Some((b'-', [])) => Ok(LexBound::NegInf),
            Some((b'+', [])) => Ok(LexBound::PosInf),
            Some((b'[', rest)) => Ok(LexBound::Inclusive(Sds::new(rest))),
            Some((b'(', rest)) => Ok(LexBound::Exclusive(Sds::new(rest))),
            _ => Err(RangeError::InvalidLexBound(
                String::from_utf8_lossy(item).into_owned(),
            )),
        }
    }

    /// Orders two bounds by position, ignoring inclusiveness.
    fn cmp_position(
        &self,
        other: &LexBound,
    ) -> Ordering {
        use LexBound::*;
        match (self, other) {
            (NegInf, NegInf) | (PosInf, PosInf) => Ordering::Equal,
            (NegInf, _) | (_, PosInf) => Ordering::Less,
            (PosInf, _) | (_, NegInf) => Ordering::Greater,
            (Inclusive(a) | Exclusive(a), Inclusive(b) | Exclusive(b)) => a.cmp(b),
        }
    }

    fn is_exclusive(&self) -> bool {
        matches!(self, LexBound::Exclusive(_))
    }
}

impl LexRange {
    pub fn new(
        min: LexBound,
        max: LexBound,
    ) -> Self {
        LexRange { min, max }
    }

    pub fn parse(
        min: &[u8],
        max: &[u8],
    ) -> Result<Self, RangeError> {
        Ok(LexRange {
            min: LexBound::parse(min)?,
            max: LexBound::parse(max)?,
        })
    }

    pub fn value_gte_min(
        &self,
        value: &[u8],
    ) -> bool {
        match &self.min {
            LexBound::NegInf => true,
            LexBound::PosInf => false,
            LexBound::Inclusive(m) => value >= m.as_bytes(),
            LexBound::Exclusive(m) => value > m.as_bytes(),
        }
    }

    pub fn value_lte_max(
        &self,
        value: &[u8],
    ) -> bool {
        match &self.max {
            LexBound::PosInf => true,
            LexBound::NegInf => false,
            LexBound::Inclusive(m) => value <= m.as_bytes(),
            LexBound::Exclusive(m) => value < m.as_bytes(),
        }
    }

    pub fn contains(
        &self,
        value: &[u8],
    ) -> bool {
        self.value_gte_min(value) && self.value_lte_max(value)
    }

    /// Whether no member can fall inside the range.
    pub fn is_empty(&self) -> bool {
        match self.min.cmp_position(&self.max) {
            Ordering::Greater => true,
            Ordering::Equal => self.min.is_exclusive() || self.max.is_exclusive(),
            Ordering::Less => false,
        }
    }
}

fn parse_score_bound(item: &[u8]) -> Result<(f64, bool), RangeError> {
    let (text, exclusive) = match item.split_first() {
        Some((b'(', rest)) => (rest, true),
        _ => (item, false),
    };
    let invalid = || RangeError::InvalidScore(String::from_utf8_lossy(item).into_owned());
    let value: f64 = std::str::from_utf8(text)
        .map_err(|_| invalid())?
        .parse()
        .map_err(|_| invalid())?;
    if value.is_nan() {
        return Err(invalid());
    }
    Ok((value, exclusive))
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(b"1", b"2", 1.0, 2.0, false, false)]
    #[case(b"(1", b"(2.5", 1.0, 2.5, true, true)]
    #[case(b"-inf", b"+inf", f64::NEG_INFINITY, f64::INFINITY, false, false)]
    #[case(b"(-inf", b"inf", f64::NEG_INFINITY, f64::INFINITY, true, false)]
    fn test_parse_score_range(
        #[case] min: &[u8],
        #[case] max: &[u8],
        #[case] lo: f64,
        #[case] hi: f64,
        #[case] lo_ex: bool,
        #[case] hi_ex: bool,
    ) {
        let r = ScoreRange::parse(min, max).unwrap();
        assert_eq!(r.min, lo);
        assert_eq!(r.max, hi);
        assert_eq!(r.min_ex, lo_ex);
        assert_eq!(r.max_ex, hi_ex);
    }

    #[rstest]
    #[case(b"abc")]
    #[case(b"nan")]
    #[case(b"(")]
    #[case(b"")]
    fn test_parse_score_rejects(#[case] bad: &[u8]) {
        assert!(matches!(
            ScoreRange::parse(bad, b"1"),
            Err(RangeError::InvalidScore(_))
        ));
    }

    #[test]
    fn test_score_range_bounds() {
        let r = ScoreRange::parse(b"(1", b"3").unwrap();
        assert!(!r.contains(1.0));
        assert!(r.contains(1.5));
        assert!(r.contains(3.0));
        assert!(!r.contains(3.5));
        assert!(!r.is_empty());
        assert!(ScoreRange::parse(b"(2", b"2").unwrap().is_empty());
        assert!(ScoreRange::inclusive(3.0, 1.0).is_empty());
    }

    #[test]
    fn test_parse_lex_range() {
        let r = LexRange::parse(b"[b", b"(d").unwrap();
        assert!(!r.contains(b"a"));
        assert!(r.contains(b"b"));
        assert!(r.contains(b"cz"));
        assert!(!r.contains(b"d"));

        let all = LexRange::parse(b"-", b"+").unwrap();
        assert!(all.contains(b""));
        assert!(all.contains(b"zzz"));
        assert!(!all.is_empty());
    }

    #[test]
    fn test_lex_range_rejects_bare_member() {
        assert!(LexRange::parse(b"b", b"+").is_err());
        assert!(LexRange::parse(b"-", b"").is_err());
    }

    #[test]
    fn test_lex_range_emptiness() {
        assert!(LexRange::parse(b"+", b"-").unwrap().is_empty());
        assert!(LexRange::parse(b"[c", b"[a").unwrap().is_empty());
        assert!(LexRange::parse(b"(a", b"[a").unwrap().is_empty());
        assert!(!LexRange::parse(b"[a", b"[a").unwrap().is_empty());
    }
}
