use tracing::debug;

use super::{list::normalize_range, EncodingConfig, ObjectEncoding};
use crate::{
    database::{
        dict::Dict,
        sds::Sds,
        skiplist::{ScoreRange, SkipList},
        ziplist::{Where, ZipList},
    },
    error::RangeError,
};

/// Sorted set value.
///
/// The compact form is a ziplist of `member, score` pairs kept in
/// `(score, member)` order. The full form pairs a skip list, for order and
/// ranks, with a dict from member to score for O(1) lookups. Both hold the
/// same members.
#[derive(Debug)]
pub enum ZSetValue {
    Ziplist(ZipList),
    SkipList {
        dict: Dict<Sds, f64>,
        zsl: SkipList<Sds>,
    },
}

/// What [`ZSetValue::add`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZAddOutcome {
    Added,
    Updated,
    Unchanged,
}

impl ZSetValue {
    pub fn new() -> Self {
        ZSetValue::Ziplist(ZipList::new())
    }

    pub fn encoding(&self) -> ObjectEncoding {
        match self {
            ZSetValue::Ziplist(_) => ObjectEncoding::Ziplist,
            ZSetValue::SkipList { .. } => ObjectEncoding::Skiplist,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ZSetValue::Ziplist(zl) => zl.len() / 2,
            ZSetValue::SkipList { zsl, .. } => zsl.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inserts `member` or moves it to `score`.
    pub fn add(
        &mut self,
        score: f64,
        member: &[u8],
        cfg: &EncodingConfig,
    ) -> Result<ZAddOutcome, RangeError> {
        if score.is_nan() {
            return Err(RangeError::InvalidScore("nan".to_string()));
        }
        match self {
            ZSetValue::Ziplist(zl) => {
                if let Some((mp, cur)) = zzl_find(zl, member) {
                    if cur == score {
                        return Ok(ZAddOutcome::Unchanged);
                    }
                    zzl_delete(zl, mp);
                    zzl_insert(zl, member, score);
                    return Ok(ZAddOutcome::Updated);
                }
                zzl_insert(zl, member, score);
                if zl.len() / 2 > cfg.zset_max_ziplist_entries
                    || member.len() > cfg.zset_max_ziplist_value
                {
                    self.convert(cfg);
                }
                Ok(ZAddOutcome::Added)
            }
            ZSetValue::SkipList { dict, zsl } => {
                if let Some(&cur) = dict.get(member) {
                    if cur == score {
                        return Ok(ZAddOutcome::Unchanged);
                    }
                    zsl.update_score(cur, &Sds::new(member), score);
                    if let Some(v) = dict.get_mut(member) {
                        *v = score;
                    }
                    return Ok(ZAddOutcome::Updated);
                }
                let member = Sds::new(member);
                zsl.insert(score, member.clone());
                dict.replace(member, score);
                Ok(ZAddOutcome::Added)
            }
        }
    }

    /// Removes `member`. Returns `true` if it was present.
    pub fn remove(
        &mut self,
        member: &[u8],
    ) -> bool {
        match self {
            ZSetValue::Ziplist(zl) => match zzl_find(zl, member) {
                Some((mp, _)) => {
                    zzl_delete(zl, mp);
                    true
                }
                None => false,
            },
            ZSetValue::SkipList { dict, zsl } => match dict.delete_no_free(member) {
                Some((member, score)) => {
                    zsl.delete(score, &member);
                    true
                }
                None => false,
            },
        }
    }

    pub fn score(
        &self,
        member: &[u8],
    ) -> Option<f64> {
        match self {
            ZSetValue::Ziplist(zl) => zzl_find(zl, member).map(|(_, s)| s),
            ZSetValue::SkipList { dict, .. } => dict.get(member).copied(),
        }
    }

    /// 0-based rank of `member`, counted from the highest score when
    /// `reverse` is set.
    pub fn rank(
        &self,
        member: &[u8],
        reverse: bool,
    ) -> Option<u64> {
        let len = self.len() as u64;
        let rank = match self {
            ZSetValue::Ziplist(zl) => {
                let mut rank = 1u64;
                let mut p = zl.head();
                loop {
                    let mp = p?;
                    if zl.compare(mp, member) {
                        break rank;
                    }
                    p = zl.next(mp).and_then(|sp| zl.next(sp));
                    rank += 1;
                }
            }
            ZSetValue::SkipList { dict, zsl } => {
                let score = *dict.get(member)?;
                zsl.rank_of(score, &Sds::new(member))?
            }
        };
        Some(if reverse { len - rank } else { rank - 1 })
    }

    /// Pairs between ranks `start` and `stop` inclusive. Negative ranks
    /// count from the end.
    pub fn range_by_rank(
        &self,
        start: i64,
        stop: i64,
        reverse: bool,
    ) -> Vec<(Sds, f64)> {
        let len = self.len();
        let Some((start, stop)) = normalize_range(start, stop, len) else {
            return Vec::new();
        };
        let count = stop - start + 1;
        match self {
            ZSetValue::Ziplist(zl) => {
                let pairs = zzl_pairs(zl);
                if reverse {
                    pairs.into_iter().rev().skip(start).take(count).collect()
                } else {
                    pairs.into_iter().skip(start).take(count).collect()
                }
            }
            ZSetValue::SkipList { zsl, .. } => {
                if reverse {
                    let from = zsl.by_rank((len - start) as u64);
                    zsl.iter_rev_from(from)
                        .take(count)
                        .map(|(m, s)| (m.clone(), s))
                        .collect()
                } else {
                    let from = zsl.by_rank(start as u64 + 1);
                    zsl.iter_from(from)
                        .take(count)
                        .map(|(m, s)| (m.clone(), s))
                        .collect()
                }
            }
        }
    }

    /// Pairs whose score lies in `range`, in ascending order, or descending
    /// when `reverse` is set.
    pub fn range_by_score(
        &self,
        range: &ScoreRange,
        reverse: bool,
    ) -> Vec<(Sds, f64)> {
        match self {
            ZSetValue::Ziplist(zl) => {
                let mut out: Vec<_> = zzl_pairs(zl)
                    .into_iter()
                    .filter(|(_, s)| range.contains(*s))
                    .collect();
                if reverse {
                    out.reverse();
                }
                out
            }
            ZSetValue::SkipList { zsl, .. } => {
                if reverse {
                    zsl.iter_rev_from(zsl.last_in_range(range))
                        .take_while(|(_, s)| range.value_gte_min(*s))
                        .map(|(m, s)| (m.clone(), s))
                        .collect()
                } else {
                    zsl.iter_from(zsl.first_in_range(range))
                        .take_while(|(_, s)| range.value_lte_max(*s))
                        .map(|(m, s)| (m.clone(), s))
                        .collect()
                }
            }
        }
    }

    /// Every pair in ascending order.
    pub fn entries(&self) -> Vec<(Sds, f64)> {
        self.range_by_rank(0, -1, false)
    }

    /// Converts to the skip list form. No-op if already converted.
    pub fn convert(
        &mut self,
        cfg: &EncodingConfig,
    ) {
        if let ZSetValue::Ziplist(zl) = self {
            let mut dict = cfg.new_dict();
            let mut zsl = SkipList::new();
            for (member, score) in zzl_pairs(zl) {
                zsl.insert(score, member.clone());
                dict.replace(member, score);
            }
            debug!(len = zsl.len(), "sorted set converted to skiplist");
            *self = ZSetValue::SkipList { dict, zsl };
        }
    }
}

impl Default for ZSetValue {
    fn default() -> Self {
        Self::new()
    }
}

/// Textual form of a score as kept in the compact encoding. Integral
/// values are written without a fraction so they encode as integers.
pub fn format_score(score: f64) -> Sds {
    if score.is_nan() {
        Sds::new("nan")
    } else if score.is_infinite() {
        Sds::new(if score > 0.0 { "inf" } else { "-inf" })
    } else if score.fract() == 0.0 && score.abs() < 1e17 {
        Sds::from_i64(score as i64)
    } else if score.abs() >= 1e17 || score.abs() < 1e-5 {
        Sds::new(format!("{score:e}"))
    } else {
        Sds::new(score.to_string())
    }
}

fn zzl_score(
    zl: &ZipList,
    sp: usize,
) -> f64 {
    zl.get(sp).and_then(|v| v.as_f64()).unwrap_or(0.0)
}

/// Member offset and score of `member`.
fn zzl_find(
    zl: &ZipList,
    member: &[u8],
) -> Option<(usize, f64)> {
    let mut p = zl.head();
    while let Some(mp) = p {
        let sp = zl.next(mp)?;
        if zl.compare(mp, member) {
            return Some((mp, zzl_score(zl, sp)));
        }
        p = zl.next(sp);
    }
    None
}

fn zzl_insert(
    zl: &mut ZipList,
    member: &[u8],
    score: f64,
) {
    let encoded = format_score(score);
    let mut p = zl.head();
    while let Some(mp) = p {
        let Some(sp) = zl.next(mp) else { break };
        let s = zzl_score(zl, sp);
        let goes_before = s > score
            || (s == score
                && zl
                    .get(mp)
                    .is_some_and(|v| member < v.to_bytes().as_ref()));
        if goes_before {
            // Score first, so the member lands in front of it at `mp`.
            zl.insert_before(mp, encoded.as_bytes());
            zl.insert_before(mp, member);
            return;
        }
        p = zl.next(sp);
    }
    zl.push(member, Where::Tail);
    zl.push(encoded.as_bytes(), Where::Tail);
}

fn zzl_delete(
    zl: &mut ZipList,
    mp: usize,
) {
    zl.delete(mp);
    zl.delete(mp);
}

fn zzl_pairs(zl: &ZipList) -> Vec<(Sds, f64)> {
    let mut out = Vec::with_capacity(zl.len() / 2);
    let mut it = zl.iter();
    while let (Some(m), Some(s)) = (it.next(), it.next()) {
        out.push((m.to_sds(), s.as_f64().unwrap_or(0.0)));
    }
    out
}
