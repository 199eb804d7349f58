use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use cachedb::{
    database::{
        intset::Encoding,
        skiplist::ScoreRange,
        ziplist::{Where, ZipValue},
    },
    Dict, IntSet, Sds, SkipList, ZipList,
};
use proptest::prelude::*;

fn min_width(v: i64) -> Encoding {
    Encoding::for_value(v)
}

/// Range endpoints: infinities, whole scores and the gaps between them.
fn score_bound() -> impl Strategy<Value = f64> {
    prop_oneof![
        Just(f64::NEG_INFINITY),
        Just(f64::INFINITY),
        (-120i32..120).prop_map(|v| f64::from(v) / 2.0),
    ]
}

/// Ziplist payloads, with plenty that take the integer encodings.
fn zip_payload() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        prop::collection::vec(any::<u8>(), 0..300),
        (0i64..=12).prop_map(|v| v.to_string().into_bytes()),
        (-(1i64 << 23)..(1i64 << 23)).prop_map(|v| v.to_string().into_bytes()),
        any::<i64>().prop_map(|v| v.to_string().into_bytes()),
    ]
}

proptest! {
    /// The table agrees with a `HashMap` after any mix of operations, with
    /// rehash steps interleaved.
    #[test]
    fn prop_dict_behaves_like_hashmap(ops in prop::collection::vec(
        (0u8..4, 0u16..300, any::<u32>()), 0..600
    )) {
        let mut dict = Dict::new();
        let mut map = HashMap::new();

        for (op, key, value) in ops {
            match op {
                0 => {
                    let added = dict.add(key, value).is_ok();
                    let fresh = !map.contains_key(&key);
                    if fresh {
                        map.insert(key, value);
                    }
                    prop_assert_eq!(added, fresh);
                }
                1 => {
                    prop_assert_eq!(dict.replace(key, value), map.insert(key, value).is_none());
                }
                2 => {
                    prop_assert_eq!(dict.delete(&key), map.remove(&key).is_some());
                }
                3 => {
                    dict.rehash(1);
                    prop_assert_eq!(dict.fetch_value(&key), map.get(&key));
                }
                _ => unreachable!(),
            }
            prop_assert_eq!(dict.len(), map.len());
        }

        let items: HashMap<_, _> = dict.iter().map(|(k, v)| (*k, *v)).collect();
        prop_assert_eq!(items, map);
    }
}

proptest! {
    /// A full scan reports every key, even when keys are inserted between
    /// calls.
    #[test]
    fn prop_scan_reports_every_key(
        keys in prop::collection::hash_set(any::<u32>(), 0..400),
        extra in prop::collection::vec(any::<u32>(), 0..400),
    ) {
        let mut dict = Dict::new();
        for k in &keys {
            dict.add(*k, ()).unwrap();
        }

        let mut seen = HashSet::new();
        let mut cursor = 0;
        let mut extra = extra.into_iter();
        loop {
            cursor = dict.scan(cursor, |k, _| {
                seen.insert(*k);
            });
            if let Some(k) = extra.next() {
                dict.replace(k, ());
            }
            dict.rehash(2);
            if cursor == 0 {
                break;
            }
        }
        prop_assert!(keys.is_subset(&seen));
    }
}

proptest! {
    /// An intset stays sorted, holds exactly the inserted values and uses
    /// the smallest width able to hold all of them.
    #[test]
    fn prop_intset_sorted_and_minimal(values in prop::collection::vec(any::<i64>(), 0..300)) {
        let mut set = IntSet::new();
        let mut model = BTreeSet::new();
        for v in &values {
            prop_assert_eq!(set.add(*v), model.insert(*v));
        }

        let got: Vec<i64> = set.iter().collect();
        let want: Vec<i64> = model.iter().copied().collect();
        prop_assert_eq!(got, want);

        let widest = values.iter().map(|v| min_width(*v)).max().unwrap_or(Encoding::Int16);
        prop_assert_eq!(set.encoding(), widest);

        let loaded = IntSet::from_blob(&set.to_blob()).unwrap();
        prop_assert_eq!(loaded, set);
    }
}

proptest! {
    /// Pushes, inserts and deletes keep every prevlen field consistent and
    /// the contents equal to a `Vec` model.
    #[test]
    fn prop_ziplist_matches_vec(ops in prop::collection::vec(
        (0u8..4, zip_payload(), any::<u16>()), 0..80
    )) {
        let mut zl = ZipList::new();
        let mut model: Vec<Vec<u8>> = Vec::new();

        for (op, value, at) in ops {
            match op {
                0 => {
                    zl.push(&value, Where::Tail);
                    model.push(value);
                }
                1 => {
                    zl.push(&value, Where::Head);
                    model.insert(0, value);
                }
                2 if !model.is_empty() => {
                    let i = at as usize % model.len();
                    let p = zl.index(i as isize).unwrap();
                    zl.insert_before(p, &value);
                    model.insert(i, value);
                }
                3 if !model.is_empty() => {
                    let i = at as usize % model.len();
                    let p = zl.index(i as isize).unwrap();
                    zl.delete(p);
                    model.remove(i);
                }
                _ => {}
            }
            prop_assert!(zl.validate().is_ok());
        }

        prop_assert_eq!(zl.len(), model.len());
        for (got, want) in zl.iter().zip(&model) {
            match got {
                ZipValue::Str(s) => prop_assert_eq!(s, &want[..]),
                ZipValue::Int(v) => {
                    let rendered = v.to_string();
                    prop_assert_eq!(rendered.as_bytes(), &want[..]);
                }
            }
        }
    }
}

proptest! {
    /// Ranks and score ranges agree with a linear scan of a sorted model.
    #[test]
    fn prop_skiplist_rank_and_range(
        entries in prop::collection::btree_map("[a-z]{1,6}", -50i32..50, 0..200),
        min in score_bound(),
        max in score_bound(),
        min_ex in any::<bool>(),
        max_ex in any::<bool>(),
        removals in prop::collection::vec(any::<prop::sample::Index>(), 0..30),
    ) {
        let mut zsl = SkipList::new();
        let mut scores: BTreeMap<String, f64> = BTreeMap::new();
        for (m, s) in &entries {
            zsl.insert(*s as f64, Sds::new(m));
            scores.insert(m.clone(), *s as f64);
        }
        if !scores.is_empty() {
            for idx in removals {
                let Some(m) = scores.keys().nth(idx.index(scores.len())).cloned() else {
                    continue;
                };
                let s = scores.remove(&m).unwrap();
                prop_assert!(zsl.delete(s, &Sds::new(&m)));
                if scores.is_empty() {
                    break;
                }
            }
        }
        prop_assert!(zsl.validate_invariants().is_ok());

        let mut sorted: Vec<(f64, Sds)> = scores.iter().map(|(m, s)| (*s, Sds::new(m))).collect();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        prop_assert_eq!(zsl.len(), sorted.len());

        for (i, (s, m)) in sorted.iter().enumerate() {
            prop_assert_eq!(zsl.rank_of(*s, m), Some(i as u64 + 1));
        }

        let range = ScoreRange { min, max, min_ex, max_ex };
        let want: Vec<_> = sorted
            .iter()
            .filter(|(s, _)| {
                let above = if min_ex { *s > min } else { *s >= min };
                let below = if max_ex { *s < max } else { *s <= max };
                above && below
            })
            .map(|(s, m)| (m.clone(), *s))
            .collect();

        let first = zsl.first_in_range(&range).and_then(|id| zsl.get(id));
        let last = zsl.last_in_range(&range).and_then(|id| zsl.get(id));
        prop_assert_eq!(first.map(|(m, s)| (m.clone(), s)), want.first().cloned());
        prop_assert_eq!(last.map(|(m, s)| (m.clone(), s)), want.last().cloned());

        let got: Vec<_> = zsl
            .iter_from(zsl.first_in_range(&range))
            .take_while(|(_, s)| range.value_lte_max(*s))
            .map(|(m, s)| (m.clone(), s))
            .collect();
        prop_assert_eq!(got, want);
    }
}
