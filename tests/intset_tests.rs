use cachedb::{
    database::intset::{Encoding, INTSET_HEADER_LEN},
    IntSet, IntSetError,
};
use rstest::rstest;

/// Adding a value that needs four bytes upgrades a two-byte set, and the
/// elements stay sorted.
#[test]
fn test_upgrade_keeps_order() {
    let mut s = IntSet::new();
    assert!(s.add(5));
    assert_eq!(s.encoding(), Encoding::Int16);
    assert!(s.add(-40_000));
    assert_eq!(s.encoding(), Encoding::Int32);
    assert_eq!(s.iter().collect::<Vec<_>>(), vec![-40_000, 5]);
    assert_eq!(s.blob_len(), INTSET_HEADER_LEN + 2 * 4);
}

/// The width is the smallest that fits the widest value ever added.
#[rstest]
#[case(&[1, 2, 3], Encoding::Int16)]
#[case(&[i16::MIN as i64, i16::MAX as i64], Encoding::Int16)]
#[case(&[i16::MAX as i64 + 1], Encoding::Int32)]
#[case(&[i16::MIN as i64 - 1, 0], Encoding::Int32)]
#[case(&[i32::MAX as i64 + 1], Encoding::Int64)]
#[case(&[i64::MIN, i64::MAX, 0], Encoding::Int64)]
fn test_minimal_width(
    #[case] values: &[i64],
    #[case] expected: Encoding,
) {
    let mut s = IntSet::new();
    for &v in values {
        s.add(v);
    }
    assert_eq!(s.encoding(), expected);
}

/// Removing the wide value does not narrow the set again.
#[test]
fn test_remove_never_downgrades() {
    let mut s = IntSet::new();
    s.add(1);
    s.add(i64::MAX);
    assert!(s.remove(i64::MAX));
    assert_eq!(s.encoding(), Encoding::Int64);
    assert!(!s.remove(i64::MAX));
    assert_eq!(s.len(), 1);
}

/// Duplicates are refused and lookups of values wider than the current
/// encoding are answered without a search.
#[test]
fn test_duplicates_and_wide_lookups() {
    let mut s = IntSet::new();
    for v in [3, 1, 2, 3, 1] {
        s.add(v);
    }
    assert_eq!(s.len(), 3);
    assert!(!s.add(2));
    assert!(!s.contains(1 << 40));
    assert!(!s.remove(1 << 40));
    assert_eq!((s.min(), s.max()), (Some(1), Some(3)));
}

/// Range iteration returns the inclusive slice of sorted values.
#[test]
fn test_iter_range() {
    let mut s = IntSet::new();
    for v in (0..100).map(|i| i * 3) {
        s.add(v);
    }
    let got: Vec<_> = s.iter_range(10, 20).collect();
    assert_eq!(got, vec![12, 15, 18]);
    assert_eq!(s.iter_range(20, 10).count(), 0);
    assert_eq!(s.iter_range(-50, 0).collect::<Vec<_>>(), vec![0]);
}

/// Serialized sets load back; blobs with a bad header are rejected.
#[test]
fn test_blob_validation() {
    let mut s = IntSet::new();
    for v in [70_000, -3, 12] {
        s.add(v);
    }
    let blob = s.to_blob();
    assert_eq!(&blob[..4], &4u32.to_le_bytes());
    assert_eq!(IntSet::from_blob(&blob).unwrap(), s);

    assert!(matches!(
        IntSet::from_blob(&blob[..5]),
        Err(IntSetError::Truncated { .. })
    ));
    let mut bad = blob.clone();
    bad[0] = 3;
    assert_eq!(IntSet::from_blob(&bad), Err(IntSetError::InvalidEncoding(3)));
}

/// Random picks always come from the set.
#[test]
fn test_random_member() {
    let mut s = IntSet::new();
    for v in [-7, 0, 7] {
        s.add(v);
    }
    let mut rng = fastrand::Rng::with_seed(11);
    for _ in 0..50 {
        assert!(s.contains(s.random(&mut rng).unwrap()));
    }
    assert_eq!(IntSet::new().random(&mut rng), None);
}
