use cachedb::{database::sds::SDS_MAX_PREALLOC, Sds, SdsError};

/// The payload is always followed by a zero byte, whatever operation last
/// touched it.
#[test]
fn test_terminator_after_every_operation() {
    let mut s = Sds::new("  hello world  ");
    s.debug_assert_invariants();
    s.trim(b" ");
    assert_eq!(s.as_bytes_with_nul(), b"hello world\0");
    s.range(0, 4);
    assert_eq!(s.as_bytes_with_nul(), b"hello\0");
    s.append(b", there");
    assert_eq!(s.as_bytes_with_nul(), b"hello, there\0");
    s.grow_zero_filled(15);
    assert_eq!(s.as_bytes_with_nul(), b"hello, there\0\0\0\0");
    s.clear();
    assert_eq!(s.as_bytes_with_nul(), b"\0");
}

/// Appending doubles the allocation while small, so repeated appends are
/// amortized.
#[test]
fn test_preallocation_growth() {
    let mut s = Sds::empty();
    s.append(b"abcd");
    assert_eq!(s.len(), 4);
    assert_eq!(s.avail(), 4);

    let mut reallocs = 0;
    let mut last = s.alloc_size();
    for _ in 0..10_000 {
        s.append(b"x");
        if s.alloc_size() != last {
            reallocs += 1;
            last = s.alloc_size();
        }
    }
    assert!(reallocs < 20, "{reallocs} reallocations");

    s.remove_free_space();
    assert_eq!(s.avail(), 0);
    assert_eq!(s.alloc_size(), s.len() + 1);
}

/// Past the preallocation limit the spare room stops doubling.
#[test]
fn test_large_growth_adds_fixed_room() {
    let mut s = Sds::empty();
    s.make_room_for(SDS_MAX_PREALLOC * 2);
    assert_eq!(s.avail(), SDS_MAX_PREALLOC * 3);
}

/// Bytes written into the spare room become visible through `incr_len`.
#[test]
fn test_spare_capacity_and_incr_len() {
    let mut s = Sds::new("key:");
    s.make_room_for(3);
    s.spare_capacity_mut()[..3].copy_from_slice(b"123");
    s.incr_len(3);
    assert_eq!(s, "key:123");
    s.incr_len(-4);
    assert_eq!(s, "key");
}

/// `update_len` cuts the payload at the first zero byte.
#[test]
fn test_update_len() {
    let mut s = Sds::new(b"abc\0def");
    assert_eq!(s.len(), 7);
    s.update_len();
    assert_eq!(s.len(), 3);
}

/// Ranges follow the usual negative index and clamping rules.
#[test]
fn test_range_rules() {
    let cases: [(isize, isize, &str); 6] = [
        (0, -1, "hello"),
        (1, 3, "ell"),
        (-3, -1, "llo"),
        (2, 100, "llo"),
        (3, 1, ""),
        (10, 20, ""),
    ];
    for (start, end, want) in cases {
        let mut s = Sds::new("hello");
        s.range(start, end);
        assert_eq!(s, want, "range({start}, {end})");
    }
}

/// Splitting on a separator and joining back gives the original bytes.
#[test]
fn test_split_and_join() {
    let parts = Sds::split_len(b"a--b----c", b"--").unwrap();
    let text: Vec<_> = parts.iter().map(|p| p.to_string()).collect();
    assert_eq!(text, ["a", "b", "", "c"]);
    assert_eq!(Sds::join(&parts, b"--"), "a--b----c");
    assert!(Sds::split_len(b"", b",").unwrap().is_empty());
    assert_eq!(
        Sds::split_len(b"a,b", b"").unwrap_err(),
        SdsError::EmptySeparator
    );
}

/// Non-printable bytes are escaped in the quoted representation.
#[test]
fn test_cat_repr() {
    let mut s = Sds::empty();
    s.cat_repr(b"a\"b\n\x01");
    assert_eq!(s, "\"a\\\"b\\n\\x01\"");
}

/// Case mapping and character translation only touch the payload.
#[test]
fn test_case_and_map_chars() {
    let mut s = Sds::new("Hello-World");
    s.to_upper();
    assert_eq!(s, "HELLO-WORLD");
    s.to_lower();
    s.map_chars(b"-o", b"_0");
    assert_eq!(s, "hell0_w0rld");
}

/// Binary content compares and orders by bytes, and integers format in
/// decimal.
#[test]
fn test_ordering_and_integers() {
    assert!(Sds::new(b"a\0") > Sds::new(b"a"));
    assert!(Sds::new("abc") < Sds::new("abd"));
    assert_eq!(Sds::from_i64(i64::MIN), "-9223372036854775808");
    assert_eq!(Sds::from_u64(u64::MAX), "18446744073709551615");
    let mut s = Sds::new("x");
    s.copy_from(b"a much longer replacement");
    assert_eq!(s, "a much longer replacement");
}
