#![no_main]

use cachedb::IntSet;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(set) = IntSet::from_blob(data) else {
        return;
    };

    let values: Vec<i64> = set.iter().collect();
    assert!(values.windows(2).all(|w| w[0] < w[1]));
    for v in &values {
        assert!(set.contains(*v));
    }
    assert_eq!(set.to_blob(), data);
});
