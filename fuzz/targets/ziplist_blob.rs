#![no_main]

use cachedb::ZipList;
use libfuzzer_sys::fuzz_target;

// Loading arbitrary bytes never panics, and anything accepted can be walked
// in both directions.
fuzz_target!(|data: &[u8]| {
    let Ok(zl) = ZipList::from_blob(data) else {
        return;
    };

    let forward = zl.iter().count();
    let mut backward = 0;
    let mut p = zl.tail();
    while let Some(pos) = p {
        assert!(zl.get(pos).is_some());
        backward += 1;
        p = zl.prev(pos);
    }
    assert_eq!(forward, backward);
    assert_eq!(forward, zl.len());
});
