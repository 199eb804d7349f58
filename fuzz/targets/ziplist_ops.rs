#![no_main]

use arbitrary::Arbitrary;
use cachedb::{database::ziplist::Where, ZipList};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Op {
    PushHead(Vec<u8>),
    PushTail(Vec<u8>),
    InsertAt(u16, Vec<u8>),
    DeleteAt(u16),
    DeleteRange(i16, u8),
}

fuzz_target!(|ops: Vec<Op>| {
    let mut zl = ZipList::new();
    let mut model: Vec<Vec<u8>> = Vec::new();

    for op in ops {
        match op {
            Op::PushHead(v) => {
                zl.push(&v, Where::Head);
                model.insert(0, v);
            }
            Op::PushTail(v) => {
                zl.push(&v, Where::Tail);
                model.push(v);
            }
            Op::InsertAt(i, v) if !model.is_empty() => {
                let i = i as usize % model.len();
                if let Some(p) = zl.index(i as isize) {
                    zl.insert_before(p, &v);
                    model.insert(i, v);
                }
            }
            Op::DeleteAt(i) if !model.is_empty() => {
                let i = i as usize % model.len();
                if let Some(p) = zl.index(i as isize) {
                    zl.delete(p);
                    model.remove(i);
                }
            }
            Op::DeleteRange(start, num) => {
                let len = model.len() as isize;
                let s = start as isize;
                let from = if s < 0 { len + s } else { s };
                if from >= 0 && from < len {
                    zl.delete_range(s, num as usize);
                    let end = (from as usize + num as usize).min(model.len());
                    model.drain(from as usize..end);
                }
            }
            _ => {}
        }
        assert!(zl.validate().is_ok());
    }

    assert_eq!(zl.len(), model.len());
    for (got, want) in zl.iter().zip(&model) {
        assert_eq!(got.to_bytes().as_ref(), &want[..]);
    }
});
