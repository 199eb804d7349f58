use std::hint::black_box;

use cachedb::{database::ziplist::Where, ZipList};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

fn filled(n: usize) -> ZipList {
    let mut zl = ZipList::new();
    for i in 0..n {
        if i % 2 == 0 {
            zl.push(i.to_string().as_bytes(), Where::Tail);
        } else {
            zl.push(format!("value-{i}").as_bytes(), Where::Tail);
        }
    }
    zl
}

fn bench_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("ziplist push");
    for n in [64usize, 512] {
        group.bench_with_input(BenchmarkId::new("tail", n), &n, |b, &n| {
            b.iter(|| filled(black_box(n)));
        });
        group.bench_with_input(BenchmarkId::new("head", n), &n, |b, &n| {
            b.iter(|| {
                let mut zl = ZipList::new();
                for _ in 0..n {
                    zl.push(black_box(b"item"), Where::Head);
                }
                zl
            });
        });
    }
    group.finish();
}

fn bench_find(c: &mut Criterion) {
    let zl = filled(512);
    let head = zl.head();
    c.bench_function("ziplist find last of 512", |b| {
        b.iter(|| {
            head.and_then(|p| zl.find(p, black_box(b"value-511"), 0))
        });
    });
}

fn bench_cascade(c: &mut Criterion) {
    c.bench_function("ziplist cascade update over 100 entries", |b| {
        let mut base = ZipList::new();
        for _ in 0..100 {
            base.push(&[b'n'; 250], Where::Tail);
        }
        b.iter(|| {
            let mut zl = base.clone();
            zl.push(black_box(&[b'L'; 300]), Where::Head);
            zl
        });
    });
}

criterion_group!(benches, bench_push, bench_find, bench_cascade);
criterion_main!(benches);
