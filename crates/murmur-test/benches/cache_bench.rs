//! Benchmarks for the dedup cache

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use murmur_cache::{CacheConfig, SeenCache};
use murmur_core::PacketId;

fn id(n: u128) -> PacketId {
    PacketId::from_bytes(n.to_le_bytes())
}

fn bench_add_churn(c: &mut Criterion) {
    let ids: Vec<PacketId> = (0..1024).map(id).collect();

    c.bench_function("cache_add_churn", |b| {
        let mut seen = SeenCache::new(CacheConfig::default());
        let mut i = 0usize;
        b.iter(|| {
            seen.add(black_box(ids[i % ids.len()]));
            i += 1;
        })
    });
}

fn bench_has_hit(c: &mut Criterion) {
    let mut seen = SeenCache::new(CacheConfig {
        max_age: Duration::from_secs(60),
        max_size: 100,
    });
    for n in 0..100 {
        seen.add(id(n));
    }

    c.bench_function("cache_has_hit", |b| {
        let mut n = 0u128;
        b.iter(|| {
            let hit = seen.has(black_box(id(n % 100)));
            n += 1;
            hit
        })
    });
}

fn bench_has_miss(c: &mut Criterion) {
    let mut seen = SeenCache::new(CacheConfig::default());
    for n in 0..100 {
        seen.add(id(n));
    }

    c.bench_function("cache_has_miss", |b| {
        b.iter(|| seen.has(black_box(id(u128::MAX))))
    });
}

criterion_group!(benches, bench_add_churn, bench_has_hit, bench_has_miss);
criterion_main!(benches);
