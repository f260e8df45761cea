//! Trie write and read path benchmarks.
//!
//! Measures the three operations a state database leans on: bulk key
//! insertion, point lookups against a populated trie, and delete-heavy
//! churn with its collapse work. All inputs come from a seeded RNG so
//! runs are comparable.
//!
//! ```bash
//! cargo bench --bench trie
//! ```

use criterion::{criterion_group, criterion_main, Criterion};
use ptrie::{MemStore, Trie};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::collections::HashSet;
use std::hint::black_box;

/// Generates `n` unique random key-value pairs.
fn gen_pairs(n: usize, rng: &mut StdRng) -> Vec<([u8; 32], Vec<u8>)> {
    let mut used = HashSet::new();
    let mut pairs = Vec::with_capacity(n);
    while pairs.len() < n {
        let key: [u8; 32] = rng.gen();
        if used.insert(key) {
            pairs.push((key, rng.gen::<[u8; 24]>().to_vec()));
        }
    }
    pairs
}

fn benchmark_trie_ops(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);

    // BENCHMARK 1: bulk insertion of 1k fresh keys into an empty trie.
    // Dominated by node splits and per-write path re-hashing.
    c.bench_function("trie upsert 1k keys", |b| {
        b.iter_batched(
            || gen_pairs(1_000, &mut rng),
            |pairs| {
                let store = MemStore::new();
                let mut trie = Trie::empty(&store);
                for (key, value) in &pairs {
                    trie.upsert(key, value).unwrap();
                }
                black_box(trie.root_hash())
            },
            criterion::BatchSize::SmallInput,
        );
    });

    // BENCHMARK 2: point lookups over a populated trie.
    // Pure descend; no writes, no re-hashing.
    let pairs = gen_pairs(1_000, &mut rng);
    let store = MemStore::new();
    let mut trie = Trie::empty(&store);
    for (key, value) in &pairs {
        trie.upsert(key, value).unwrap();
    }
    let root = trie.root_hash();
    c.bench_function("trie get 1k keys", |b| {
        b.iter(|| {
            for (key, _) in &pairs {
                black_box(trie.get(key).unwrap());
            }
        });
    });

    // BENCHMARK 3: delete half of the populated trie.
    // Exercises branch trimming and the collapse of degenerate shapes.
    c.bench_function("trie delete 500 of 1k keys", |b| {
        b.iter_batched(
            || store.clone(),
            |churn_store| {
                let mut churn = Trie::new(&churn_store, root, 32);
                for (key, _) in pairs.iter().step_by(2) {
                    churn.delete(key).unwrap();
                }
                black_box(churn.root_hash())
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, benchmark_trie_ops);
criterion_main!(benches);
