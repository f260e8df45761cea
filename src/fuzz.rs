//! End-to-end oracle testing for the trie.
//!
//! Replays sequences of upserts and deletes against both the trie and a
//! reference `BTreeMap`, checking three properties throughout:
//!
//! - **Lookup consistency**: every `get` agrees with the oracle, for
//!   present and absent keys alike.
//! - **Root canonicality**: after every block the root equals the root of
//!   a fresh trie rebuilt from the oracle's final contents, so the
//!   commitment depends only on what is stored, never on how it got there.
//! - **Shape health**: every walk exercises the descent-time invariant
//!   checks; a structural regression surfaces as an error, not as a wrong
//!   answer.
//!
//! Operations reference keys through a pool of pre-generated 32-byte keys
//! with clustered prefixes, so extension splits and branch collapses are
//! hit constantly rather than only on hash-collision luck.

use crate::constant::DEFAULT_KEY_SIZE;
#[cfg(test)]
use crate::{mem_store::MemStore, trie::trie::Trie};

/// A state modification applied during a simulated block.
///
/// The `u16` index is used modulo the pool size to reference a key.
#[derive(Debug, Clone)]
pub enum Operation {
    /// Inserts or updates the key at pool index with a new single-byte
    /// value seed.
    Upsert(u16, u8),
    /// Removes the key at pool index. Deleting an absent key must report
    /// `NotFound` and leave the root untouched.
    Delete(u16),
}

/// A batch of operation runs with lookups at the block boundary.
#[derive(Debug, Clone, Default)]
pub struct Block {
    /// Operation runs applied in order within the block.
    pub batches: Vec<Vec<Operation>>,
    /// Keys (as pool indices) probed after the block is applied.
    pub lookups: Vec<u16>,
}

/// Number of distinct keys the operations draw from.
pub const KEY_POOL_SIZE: usize = 512;

/// Deterministic pool key: a short clustered prefix over a three-symbol
/// alphabet, padded to the fixed key length with BLAKE2b output.
pub fn pool_key(index: usize) -> Vec<u8> {
    let mut key = vec![
        (index % 3) as u8,
        ((index / 3) % 3) as u8,
        ((index / 9) % 3) as u8,
    ];
    let filler = blake2_rfc::blake2b::blake2b(
        DEFAULT_KEY_SIZE - key.len(),
        &[],
        &(index as u32).to_le_bytes(),
    );
    key.extend_from_slice(filler.as_bytes());
    key
}

#[cfg(test)]
fn pool_value(index: usize, seed: u8) -> Vec<u8> {
    vec![seed, index as u8, (index >> 8) as u8]
}

/// Main end-to-end oracle test function.
#[cfg(test)]
pub fn e2e_fuzz_test(blocks: &[Block]) {
    use crate::trie::TrieError;
    use std::collections::BTreeMap;

    let key_pool: Vec<Vec<u8>> = (0..KEY_POOL_SIZE).map(pool_key).collect();

    let store = MemStore::new();
    let mut trie = Trie::empty(&store);
    let mut oracle: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();

    for block in blocks {
        for batch in &block.batches {
            for op in batch {
                match *op {
                    Operation::Upsert(index, seed) => {
                        let key = &key_pool[index as usize % key_pool.len()];
                        let value = pool_value(index as usize, seed);
                        trie.upsert(key, &value).expect("upsert failed");
                        oracle.insert(key.clone(), value);
                    }
                    Operation::Delete(index) => {
                        let key = &key_pool[index as usize % key_pool.len()];
                        let root_before = trie.root_hash();
                        match oracle.remove(key) {
                            Some(_) => {
                                trie.delete(key).expect("delete of a present key failed");
                            }
                            None => {
                                assert!(
                                    matches!(trie.delete(key), Err(TrieError::NotFound)),
                                    "delete of an absent key must report NotFound"
                                );
                                assert_eq!(
                                    trie.root_hash(),
                                    root_before,
                                    "failed delete must not move the root"
                                );
                            }
                        }
                    }
                }
            }
        }

        // Block boundary: probe the requested keys against the oracle.
        for &index in &block.lookups {
            let key = &key_pool[index as usize % key_pool.len()];
            match oracle.get(key) {
                Some(expected) => assert_eq!(
                    &trie.get(key).expect("lookup of a present key failed"),
                    expected,
                    "lookup mismatch for key {}",
                    hex::encode(key),
                ),
                None => assert!(
                    matches!(trie.get(key), Err(TrieError::NotFound)),
                    "absent key {} must report NotFound",
                    hex::encode(key),
                ),
            }
        }

        // Root canonicality: a trie rebuilt from the oracle's contents
        // alone must commit to the same root.
        let rebuild_store = MemStore::new();
        let mut rebuilt = Trie::empty(&rebuild_store);
        for (key, value) in &oracle {
            rebuilt.upsert(key, value).expect("rebuild upsert failed");
        }
        assert_eq!(
            rebuilt.root_hash(),
            trie.root_hash(),
            "root diverged from the rebuilt trie after {} entries",
            oracle.len()
        );
    }

    // Final sweep over the whole pool, present and absent keys alike.
    for key in &key_pool {
        match oracle.get(key) {
            Some(expected) => assert_eq!(&trie.get(key).expect("final lookup failed"), expected),
            None => assert!(matches!(trie.get(key), Err(TrieError::NotFound))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn empty_blocks() {
        e2e_fuzz_test(&[]);
    }

    #[test]
    fn single_upsert() {
        e2e_fuzz_test(&[Block {
            batches: vec![vec![Operation::Upsert(0, 42)]],
            lookups: vec![0, 1],
        }]);
    }

    #[test]
    fn upsert_then_delete() {
        e2e_fuzz_test(&[Block {
            batches: vec![
                vec![Operation::Upsert(0, 42)],
                vec![Operation::Delete(0), Operation::Delete(0)],
            ],
            lookups: vec![0],
        }]);
    }

    #[test]
    fn shared_prefix_churn() {
        // indices 0..27 cover every combination of the clustered prefix,
        // forcing splits and collapses around the same few extensions
        let fill: Vec<Operation> = (0..27).map(|i| Operation::Upsert(i, i as u8)).collect();
        let drain: Vec<Operation> = (0..27)
            .filter(|i| i % 2 == 0)
            .map(Operation::Delete)
            .collect();
        e2e_fuzz_test(&[
            Block {
                batches: vec![fill],
                lookups: (0..27).collect(),
            },
            Block {
                batches: vec![drain],
                lookups: (0..27).collect(),
            },
        ]);
    }

    #[test]
    fn random_ops() {
        let mut rng = StdRng::seed_from_u64(42);
        let blocks: Vec<Block> = (0..8)
            .map(|_| Block {
                batches: (0..4)
                    .map(|_| {
                        (0..64)
                            .map(|_| {
                                if rng.gen_bool(0.7) {
                                    Operation::Upsert(rng.gen(), rng.gen())
                                } else {
                                    Operation::Delete(rng.gen())
                                }
                            })
                            .collect()
                    })
                    .collect(),
                lookups: (0..32).map(|_| rng.gen()).collect(),
            })
            .collect();
        e2e_fuzz_test(&blocks);
    }
}
