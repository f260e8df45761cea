#![no_main]

use libfuzzer_sys::fuzz_target;
use ptrie::fuzz::{pool_key, KEY_POOL_SIZE};
use ptrie::{MemStore, Trie, TrieError};
use std::collections::BTreeMap;

fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }

    let key_pool: Vec<Vec<u8>> = (0..KEY_POOL_SIZE).map(pool_key).collect();
    let store = MemStore::new();
    let mut trie = Trie::empty(&store);
    let mut oracle: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();

    // Each 3-byte chunk is one operation: two index bytes picking a pool
    // key and a selector byte choosing between upsert and delete.
    for chunk in data.chunks_exact(3) {
        let index = u16::from_le_bytes([chunk[0], chunk[1]]) as usize % key_pool.len();
        let key = &key_pool[index];
        if chunk[2] < 180 {
            let value = vec![chunk[2], chunk[0]];
            trie.upsert(key, &value).expect("upsert failed");
            oracle.insert(key.clone(), value);
        } else {
            let removed = oracle.remove(key);
            match trie.delete(key) {
                Ok(_) => assert!(removed.is_some(), "delete succeeded for an absent key"),
                Err(TrieError::NotFound) => {
                    assert!(removed.is_none(), "delete missed a present key")
                }
                Err(err) => panic!("delete failed: {err}"),
            }
        }
    }

    // Lookups agree with the oracle over the whole pool.
    for key in &key_pool {
        match oracle.get(key) {
            Some(expected) => assert_eq!(&trie.get(key).expect("lookup failed"), expected),
            None => assert!(matches!(trie.get(key), Err(TrieError::NotFound))),
        }
    }

    // The root commits to the contents alone: rebuilding from the oracle
    // must land on the same hash.
    let rebuild_store = MemStore::new();
    let mut rebuilt = Trie::empty(&rebuild_store);
    for (key, value) in &oracle {
        rebuilt.upsert(key, value).expect("rebuild failed");
    }
    assert_eq!(rebuilt.root_hash(), trie.root_hash(), "root is not canonical");
});
