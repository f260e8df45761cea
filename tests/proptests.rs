use proptest::prelude::*;
use std::collections::BTreeMap;

use ptrie::{Branch, MemStore, Node, NodeHash, Trie, TrieError, DEFAULT_KEY_SIZE};

/// Keys over a four-symbol alphabet: shared prefixes, splits and
/// collapses happen constantly instead of on collision luck.
fn arb_key() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(0u8..4, DEFAULT_KEY_SIZE)
}

fn arb_value() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(any::<u8>(), 0..24)
}

fn arb_entries(max: usize) -> impl Strategy<Value = BTreeMap<Vec<u8>, Vec<u8>>> {
    proptest::collection::btree_map(arb_key(), arb_value(), 0..max)
}

fn arb_hash() -> impl Strategy<Value = NodeHash> {
    any::<[u8; 32]>().prop_map(NodeHash::from)
}

fn arb_node() -> impl Strategy<Value = Node> {
    prop_oneof![
        (arb_value(), arb_value()).prop_map(|(path, value)| Node::leaf(path, value)),
        (proptest::collection::vec(any::<u8>(), 1..32), arb_hash())
            .prop_map(|(path, child)| Node::extension(path, child)),
        proptest::collection::btree_map(any::<u8>(), arb_hash(), 0..8).prop_map(|children| {
            let mut branch = Branch::default();
            for (slot, hash) in children {
                branch.slots[slot as usize] = Some(hash);
            }
            Node::Branch(branch)
        }),
    ]
}

fn build(store: &MemStore, entries: impl IntoIterator<Item = (Vec<u8>, Vec<u8>)>) -> NodeHash {
    let mut trie = Trie::empty(store);
    for (key, value) in entries {
        trie.upsert(&key, &value).unwrap();
    }
    trie.root_hash()
}

proptest! {
    /// The root commits to the contents, not to the insertion order.
    #[test]
    fn root_is_insertion_order_independent(
        (sorted, shuffled) in arb_entries(24).prop_flat_map(|entries| {
            let pairs: Vec<_> = entries.into_iter().collect();
            (Just(pairs.clone()), Just(pairs).prop_shuffle())
        })
    ) {
        let store_a = MemStore::new();
        let store_b = MemStore::new();
        prop_assert_eq!(build(&store_a, sorted), build(&store_b, shuffled));
    }

    /// Every inserted pair is readable back; a key outside the set is not.
    #[test]
    fn get_after_upsert(entries in arb_entries(24), probe in arb_key()) {
        let store = MemStore::new();
        let mut trie = Trie::empty(&store);
        for (key, value) in &entries {
            trie.upsert(key, value).unwrap();
            prop_assert_eq!(&trie.get(key).unwrap(), value);
        }
        for (key, value) in &entries {
            prop_assert_eq!(&trie.get(key).unwrap(), value);
        }
        if !entries.contains_key(&probe) {
            prop_assert_eq!(trie.get(&probe), Err(TrieError::NotFound));
        }
    }

    /// Upserting a fresh key and deleting it restores the previous root.
    #[test]
    fn delete_is_the_inverse_of_upsert(
        entries in arb_entries(16),
        extra in arb_key(),
        value in arb_value(),
    ) {
        prop_assume!(!entries.contains_key(&extra));
        let store = MemStore::new();
        let mut trie = Trie::empty(&store);
        for (key, value) in &entries {
            trie.upsert(key, value).unwrap();
        }
        let before = trie.root_hash();

        trie.upsert(&extra, &value).unwrap();
        let after = trie.delete(&extra).unwrap();
        prop_assert_eq!(after, before);
    }

    /// Deleting every key in any order drains the trie back to the sentinel.
    #[test]
    fn draining_restores_the_empty_root(
        (entries, order) in arb_entries(16).prop_flat_map(|entries| {
            let keys: Vec<_> = entries.keys().cloned().collect();
            (Just(entries), Just(keys).prop_shuffle())
        })
    ) {
        let store = MemStore::new();
        let mut trie = Trie::empty(&store);
        for (key, value) in &entries {
            trie.upsert(key, value).unwrap();
        }
        for key in &order {
            trie.delete(key).unwrap();
        }
        prop_assert!(trie.is_empty());
    }

    /// serialize ∘ deserialize is the identity, and equal nodes encode to
    /// identical bytes.
    #[test]
    fn node_codec_round_trips(node in arb_node()) {
        let blob = node.serialize();
        let decoded = Node::deserialize(&blob).unwrap();
        prop_assert_eq!(&decoded, &node);
        prop_assert_eq!(decoded.serialize(), blob);
        prop_assert_eq!(decoded.hash(), node.hash());
    }

    /// descend is a pure function of the node and the key.
    #[test]
    fn descend_is_deterministic(node in arb_node(), key in arb_key()) {
        prop_assert_eq!(node.descend(&key), node.descend(&key));
    }
}
