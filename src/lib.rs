#![doc = include_str!("../README.md")]

pub mod constant;
pub mod fuzz;
pub mod mem_store;
pub mod node;
pub mod traits;
pub mod trie;

pub use constant::{DEFAULT_KEY_SIZE, EMPTY_ROOT, HASH_SIZE, RADIX};
pub use mem_store::MemStore;
pub use node::{Branch, Descent, Extension, Leaf, Node, NodeHash};
pub use traits::NodeStore;
pub use trie::{trie::Trie, TrieError};
