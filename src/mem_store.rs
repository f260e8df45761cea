//! In-memory storage backend for trie nodes.
//!
//! This module provides [`MemStore`], a simple in-memory backend that
//! implements the [`NodeStore`] trait. It keeps node blobs in a
//! [`HashMap`] keyed by content hash.
//!
//! # Note
//!
//! `MemStore` is **not** part of the trie logic. It is merely the
//! key-value storage the trie reads and writes through; the actual trie
//! algorithms live in the `node` and `trie` modules.
//!
//! # Usage
//!
//! `MemStore` is primarily intended for:
//! - Unit testing and integration testing
//! - Development and debugging
//! - Serving as a reference implementation of the storage trait
//!
//! For production use cases requiring persistence, use a database-backed
//! storage implementation instead of this in-memory version.
//!
//! # Thread Safety
//!
//! All operations are thread-safe through the use of [`RwLock`] for
//! interior mutability.
use crate::{node::NodeHash, traits::NodeStore};
use std::{collections::HashMap, sync::RwLock};

/// In-memory content-addressed store for node blobs.
///
/// Under content addressing the map is append-mostly: a given hash is
/// only ever associated with one blob, so re-inserting an existing hash
/// cannot change what readers observe.
#[derive(Debug, Default)]
pub struct MemStore {
    blobs: RwLock<HashMap<NodeHash, Vec<u8>>>,
}

impl Clone for MemStore {
    fn clone(&self) -> Self {
        Self {
            blobs: RwLock::new(self.blobs.read().expect("store lock poisoned").clone()),
        }
    }
}

impl MemStore {
    /// Creates a new empty `MemStore` instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blobs currently held.
    pub fn len(&self) -> usize {
        self.blobs.read().expect("store lock poisoned").len()
    }

    /// Whether the store holds no blobs at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a blob is stored under `hash`.
    pub fn contains(&self, hash: &NodeHash) -> bool {
        self.blobs
            .read()
            .expect("store lock poisoned")
            .contains_key(hash)
    }
}

impl NodeStore for MemStore {
    /// Error type for store operations.
    ///
    /// Uses static string references for simplicity in this in-memory
    /// implementation.
    type Error = &'static str;

    fn get(&self, hash: &NodeHash) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self
            .blobs
            .read()
            .map_err(|_| "store lock poisoned")?
            .get(hash)
            .cloned())
    }

    fn put(&self, hash: NodeHash, blob: Vec<u8>) -> Result<(), Self::Error> {
        self.blobs
            .write()
            .map_err(|_| "store lock poisoned")?
            .entry(hash)
            .or_insert(blob);
        Ok(())
    }

    fn delete(&self, hash: &NodeHash) -> Result<(), Self::Error> {
        self.blobs
            .write()
            .map_err(|_| "store lock poisoned")?
            .remove(hash);
        Ok(())
    }
}
