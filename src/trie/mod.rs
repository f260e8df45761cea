//! This module implements the trie proper: the walk over stored nodes,
//! the insert splits, and the bottom-up collapse that re-hashes the
//! touched path and restores the canonical shape after every write.
use crate::node::NodeHash;
use thiserror::Error;

#[allow(clippy::module_inception)]
pub mod trie;

/// Error type for trie operations.
///
/// None of these are retried internally: a failed operation leaves the
/// published root untouched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrieError {
    /// The key is not present in the trie.
    #[error("key not found")]
    NotFound,
    /// The key's length does not match the trie instance.
    #[error("invalid key length: expected {expected}, got {got}")]
    InvalidKey { expected: usize, got: usize },
    /// A persisted blob failed to decode.
    #[error("malformed node blob: {0}")]
    Malformed(&'static str),
    /// A child hash referenced by a parent is missing from the store.
    #[error("missing node blob: {0}")]
    Corrupted(NodeHash),
    /// A structural invariant failed during a walk; the trie is assumed
    /// corrupted.
    #[error("structural invariant violated: {0}")]
    InvariantViolated(&'static str),
    /// A value was requested from a branch or extension.
    #[error("node does not store a value")]
    NotAValue,
    /// The node store reported a failure.
    #[error("node store failure: {0}")]
    Store(String),
}
