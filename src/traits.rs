//! Define the trait for the host-provided node store.
use crate::node::NodeHash;
use std::fmt::Debug;

/// Content-addressed blob store holding the persisted trie nodes.
///
/// The trie refers to every node by the BLAKE2b-256 hash of its canonical
/// encoding and assumes nothing about the backing storage beyond point
/// reads and idempotent writes. Blobs are immutable once written: a
/// mutation writes new blobs under new hashes and republishes the root,
/// it never overwrites.
///
/// Implementations must provide atomic point reads so that concurrent
/// readers holding an older root can keep descending while a writer
/// appends new blobs.
pub trait NodeStore {
    /// Custom trait's error type.
    type Error: Debug + Send;

    /// Fetch the blob stored under `hash`, or `None` if the store has
    /// never seen it.
    fn get(&self, hash: &NodeHash) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Store `blob` under `hash`. Writing a hash that already exists is a
    /// no-op under content addressing.
    fn put(&self, hash: NodeHash, blob: Vec<u8>) -> Result<(), Self::Error>;

    /// Remove the blob stored under `hash`. Only used by the host's
    /// garbage collector; the trie itself never deletes blobs.
    fn delete(&self, _hash: &NodeHash) -> Result<(), Self::Error> {
        unimplemented!("delete is not implemented for this store")
    }
}
