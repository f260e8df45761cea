//! This module defines the constants that determine the shape and wire
//! format of the trie.
use alloy_primitives::{b256, B256};

/// Branch factor of the trie. One child slot per possible value of the
/// next key byte.
pub const RADIX: usize = 256;

/// Size in bytes of a node content hash (BLAKE2b-256).
pub const HASH_SIZE: usize = 32;

/// Default key length in bytes. Every key stored in a given trie instance
/// must have the length the instance was created with.
pub const DEFAULT_KEY_SIZE: usize = 32;

/// Largest supported key length. Path fragments are framed with a
/// one-byte length in the persisted encoding, so no fragment (and hence
/// no key) may exceed this.
pub const MAX_KEY_SIZE: usize = u8::MAX as usize;

/// Wire tag of a leaf node. Doubles as the `Ext` marker value for leaves.
pub const TAG_LEAF: u8 = 0;
/// Wire tag of an extension node. Doubles as the `Ext` marker value for
/// extensions.
pub const TAG_EXTENSION: u8 = 1;
/// Wire tag of a branch node.
pub const TAG_BRANCH: u8 = 2;

/// Root hash of the empty trie: the content hash of a branch with no
/// children and no value, whose hash pre-image is the empty byte string.
/// The empty trie is a sentinel; this blob is never written to the store.
/// Refer to the test case `empty_root_is_the_empty_branch_hash` below for
/// the derivation.
pub const EMPTY_ROOT: B256 =
    b256!("0e5751c026e543b2e8ab2eb06099daa1d1e5df47778f7787faab45cdf12fe3a8");
