//! Trie node variants and their canonical encoding.
//!
//! The trie uses three node shapes:
//! - Branch: 256 child slots (one per value of the next key byte)
//! - Extension: compressed path fragment pointing to a single child
//! - Leaf: residual path fragment carrying the caller's value
//!
//! Parents refer to children by content hash only. A node's hash is
//! BLAKE2b-256 over its hash pre-image, which is part of the
//! consensus-visible root and must never change; the persisted blob wraps
//! the same data in a length-framed layout so it can be decoded
//! unambiguously.

use crate::constant::{HASH_SIZE, RADIX, TAG_BRANCH, TAG_EXTENSION, TAG_LEAF};
use crate::trie::TrieError;
use alloy_primitives::B256;
use blake2_rfc::blake2b::Blake2b;
use tracing::debug;

/// Content hash identifying a persisted node blob.
pub type NodeHash = B256;

/// A branch node: one slot per possible next key byte, plus a value field
/// that is kept for wire-format compatibility but never populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    /// Child hashes, indexed by the next key byte. `None` is an empty slot.
    pub slots: [Option<NodeHash>; RADIX],
    /// Vestigial value field. Present in the encoding and the hash
    /// pre-image; a non-empty value observed during descent is an
    /// invariant violation.
    pub value: Vec<u8>,
}

impl Default for Branch {
    fn default() -> Self {
        Self {
            slots: [None; RADIX],
            value: Vec::new(),
        }
    }
}

impl Branch {
    /// Counts non-empty child slots.
    pub fn child_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Returns the slot index and child hash of the only occupied slot,
    /// if exactly one is occupied.
    pub fn single_child(&self) -> Option<(u8, NodeHash)> {
        let mut occupied = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.map(|hash| (i as u8, hash)));
        match (occupied.next(), occupied.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        }
    }
}

/// A leaf node: the unconsumed tail of the key and the stored value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaf {
    pub path: Vec<u8>,
    pub value: Vec<u8>,
}

/// An extension node: a compressed run of key bytes leading to a single
/// child, which is always a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    pub path: Vec<u8>,
    pub child: NodeHash,
}

/// One step of descent through a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Descent {
    /// The walk continues into `child` after consuming `consumed` key bytes.
    Continue { child: NodeHash, consumed: usize },
    /// The node is the leaf holding the key.
    Arrived,
    /// No entry lies on this path; the first `matched` bytes agree.
    /// Internal signal, consumed by the walker and never surfaced.
    Diverge { matched: usize },
}

/// A trie node (branch, extension, or leaf).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Branch(Branch),
    Leaf(Leaf),
    Extension(Extension),
}

impl Node {
    /// Builds a leaf node.
    pub fn leaf(path: Vec<u8>, value: Vec<u8>) -> Self {
        Node::Leaf(Leaf { path, value })
    }

    /// Builds an extension node.
    pub fn extension(path: Vec<u8>, child: NodeHash) -> Self {
        Node::Extension(Extension { path, child })
    }

    /// Computes the BLAKE2b-256 content hash of this node.
    ///
    /// The pre-image is the concatenation of the occupied child hashes in
    /// slot order plus the value for a branch, and the `Ext` marker, path
    /// and payload for a leaf or extension. It deliberately omits the
    /// framing bytes of [`Node::serialize`]; the pre-image is what the
    /// root commits to.
    pub fn hash(&self) -> NodeHash {
        let mut ctx = Blake2b::new(HASH_SIZE);
        match self {
            Node::Branch(branch) => {
                for slot in branch.slots.iter().flatten() {
                    ctx.update(slot.as_slice());
                }
                ctx.update(&branch.value);
            }
            Node::Leaf(leaf) => {
                ctx.update(&[TAG_LEAF]);
                ctx.update(&leaf.path);
                ctx.update(&leaf.value);
            }
            Node::Extension(ext) => {
                ctx.update(&[TAG_EXTENSION]);
                ctx.update(&ext.path);
                ctx.update(ext.child.as_slice());
            }
        }
        NodeHash::from_slice(ctx.finalize().as_bytes())
    }

    /// Serializes the node into its persisted blob.
    ///
    /// The first byte is the node type tag (0 leaf, 1 extension,
    /// 2 branch). Leaves and extensions repeat the tag as the `Ext`
    /// marker and frame their path with a one-byte length; branches
    /// write all 256 slots in index order, each as a one-byte length
    /// (0 or 32) followed by the hash bytes. The remainder is the value
    /// (leaf, branch) or the 32-byte child hash (extension).
    pub fn serialize(&self) -> Vec<u8> {
        match self {
            Node::Branch(branch) => {
                let mut out =
                    Vec::with_capacity(1 + RADIX + HASH_SIZE * branch.child_count());
                out.push(TAG_BRANCH);
                for slot in &branch.slots {
                    match slot {
                        Some(hash) => {
                            out.push(HASH_SIZE as u8);
                            out.extend_from_slice(hash.as_slice());
                        }
                        None => out.push(0),
                    }
                }
                out.extend_from_slice(&branch.value);
                out
            }
            Node::Leaf(leaf) => {
                let mut out = Vec::with_capacity(3 + leaf.path.len() + leaf.value.len());
                out.push(TAG_LEAF);
                out.push(TAG_LEAF);
                out.push(leaf.path.len() as u8);
                out.extend_from_slice(&leaf.path);
                out.extend_from_slice(&leaf.value);
                out
            }
            Node::Extension(ext) => {
                let mut out = Vec::with_capacity(3 + ext.path.len() + HASH_SIZE);
                out.push(TAG_EXTENSION);
                out.push(TAG_EXTENSION);
                out.push(ext.path.len() as u8);
                out.extend_from_slice(&ext.path);
                out.extend_from_slice(ext.child.as_slice());
                out
            }
        }
    }

    /// Decodes a persisted blob back into a node. Inverse of
    /// [`Node::serialize`].
    pub fn deserialize(blob: &[u8]) -> Result<Self, TrieError> {
        let (&tag, body) = blob
            .split_first()
            .ok_or(TrieError::Malformed("empty node blob"))?;
        match tag {
            TAG_LEAF | TAG_EXTENSION => {
                let (&ext, rest) = body
                    .split_first()
                    .ok_or(TrieError::Malformed("missing ext marker"))?;
                if ext != tag {
                    return Err(TrieError::Malformed("ext marker disagrees with type tag"));
                }
                let (&path_len, rest) = rest
                    .split_first()
                    .ok_or(TrieError::Malformed("missing path length"))?;
                if rest.len() < path_len as usize {
                    return Err(TrieError::Malformed("truncated path fragment"));
                }
                let (path, payload) = rest.split_at(path_len as usize);
                if tag == TAG_LEAF {
                    Ok(Node::leaf(path.to_vec(), payload.to_vec()))
                } else if payload.len() == HASH_SIZE {
                    Ok(Node::extension(path.to_vec(), NodeHash::from_slice(payload)))
                } else {
                    Err(TrieError::Malformed("extension child is not a 32-byte hash"))
                }
            }
            TAG_BRANCH => {
                let mut slots = [None; RADIX];
                let mut rest = body;
                for slot in slots.iter_mut() {
                    let (&len, tail) = rest
                        .split_first()
                        .ok_or(TrieError::Malformed("truncated branch slots"))?;
                    rest = tail;
                    match len {
                        0 => {}
                        len if len as usize == HASH_SIZE => {
                            if rest.len() < HASH_SIZE {
                                return Err(TrieError::Malformed(
                                    "truncated branch child hash",
                                ));
                            }
                            let (hash, tail) = rest.split_at(HASH_SIZE);
                            *slot = Some(NodeHash::from_slice(hash));
                            rest = tail;
                        }
                        _ => return Err(TrieError::Malformed("invalid branch slot length")),
                    }
                }
                Ok(Node::Branch(Branch {
                    slots,
                    value: rest.to_vec(),
                }))
            }
            _ => Err(TrieError::Malformed("unknown node type tag")),
        }
    }

    /// Returns the caller's value bytes if the node is a leaf.
    pub fn blob(&self) -> Result<&[u8], TrieError> {
        match self {
            Node::Leaf(leaf) => Ok(&leaf.value),
            // branches and extensions store child hashes, not values
            _ => Err(TrieError::NotAValue),
        }
    }

    /// Walks one step toward `tail`, the not-yet-consumed suffix of the
    /// key. Pure function of the node and the tail.
    ///
    /// Structural invariants are checked on the way: a branch must carry
    /// at least two children and no value, an extension must have a
    /// non-empty path, and with fixed-length keys the tail can never run
    /// out before a path fragment does.
    pub fn descend(&self, tail: &[u8]) -> Result<Descent, TrieError> {
        match self {
            Node::Branch(branch) => {
                if !branch.value.is_empty() {
                    return Err(TrieError::InvariantViolated("branch carries a value"));
                }
                if branch.child_count() < 2 {
                    return Err(TrieError::InvariantViolated(
                        "branch has fewer than two children",
                    ));
                }
                let Some(&next) = tail.first() else {
                    return Err(TrieError::InvariantViolated("key exhausted at a branch"));
                };
                match branch.slots[next as usize] {
                    Some(child) => Ok(Descent::Continue { child, consumed: 1 }),
                    None => Ok(Descent::Diverge { matched: 0 }),
                }
            }
            Node::Leaf(leaf) => {
                let matched = common_prefix(&leaf.path, tail);
                if matched == leaf.path.len() {
                    if tail.len() != leaf.path.len() {
                        return Err(TrieError::InvariantViolated(
                            "leaf path shorter than the key tail",
                        ));
                    }
                    Ok(Descent::Arrived)
                } else if matched == tail.len() {
                    Err(TrieError::InvariantViolated("key exhausted inside a leaf path"))
                } else {
                    Ok(Descent::Diverge { matched })
                }
            }
            Node::Extension(ext) => {
                if ext.path.is_empty() {
                    return Err(TrieError::InvariantViolated("extension with empty path"));
                }
                let matched = common_prefix(&ext.path, tail);
                if matched == ext.path.len() {
                    Ok(Descent::Continue {
                        child: ext.child,
                        consumed: matched,
                    })
                } else if matched == tail.len() {
                    Err(TrieError::InvariantViolated(
                        "key exhausted inside an extension path",
                    ))
                } else {
                    Ok(Descent::Diverge { matched })
                }
            }
        }
    }

    /// Produces the replacement nodes that realize inserting
    /// `(tail, value)` into the subtree rooted at this node, ordered
    /// root-first. Only called after [`Node::descend`] reported a
    /// divergence here.
    ///
    /// A diverging branch contributes only the new leaf; the walker keeps
    /// the branch on its path stack and links the leaf in during the
    /// collapse pass. Diverging leaves and extensions are replaced by a
    /// split.
    pub(crate) fn insert(&self, tail: &[u8], value: &[u8]) -> Result<Vec<Node>, TrieError> {
        match self {
            Node::Branch(branch) => {
                let Some(&next) = tail.first() else {
                    return Err(TrieError::InvariantViolated("key exhausted at a branch"));
                };
                if branch.slots[next as usize].is_some() {
                    return Err(TrieError::InvariantViolated(
                        "branch already covers the diverging slot",
                    ));
                }
                Ok(vec![Node::leaf(tail[1..].to_vec(), value.to_vec())])
            }
            Node::Leaf(leaf) => {
                let matched = common_prefix(&leaf.path, tail);
                if matched == leaf.path.len() || matched == tail.len() {
                    return Err(TrieError::InvariantViolated(
                        "insert reached a leaf without divergence",
                    ));
                }
                debug!(matched, "splitting leaf");
                // The old and the new value part ways one byte past the
                // shared prefix; that byte picks each one's branch slot.
                let kept = Node::leaf(leaf.path[matched + 1..].to_vec(), leaf.value.clone());
                let added = Node::leaf(tail[matched + 1..].to_vec(), value.to_vec());
                let mut branch = Branch::default();
                branch.slots[leaf.path[matched] as usize] = Some(kept.hash());
                branch.slots[tail[matched] as usize] = Some(added.hash());
                let branch = Node::Branch(branch);

                let mut chain = Vec::with_capacity(4);
                if matched > 0 {
                    chain.push(Node::extension(tail[..matched].to_vec(), branch.hash()));
                }
                chain.push(branch);
                chain.push(kept);
                chain.push(added);
                Ok(chain)
            }
            Node::Extension(ext) => {
                let matched = common_prefix(&ext.path, tail);
                if matched == ext.path.len() || matched == tail.len() {
                    return Err(TrieError::InvariantViolated(
                        "insert reached an extension without divergence",
                    ));
                }
                // diverging remainder of the extension's own path
                let diverged = &ext.path[matched..];
                debug!(matched, diverged = %hex::encode(diverged), "splitting extension");
                let added = Node::leaf(tail[matched + 1..].to_vec(), value.to_vec());
                let mut branch = Branch::default();
                branch.slots[tail[matched] as usize] = Some(added.hash());

                // The remainder past the divergence byte either reconnects
                // the original child directly or shrinks into a shorter
                // extension in front of it.
                let shortened = if diverged.len() == 1 {
                    branch.slots[diverged[0] as usize] = Some(ext.child);
                    None
                } else {
                    let shortened = Node::extension(diverged[1..].to_vec(), ext.child);
                    branch.slots[diverged[0] as usize] = Some(shortened.hash());
                    Some(shortened)
                };
                let branch = Node::Branch(branch);

                let mut chain = Vec::with_capacity(4);
                if matched > 0 {
                    chain.push(Node::extension(ext.path[..matched].to_vec(), branch.hash()));
                }
                chain.push(branch);
                if let Some(shortened) = shortened {
                    chain.push(shortened);
                }
                chain.push(added);
                Ok(chain)
            }
        }
    }
}

/// Length of the longest common prefix of `a` and `b`.
fn common_prefix(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}
