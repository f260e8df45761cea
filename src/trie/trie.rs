//! This module implements [`Trie`].

use crate::{
    constant::{DEFAULT_KEY_SIZE, EMPTY_ROOT, MAX_KEY_SIZE},
    node::{Branch, Descent, Extension, Node, NodeHash},
    traits::NodeStore,
    trie::TrieError,
};
use tracing::debug;

/// One visited node on the path from the root to the write frontier.
///
/// Branches remember the slot byte through which descent left them;
/// extensions have a single child and need no bookkeeping.
enum Frame {
    Branch { node: Branch, entry: u8 },
    Extension(Extension),
}

/// State carried root-ward by the collapse pass.
enum Carry {
    /// The subtree below was rewritten; the parent re-points its slot and
    /// re-hashes.
    Replaced(NodeHash),
    /// The subtree below folded into a single surviving path: `fragment`
    /// is the key run leading to `survivor`. `None` means the subtree
    /// emptied out entirely (the deleted leaf itself).
    Collapsed {
        fragment: Vec<u8>,
        survivor: Option<NodeHash>,
    },
}

/// An authenticated key-value index over a content-addressed node store.
///
/// The trie owns the current root hash and a fixed key length; all node
/// data lives in the store. Writes take `&mut self` and are expected to
/// be serialized by the host; readers holding a root may descend
/// concurrently.
#[derive(Debug)]
pub struct Trie<'a, S> {
    /// Storage backend holding the persisted node blobs.
    store: &'a S,
    /// Content hash of the current root node, or [`EMPTY_ROOT`].
    root: NodeHash,
    /// Length every key in this instance must have.
    key_size: usize,
}

impl<'a, S: NodeStore> Trie<'a, S> {
    /// Creates an empty trie over `store` with the default key length.
    pub fn empty(store: &'a S) -> Self {
        Self::new(store, EMPTY_ROOT, DEFAULT_KEY_SIZE)
    }

    /// Opens a trie at an existing `root` with the given key length.
    pub fn new(store: &'a S, root: NodeHash, key_size: usize) -> Self {
        assert!(
            key_size > 0 && key_size <= MAX_KEY_SIZE,
            "key size must be in 1..={MAX_KEY_SIZE}"
        );
        Self {
            store,
            root,
            key_size,
        }
    }

    /// The current 32-byte root commitment.
    pub fn root_hash(&self) -> NodeHash {
        self.root
    }

    /// Whether the trie holds no entries.
    pub fn is_empty(&self) -> bool {
        self.root == EMPTY_ROOT
    }

    /// The key length this instance was created with.
    pub fn key_size(&self) -> usize {
        self.key_size
    }

    /// Looks up the value stored under `key`.
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>, TrieError> {
        self.check_key(key)?;
        if self.is_empty() {
            return Err(TrieError::NotFound);
        }
        let mut node = self.load(&self.root)?;
        let mut offset = 0;
        loop {
            match node.descend(&key[offset..])? {
                Descent::Continue { child, consumed } => {
                    offset += consumed;
                    node = self.load(&child)?;
                }
                Descent::Arrived => return node.blob().map(<[u8]>::to_vec),
                Descent::Diverge { .. } => return Err(TrieError::NotFound),
            }
        }
    }

    /// Inserts or replaces the value under `key` and returns the new
    /// root hash.
    pub fn upsert(&mut self, key: &[u8], value: &[u8]) -> Result<NodeHash, TrieError> {
        self.check_key(key)?;
        if self.is_empty() {
            // first entry: the root is a single leaf holding the whole key
            let root = self.persist(&Node::leaf(key.to_vec(), value.to_vec()))?;
            return Ok(self.publish(root));
        }

        let mut stack: Vec<Frame> = Vec::new();
        let mut node = self.load(&self.root)?;
        let mut offset = 0;
        let frontier = loop {
            match node.descend(&key[offset..])? {
                Descent::Continue { child, consumed } => {
                    let next = self.load(&child)?;
                    stack.push(frame(node, key[offset])?);
                    offset += consumed;
                    node = next;
                }
                Descent::Arrived => match node {
                    // same key: rewrite the leaf with the new value
                    Node::Leaf(leaf) => {
                        break self.persist(&Node::leaf(leaf.path, value.to_vec()))?
                    }
                    _ => return Err(TrieError::InvariantViolated("arrived at a non-leaf")),
                },
                Descent::Diverge { .. } => {
                    let tail = &key[offset..];
                    let chain = node.insert(tail, value)?;
                    let mut nodes = chain.iter();
                    let top = match nodes.next() {
                        Some(top) => self.persist(top)?,
                        None => {
                            return Err(TrieError::InvariantViolated(
                                "insert produced no replacement nodes",
                            ))
                        }
                    };
                    for fresh in nodes {
                        self.persist(fresh)?;
                    }
                    // a diverging branch survives and links the new leaf
                    // during collapse; leaves and extensions are replaced
                    if let Node::Branch(branch) = node {
                        stack.push(Frame::Branch {
                            node: branch,
                            entry: tail[0],
                        });
                    }
                    break top;
                }
            }
        };

        let root = self.collapse(stack, Carry::Replaced(frontier))?;
        Ok(self.publish(root))
    }

    /// Removes `key` and returns the new root hash, or [`TrieError::NotFound`]
    /// if the key is absent.
    pub fn delete(&mut self, key: &[u8]) -> Result<NodeHash, TrieError> {
        self.check_key(key)?;
        if self.is_empty() {
            return Err(TrieError::NotFound);
        }

        let mut stack: Vec<Frame> = Vec::new();
        let mut node = self.load(&self.root)?;
        let mut offset = 0;
        loop {
            match node.descend(&key[offset..])? {
                Descent::Continue { child, consumed } => {
                    let next = self.load(&child)?;
                    stack.push(frame(node, key[offset])?);
                    offset += consumed;
                    node = next;
                }
                Descent::Arrived => break,
                Descent::Diverge { .. } => return Err(TrieError::NotFound),
            }
        }

        // the leaf is gone; collapse reshapes the path above it
        let root = self.collapse(
            stack,
            Carry::Collapsed {
                fragment: Vec::new(),
                survivor: None,
            },
        )?;
        Ok(self.publish(root))
    }

    /// Applies a batch of operations in order: `Some(value)` upserts,
    /// `None` deletes. Returns the root after the whole batch. Deleting
    /// an absent key fails the batch with [`TrieError::NotFound`];
    /// operations already applied stay applied.
    pub fn apply<I>(&mut self, ops: I) -> Result<NodeHash, TrieError>
    where
        I: IntoIterator<Item = (Vec<u8>, Option<Vec<u8>>)>,
    {
        for (key, value) in ops {
            match value {
                Some(value) => self.upsert(&key, &value)?,
                None => self.delete(&key)?,
            };
        }
        Ok(self.root)
    }

    fn check_key(&self, key: &[u8]) -> Result<(), TrieError> {
        if key.len() != self.key_size {
            return Err(TrieError::InvalidKey {
                expected: self.key_size,
                got: key.len(),
            });
        }
        Ok(())
    }

    /// Fetches and decodes the node stored under `hash`.
    fn load(&self, hash: &NodeHash) -> Result<Node, TrieError> {
        let blob = self
            .store
            .get(hash)
            .map_err(|e| TrieError::Store(format!("{e:?}")))?
            .ok_or(TrieError::Corrupted(*hash))?;
        Node::deserialize(&blob)
    }

    /// Serializes `node`, writes the blob under its content hash, and
    /// returns the hash.
    fn persist(&self, node: &Node) -> Result<NodeHash, TrieError> {
        let hash = node.hash();
        self.store
            .put(hash, node.serialize())
            .map_err(|e| TrieError::Store(format!("{e:?}")))?;
        Ok(hash)
    }

    fn publish(&mut self, root: NodeHash) -> NodeHash {
        debug!(root = %root, "published new root");
        self.root = root;
        root
    }

    /// Runs the path stack child-to-parent, rewriting each frame against
    /// the state carried up from below, and returns the new root hash.
    ///
    /// Every rewritten node is persisted before its parent records the
    /// new hash, so the store always contains the complete new path by
    /// the time the root is published.
    fn collapse(&self, mut stack: Vec<Frame>, mut carry: Carry) -> Result<NodeHash, TrieError> {
        while let Some(frame) = stack.pop() {
            carry = match frame {
                Frame::Branch { mut node, entry } => match carry {
                    Carry::Replaced(hash) => {
                        node.slots[entry as usize] = Some(hash);
                        Carry::Replaced(self.persist(&Node::Branch(node))?)
                    }
                    Carry::Collapsed {
                        fragment,
                        survivor: Some(hash),
                    } => {
                        // a descendant folded into a single path; rebuild
                        // it as a real node before linking it back in
                        let folded = self.fold(fragment, hash)?;
                        node.slots[entry as usize] = Some(self.persist(&folded)?);
                        Carry::Replaced(self.persist(&Node::Branch(node))?)
                    }
                    Carry::Collapsed { survivor: None, .. } => {
                        node.slots[entry as usize] = None;
                        match node.single_child() {
                            Some((slot, hash)) => {
                                debug!(slot, "collapsing single-child branch");
                                Carry::Collapsed {
                                    fragment: vec![slot],
                                    survivor: Some(hash),
                                }
                            }
                            None => {
                                if node.child_count() < 2 {
                                    return Err(TrieError::InvariantViolated(
                                        "branch left without children",
                                    ));
                                }
                                Carry::Replaced(self.persist(&Node::Branch(node))?)
                            }
                        }
                    }
                },
                Frame::Extension(mut ext) => match carry {
                    Carry::Replaced(hash) => {
                        ext.child = hash;
                        Carry::Replaced(self.persist(&Node::Extension(ext))?)
                    }
                    Carry::Collapsed {
                        fragment,
                        survivor: Some(hash),
                    } => {
                        // fold the extension's own path into the fragment
                        // and keep carrying; the parent decides the shape
                        let mut path = ext.path;
                        path.extend_from_slice(&fragment);
                        Carry::Collapsed {
                            fragment: path,
                            survivor: Some(hash),
                        }
                    }
                    Carry::Collapsed { survivor: None, .. } => {
                        return Err(TrieError::InvariantViolated(
                            "extension child vanished during collapse",
                        ))
                    }
                },
            };
        }

        match carry {
            Carry::Replaced(hash) => Ok(hash),
            Carry::Collapsed {
                fragment,
                survivor: Some(hash),
            } => {
                let folded = self.fold(fragment, hash)?;
                self.persist(&folded)
            }
            // the last entry was deleted
            Carry::Collapsed { survivor: None, .. } => Ok(EMPTY_ROOT),
        }
    }

    /// Materializes a collapsed path: `fragment` leads to the node stored
    /// under `hash`. Leaves and extensions absorb the fragment into their
    /// own path; a branch gains an extension in front.
    fn fold(&self, fragment: Vec<u8>, hash: NodeHash) -> Result<Node, TrieError> {
        match self.load(&hash)? {
            Node::Leaf(leaf) => {
                let mut path = fragment;
                path.extend_from_slice(&leaf.path);
                Ok(Node::leaf(path, leaf.value))
            }
            Node::Extension(ext) => {
                let mut path = fragment;
                path.extend_from_slice(&ext.path);
                Ok(Node::extension(path, ext.child))
            }
            Node::Branch(_) => Ok(Node::extension(fragment, hash)),
        }
    }
}

/// Wraps a visited node into a path frame. `entry` is the key byte under
/// the walk's cursor when the node was left.
fn frame(node: Node, entry: u8) -> Result<Frame, TrieError> {
    match node {
        Node::Branch(node) => Ok(Frame::Branch { node, entry }),
        Node::Extension(ext) => Ok(Frame::Extension(ext)),
        Node::Leaf(_) => Err(TrieError::InvariantViolated("leaf on the descent path")),
    }
}
