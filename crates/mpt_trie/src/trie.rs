//! The trie proper: get, put, delete and root computation.

use crate::helper::common_prefix_length;
use crate::node::BRANCH_CHILD_COUNT;
use crate::{MptError, MptResult, Node};
use neo3_core::UInt256;

/// Read access to previously committed nodes.
pub trait NodeStore {
    /// Gets the serialized node stored under `hash`.
    fn get_node(&self, hash: &UInt256) -> MptResult<Option<Vec<u8>>>;
}

/// A Merkle-Patricia trie rooted at an optional previously committed hash.
///
/// Mutations build an in-memory subtree; [`Trie::commit`] drains the dirty
/// nodes for the caller to write through the DAO. Applying the same ordered
/// sequence of operations to the same root always produces the same new
/// root hash.
pub struct Trie<S: NodeStore> {
    root: Node,
    store: S,
}

impl<S: NodeStore> Trie<S> {
    /// Opens a trie. `root` of `None` starts an empty trie.
    pub fn new(root: Option<UInt256>, store: S) -> Self {
        let root = match root {
            Some(hash) if !hash.is_zero() => Node::Hash(hash),
            _ => Node::Empty,
        };
        Self { root, store }
    }

    /// Gets the value stored under `key`.
    pub fn get(&mut self, key: &[u8]) -> MptResult<Option<Vec<u8>>> {
        let path = crate::helper::to_nibbles(key);
        let root = std::mem::replace(&mut self.root, Node::Empty);
        let (root, result) = self.get_node(root, &path);
        self.root = root;
        result
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> MptResult<()> {
        if key.is_empty() || key.len() > 128 {
            return Err(MptError::InvalidKey(format!("key length {}", key.len())));
        }
        if value.is_empty() {
            return self.delete(key);
        }
        let path = crate::helper::to_nibbles(key);
        let root = std::mem::replace(&mut self.root, Node::Empty);
        self.root = self.put_node(root, &path, value.to_vec())?;
        Ok(())
    }

    /// Removes `key` if present.
    pub fn delete(&mut self, key: &[u8]) -> MptResult<()> {
        let path = crate::helper::to_nibbles(key);
        let root = std::mem::replace(&mut self.root, Node::Empty);
        self.root = self.delete_node(root, &path)?;
        Ok(())
    }

    /// Gets the current root hash; the zero hash for an empty trie.
    pub fn root_hash(&self) -> MptResult<UInt256> {
        match &self.root {
            Node::Empty => Ok(UInt256::zero()),
            node => node.hash(),
        }
    }

    /// Serializes every resolved node of the current tree, returning
    /// `(hash, bytes)` pairs for the DAO to store. Unmodified subtrees that
    /// were never resolved stay as hash references and are not re-written.
    pub fn commit(&mut self) -> MptResult<Vec<(UInt256, Vec<u8>)>> {
        let mut dirty = Vec::new();
        Self::collect_nodes(&self.root, &mut dirty)?;
        Ok(dirty)
    }

    fn collect_nodes(node: &Node, dirty: &mut Vec<(UInt256, Vec<u8>)>) -> MptResult<()> {
        match node {
            Node::Empty | Node::Hash(_) => Ok(()),
            Node::Branch(children) => {
                dirty.push((node.hash()?, node.to_bytes()?));
                for child in children.iter() {
                    Self::collect_nodes(child, dirty)?;
                }
                Ok(())
            }
            Node::Extension { next, .. } => {
                dirty.push((node.hash()?, node.to_bytes()?));
                Self::collect_nodes(next, dirty)
            }
            Node::Leaf { .. } => {
                dirty.push((node.hash()?, node.to_bytes()?));
                Ok(())
            }
        }
    }

    fn resolve(&self, node: Node) -> MptResult<Node> {
        match node {
            Node::Hash(hash) => {
                let bytes = self
                    .store
                    .get_node(&hash)?
                    .ok_or(MptError::MissingNode(hash))?;
                Node::from_bytes(&bytes)
            }
            other => Ok(other),
        }
    }

    fn get_node(&self, node: Node, path: &[u8]) -> (Node, MptResult<Option<Vec<u8>>>) {
        let node = match self.resolve(node) {
            Ok(node) => node,
            Err(e) => return (Node::Empty, Err(e)),
        };
        match node {
            Node::Empty => (node, Ok(None)),
            Node::Leaf { ref value } => {
                let result = if path.is_empty() {
                    Some(value.clone())
                } else {
                    None
                };
                (node, Ok(result))
            }
            Node::Extension { key, next } => {
                if path.len() >= key.len() && path[..key.len()] == key[..] {
                    let (next, result) = self.get_node(*next, &path[key.len()..]);
                    (
                        Node::Extension {
                            key,
                            next: Box::new(next),
                        },
                        result,
                    )
                } else {
                    (
                        Node::Extension { key, next },
                        Ok(None),
                    )
                }
            }
            Node::Branch(mut children) => {
                let slot = if path.is_empty() {
                    BRANCH_CHILD_COUNT - 1
                } else {
                    path[0] as usize
                };
                let rest = if path.is_empty() { path } else { &path[1..] };
                let child = std::mem::replace(&mut children[slot], Node::Empty);
                let (child, result) = self.get_node(child, rest);
                children[slot] = child;
                (Node::Branch(children), result)
            }
            Node::Hash(_) => unreachable!("resolved above"),
        }
    }

    fn put_node(&self, node: Node, path: &[u8], value: Vec<u8>) -> MptResult<Node> {
        let node = self.resolve(node)?;
        match node {
            Node::Empty => {
                if path.is_empty() {
                    Ok(Node::Leaf { value })
                } else {
                    Ok(Node::Extension {
                        key: path.to_vec(),
                        next: Box::new(Node::Leaf { value }),
                    })
                }
            }
            Node::Leaf { value: old } => {
                if path.is_empty() {
                    return Ok(Node::Leaf { value });
                }
                // The stored key ends here; fork into a branch keeping the
                // old leaf in the terminating slot.
                let mut children: [Node; BRANCH_CHILD_COUNT] =
                    std::array::from_fn(|_| Node::Empty);
                children[BRANCH_CHILD_COUNT - 1] = Node::Leaf { value: old };
                children[path[0] as usize] =
                    self.put_node(Node::Empty, &path[1..], value)?;
                Ok(Node::Branch(Box::new(children)))
            }
            Node::Extension { key, next } => {
                let lcp = common_prefix_length(&key, path);
                if lcp == key.len() {
                    let next = self.put_node(*next, &path[lcp..], value)?;
                    return Ok(Node::Extension {
                        key,
                        next: Box::new(next),
                    });
                }
                // Split the extension at the divergence point.
                let mut children: [Node; BRANCH_CHILD_COUNT] =
                    std::array::from_fn(|_| Node::Empty);
                let old_slot = key[lcp] as usize;
                let old_rest = key[lcp + 1..].to_vec();
                children[old_slot] = if old_rest.is_empty() {
                    *next
                } else {
                    Node::Extension {
                        key: old_rest,
                        next,
                    }
                };
                if path.len() == lcp {
                    children[BRANCH_CHILD_COUNT - 1] = Node::Leaf { value };
                } else {
                    children[path[lcp] as usize] =
                        self.put_node(Node::Empty, &path[lcp + 1..], value)?;
                }
                let branch = Node::Branch(Box::new(children));
                if lcp == 0 {
                    Ok(branch)
                } else {
                    Ok(Node::Extension {
                        key: key[..lcp].to_vec(),
                        next: Box::new(branch),
                    })
                }
            }
            Node::Branch(mut children) => {
                if path.is_empty() {
                    children[BRANCH_CHILD_COUNT - 1] = Node::Leaf { value };
                } else {
                    let slot = path[0] as usize;
                    let child = std::mem::replace(&mut children[slot], Node::Empty);
                    children[slot] = self.put_node(child, &path[1..], value)?;
                }
                Ok(Node::Branch(children))
            }
            Node::Hash(_) => unreachable!("resolved above"),
        }
    }

    fn delete_node(&self, node: Node, path: &[u8]) -> MptResult<Node> {
        let node = self.resolve(node)?;
        match node {
            Node::Empty => Ok(Node::Empty),
            Node::Leaf { value } => {
                if path.is_empty() {
                    Ok(Node::Empty)
                } else {
                    Ok(Node::Leaf { value })
                }
            }
            Node::Extension { key, next } => {
                if path.len() >= key.len() && path[..key.len()] == key[..] {
                    let next = self.delete_node(*next, &path[key.len()..])?;
                    Ok(Self::merge_extension(key, next))
                } else {
                    Ok(Node::Extension { key, next })
                }
            }
            Node::Branch(mut children) => {
                if path.is_empty() {
                    children[BRANCH_CHILD_COUNT - 1] = Node::Empty;
                } else {
                    let slot = path[0] as usize;
                    let child = std::mem::replace(&mut children[slot], Node::Empty);
                    children[slot] = self.delete_node(child, &path[1..])?;
                }
                self.collapse_branch(children)
            }
            Node::Hash(_) => unreachable!("resolved above"),
        }
    }

    fn merge_extension(key: Vec<u8>, next: Node) -> Node {
        match next {
            Node::Empty => Node::Empty,
            Node::Extension {
                key: next_key,
                next,
            } => {
                let mut merged = key;
                merged.extend_from_slice(&next_key);
                Node::Extension { key: merged, next }
            }
            other => Node::Extension {
                key,
                next: Box::new(other),
            },
        }
    }

    fn collapse_branch(&self, children: Box<[Node; BRANCH_CHILD_COUNT]>) -> MptResult<Node> {
        let live: Vec<usize> = children
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_empty())
            .map(|(i, _)| i)
            .collect();
        match live.len() {
            0 => Ok(Node::Empty),
            1 => {
                let slot = live[0];
                let mut children = children;
                let child = std::mem::replace(&mut children[slot], Node::Empty);
                if slot == BRANCH_CHILD_COUNT - 1 {
                    // The surviving entry terminates here; it replaces the
                    // branch directly.
                    return Ok(child);
                }
                let child = self.resolve(child)?;
                Ok(Self::merge_extension(vec![slot as u8], child))
            }
            _ => Ok(Node::Branch(children)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Default, Clone)]
    struct MapStore {
        nodes: Arc<Mutex<HashMap<UInt256, Vec<u8>>>>,
    }

    impl NodeStore for MapStore {
        fn get_node(&self, hash: &UInt256) -> MptResult<Option<Vec<u8>>> {
            Ok(self.nodes.lock().unwrap().get(hash).cloned())
        }
    }

    impl MapStore {
        fn absorb(&self, dirty: Vec<(UInt256, Vec<u8>)>) {
            let mut nodes = self.nodes.lock().unwrap();
            for (hash, bytes) in dirty {
                nodes.insert(hash, bytes);
            }
        }
    }

    #[test]
    fn put_get_delete() {
        let mut trie = Trie::new(None, MapStore::default());
        trie.put(b"key1", b"value1").unwrap();
        trie.put(b"key2", b"value2").unwrap();
        assert_eq!(trie.get(b"key1").unwrap(), Some(b"value1".to_vec()));
        assert_eq!(trie.get(b"key2").unwrap(), Some(b"value2".to_vec()));
        assert_eq!(trie.get(b"key3").unwrap(), None);

        trie.delete(b"key1").unwrap();
        assert_eq!(trie.get(b"key1").unwrap(), None);
        assert_eq!(trie.get(b"key2").unwrap(), Some(b"value2".to_vec()));
    }

    #[test]
    fn root_is_deterministic_regardless_of_history() {
        let mut a = Trie::new(None, MapStore::default());
        a.put(b"alpha", b"1").unwrap();
        a.put(b"beta", b"2").unwrap();
        a.put(b"gamma", b"3").unwrap();
        a.delete(b"gamma").unwrap();

        let mut b = Trie::new(None, MapStore::default());
        b.put(b"beta", b"2").unwrap();
        b.put(b"alpha", b"1").unwrap();

        assert_eq!(a.root_hash().unwrap(), b.root_hash().unwrap());
    }

    #[test]
    fn empty_trie_has_zero_root() {
        let trie = Trie::new(None, MapStore::default());
        assert!(trie.root_hash().unwrap().is_zero());
    }

    #[test]
    fn update_changes_root() {
        let mut trie = Trie::new(None, MapStore::default());
        trie.put(b"k", b"v1").unwrap();
        let first = trie.root_hash().unwrap();
        trie.put(b"k", b"v2").unwrap();
        assert_ne!(trie.root_hash().unwrap(), first);
    }

    #[test]
    fn reopen_from_committed_root() {
        let store = MapStore::default();
        let root = {
            let mut trie = Trie::new(None, store.clone());
            trie.put(b"persisted", b"value").unwrap();
            trie.put(b"other", b"data").unwrap();
            store.absorb(trie.commit().unwrap());
            trie.root_hash().unwrap()
        };

        let mut reopened = Trie::new(Some(root), store.clone());
        assert_eq!(reopened.get(b"persisted").unwrap(), Some(b"value".to_vec()));

        // Continue mutating from the stored root.
        reopened.put(b"persisted", b"changed").unwrap();
        store.absorb(reopened.commit().unwrap());
        let mut third = Trie::new(Some(reopened.root_hash().unwrap()), store);
        assert_eq!(third.get(b"persisted").unwrap(), Some(b"changed".to_vec()));
        assert_eq!(third.get(b"other").unwrap(), Some(b"data".to_vec()));
    }

    #[test]
    fn missing_node_is_reported() {
        let mut trie = Trie::new(Some(UInt256::from_array([5u8; 32])), MapStore::default());
        assert!(matches!(
            trie.get(b"anything"),
            Err(MptError::MissingNode(_))
        ));
    }

    #[test]
    fn empty_value_deletes() {
        let mut trie = Trie::new(None, MapStore::default());
        trie.put(b"k", b"v").unwrap();
        trie.put(b"k", b"").unwrap();
        assert_eq!(trie.get(b"k").unwrap(), None);
        assert!(trie.root_hash().unwrap().is_zero());
    }
}
