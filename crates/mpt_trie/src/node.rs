//! Trie nodes and their canonical encoding.

use crate::{MptError, MptResult};
use neo3_core::UInt256;
use neo3_cryptography::hash::hash256;
use neo3_io::{BinaryWriter, MemoryReader};

/// Number of children of a branch node: one per nibble plus the
/// terminating slot for keys ending at the branch.
pub const BRANCH_CHILD_COUNT: usize = 17;

/// Discriminator of a serialized node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NodeType {
    Branch = 0x00,
    Extension = 0x01,
    Leaf = 0x02,
}

/// A node of the Merkle-Patricia trie.
///
/// `Hash` nodes are unresolved references into the backing store; they are
/// loaded lazily while descending and never serialized as such — a child
/// reference inside an encoded parent is just the child's hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Empty,
    Hash(UInt256),
    Branch(Box<[Node; BRANCH_CHILD_COUNT]>),
    Extension { key: Vec<u8>, next: Box<Node> },
    Leaf { value: Vec<u8> },
}

impl Node {
    /// Creates an empty branch.
    pub fn new_branch() -> Self {
        Node::Branch(Box::new(std::array::from_fn(|_| Node::Empty)))
    }

    /// Whether the node is the empty sentinel.
    pub fn is_empty(&self) -> bool {
        matches!(self, Node::Empty)
    }

    /// Serializes the node. Child subtrees encode as their 32-byte hashes.
    pub fn to_bytes(&self) -> MptResult<Vec<u8>> {
        let mut writer = BinaryWriter::new();
        match self {
            Node::Empty | Node::Hash(_) => {
                return Err(MptError::InvalidFormat(
                    "only resolved nodes serialize".to_string(),
                ))
            }
            Node::Branch(children) => {
                writer.write_byte(NodeType::Branch as u8)?;
                for child in children.iter() {
                    Self::write_child(&mut writer, child)?;
                }
            }
            Node::Extension { key, next } => {
                writer.write_byte(NodeType::Extension as u8)?;
                writer.write_var_bytes(key)?;
                Self::write_child(&mut writer, next)?;
            }
            Node::Leaf { value } => {
                writer.write_byte(NodeType::Leaf as u8)?;
                writer.write_var_bytes(value)?;
            }
        }
        Ok(writer.to_bytes())
    }

    fn write_child(writer: &mut BinaryWriter, child: &Node) -> MptResult<()> {
        match child {
            Node::Empty => writer.write_byte(0)?,
            other => {
                writer.write_byte(1)?;
                writer.write_bytes(other.hash()?.as_bytes())?;
            }
        }
        Ok(())
    }

    /// Decodes a node serialized by [`Node::to_bytes`]. Children come back
    /// as `Hash` references.
    pub fn from_bytes(data: &[u8]) -> MptResult<Self> {
        let mut reader = MemoryReader::new(data);
        let type_byte = reader.read_byte()?;
        let node = match type_byte {
            0x00 => {
                let mut children: [Node; BRANCH_CHILD_COUNT] =
                    std::array::from_fn(|_| Node::Empty);
                for child in children.iter_mut() {
                    *child = Self::read_child(&mut reader)?;
                }
                Node::Branch(Box::new(children))
            }
            0x01 => {
                let key = reader.read_var_bytes(256)?;
                let next = Self::read_child(&mut reader)?;
                Node::Extension {
                    key,
                    next: Box::new(next),
                }
            }
            0x02 => Node::Leaf {
                value: reader.read_var_bytes(u16::MAX as usize)?,
            },
            other => {
                return Err(MptError::InvalidFormat(format!(
                    "unknown node type {other:#04x}"
                )))
            }
        };
        if reader.remaining() != 0 {
            return Err(MptError::InvalidFormat("trailing bytes".to_string()));
        }
        Ok(node)
    }

    fn read_child(reader: &mut MemoryReader) -> MptResult<Node> {
        match reader.read_byte()? {
            0 => Ok(Node::Empty),
            1 => {
                let bytes = reader.read_bytes(32)?;
                Ok(Node::Hash(
                    UInt256::from_bytes(&bytes)
                        .map_err(|e| MptError::InvalidFormat(e.to_string()))?,
                ))
            }
            other => Err(MptError::InvalidFormat(format!(
                "invalid child marker {other:#04x}"
            ))),
        }
    }

    /// Gets the hash identifying the node: a double SHA-256 of its
    /// serialized form. `Hash` nodes return their reference directly.
    pub fn hash(&self) -> MptResult<UInt256> {
        match self {
            Node::Hash(hash) => Ok(*hash),
            Node::Empty => Err(MptError::InvalidFormat("empty node has no hash".to_string())),
            _ => Ok(UInt256::from_array(hash256(&self.to_bytes()?))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_roundtrip() {
        let leaf = Node::Leaf {
            value: vec![1, 2, 3],
        };
        let bytes = leaf.to_bytes().unwrap();
        assert_eq!(Node::from_bytes(&bytes).unwrap(), leaf);
    }

    #[test]
    fn branch_children_come_back_as_hash_refs() {
        let mut branch = Node::new_branch();
        if let Node::Branch(children) = &mut branch {
            children[3] = Node::Leaf { value: vec![9] };
        }
        let decoded = Node::from_bytes(&branch.to_bytes().unwrap()).unwrap();
        let Node::Branch(children) = decoded else {
            panic!("expected branch");
        };
        let leaf_hash = Node::Leaf { value: vec![9] }.hash().unwrap();
        assert_eq!(children[3], Node::Hash(leaf_hash));
        assert!(children[0].is_empty());
    }

    #[test]
    fn hash_is_stable_across_encoding() {
        let node = Node::Extension {
            key: vec![0xA, 0xB],
            next: Box::new(Node::Leaf { value: vec![7] }),
        };
        let decoded = Node::from_bytes(&node.to_bytes().unwrap()).unwrap();
        assert_eq!(node.hash().unwrap(), decoded.hash().unwrap());
    }

    #[test]
    fn unknown_type_rejected() {
        assert!(Node::from_bytes(&[0x09]).is_err());
    }
}
