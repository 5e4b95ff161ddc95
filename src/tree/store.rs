//! Append-only node arena.
//!
//! [`NodeStore`] owns every node of a conversation. Nodes live in a `Vec` in
//! creation order (so sequence order and storage order coincide), with a
//! `NodeId -> slot` index for lookups. Parent and child links are ids, never
//! references, and nothing is ever removed.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::Utc;

use crate::error::TreeError;
use crate::tree::types::{Node, NodeId};

#[derive(Debug, Clone, PartialEq)]
pub struct NodeStore {
    nodes: Vec<Node>,
    index: HashMap<NodeId, usize>,
}

impl Default for NodeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeStore {
    /// A store holding only a fresh root.
    pub fn new() -> Self {
        let root = Node {
            id: NodeId::generate(),
            parent: None,
            children: Vec::new(),
            sequence: 0,
            prompt: String::new(),
            response: String::new(),
            model: String::new(),
            tag: None,
            created_at: Utc::now(),
        };
        let mut index = HashMap::new();
        index.insert(root.id, 0);
        Self {
            nodes: vec![root],
            index,
        }
    }

    /// Replace everything with a fresh root. Returns the new root's id.
    pub fn reset(&mut self) -> NodeId {
        *self = Self::new();
        self.root().id
    }

    /// Append a child under `parent` with the next global sequence number.
    ///
    /// Does not touch the current position; the caller decides where to go.
    pub fn create_node(
        &mut self,
        parent: NodeId,
        prompt: &str,
        response: &str,
        model: &str,
    ) -> Result<&Node, TreeError> {
        let parent_slot = *self
            .index
            .get(&parent)
            .ok_or(TreeError::InvalidParent(parent))?;

        let node = Node {
            id: NodeId::generate(),
            parent: Some(parent),
            children: Vec::new(),
            sequence: self.next_sequence(),
            prompt: prompt.to_string(),
            response: response.to_string(),
            model: model.to_string(),
            tag: None,
            created_at: Utc::now(),
        };
        let id = node.id;
        let slot = self.nodes.len();

        self.nodes[parent_slot].children.push(id);
        self.nodes.push(node);
        self.index.insert(id, slot);

        tracing::debug!(node = %id, parent = %parent, sequence = self.nodes[slot].sequence, "node created");
        Ok(&self.nodes[slot])
    }

    pub fn get(&self, id: NodeId) -> Result<&Node, TreeError> {
        self.index
            .get(&id)
            .map(|&slot| &self.nodes[slot])
            .ok_or(TreeError::NotFound(id))
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let slot = *self.index.get(&id)?;
        Some(&mut self.nodes[slot])
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    /// The unique parentless node. Always present.
    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    /// Look a node up by its chronological number.
    pub fn by_sequence(&self, sequence: u64) -> Option<&Node> {
        self.nodes
            .binary_search_by_key(&sequence, |n| n.sequence)
            .ok()
            .map(|slot| &self.nodes[slot])
    }

    /// Path from the root down to `id`, both ends inclusive.
    pub fn ancestors(&self, id: NodeId) -> Result<Vec<&Node>, TreeError> {
        let mut chain = vec![self.get(id)?];
        while let Some(parent) = chain.last().and_then(|n| n.parent) {
            chain.push(self.get(parent)?);
        }
        chain.reverse();
        Ok(chain)
    }

    pub fn parent(&self, id: NodeId) -> Result<Option<&Node>, TreeError> {
        match self.get(id)?.parent {
            Some(parent) => self.get(parent).map(Some),
            None => Ok(None),
        }
    }

    pub fn children(&self, id: NodeId) -> Result<Vec<&Node>, TreeError> {
        self.get(id)?
            .children
            .iter()
            .map(|&child| self.get(child))
            .collect()
    }

    /// Other children of the same parent, in creation order.
    pub fn siblings(&self, id: NodeId) -> Result<Vec<&Node>, TreeError> {
        match self.parent(id)? {
            Some(parent) => Ok(self
                .children(parent.id)?
                .into_iter()
                .filter(|n| n.id != id)
                .collect()),
            None => Ok(Vec::new()),
        }
    }

    /// 1-based position of `id` among its parent's children. `None` for the root.
    pub fn ordinal(&self, id: NodeId) -> Result<Option<usize>, TreeError> {
        match self.parent(id)? {
            Some(parent) => Ok(parent
                .children
                .iter()
                .position(|&child| child == id)
                .map(|i| i + 1)),
            None => Ok(None),
        }
    }

    /// `id` and all of its descendants, breadth first.
    pub fn subtree(&self, id: NodeId) -> Result<Vec<&Node>, TreeError> {
        let mut out = Vec::new();
        let mut queue = VecDeque::from([id]);
        while let Some(next) = queue.pop_front() {
            let node = self.get(next)?;
            queue.extend(node.children.iter().copied());
            out.push(node);
        }
        Ok(out)
    }

    /// Nodes without children, in sequence order.
    pub fn leaves(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.children.is_empty())
    }

    /// All nodes in sequence order, root first.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: a store holds at least its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn next_sequence(&self) -> u64 {
        self.nodes.last().map_or(0, |n| n.sequence + 1)
    }

    /// Rebuild a store from nodes in sequence order, checking every structural
    /// invariant. The error string says which one failed.
    pub(crate) fn from_nodes(nodes: Vec<Node>) -> Result<Self, String> {
        let Some(first) = nodes.first() else {
            return Err("no nodes".into());
        };
        if first.parent.is_some() {
            return Err("first node is not a root".into());
        }

        let mut index = HashMap::with_capacity(nodes.len());
        for (slot, node) in nodes.iter().enumerate() {
            if slot > 0 {
                let Some(parent) = node.parent else {
                    return Err(format!("more than one root (sequence {})", node.sequence));
                };
                // Parents are created strictly before their children.
                let Some(&parent_slot) = index.get(&parent) else {
                    return Err(format!(
                        "sequence {} refers to unknown or later parent {parent}",
                        node.sequence
                    ));
                };
                let prev: &Node = &nodes[slot - 1];
                if node.sequence <= prev.sequence {
                    return Err(format!(
                        "sequence numbers not strictly increasing at {}",
                        node.sequence
                    ));
                }
                let parent_node: &Node = &nodes[parent_slot];
                if !parent_node.children.contains(&node.id) {
                    return Err(format!(
                        "sequence {} missing from its parent's children",
                        node.sequence
                    ));
                }
            }
            if index.insert(node.id, slot).is_some() {
                return Err(format!("duplicate node id {}", node.id));
            }
        }

        for node in &nodes {
            let mut seen = HashSet::with_capacity(node.children.len());
            for child in &node.children {
                if !seen.insert(child) {
                    return Err(format!("duplicate child {child} under {}", node.id));
                }
                let owner = index
                    .get(child)
                    .map(|&slot| nodes[slot].parent)
                    .ok_or_else(|| format!("unknown child {child} under {}", node.id))?;
                if owner != Some(node.id) {
                    return Err(format!("child {child} listed under the wrong parent"));
                }
            }
        }

        Ok(Self { nodes, index })
    }
}
