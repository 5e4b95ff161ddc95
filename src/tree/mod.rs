//! The context tree: node arena, addressing, tags, and the current position.
//!
//! [`ContextTree`] bundles a [`NodeStore`], the current-position pointer, and a
//! [`TagRegistry`]. Moving the pointer never removes anything; appending a turn
//! always adds a new child of the current position, so reverting to an earlier
//! node and continuing creates a sibling branch next to the old one.

pub mod address;
pub mod store;
pub mod tags;
pub mod types;

use crate::error::TreeError;
use store::NodeStore;
use tags::TagRegistry;
use types::{Node, NodeId};

#[derive(Debug, Clone, PartialEq)]
pub struct ContextTree {
    store: NodeStore,
    current: NodeId,
    tags: TagRegistry,
}

impl Default for ContextTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextTree {
    /// A fresh tree positioned at its root.
    pub fn new() -> Self {
        let store = NodeStore::new();
        let current = store.root().id;
        Self {
            store,
            current,
            tags: TagRegistry::new(),
        }
    }

    /// Reassemble a tree from persisted parts, checking that `current` exists.
    pub(crate) fn from_parts(
        store: NodeStore,
        current: NodeId,
        tags: TagRegistry,
    ) -> Result<Self, String> {
        if !store.contains(current) {
            return Err(format!("current position {current} is not in the tree"));
        }
        Ok(Self {
            store,
            current,
            tags,
        })
    }

    /// Discard every node and tag, leaving a single root.
    pub fn reset(&mut self) {
        let root = self.store.reset();
        self.current = root;
        self.tags = TagRegistry::new();
        tracing::info!(root = %root, "tree reset");
    }

    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    pub fn tags(&self) -> &TagRegistry {
        &self.tags
    }

    pub fn current_id(&self) -> NodeId {
        self.current
    }

    pub fn current(&self) -> &Node {
        // `current` is only ever set to ids the store holds.
        self.store
            .get(self.current)
            .unwrap_or_else(|_| self.store.root())
    }

    pub fn get(&self, id: NodeId) -> Result<&Node, TreeError> {
        self.store.get(id)
    }

    /// Pure pointer move.
    pub fn move_to(&mut self, id: NodeId) -> Result<&Node, TreeError> {
        self.store.get(id)?;
        self.current = id;
        tracing::debug!(node = %id, "current position moved");
        Ok(self.current())
    }

    /// Move to the parent of the current node. `None` at the root.
    pub fn up(&mut self) -> Option<&Node> {
        let parent = self.current().parent?;
        self.current = parent;
        Some(self.current())
    }

    /// Move to the `n`-th (1-based) child of the current node.
    pub fn down(&mut self, n: usize) -> Option<&Node> {
        let child = *self.current().children.get(n.checked_sub(1)?)?;
        self.current = child;
        Some(self.current())
    }

    /// Record a completed turn as a new child of the current position and
    /// advance to it.
    pub fn append_turn(&mut self, prompt: &str, response: &str, model: &str) -> Result<NodeId, TreeError> {
        let id = self.store.create_node(self.current, prompt, response, model)?.id;
        self.current = id;
        Ok(id)
    }

    pub fn set_tag(&mut self, id: NodeId, text: &str) -> Result<(), TreeError> {
        self.tags.set_tag(&mut self.store, id, text)
    }

    pub fn tag_current(&mut self, text: &str) -> Result<(), TreeError> {
        self.set_tag(self.current, text)
    }

    pub fn recent_tags(&self) -> Vec<String> {
        self.tags.recent_tags()
    }

    /// Nodes carrying `tag`, in sequence order.
    pub fn nodes_with_tag(&self, tag: &str) -> Vec<&Node> {
        tags::nodes_with_tag(&self.store, tag)
    }

    /// The turns leading to `id`, excluding the synthetic root.
    pub fn history(&self, id: NodeId) -> Result<Vec<&Node>, TreeError> {
        let mut chain = self.store.ancestors(id)?;
        chain.retain(|n| !n.is_root());
        Ok(chain)
    }

    pub fn label(&self, id: NodeId) -> Result<String, TreeError> {
        address::label(&self.store, id)
    }

    pub fn resolve_prefix(&self, text: &str) -> Vec<&Node> {
        address::resolve_prefix(&self.store, text)
    }

    pub fn find_exact(&self, text: &str) -> Option<&Node> {
        address::find_exact(&self.store, text)
    }

    /// Number of turns, not counting the root.
    pub fn turn_count(&self) -> usize {
        self.store.len() - 1
    }
}
