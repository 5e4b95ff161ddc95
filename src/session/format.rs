//! On-disk session layout.
//!
//! A session file is pretty-printed JSON:
//!
//! ```json
//! {
//!   "version": 1,
//!   "saved_at": "2026-10-18T09:12:44.120Z",
//!   "current": "0199f3c2-...",
//!   "recent_tags": ["good", "retry"],
//!   "nodes": [ { "id": "...", "parent": null, "children": [...], "sequence": 0, ... } ]
//! }
//! ```
//!
//! Nodes are written in sequence order, root first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tree::store::NodeStore;
use crate::tree::tags::TagRegistry;
use crate::tree::types::{Node, NodeId};
use crate::tree::ContextTree;

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize)]
pub(crate) struct SessionFileOut<'a> {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub current: NodeId,
    pub recent_tags: Vec<String>,
    pub nodes: Vec<&'a Node>,
}

impl<'a> SessionFileOut<'a> {
    pub fn from_tree(tree: &'a ContextTree, saved_at: DateTime<Utc>) -> Self {
        Self {
            version: FORMAT_VERSION,
            saved_at,
            current: tree.current_id(),
            recent_tags: tree.recent_tags(),
            nodes: tree.store().iter().collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SessionFileIn {
    pub version: u32,
    #[allow(dead_code)]
    pub saved_at: DateTime<Utc>,
    pub current: NodeId,
    #[serde(default)]
    pub recent_tags: Vec<String>,
    pub nodes: Vec<Node>,
}

impl SessionFileIn {
    /// Validate and rebuild the tree. The error names the broken invariant.
    pub fn into_tree(self) -> Result<ContextTree, String> {
        if self.version != FORMAT_VERSION {
            return Err(format!("unsupported format version {}", self.version));
        }
        let store = NodeStore::from_nodes(self.nodes)?;
        let tags = TagRegistry::from_recent(self.recent_tags)?;
        ContextTree::from_parts(store, self.current, tags)
    }
}

/// Just enough of a session file to list it.
#[derive(Debug, Deserialize)]
pub(crate) struct SessionHeader {
    pub saved_at: DateTime<Utc>,
    pub nodes: Vec<NodeTagView>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NodeTagView {
    #[serde(default)]
    pub tag: Option<String>,
}
