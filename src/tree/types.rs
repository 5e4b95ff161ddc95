//! Core node type definitions.
//!
//! Defines [`NodeId`] (the opaque, stable identity of a node) and [`Node`]
//! (one prompt/response turn, or the synthetic root).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable node identity. Assigned once at creation, never reused.
///
/// Backed by a UUID v7, so ids also sort by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(uuid::Uuid);

impl NodeId {
    pub(crate) fn generate() -> Self {
        Self(uuid::Uuid::now_v7())
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// One turn of the conversation: the prompt sent and the response received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Opaque stable identifier.
    pub id: NodeId,
    /// Parent node, `None` only for the root.
    pub parent: Option<NodeId>,
    /// Children in creation order.
    pub children: Vec<NodeId>,
    /// Global creation-order number. The root is 0.
    pub sequence: u64,
    pub prompt: String,
    pub response: String,
    /// Model that produced `response`. Empty for the root.
    #[serde(default)]
    pub model: String,
    /// Flat user tag, at most one per node.
    #[serde(default)]
    pub tag: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Node {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}
