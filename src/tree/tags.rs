//! Flat per-node tags and the recent-tag list.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::TreeError;
use crate::tree::store::NodeStore;
use crate::tree::types::{Node, NodeId};

/// Maximum number of distinct tags remembered for quick re-entry.
pub const RECENT_TAG_LIMIT: usize = 5;

/// Tree-level tag metadata: unique recent tags, most recent first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagRegistry {
    recent: VecDeque<String>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from a persisted list. Duplicates and overflow are rejected
    /// rather than repaired.
    pub(crate) fn from_recent(recent: Vec<String>) -> Result<Self, String> {
        if recent.len() > RECENT_TAG_LIMIT {
            return Err(format!(
                "{} recent tags, at most {RECENT_TAG_LIMIT} allowed",
                recent.len()
            ));
        }
        for (i, tag) in recent.iter().enumerate() {
            if recent[..i].contains(tag) {
                return Err(format!("duplicate recent tag {tag:?}"));
            }
            if tag.trim().is_empty() {
                return Err("blank recent tag".into());
            }
        }
        Ok(Self {
            recent: recent.into(),
        })
    }

    /// Tag `id` with `text`, replacing any earlier tag.
    ///
    /// Blank text clears the node's tag and leaves the recent list alone.
    /// Any other text is stored verbatim and moves to the front of the
    /// recent list.
    pub fn set_tag(&mut self, store: &mut NodeStore, id: NodeId, text: &str) -> Result<(), TreeError> {
        let node = store.get_mut(id).ok_or(TreeError::InvalidNode(id))?;

        if text.trim().is_empty() {
            node.tag = None;
            tracing::debug!(node = %id, "tag cleared");
            return Ok(());
        }

        node.tag = Some(text.to_string());
        self.touch(text);
        tracing::debug!(node = %id, tag = text, "tag set");
        Ok(())
    }

    fn touch(&mut self, text: &str) {
        self.recent.retain(|t| t != text);
        self.recent.push_front(text.to_string());
        self.recent.truncate(RECENT_TAG_LIMIT);
    }

    /// Most recent first, at most [`RECENT_TAG_LIMIT`] entries.
    pub fn recent_tags(&self) -> Vec<String> {
        self.recent.iter().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }
}

/// Nodes carrying exactly `tag`, in sequence order.
pub fn nodes_with_tag<'s>(store: &'s NodeStore, tag: &str) -> Vec<&'s Node> {
    store
        .iter()
        .filter(|n| n.tag.as_deref() == Some(tag))
        .collect()
}
