//! Candidate sources for nodes, tags, and saved sessions.

use crate::nav::{snippet, CandidateSource};
use crate::session::SessionSummary;
use crate::tree::address::{self, AddressBook};
use crate::tree::types::NodeId;
use crate::tree::ContextTree;

/// Nodes addressed by chronological number or dotted hierarchical id.
pub struct NodeSource<'t> {
    tree: &'t ContextTree,
    book: AddressBook,
    preview_chars: usize,
}

impl<'t> NodeSource<'t> {
    pub fn new(tree: &'t ContextTree, preview_chars: usize) -> Self {
        Self {
            tree,
            book: AddressBook::build(tree.store()),
            preview_chars,
        }
    }

    fn path_of(&self, id: NodeId) -> &[usize] {
        self.book.path(id).unwrap_or(&[])
    }
}

impl CandidateSource for NodeSource<'_> {
    type Item = NodeId;

    fn candidates(&self, query: &str) -> Vec<NodeId> {
        address::resolve_prefix_in(self.tree.store(), &self.book, query)
            .into_iter()
            .map(|n| n.id)
            .collect()
    }

    fn key(&self, item: &NodeId) -> String {
        let path = self.path_of(*item);
        match path {
            // The root has no dotted form; its sequence number is 0.
            [] => "0".into(),
            // Without the dot, "2" would read as sequence number 2.
            [ordinal] => format!("{ordinal}."),
            _ => address::format_path(path),
        }
    }

    fn describe(&self, item: &NodeId) -> String {
        let Ok(node) = self.tree.get(*item) else {
            return item.to_string();
        };
        let mut row = self.book.label(node);
        if let Some(tag) = &node.tag {
            row.push_str(&format!(" [{tag}]"));
        }
        if !node.prompt.is_empty() {
            row.push_str("  ");
            row.push_str(&snippet(&node.prompt, self.preview_chars));
        }
        if *item == self.tree.current_id() {
            row.push_str("  (current)");
        }
        row
    }

    fn preview(&self, item: &NodeId) -> String {
        let Ok(node) = self.tree.get(*item) else {
            return String::new();
        };
        if node.is_root() {
            return "(start of conversation)".into();
        }
        format!(
            "Q: {} | A: {}",
            snippet(&node.prompt, self.preview_chars),
            snippet(&node.response, self.preview_chars)
        )
    }

    fn accepts(&self, c: char) -> bool {
        c.is_ascii_digit() || c == '.'
    }
}

/// Recent tags filtered by prefix, plus any novel text.
pub struct TagSource {
    recent: Vec<String>,
}

impl TagSource {
    pub fn new(recent: Vec<String>) -> Self {
        Self { recent }
    }
}

impl CandidateSource for TagSource {
    type Item = String;

    fn candidates(&self, query: &str) -> Vec<String> {
        self.recent
            .iter()
            .filter(|t| t.starts_with(query))
            .cloned()
            .collect()
    }

    fn key(&self, item: &String) -> String {
        item.clone()
    }

    fn describe(&self, item: &String) -> String {
        item.clone()
    }

    fn preview(&self, item: &String) -> String {
        format!("tag: {item}")
    }

    fn free_form(&self, query: &str) -> Option<String> {
        (!query.trim().is_empty()).then(|| query.to_string())
    }
}

/// Saved sessions by name prefix.
pub struct SessionSource {
    sessions: Vec<SessionSummary>,
}

impl SessionSource {
    pub fn new(sessions: Vec<SessionSummary>) -> Self {
        Self { sessions }
    }

    fn find(&self, name: &str) -> Option<&SessionSummary> {
        self.sessions.iter().find(|s| s.name == name)
    }
}

impl CandidateSource for SessionSource {
    type Item = String;

    /// Every session for an empty query, so the list can be browsed at once.
    fn candidates(&self, query: &str) -> Vec<String> {
        self.sessions
            .iter()
            .filter(|s| s.name.starts_with(query))
            .map(|s| s.name.clone())
            .collect()
    }

    fn key(&self, item: &String) -> String {
        item.clone()
    }

    fn describe(&self, item: &String) -> String {
        match self.find(item) {
            Some(s) => format!(
                "{}  {} turns  saved {}",
                s.name,
                s.turn_count,
                s.saved_at.format("%Y-%m-%d %H:%M")
            ),
            None => item.clone(),
        }
    }

    fn preview(&self, item: &String) -> String {
        match self.find(item) {
            Some(s) if !s.tags.is_empty() => format!("tags: {}", s.tags.join(", ")),
            Some(_) => "no tags".into(),
            None => String::new(),
        }
    }
}
