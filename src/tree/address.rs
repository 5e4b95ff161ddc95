//! Chronological and hierarchical node addresses.
//!
//! Every node has two derived coordinates:
//!
//! - its **chronological number**, the global sequence number assigned at
//!   creation (`4`), and
//! - its **hierarchical id**, the dot-joined 1-based ordinals of each step from
//!   the root down to the node (`1.2.1`).
//!
//! The root's hierarchical id is the empty path, displayed as `root`, so the
//! root's label is `0 (root)`.
//!
//! User input is resolved by [`resolve_prefix`]. Text containing a dot is
//! matched hierarchically by whole segments (`1.2` matches `1.2` and `1.2.3`
//! but not `1.20`); text without a dot is matched against the decimal string
//! of each sequence number (`1` matches `1`, `10`, `11`, ...).

use std::collections::HashMap;

use crate::error::TreeError;
use crate::tree::store::NodeStore;
use crate::tree::types::{Node, NodeId};

/// Display text for the root's empty hierarchical path.
pub const ROOT_PATH_LABEL: &str = "root";

/// Hierarchical path of a single node: the ordinal of each step below the root.
pub fn hierarchical_path(store: &NodeStore, id: NodeId) -> Result<Vec<usize>, TreeError> {
    let chain = store.ancestors(id)?;
    let mut path = Vec::with_capacity(chain.len().saturating_sub(1));
    for pair in chain.windows(2) {
        let (parent, child) = (pair[0], pair[1]);
        let ordinal = parent
            .children
            .iter()
            .position(|&c| c == child.id)
            .ok_or(TreeError::NotFound(child.id))?;
        path.push(ordinal + 1);
    }
    Ok(path)
}

/// Dotted form of a hierarchical path. Empty for the root.
pub fn format_path(path: &[usize]) -> String {
    path.iter()
        .map(|ordinal| ordinal.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

/// `"<sequence> (<hierarchical id>)"`, e.g. `"4 (1.2.1)"` or `"0 (root)"`.
pub fn label(store: &NodeStore, id: NodeId) -> Result<String, TreeError> {
    let node = store.get(id)?;
    let path = hierarchical_path(store, id)?;
    Ok(format_label(node.sequence, &path))
}

pub fn format_label(sequence: u64, path: &[usize]) -> String {
    if path.is_empty() {
        format!("{sequence} ({ROOT_PATH_LABEL})")
    } else {
        format!("{sequence} ({})", format_path(path))
    }
}

/// Hierarchical paths for every node, computed in one pass.
///
/// Parents always precede children in sequence order, so each path is the
/// parent's path plus one ordinal.
#[derive(Debug, Clone, Default)]
pub struct AddressBook {
    paths: HashMap<NodeId, Vec<usize>>,
}

impl AddressBook {
    pub fn build(store: &NodeStore) -> Self {
        let mut paths: HashMap<NodeId, Vec<usize>> = HashMap::with_capacity(store.len());
        for node in store.iter() {
            let base = paths.entry(node.id).or_default().clone();
            for (i, child) in node.children.iter().enumerate() {
                let mut path = base.clone();
                path.push(i + 1);
                paths.insert(*child, path);
            }
        }
        Self { paths }
    }

    pub fn path(&self, id: NodeId) -> Option<&[usize]> {
        self.paths.get(&id).map(Vec::as_slice)
    }

    pub fn label(&self, node: &Node) -> String {
        format_label(node.sequence, self.path(node.id).unwrap_or(&[]))
    }
}

/// A parsed address fragment, as typed so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressQuery<'a> {
    /// Digits only: prefix of a sequence number's decimal string.
    Chronological(&'a str),
    /// Dotted: complete leading segments of a hierarchical id.
    Hierarchical(Vec<&'a str>),
}

impl<'a> AddressQuery<'a> {
    /// Parse user input. `None` when the text cannot address any node
    /// (empty, non-digit characters, empty inner segments, leading zeros).
    pub fn parse(text: &'a str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if !text.contains('.') {
            return (is_number(text) || text == "0").then_some(Self::Chronological(text));
        }

        let mut segments: Vec<&str> = text.split('.').collect();
        // A trailing dot is a segment still being typed.
        if segments.last() == Some(&"") {
            segments.pop();
        }
        let valid = !segments.is_empty() && segments.iter().all(|s| is_number(s));
        valid.then_some(Self::Hierarchical(segments))
    }

    fn matches(&self, sequence: u64, path: &[usize]) -> bool {
        match self {
            Self::Chronological(prefix) => sequence.to_string().starts_with(prefix),
            Self::Hierarchical(segments) => {
                segments.len() <= path.len()
                    && segments
                        .iter()
                        .zip(path)
                        .all(|(segment, ordinal)| *segment == ordinal.to_string())
            }
        }
    }
}

/// Non-empty digits with no leading zero. Sequence numbers and ordinals are
/// never written with one, so `01` would match nothing as a string.
fn is_number(text: &str) -> bool {
    !text.starts_with('0') && !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

/// Every node the typed text could still be heading for, ascending by
/// sequence number. Unmatched or unparseable input yields an empty list.
pub fn resolve_prefix<'s>(store: &'s NodeStore, text: &str) -> Vec<&'s Node> {
    resolve_prefix_in(store, &AddressBook::build(store), text)
}

/// [`resolve_prefix`] against an already built [`AddressBook`], for callers
/// resolving on every keystroke.
pub fn resolve_prefix_in<'s>(store: &'s NodeStore, book: &AddressBook, text: &str) -> Vec<&'s Node> {
    let Some(query) = AddressQuery::parse(text) else {
        return Vec::new();
    };
    store
        .iter()
        .filter(|node| query.matches(node.sequence, book.path(node.id).unwrap_or(&[])))
        .collect()
}

/// Resolve a complete address to exactly one node.
///
/// `"4"` is sequence number 4; `"1.2.1"` (or `"1."`) is a hierarchical id.
pub fn find_exact<'s>(store: &'s NodeStore, text: &str) -> Option<&'s Node> {
    match AddressQuery::parse(text)? {
        AddressQuery::Chronological(digits) => store.by_sequence(digits.parse().ok()?),
        AddressQuery::Hierarchical(segments) => {
            let mut node = store.root();
            for segment in segments {
                let ordinal: usize = segment.parse().ok()?;
                let child = *node.children.get(ordinal.checked_sub(1)?)?;
                node = store.get(child).ok()?;
            }
            Some(node)
        }
    }
}
