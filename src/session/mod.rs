//! Named, file-backed snapshots of a context tree.
//!
//! [`SessionStore`] reads and writes `<name>.json` files in a single directory
//! (`~/.context-tree/trees/` by default). Saving overwrites without prompting;
//! loading is all-or-nothing, so a missing or corrupt file never disturbs the
//! caller's in-memory tree.

pub mod format;

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use crate::error::SessionError;
use crate::tree::ContextTree;
use format::{SessionFileIn, SessionFileOut, SessionHeader};

const EXTENSION: &str = "json";
const RESERVED_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// One saved session, as shown by `/sessions`.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub name: String,
    pub saved_at: DateTime<Utc>,
    /// Turns in the session, not counting the root.
    pub turn_count: usize,
    /// Distinct node tags, in first-seen order.
    pub tags: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

/// A fresh single-root tree. Touches no files.
pub fn new_session() -> ContextTree {
    ContextTree::new()
}

/// Name used by `/save` without an argument, e.g. `conversation_20261018_091244`.
pub fn default_name(now: DateTime<Local>) -> String {
    format!("conversation_{}", now.format("%Y%m%d_%H%M%S"))
}

/// Accepts `name` or `name.json`; returns the bare name.
///
/// Names cannot hold whitespace, since `/load <name> <tag>` splits on it.
pub fn normalize_name(name: &str) -> Result<String, SessionError> {
    let trimmed = name.trim();
    let bare = trimmed
        .strip_suffix(".json")
        .unwrap_or(trimmed);
    let valid = !bare.is_empty()
        && bare != "."
        && bare != ".."
        && !bare.contains(RESERVED_CHARS)
        && !bare.chars().any(|c| c.is_control() || c.is_whitespace());
    if valid {
        Ok(bare.to_string())
    } else {
        Err(SessionError::InvalidName(name.to_string()))
    }
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str) -> Result<PathBuf, SessionError> {
        let name = normalize_name(name)?;
        Ok(self.dir.join(format!("{name}.{EXTENSION}")))
    }

    /// Write the whole tree to `name` (or a timestamped default name),
    /// replacing any earlier file of that name. Returns the written path.
    pub fn save(&self, tree: &ContextTree, name: Option<&str>) -> Result<PathBuf, SessionError> {
        let name = match name {
            Some(name) => normalize_name(name)?,
            None => default_name(Local::now()),
        };
        let path = self.path_for(&name)?;

        std::fs::create_dir_all(&self.dir).map_err(|e| SessionError::io(&self.dir, e))?;

        let file = SessionFileOut::from_tree(tree, Utc::now());
        let json = serde_json::to_string_pretty(&file)?;

        // Write next to the target, then rename over it.
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json).map_err(|e| SessionError::io(&tmp_path, e))?;
        std::fs::rename(&tmp_path, &path).map_err(|e| SessionError::io(&path, e))?;

        tracing::info!(
            session = %name,
            path = %path.display(),
            nodes = tree.store().len(),
            "session saved"
        );
        Ok(path)
    }

    /// Read the session called exactly `name`.
    pub fn load(&self, name: &str) -> Result<ContextTree, SessionError> {
        let path = self.path_for(name)?;
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(SessionError::NotFound {
                    name: name.to_string(),
                    available: self.names().unwrap_or_default(),
                });
            }
            Err(e) => return Err(SessionError::io(&path, e)),
        };

        let file: SessionFileIn = serde_json::from_str(&contents)
            .map_err(|e| SessionError::corrupt(&path, e.to_string()))?;
        let tree = file
            .into_tree()
            .map_err(|reason| SessionError::corrupt(&path, reason))?;

        tracing::info!(
            path = %path.display(),
            nodes = tree.store().len(),
            "session loaded"
        );
        Ok(tree)
    }

    /// Session names in the directory, sorted. A missing directory is empty.
    pub fn names(&self) -> Result<Vec<String>, SessionError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(SessionError::io(&self.dir, e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SessionError::io(&self.dir, e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Summaries of every readable session, newest first. Files that fail to
    /// parse are skipped with a warning.
    pub fn list(&self) -> Result<Vec<SessionSummary>, SessionError> {
        let mut summaries = Vec::new();
        for name in self.names()? {
            match self.summarize(&name) {
                Ok(summary) => summaries.push(summary),
                Err(e) => tracing::warn!(session = %name, error = %e, "skipping unreadable session"),
            }
        }
        summaries.sort_by(|a, b| b.saved_at.cmp(&a.saved_at).then_with(|| a.name.cmp(&b.name)));
        Ok(summaries)
    }

    /// Sessions with at least one node tagged exactly `tag`.
    pub fn list_tagged(&self, tag: &str) -> Result<Vec<SessionSummary>, SessionError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|s| s.tags.iter().any(|t| t == tag))
            .collect())
    }

    fn summarize(&self, name: &str) -> Result<SessionSummary, SessionError> {
        let path = self.path_for(name)?;
        let contents = std::fs::read_to_string(&path).map_err(|e| SessionError::io(&path, e))?;
        let header: SessionHeader = serde_json::from_str(&contents)
            .map_err(|e| SessionError::corrupt(&path, e.to_string()))?;

        let mut tags: Vec<String> = Vec::new();
        for tag in header.nodes.iter().filter_map(|n| n.tag.as_ref()) {
            if !tags.contains(tag) {
                tags.push(tag.clone());
            }
        }

        Ok(SessionSummary {
            name: name.to_string(),
            saved_at: header.saved_at,
            turn_count: header.nodes.len().saturating_sub(1),
            tags,
        })
    }
}
