//! Error taxonomy for the tree engine, session files, and the inference boundary.
//!
//! Every variant here is recoverable at the command level: the interactive loop
//! reports it and keeps running.

use std::path::PathBuf;

use thiserror::Error;

use crate::tree::types::NodeId;

/// Referencing a node that is not in the store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("no such state: {0}")]
    NotFound(NodeId),
    #[error("no such state to branch from: {0}")]
    InvalidParent(NodeId),
    #[error("no such state to tag: {0}")]
    InvalidNode(NodeId),
}

/// Failures while saving, loading, or listing session files.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found: {name}{}", format_available(available))]
    NotFound { name: String, available: Vec<String> },
    #[error("invalid session name: {0:?}")]
    InvalidName(String),
    #[error("session I/O failed at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt session file {}: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },
    #[error("failed to encode session: {0}")]
    Encode(#[from] serde_json::Error),
}

fn format_available(available: &[String]) -> String {
    if available.is_empty() {
        String::new()
    } else {
        format!(" (available: {})", available.join(", "))
    }
}

impl SessionError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Failures reported by the inference backend, before or during a stream.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("backend error: {0}")]
    Failed(String),
    #[error("unexpected backend response: {0}")]
    Protocol(String),
}
