#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream;
use tempfile::TempDir;

use context_tree::backend::{ChatMessage, ChunkStream, InferenceBackend};
use context_tree::error::BackendError;
use context_tree::session::SessionStore;
use context_tree::tree::types::NodeId;
use context_tree::tree::ContextTree;

/// Backend that replays a fixed list of chunks, optionally failing after them.
pub struct ScriptedBackend {
    pub chunks: Vec<String>,
    /// Yielded after every chunk when set.
    pub fail_with: Option<BackendError>,
    /// Refuse the request outright.
    pub unavailable: bool,
    /// Never finish the stream after the chunks, until the caller cancels.
    pub hang: bool,
    pub models: Vec<String>,
    /// Every message list passed to `request`, oldest first.
    pub requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedBackend {
    pub fn replying(chunks: &[&str]) -> Self {
        Self {
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            fail_with: None,
            unavailable: false,
            hang: false,
            models: vec!["test-model".to_string()],
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_after(chunks: &[&str], error: BackendError) -> Self {
        Self {
            fail_with: Some(error),
            ..Self::replying(chunks)
        }
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::replying(&[])
        }
    }

    pub fn hanging_after(chunks: &[&str]) -> Self {
        Self {
            hang: true,
            ..Self::replying(chunks)
        }
    }

    pub fn last_request(&self) -> Vec<ChatMessage> {
        self.requests.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl InferenceBackend for ScriptedBackend {
    async fn request(&self, _model: &str, messages: &[ChatMessage]) -> Result<ChunkStream, BackendError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        if self.unavailable {
            return Err(BackendError::Unavailable("connection refused".into()));
        }
        let mut items: Vec<Result<String, BackendError>> =
            self.chunks.iter().cloned().map(Ok).collect();
        if let Some(err) = &self.fail_with {
            items.push(Err(err.clone()));
        }
        let head = stream::iter(items);
        if self.hang {
            Ok(Box::pin(futures::StreamExt::chain(head, stream::pending())))
        } else {
            Ok(Box::pin(head))
        }
    }

    async fn list_models(&self) -> Result<Vec<String>, BackendError> {
        if self.unavailable {
            return Err(BackendError::Unavailable("connection refused".into()));
        }
        Ok(self.models.clone())
    }
}

/// Append `count` turns in a straight line from the current position.
/// Returns the new ids in creation order.
pub fn linear_turns(tree: &mut ContextTree, count: usize) -> Vec<NodeId> {
    (1..=count)
        .map(|i| {
            tree.append_turn(&format!("question {i}"), &format!("answer {i}"), "test-model")
                .unwrap()
        })
        .collect()
}

/// root -> 1 -> 2, back to 1, then 3:
///
/// ```text
/// 0 (root)
/// └── 1 (1)
///     ├── 2 (1.1)
///     └── 3 (1.2)
/// ```
pub fn branched_tree() -> (ContextTree, [NodeId; 3]) {
    let mut tree = ContextTree::new();
    let one = tree.append_turn("plan a trip", "where to?", "test-model").unwrap();
    let two = tree.append_turn("Japan", "great choice", "test-model").unwrap();
    tree.move_to(one).unwrap();
    let three = tree.append_turn("Portugal", "also great", "test-model").unwrap();
    (tree, [one, two, three])
}

/// A session store over a fresh temp directory. Keep the `TempDir` alive.
pub fn temp_sessions() -> (TempDir, SessionStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::new(dir.path().join("trees"));
    (dir, store)
}
