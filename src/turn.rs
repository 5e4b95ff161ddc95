//! One prompt/response exchange, from request to committed node.
//!
//! Response fragments are buffered in a [`PendingResponse`] that is not part
//! of the tree. A node is created only once the stream finishes, so a failed
//! or cancelled turn leaves the tree and the current position untouched.

use futures::StreamExt;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::backend::{ChatMessage, InferenceBackend};
use crate::error::{BackendError, TreeError};
use crate::tree::types::NodeId;
use crate::tree::ContextTree;

#[derive(Debug, Error)]
pub enum TurnError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// How a turn ended without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The full response arrived and was stored as this node.
    Committed(NodeId),
    /// The caller stopped the stream. `partial` is the discarded text.
    Cancelled { partial: String },
}

/// Response text received so far. Not addressable, not persisted.
#[derive(Debug, Default, Clone)]
pub struct PendingResponse {
    text: String,
    chunks: usize,
}

impl PendingResponse {
    pub fn push(&mut self, chunk: &str) {
        self.text.push_str(chunk);
        self.chunks += 1;
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn chunks(&self) -> usize {
        self.chunks
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

/// Model and optional system message for a turn.
#[derive(Debug, Clone, Copy)]
pub struct TurnSettings<'a> {
    pub model: &'a str,
    pub system: Option<&'a str>,
}

impl<'a> TurnSettings<'a> {
    pub fn new(model: &'a str) -> Self {
        Self { model, system: None }
    }

    pub fn with_system(mut self, system: Option<&'a str>) -> Self {
        self.system = system;
        self
    }
}

/// The messages sent for `prompt` when asked from the current position.
pub fn build_messages(
    tree: &ContextTree,
    system: Option<&str>,
    prompt: &str,
) -> Result<Vec<ChatMessage>, TreeError> {
    let history = tree.history(tree.current_id())?;
    Ok(ChatMessage::conversation(system, history, prompt))
}

/// Ask `backend` for a response to `prompt` and, once it completes, append
/// it as a new child of the current position.
///
/// `on_chunk` sees every fragment as it arrives. Cancelling `cancel` at any
/// point abandons the turn.
pub async fn run_turn<F>(
    tree: &mut ContextTree,
    backend: &dyn InferenceBackend,
    settings: TurnSettings<'_>,
    prompt: &str,
    cancel: &CancellationToken,
    mut on_chunk: F,
) -> Result<TurnOutcome, TurnError>
where
    F: FnMut(&str),
{
    let TurnSettings { model, system } = settings;
    let messages = build_messages(tree, system, prompt)?;
    let parent = tree.current_id();

    let mut stream = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            tracing::info!("turn cancelled before the response started");
            return Ok(TurnOutcome::Cancelled { partial: String::new() });
        }
        stream = backend.request(model, &messages) => stream?,
    };

    let mut pending = PendingResponse::default();
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!(chunks = pending.chunks(), "turn cancelled mid-stream");
                return Ok(TurnOutcome::Cancelled { partial: pending.into_text() });
            }
            next = stream.next() => match next {
                Some(Ok(chunk)) => {
                    pending.push(&chunk);
                    on_chunk(&chunk);
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, chunks = pending.chunks(), "response stream failed");
                    return Err(e.into());
                }
                None => break,
            }
        }
    }

    let id = tree.append_turn(prompt, pending.text(), model)?;
    tracing::info!(node = %id, parent = %parent, chunks = pending.chunks(), "turn committed");
    Ok(TurnOutcome::Committed(id))
}
