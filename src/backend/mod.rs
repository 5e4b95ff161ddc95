//! Boundary to the language-model runtime.
//!
//! Provides the [`InferenceBackend`] trait and an Ollama implementation. A
//! backend takes the assembled conversation and hands back a pull-based
//! [`ChunkStream`] of response text; the caller decides when to stop reading.
//! The backend is created via [`create_backend`] from configuration.

pub mod ollama;

use std::pin::Pin;

use anyhow::Result;
use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::BackendError;
use crate::tree::types::Node;

/// Response text fragments in arrival order. The stream ends after the last
/// fragment; an `Err` item means the response failed and is incomplete.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, BackendError>> + Send>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// The optional system message, alternating user/assistant messages for
    /// each earlier turn, then `prompt`.
    pub fn conversation<'a>(
        system: Option<&str>,
        history: impl IntoIterator<Item = &'a Node>,
        prompt: &str,
    ) -> Vec<Self> {
        let mut messages: Vec<Self> = system.map(Self::system).into_iter().collect();
        for node in history {
            messages.push(Self::user(node.prompt.as_str()));
            messages.push(Self::assistant(node.response.as_str()));
        }
        messages.push(Self::user(prompt));
        messages
    }
}

/// A model runtime that can stream a chat completion.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Start a completion for `messages`. Errors here mean nothing was produced.
    async fn request(&self, model: &str, messages: &[ChatMessage]) -> Result<ChunkStream, BackendError>;

    /// Models the runtime can serve.
    async fn list_models(&self) -> Result<Vec<String>, BackendError>;
}

/// Create an inference backend from config.
///
/// Currently only `"ollama"` is supported.
pub fn create_backend(
    config: &crate::config::BackendConfig,
) -> Result<Box<dyn InferenceBackend>> {
    match config.provider.as_str() {
        "ollama" => {
            let backend = ollama::OllamaBackend::new(config)?;
            Ok(Box::new(backend))
        }
        other => anyhow::bail!("unknown inference provider: {other}. Supported: ollama"),
    }
}
