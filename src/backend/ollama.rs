//! Ollama HTTP backend.
//!
//! Streams `POST /api/chat` responses, which arrive as newline-delimited JSON
//! objects carrying `message.content` fragments and a final `done: true`.

use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

use super::{ChatMessage, ChunkStream, InferenceBackend};
use crate::config::BackendConfig;
use crate::error::BackendError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct OllamaBackend {
    client: reqwest::Client,
    base_url: String,
}

impl OllamaBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    message: Option<ChunkMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

fn request_error(base_url: &str, err: reqwest::Error) -> BackendError {
    if err.is_connect() || err.is_timeout() {
        BackendError::Unavailable(format!(
            "cannot reach Ollama at {base_url} ({err}); is `ollama serve` running?"
        ))
    } else {
        BackendError::Failed(err.to_string())
    }
}

/// Turn a non-success response into a backend error, preferring Ollama's
/// own `{"error": ...}` message.
async fn status_error(response: reqwest::Response) -> BackendError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.error)
        .unwrap_or(body);
    BackendError::Failed(format!("HTTP {status}: {}", message.trim()))
}

#[async_trait]
impl InferenceBackend for OllamaBackend {
    async fn request(&self, model: &str, messages: &[ChatMessage]) -> Result<ChunkStream, BackendError> {
        let body = ChatRequest {
            model,
            messages,
            stream: true,
        };

        tracing::info!(model, messages = messages.len(), "sending chat request");
        let response = self
            .client
            .post(self.url("/api/chat"))
            .json(&body)
            .send()
            .await
            .map_err(|e| request_error(&self.base_url, e))?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        Ok(decode_chat_stream(response.bytes_stream()))
    }

    async fn list_models(&self) -> Result<Vec<String>, BackendError> {
        let response = self
            .client
            .get(self.url("/api/tags"))
            .send()
            .await
            .map_err(|e| request_error(&self.base_url, e))?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Protocol(e.to_string()))?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

/// Splits a byte stream into lines, holding partial lines across reads.
#[derive(Debug, Default)]
struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&line).trim().to_string());
        }
        lines
    }

    fn finish(&mut self) -> Option<String> {
        let rest = String::from_utf8_lossy(&std::mem::take(&mut self.buf))
            .trim()
            .to_string();
        (!rest.is_empty()).then_some(rest)
    }
}

struct DecodeState<S> {
    body: Pin<Box<S>>,
    lines: LineBuffer,
    pending: VecDeque<Result<String, BackendError>>,
    done: bool,
}

impl<S> DecodeState<S> {
    fn handle_line(&mut self, line: &str) {
        if line.is_empty() || self.done {
            return;
        }
        let chunk: ChatChunk = match serde_json::from_str(line) {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::debug!(error = %e, "skipping malformed stream line");
                return;
            }
        };
        if let Some(error) = chunk.error {
            self.pending.push_back(Err(BackendError::Failed(error)));
            self.done = true;
            return;
        }
        if let Some(message) = chunk.message {
            if !message.content.is_empty() {
                self.pending.push_back(Ok(message.content));
            }
        }
        if chunk.done {
            self.done = true;
        }
    }
}

/// Decode an NDJSON chat body into text fragments.
///
/// Ends cleanly only after a `done` line; a body that stops before that is
/// reported as a failed response.
pub(crate) fn decode_chat_stream<S, B, E>(body: S) -> ChunkStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = DecodeState {
        body: Box::pin(body),
        lines: LineBuffer::default(),
        pending: VecDeque::new(),
        done: false,
    };

    Box::pin(futures::stream::unfold(Some(state), |state| async move {
        let mut state = state?;
        loop {
            if let Some(item) = state.pending.pop_front() {
                let next = if item.is_err() { None } else { Some(state) };
                return Some((item, next));
            }
            if state.done {
                return None;
            }
            match state.body.next().await {
                Some(Ok(bytes)) => {
                    for line in state.lines.push(bytes.as_ref()) {
                        state.handle_line(&line);
                    }
                }
                Some(Err(e)) => {
                    state
                        .pending
                        .push_back(Err(BackendError::Failed(format!("stream interrupted: {e}"))));
                }
                None => {
                    if let Some(line) = state.lines.finish() {
                        state.handle_line(&line);
                    }
                    if !state.done {
                        state.pending.push_back(Err(BackendError::Protocol(
                            "response ended before completion".into(),
                        )));
                    }
                    state.done = true;
                }
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(parts: &[&str]) -> impl Stream<Item = Result<Vec<u8>, String>> + Send + Unpin {
        let parts: Vec<Result<Vec<u8>, String>> =
            parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect();
        futures::stream::iter(parts)
    }

    async fn collect(stream: ChunkStream) -> Vec<Result<String, BackendError>> {
        stream.collect().await
    }

    #[tokio::test]
    async fn decodes_fragments_split_across_reads() {
        let stream = decode_chat_stream(body(&[
            "{\"message\":{\"content\":\"Hel\"},\"done\":false}\n{\"mess",
            "age\":{\"content\":\"lo\"},\"done\":false}\n",
            "{\"message\":{\"content\":\"\"},\"done\":true}\n",
        ]));
        let items = collect(stream).await;
        assert_eq!(items, vec![Ok("Hel".to_string()), Ok("lo".to_string())]);
    }

    #[tokio::test]
    async fn skips_malformed_lines() {
        let stream = decode_chat_stream(body(&[
            "not json\n",
            "{\"message\":{\"content\":\"ok\"}}\n",
            "{\"done\":true}",
        ]));
        let items = collect(stream).await;
        assert_eq!(items, vec![Ok("ok".to_string())]);
    }

    #[tokio::test]
    async fn error_line_ends_stream_with_failure() {
        let stream = decode_chat_stream(body(&[
            "{\"message\":{\"content\":\"par\"}}\n",
            "{\"error\":\"model crashed\"}\n",
            "{\"message\":{\"content\":\"never\"}}\n",
        ]));
        let items = collect(stream).await;
        assert_eq!(
            items,
            vec![
                Ok("par".to_string()),
                Err(BackendError::Failed("model crashed".into()))
            ]
        );
    }

    #[tokio::test]
    async fn truncated_body_is_a_failure() {
        let stream = decode_chat_stream(body(&["{\"message\":{\"content\":\"cut\"}}\n"]));
        let items = collect(stream).await;
        assert_eq!(items.len(), 2);
        assert!(matches!(items[1], Err(BackendError::Protocol(_))));
    }
}
