//! Branching conversation sessions for a local language-model runtime.
//!
//! A conversation is a **context tree**: every prompt/response turn is a node,
//! and asking a new question always adds a child of the *current position*.
//! Moving back to an earlier node and asking again therefore starts a sibling
//! branch instead of overwriting anything. Every node keeps two addresses, a
//! chronological number and a dotted hierarchical id, displayed together as
//! `4 (1.2.1)`.
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`error`] — Error types for the tree, session files, and the backend
//! - [`tree`] — Node store, addressing, tags, and the current position
//! - [`session`] — Saving and loading named sessions as JSON files
//! - [`nav`] — Incremental-search picker with live preview
//! - [`backend`] — Inference backend trait and the Ollama client
//! - [`turn`] — Streaming a response and committing it as a node

pub mod backend;
pub mod config;
pub mod error;
pub mod nav;
pub mod session;
pub mod tree;
pub mod turn;
