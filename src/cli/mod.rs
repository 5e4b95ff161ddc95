//! One-shot subcommands that run without the interactive loop.

pub mod models;
pub mod sessions;
pub mod show;
