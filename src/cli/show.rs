use anyhow::{Context, Result};

use context_tree::config::CtreeConfig;
use context_tree::session::SessionStore;

use crate::repl::render;

/// Print a saved session's tree without starting a chat.
pub fn show(config: &CtreeConfig, name: &str) -> Result<()> {
    let store = SessionStore::new(config.resolved_sessions_dir());
    let tree = store
        .load(name)
        .with_context(|| format!("failed to open session {name}"))?;

    println!("{name}: {} turns, {} recent tags", tree.turn_count(), tree.recent_tags().len());
    if !tree.recent_tags().is_empty() {
        println!("Recent tags: {}", tree.recent_tags().join(", "));
    }
    println!();
    for line in render::tree_lines(&tree, config.display.preview_chars) {
        println!("{line}");
    }
    Ok(())
}
