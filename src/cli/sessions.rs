use anyhow::Result;

use context_tree::config::CtreeConfig;
use context_tree::session::SessionStore;

use crate::repl::render;

/// List saved sessions, newest first, optionally only those with a node tagged `tag`.
pub fn sessions(config: &CtreeConfig, tag: Option<&str>) -> Result<()> {
    let store = SessionStore::new(config.resolved_sessions_dir());
    let sessions = match tag {
        Some(tag) => store.list_tagged(tag)?,
        None => store.list()?,
    };

    if sessions.is_empty() {
        match tag {
            Some(tag) => println!("No saved sessions contain a state tagged [{tag}]."),
            None => println!("No saved sessions in {}.", store.dir().display()),
        }
        return Ok(());
    }

    println!("Sessions in {}", store.dir().display());
    println!("{}", "=".repeat(40));
    for line in render::session_lines(&sessions) {
        println!("  {line}");
    }
    Ok(())
}
