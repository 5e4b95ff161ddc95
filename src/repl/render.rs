//! Text views of a tree for `/states`, `/compare`, `ctree show`, and the help
//! screen.

use colored::Colorize;

use context_tree::error::TreeError;
use context_tree::nav::snippet;
use context_tree::session::SessionSummary;
use context_tree::tree::address::AddressBook;
use context_tree::tree::types::{Node, NodeId};
use context_tree::tree::ContextTree;

use super::command::COMMANDS;

fn row(book: &AddressBook, node: &Node, current: NodeId, preview_chars: usize) -> String {
    let mut line = book.label(node).bold().to_string();
    if let Some(tag) = &node.tag {
        line.push_str(&format!(" {}", format!("[{tag}]").yellow()));
    }
    if !node.prompt.is_empty() {
        line.push_str("  ");
        line.push_str(&snippet(&node.prompt, preview_chars));
    }
    if node.id == current {
        line.push_str(&format!("  {}", "<- current".green().bold()));
    }
    line
}

/// The whole tree, depth first, children in creation order.
pub fn tree_lines(tree: &ContextTree, preview_chars: usize) -> Vec<String> {
    let store = tree.store();
    let book = AddressBook::build(store);
    let current = tree.current_id();
    let root = store.root();

    let mut lines = vec![row(&book, root, current, preview_chars)];
    // (node, indent prefix, is last sibling)
    let mut stack: Vec<(NodeId, String, bool)> = root
        .children
        .iter()
        .rev()
        .enumerate()
        .map(|(i, id)| (*id, String::new(), i == 0))
        .collect();

    while let Some((id, prefix, last)) = stack.pop() {
        let Ok(node) = store.get(id) else {
            continue;
        };
        let branch = if last { "└── " } else { "├── " };
        lines.push(format!(
            "{}{}{}",
            prefix,
            branch.dimmed(),
            row(&book, node, current, preview_chars)
        ));

        let child_prefix = format!("{prefix}{}", if last { "    " } else { "│   " });
        for (i, child) in node.children.iter().rev().enumerate() {
            stack.push((*child, child_prefix.clone(), i == 0));
        }
    }
    lines
}

/// Nodes carrying `tag`, flat, in creation order.
pub fn tagged_lines(tree: &ContextTree, tag: &str, preview_chars: usize) -> Vec<String> {
    let book = AddressBook::build(tree.store());
    let current = tree.current_id();
    tree.nodes_with_tag(tag)
        .into_iter()
        .map(|node| row(&book, node, current, preview_chars))
        .collect()
}

/// Siblings of the current state, numbered from 1 for `/compare <n>`.
pub fn sibling_lines(tree: &ContextTree, preview_chars: usize) -> Result<Vec<String>, TreeError> {
    let store = tree.store();
    let book = AddressBook::build(store);
    let current = tree.current_id();
    Ok(store
        .siblings(current)?
        .into_iter()
        .enumerate()
        .map(|(i, node)| format!("  {}. {}", i + 1, row(&book, node, current, preview_chars)))
        .collect())
}

/// The current state (A) next to `other` (B).
pub fn compare_lines(
    tree: &ContextTree,
    other: NodeId,
    preview_chars: usize,
) -> Result<Vec<String>, TreeError> {
    let book = AddressBook::build(tree.store());
    let a = tree.current();
    let b = tree.get(other)?;

    let mut lines = vec![
        "Branch comparison".bold().to_string(),
        format!("A: {}  B: {}", book.label(a).cyan(), book.label(b).cyan()),
        String::new(),
        "Prompt".yellow().to_string(),
        format!("A: {}", snippet(&a.prompt, preview_chars)),
        format!("B: {}", snippet(&b.prompt, preview_chars)),
        String::new(),
        "Response".green().to_string(),
        format!("A: {}", snippet(&a.response, preview_chars)),
        format!("B: {}", snippet(&b.response, preview_chars)),
    ];
    if a.tag.is_some() || b.tag.is_some() {
        let tag = |node: &Node| node.tag.as_deref().map_or("-".to_string(), |t| format!("[{t}]"));
        lines.push(String::new());
        lines.push("Tag".magenta().to_string());
        lines.push(format!("A: {}", tag(a)));
        lines.push(format!("B: {}", tag(b)));
    }
    Ok(lines)
}

/// One row per saved session, newest first as given.
pub fn session_lines(sessions: &[SessionSummary]) -> Vec<String> {
    let width = sessions.iter().map(|s| s.name.chars().count()).max().unwrap_or(0);
    sessions
        .iter()
        .map(|s| {
            let mut line = format!(
                "{:<width$}  {:>4} turns  {}",
                s.name,
                s.turn_count,
                s.saved_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M"),
            );
            if !s.tags.is_empty() {
                line.push_str(&format!("  {}", format!("[{}]", s.tags.join(", ")).yellow()));
            }
            line
        })
        .collect()
}

pub fn help_lines() -> Vec<String> {
    let mut lines = vec!["Commands:".bold().to_string()];
    for (usage, aliases, text) in COMMANDS {
        let alias = if aliases.is_empty() {
            String::new()
        } else {
            format!(" ({})", aliases.join(", "))
        };
        lines.push(format!("  {:<24} {}{}", usage, text, alias.dimmed()));
    }
    lines.push(String::new());
    lines.push("Anything else is sent to the model from the current state.".into());
    lines.push("Ctrl-C stops a response in progress without saving it.".into());
    lines
}
