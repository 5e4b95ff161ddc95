//! Slash-command parsing.
//!
//! Anything not starting with `/` is a prompt for the model.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Save(Option<String>),
    /// `name: None` browses saved sessions interactively, optionally narrowed
    /// to sessions carrying `tag`.
    Load { name: Option<String>, tag: Option<String> },
    New,
    States(Option<String>),
    /// `None` opens interactive tag entry.
    Tag(Option<String>),
    Untag,
    /// `None` opens interactive navigation.
    Goto(Option<String>),
    Up,
    Down(usize),
    Sessions(Option<String>),
    Model(Option<String>),
    Models,
    /// `None` clears the system message.
    System(Option<String>),
    /// `None` lists the current state's siblings; `Some(n)` compares with the
    /// n-th of them.
    Compare(Option<usize>),
    Clear,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Empty,
    Prompt(String),
    Command(Command),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command: /{0} (try /help)")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

/// Name, aliases, and one-line help for every command, in display order.
pub const COMMANDS: &[(&str, &[&str], &str)] = &[
    ("/save [name]", &[], "Save the tree (default name is timestamped)"),
    ("/load [name|*] [tag]", &[], "Load a session; no name or * browses"),
    ("/new", &[], "Discard the in-memory tree and start over"),
    ("/states [tag]", &["/s"], "Show the tree, or nodes with a tag"),
    ("/tag [text]", &["/t"], "Tag the current state; no text opens tag entry"),
    ("/untag", &[], "Remove the current state's tag"),
    ("/goto [address]", &["/r", "/revert", "/cd"], "Move to a state; no address opens live search"),
    ("/up", &["/u"], "Move to the parent state"),
    ("/down <n>", &["/d"], "Move to the n-th child"),
    ("/sessions [tag]", &["/ls"], "List saved sessions"),
    ("/model [name]", &["/m"], "Show or set the model"),
    ("/models", &[], "List models the backend can serve"),
    ("/system [text]", &["/sys"], "Set the system message; no text clears it"),
    ("/compare [n]", &["/c"], "List sibling branches, or compare with the n-th"),
    ("/clear", &[], "Clear the screen"),
    ("/help", &["/h", "/?"], "Show this help"),
    ("/quit", &["/q", "/exit"], "Exit"),
];

fn optional(rest: &str) -> Option<String> {
    let rest = rest.trim();
    (!rest.is_empty()).then(|| rest.to_string())
}

/// Everything after the separator, untouched. Blank text is `None`.
fn verbatim(rest: &str) -> Option<String> {
    let rest = rest.trim_start();
    (!rest.trim().is_empty()).then(|| rest.to_string())
}

pub fn parse_input(line: &str) -> Result<Input, CommandError> {
    if line.trim().is_empty() {
        return Ok(Input::Empty);
    }
    let Some(body) = line.trim_start().strip_prefix('/') else {
        return Ok(Input::Prompt(line.trim_end().to_string()));
    };

    let (name, rest) = body
        .split_once(char::is_whitespace)
        .unwrap_or((body, ""));

    let command = match name.to_lowercase().as_str() {
        "save" => Command::Save(optional(rest)),
        "load" => {
            let mut parts = rest.split_whitespace();
            let name = parts.next().filter(|n| *n != "*").map(str::to_string);
            let tag = optional(&parts.collect::<Vec<_>>().join(" "));
            Command::Load { name, tag }
        }
        "new" => Command::New,
        "states" | "s" => Command::States(optional(rest)),
        "tag" | "t" => Command::Tag(verbatim(rest)),
        "untag" => Command::Untag,
        "goto" | "revert" | "cd" | "r" => Command::Goto(optional(rest)),
        "up" | "u" => Command::Up,
        "down" | "d" => {
            let n = rest
                .trim()
                .parse::<usize>()
                .map_err(|_| CommandError::Usage("/down <n>"))?;
            Command::Down(n)
        }
        "sessions" | "ls" => Command::Sessions(optional(rest)),
        "model" | "m" => Command::Model(optional(rest)),
        "models" => Command::Models,
        "system" | "sys" => Command::System(optional(rest)),
        "compare" | "c" => match optional(rest) {
            None => Command::Compare(None),
            Some(n) => Command::Compare(Some(
                n.parse::<usize>().map_err(|_| CommandError::Usage("/compare [n]"))?,
            )),
        },
        "clear" => Command::Clear,
        "help" | "h" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Input::Command(command))
}
