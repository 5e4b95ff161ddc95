//! The interactive chat loop behind `ctree chat`.
//!
//! Reads a line with rustyline, sends plain text to the model from the current
//! state and dispatches slash commands. Every command failure is printed and
//! the loop carries on; only a broken terminal ends the session early.

pub mod command;
pub mod render;

use std::borrow::Cow::{self, Borrowed, Owned};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context as _, Result};
use colored::Colorize;
use crossterm::{
    cursor::MoveTo,
    execute,
    terminal::{Clear, ClearType},
};
use indicatif::{ProgressBar, ProgressStyle};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tokio_util::sync::CancellationToken;

use context_tree::backend::InferenceBackend;
use context_tree::config::{default_ctree_dir, CtreeConfig};
use context_tree::nav::{snippet, terminal, NodeSource, Picker, SessionSource, TagSource};
use context_tree::session::{self, SessionStore};
use context_tree::tree::ContextTree;
use context_tree::turn::{self, TurnOutcome, TurnSettings};

use command::{parse_input, Command, Input, COMMANDS};

/// Slash-command completion and inline hints for the prompt line.
struct CommandHelper {
    commands: Vec<String>,
}

impl CommandHelper {
    fn new() -> Self {
        let mut commands = Vec::new();
        for (usage, aliases, _) in COMMANDS {
            if let Some(name) = usage.split_whitespace().next() {
                commands.push(name.to_string());
            }
            commands.extend(aliases.iter().map(|a| a.to_string()));
        }
        Self { commands }
    }
}

impl Helper for CommandHelper {}

impl Completer for CommandHelper {
    type Candidate = Pair;

    fn complete(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];
        if !line.starts_with('/') || line.contains(' ') {
            return Ok((0, vec![]));
        }
        let candidates = self
            .commands
            .iter()
            .filter(|cmd| cmd.starts_with(line))
            .map(|cmd| Pair {
                display: cmd.clone(),
                replacement: cmd.clone(),
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Highlighter for CommandHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Owned(hint.dimmed().to_string())
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CommandHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];
        if !line.starts_with('/') || line.contains(' ') {
            return None;
        }
        self.commands
            .iter()
            .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
            .map(|cmd| cmd[line.len()..].to_string())
    }
}

impl Validator for CommandHelper {}

enum Flow {
    Continue,
    Quit,
}

pub struct App {
    config: CtreeConfig,
    backend: Box<dyn InferenceBackend>,
    sessions: SessionStore,
    tree: ContextTree,
    model: Option<String>,
    /// Sent ahead of the history on every turn. Not saved with the session.
    system: Option<String>,
}

fn history_path() -> PathBuf {
    default_ctree_dir().join("history")
}

impl App {
    pub fn new(config: CtreeConfig, backend: Box<dyn InferenceBackend>, sessions: SessionStore) -> Self {
        let model = config.backend.model.clone();
        Self {
            config,
            backend,
            sessions,
            tree: session::new_session(),
            model,
            system: None,
        }
    }

    /// Start from a saved session instead of an empty tree.
    pub fn load_initial(&mut self, name: &str) -> Result<()> {
        self.load_session(name, None)
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut editor: Editor<CommandHelper, DefaultHistory> = Editor::new()?;
        editor.set_helper(Some(CommandHelper::new()));
        let history = history_path();
        if let Err(e) = editor.load_history(&history) {
            tracing::debug!(path = %history.display(), error = %e, "no prompt history loaded");
        }

        self.print_banner();

        loop {
            let prompt = format!("[{}] > ", self.current_label());
            match editor.readline(&prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        let _ = editor.add_history_entry(line.as_str());
                    }
                    match self.handle_line(&line).await {
                        Ok(Flow::Continue) => {}
                        Ok(Flow::Quit) => break,
                        Err(e) => eprintln!("{}", format!("error: {e:#}").red()),
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("{}", "(type /quit to exit)".dimmed());
                }
                Err(ReadlineError::Eof) => break,
                Err(e) => return Err(e).context("failed to read input"),
            }
        }

        if let Some(dir) = history.parent() {
            let _ = std::fs::create_dir_all(dir);
        }
        if let Err(e) = editor.save_history(&history) {
            tracing::warn!(path = %history.display(), error = %e, "failed to save prompt history");
        }
        Ok(())
    }

    fn print_banner(&self) {
        println!("{}", "context-tree".bold().cyan());
        let model = self.model.as_deref().unwrap_or("(first available)");
        println!(
            "{}",
            format!("model: {model}  sessions: {}", self.sessions.dir().display()).dimmed()
        );
        println!("{}", "Type a message, or /help for commands.".dimmed());
        println!();
    }

    fn current_label(&self) -> String {
        self.tree
            .label(self.tree.current_id())
            .unwrap_or_else(|_| self.tree.current_id().to_string())
    }

    async fn handle_line(&mut self, line: &str) -> Result<Flow> {
        match parse_input(line)? {
            Input::Empty => Ok(Flow::Continue),
            Input::Prompt(prompt) => {
                self.send_prompt(&prompt).await?;
                Ok(Flow::Continue)
            }
            Input::Command(command) => self.dispatch(command).await,
        }
    }

    async fn dispatch(&mut self, command: Command) -> Result<Flow> {
        match command {
            Command::Save(name) => self.save(name.as_deref())?,
            Command::Load { name, tag } => {
                let name = match name {
                    Some(name) => name,
                    None => match self.pick_session(tag.as_deref())? {
                        Some(name) => name,
                        None => return Ok(Flow::Continue),
                    },
                };
                self.load_session(&name, tag.as_deref())?;
            }
            Command::New => {
                self.tree.reset();
                println!("Started a new conversation. Unsaved turns were discarded.");
            }
            Command::States(tag) => self.show_states(tag.as_deref()),
            Command::Tag(text) => {
                let text = match text {
                    Some(text) => text,
                    None => match self.pick_tag()? {
                        Some(text) => text,
                        None => return Ok(Flow::Continue),
                    },
                };
                self.tree.tag_current(&text)?;
                match &self.tree.current().tag {
                    Some(tag) => println!("Tagged {} as {}", self.current_label(), format!("[{tag}]").yellow()),
                    None => println!("Cleared the tag on {}", self.current_label()),
                }
            }
            Command::Untag => {
                self.tree.tag_current("")?;
                println!("Cleared the tag on {}", self.current_label());
            }
            Command::Goto(Some(address)) => {
                let id = self
                    .tree
                    .find_exact(&address)
                    .map(|node| node.id)
                    .with_context(|| format!("no such state: {address}"))?;
                self.tree.move_to(id)?;
                println!("Now at {}", self.current_label());
            }
            Command::Goto(None) => self.navigate()?,
            Command::Up => {
                if self.tree.up().is_some() {
                    println!("Now at {}", self.current_label());
                } else {
                    println!("Already at the root.");
                }
            }
            Command::Down(n) => {
                if self.tree.down(n).is_some() {
                    println!("Now at {}", self.current_label());
                } else {
                    println!("{} has no child {n}.", self.current_label());
                }
            }
            Command::Sessions(tag) => self.list_sessions(tag.as_deref())?,
            Command::Model(Some(name)) => {
                println!("Model set to {name}");
                self.model = Some(name);
            }
            Command::Model(None) => match &self.model {
                Some(model) => println!("Model: {model}"),
                None => println!("No model selected; the first available one is used."),
            },
            Command::Models => self.list_models().await?,
            Command::System(Some(text)) => {
                println!("System message set: {}", snippet(&text, 50));
                self.system = Some(text);
            }
            Command::System(None) => {
                if self.system.take().is_some() {
                    println!("System message cleared.");
                } else {
                    println!("No system message set.");
                }
            }
            Command::Compare(choice) => self.compare(choice)?,
            Command::Clear => {
                execute!(io::stdout(), Clear(ClearType::All), MoveTo(0, 0))?;
            }
            Command::Help => {
                for line in render::help_lines() {
                    println!("{line}");
                }
            }
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    /// Stream a response to `prompt` from the current state. Ctrl-C stops it
    /// and discards the partial text.
    async fn send_prompt(&mut self, prompt: &str) -> Result<()> {
        let model = self.resolve_model().await?;

        let cancel = CancellationToken::new();
        let watcher = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            }
        });

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(format!("{model} is thinking..."));
        spinner.enable_steady_tick(Duration::from_millis(80));

        let mut started = false;
        let mut out = io::stdout();
        let settings = TurnSettings::new(&model).with_system(self.system.as_deref());
        let result = turn::run_turn(
            &mut self.tree,
            self.backend.as_ref(),
            settings,
            prompt,
            &cancel,
            |chunk| {
                if !started {
                    spinner.finish_and_clear();
                    started = true;
                }
                let _ = write!(out, "{chunk}");
                let _ = out.flush();
            },
        )
        .await;

        watcher.abort();
        spinner.finish_and_clear();
        if started {
            println!();
        }

        match result.context("turn failed; nothing was added to the tree")? {
            TurnOutcome::Committed(id) => {
                println!("{}", format!("[{}]", self.tree.label(id)?).dimmed());
            }
            TurnOutcome::Cancelled { partial } => {
                println!(
                    "{}",
                    format!(
                        "(stopped; {} characters discarded, still at {})",
                        partial.chars().count(),
                        self.current_label()
                    )
                    .yellow()
                );
            }
        }
        Ok(())
    }

    async fn resolve_model(&mut self) -> Result<String> {
        if let Some(model) = &self.model {
            return Ok(model.clone());
        }
        let models = self
            .backend
            .list_models()
            .await
            .context("no model configured and the backend could not list its models")?;
        let first = models
            .into_iter()
            .next()
            .context("the backend has no models; pull one first (e.g. `ollama pull llama3.2`)")?;
        println!("{}", format!("using model {first}").dimmed());
        self.model = Some(first.clone());
        Ok(first)
    }

    fn save(&self, name: Option<&str>) -> Result<()> {
        let path = self.sessions.save(&self.tree, name)?;
        println!(
            "Saved {} turns to {}",
            self.tree.turn_count(),
            path.display()
        );
        Ok(())
    }

    /// Replace the live tree with a saved one. Nothing changes on failure.
    fn load_session(&mut self, name: &str, tag: Option<&str>) -> Result<()> {
        let tree = self.sessions.load(name)?;
        self.tree = tree;

        if let Some(tag) = tag {
            let newest = self.tree.nodes_with_tag(tag).last().map(|node| node.id);
            match newest {
                Some(id) => {
                    self.tree.move_to(id)?;
                }
                None => println!(
                    "{}",
                    format!("no state tagged [{tag}] in {name}; keeping the saved position").yellow()
                ),
            }
        }

        println!(
            "Loaded {name} ({} turns), now at {}",
            self.tree.turn_count(),
            self.current_label()
        );
        Ok(())
    }

    fn show_states(&self, tag: Option<&str>) {
        let preview_chars = self.config.display.preview_chars;
        let lines = match tag {
            Some(tag) => {
                let lines = render::tagged_lines(&self.tree, tag, preview_chars);
                if lines.is_empty() {
                    println!("No states tagged [{tag}].");
                    return;
                }
                lines
            }
            None => render::tree_lines(&self.tree, preview_chars),
        };
        for line in lines {
            println!("{line}");
        }
    }

    /// List the current state's siblings, or show it next to the n-th one.
    fn compare(&self, choice: Option<usize>) -> Result<()> {
        let preview_chars = self.config.display.preview_chars;
        let siblings = self.tree.store().siblings(self.tree.current_id())?;
        if siblings.is_empty() {
            println!("No sibling branches to compare with.");
            return Ok(());
        }

        let Some(n) = choice else {
            println!("Sibling branches of {}:", self.current_label());
            for line in render::sibling_lines(&self.tree, preview_chars)? {
                println!("{line}");
            }
            println!("{}", "Use /compare <n> to compare with one of them.".dimmed());
            return Ok(());
        };

        let other = n
            .checked_sub(1)
            .and_then(|i| siblings.get(i))
            .map(|node| node.id)
            .with_context(|| {
                format!("{} has {} siblings; no sibling {n}", self.current_label(), siblings.len())
            })?;
        for line in render::compare_lines(&self.tree, other, preview_chars)? {
            println!("{line}");
        }
        Ok(())
    }

    fn navigate(&mut self) -> Result<()> {
        let shortlist = self.config.display.shortlist_size;
        let chosen = {
            let source = NodeSource::new(&self.tree, self.config.display.preview_chars);
            let mut picker = Picker::new(source);
            terminal::run_picker(&mut picker, "goto>", shortlist)?
        };
        match chosen {
            Some(id) => {
                self.tree.move_to(id)?;
                println!("Now at {}", self.current_label());
            }
            None => println!("{}", "navigation cancelled".dimmed()),
        }
        Ok(())
    }

    fn pick_tag(&self) -> Result<Option<String>> {
        let mut picker = Picker::new(TagSource::new(self.tree.recent_tags()));
        let chosen = terminal::run_picker(&mut picker, "tag>", self.config.display.shortlist_size)?;
        if chosen.is_none() {
            println!("{}", "tagging cancelled".dimmed());
        }
        Ok(chosen)
    }

    fn pick_session(&self, tag: Option<&str>) -> Result<Option<String>> {
        let sessions = match tag {
            Some(tag) => self.sessions.list_tagged(tag)?,
            None => self.sessions.list()?,
        };
        if sessions.is_empty() {
            match tag {
                Some(tag) => println!("No saved sessions contain a state tagged [{tag}]."),
                None => println!("No saved sessions in {}.", self.sessions.dir().display()),
            }
            return Ok(None);
        }
        let mut picker = Picker::new(SessionSource::new(sessions));
        Ok(terminal::run_picker(&mut picker, "load>", self.config.display.shortlist_size)?)
    }

    fn list_sessions(&self, tag: Option<&str>) -> Result<()> {
        let sessions = match tag {
            Some(tag) => self.sessions.list_tagged(tag)?,
            None => self.sessions.list()?,
        };
        if sessions.is_empty() {
            println!("No saved sessions in {}.", self.sessions.dir().display());
            return Ok(());
        }
        for line in render::session_lines(&sessions) {
            println!("{line}");
        }
        Ok(())
    }

    async fn list_models(&self) -> Result<()> {
        let models = self.backend.list_models().await?;
        if models.is_empty() {
            println!("The backend has no models.");
        }
        for model in models {
            if self.model.as_deref() == Some(model.as_str()) {
                println!("{} {}", "*".green().bold(), model.green());
            } else {
                println!("  {model}");
            }
        }
        Ok(())
    }
}
