mod cli;
mod repl;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use context_tree::backend;
use context_tree::config::CtreeConfig;
use context_tree::session::SessionStore;

#[derive(Parser)]
#[command(name = "ctree", version, about = "Branching conversations with a local language model")]
struct Cli {
    /// Config file to read instead of ~/.context-tree/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Model used for new turns
    #[arg(long, global = true)]
    model: Option<String>,

    /// Directory holding saved sessions
    #[arg(long, global = true)]
    sessions_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start an interactive session (the default)
    Chat {
        /// Saved session to continue
        #[arg(long)]
        load: Option<String>,
    },
    /// List saved sessions
    Sessions {
        /// Only sessions with a state carrying this tag
        #[arg(long)]
        tag: Option<String>,
    },
    /// Print a saved session's tree
    Show { name: String },
    /// List models the backend can serve
    Models,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => CtreeConfig::load_from(path)?,
        None => CtreeConfig::load()?,
    };
    if let Some(model) = cli.model {
        config.backend.model = Some(model);
    }
    if let Some(dir) = cli.sessions_dir {
        config.storage.sessions_dir = dir.to_string_lossy().into_owned();
    }

    // Log to stderr at `warn` by default so the chat display stays clean.
    let filter = EnvFilter::try_new(&config.log.level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or(Command::Chat { load: None }) {
        Command::Chat { load } => {
            let backend = backend::create_backend(&config.backend)?;
            let sessions = SessionStore::new(config.resolved_sessions_dir());
            let mut app = repl::App::new(config, backend, sessions);
            if let Some(name) = load {
                app.load_initial(&name)?;
            }
            app.run().await?;
        }
        Command::Sessions { tag } => cli::sessions::sessions(&config, tag.as_deref())?,
        Command::Show { name } => cli::show::show(&config, &name)?,
        Command::Models => cli::models::models(&config).await?,
    }

    Ok(())
}
