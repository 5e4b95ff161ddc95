use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct CtreeConfig {
    pub backend: BackendConfig,
    pub storage: StorageConfig,
    pub display: DisplayConfig,
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BackendConfig {
    pub provider: String,
    pub base_url: String,
    /// Model used for new turns when none is picked at runtime.
    pub model: Option<String>,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub sessions_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DisplayConfig {
    /// Characters of prompt/response shown in previews and listings.
    pub preview_chars: usize,
    /// Candidates shown under the navigation prompt.
    pub shortlist_size: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".into(),
            base_url: "http://localhost:11434".into(),
            model: None,
            request_timeout_secs: 120,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let sessions_dir = default_ctree_dir()
            .join("trees")
            .to_string_lossy()
            .into_owned();
        Self { sessions_dir }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            preview_chars: 50,
            shortlist_size: 8,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
        }
    }
}

/// Returns `~/.context-tree/`
pub fn default_ctree_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".context-tree")
}

/// Returns the default config file path: `~/.context-tree/config.toml`
pub fn default_config_path() -> PathBuf {
    default_ctree_dir().join("config.toml")
}

impl CtreeConfig {
    /// Load config from the default TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            CtreeConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    /// (CTREE_SESSIONS_DIR, CTREE_MODEL, CTREE_OLLAMA_URL, CTREE_LOG_LEVEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("CTREE_SESSIONS_DIR") {
            self.storage.sessions_dir = val;
        }
        if let Ok(val) = std::env::var("CTREE_MODEL") {
            self.backend.model = Some(val);
        }
        if let Ok(val) = std::env::var("CTREE_OLLAMA_URL") {
            self.backend.base_url = val;
        }
        if let Ok(val) = std::env::var("CTREE_LOG_LEVEL") {
            self.log.level = val;
        }
    }

    /// Resolve the sessions directory, expanding `~` if needed.
    pub fn resolved_sessions_dir(&self) -> PathBuf {
        expand_tilde(&self.storage.sessions_dir)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
