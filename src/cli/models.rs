use anyhow::{Context, Result};

use context_tree::backend;
use context_tree::config::CtreeConfig;

/// Print the models the configured backend can serve.
pub async fn models(config: &CtreeConfig) -> Result<()> {
    let backend = backend::create_backend(&config.backend)?;
    let models = backend
        .list_models()
        .await
        .with_context(|| format!("failed to list models from {}", config.backend.base_url))?;

    if models.is_empty() {
        println!("No models available. Pull one with `ollama pull <name>`.");
        return Ok(());
    }
    for model in models {
        if config.backend.model.as_deref() == Some(model.as_str()) {
            println!("* {model}");
        } else {
            println!("  {model}");
        }
    }
    Ok(())
}
