//! Project initialization and one-shot generation commands.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

pub fn cmd_init(config_path: Option<&Path>, force: bool) -> Result<()> {
    use vibecode::config::{VibecodeToml, default_config_path};
    use vibecode::studio::StudioDb;

    let config_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(default_config_path);

    let toml = if config_path.exists() && !force {
        println!("Config already exists at {}", config_path.display());
        VibecodeToml::load(&config_path)?
    } else {
        let toml = VibecodeToml::default();
        toml.save(&config_path)?;
        println!("Created {}", config_path.display());
        toml
    };

    let db_path = Path::new(&toml.server.db_path);
    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }
    StudioDb::new(db_path)?;
    println!("Database initialized at {}", db_path.display());
    println!();
    println!("Next steps:");
    println!("  1. Put OPENROUTER_API_KEY=... in .env");
    println!("  2. Run `vibecode serve --open`");

    Ok(())
}

pub async fn cmd_generate(
    config_path: Option<&Path>,
    idea: &str,
    model: Option<&str>,
    out: Option<&Path>,
    spec_out: Option<&Path>,
) -> Result<()> {
    use vibecode::config::StudioConfig;
    use vibecode::generator::{ArtifactGenerator, PromptExpander};
    use vibecode::llm::{Credential, OpenRouterClient, OpenRouterSettings};

    let config = StudioConfig::load(config_path)?;
    let credential = Credential::from_optional(config.api_key.as_deref()).with_context(|| {
        format!(
            "No API key configured: set {} in the environment or .env",
            config.toml.llm.api_key_env
        )
    })?;

    let client = Arc::new(OpenRouterClient::new(OpenRouterSettings::from(
        &config.toml.llm,
    ))?);
    let expander = PromptExpander::new(client.clone(), config.toml.llm.expansion_model.clone())
        .with_timeout(config.expand_timeout());
    let generator = ArtifactGenerator::new(client).with_timeout(config.generate_timeout());
    let model = model.unwrap_or(config.default_model());

    let spec = expander.expand(idea, &credential).await?;
    if let Some(path) = spec_out {
        std::fs::write(path, &spec)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    let html = generator.generate(&spec, &credential, model, None).await?;

    match out {
        Some(path) => {
            std::fs::write(path, &html)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Wrote {} ({} bytes)", path.display(), html.len());
        }
        None => println!("{}", html),
    }
    Ok(())
}
