//! `vibecode config`: view and validate configuration.

use anyhow::Result;
use std::path::Path;

use super::super::ConfigCommands;

pub fn cmd_config(config_path: Option<&Path>, command: Option<ConfigCommands>) -> Result<()> {
    use vibecode::config::StudioConfig;

    let config = StudioConfig::load(config_path)?;

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("vibecode Configuration");
            println!("======================");
            println!();

            if config.config_path.exists() {
                println!("Config file: {}", config.config_path.display());
            } else {
                println!(
                    "No config file at {} (using defaults)",
                    config.config_path.display()
                );
            }
            println!();

            let toml = &config.toml;
            println!("[server]");
            println!("  port = {}", toml.server.port);
            println!("  db_path = \"{}\"", toml.server.db_path);
            println!("  dev_mode = {}", toml.server.dev_mode);
            println!();

            println!("[llm]");
            println!("  base_url = \"{}\"", toml.llm.base_url);
            println!("  api_key_env = \"{}\"", toml.llm.api_key_env);
            println!("  default_model = \"{}\"", toml.llm.default_model);
            println!("  expansion_model = \"{}\"", toml.llm.expansion_model);
            println!("  expand_timeout_secs = {}", toml.llm.expand_timeout_secs);
            println!("  generate_timeout_secs = {}", toml.llm.generate_timeout_secs);
            if let Some(referer) = &toml.llm.referer {
                println!("  referer = \"{}\"", referer);
            }
            println!("  title = \"{}\"", toml.llm.title);
            println!();

            println!("[generation]");
            println!("  free_mode = {}", toml.generation.free_mode);
            println!();

            // Show effective values (including env overrides)
            println!("Effective values (with env overrides):");
            println!("  port = {}", config.port);
            println!("  free_mode = {}", config.free_mode);
            println!(
                "  api_key = {}",
                if config.api_key.is_some() { "set" } else { "not set" }
            );
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            let warnings = config.validate();
            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
    }

    Ok(())
}
