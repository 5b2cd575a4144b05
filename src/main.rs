use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "vibecode")]
#[command(version, about = "Turn an idea into a runnable single-file HTML app")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to vibecode.toml (defaults to .vibecode/vibecode.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the studio HTTP server
    Serve {
        /// Port to serve on (overrides config and VIBECODE_PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Database path (overrides config)
        #[arg(long)]
        db_path: Option<PathBuf>,

        /// Open the server's /health page in a browser once it is up
        #[arg(long)]
        open: bool,

        /// Enable dev mode (permissive CORS, bind all interfaces)
        #[arg(long)]
        dev: bool,
    },
    /// Create the database and a default vibecode.toml
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
    /// Expand an idea and generate its HTML in one go
    Generate {
        /// The idea, in plain words
        idea: String,

        /// Model used for generation (defaults to llm.default_model)
        #[arg(short, long)]
        model: Option<String>,

        /// Write the document here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Also write the expanded specification to this file
        #[arg(long)]
        spec_out: Option<PathBuf>,
    },
    /// Print an HTML file as it would be mounted in the preview frame
    Instrument {
        file: PathBuf,

        /// Write the result here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// List the known models
    Models,
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    vibecode::logging::init_tracing(cli.verbose)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    let config_path = cli.config.as_deref();
    match &cli.command {
        Commands::Serve {
            port,
            db_path,
            open,
            dev,
        } => {
            cmd::cmd_serve(config_path, *port, db_path.clone(), *open, *dev).await?;
        }
        Commands::Init { force } => cmd::cmd_init(config_path, *force)?,
        Commands::Generate {
            idea,
            model,
            out,
            spec_out,
        } => {
            cmd::cmd_generate(
                config_path,
                idea,
                model.as_deref(),
                out.as_deref(),
                spec_out.as_deref(),
            )
            .await?;
        }
        Commands::Instrument { file, out } => cmd::cmd_instrument(file, out.as_deref())?,
        Commands::Models => cmd::cmd_models(),
        Commands::Config { command } => cmd::cmd_config(config_path, command.clone())?,
    }

    Ok(())
}
