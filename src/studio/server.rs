use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::config::StudioConfig;
use crate::generator::{ArtifactGenerator, PromptExpander};
use crate::llm::{Credential, OpenRouterClient, OpenRouterSettings, TextGenerationService};

use super::api::{self, AppState, SharedState};
use super::db::{DbHandle, StudioDb};
use super::orchestrator::GenerationOrchestrator;
use super::revise::ArtifactReviser;

/// Configuration for the studio server.
pub struct ServerConfig {
    pub port: u16,
    pub db_path: std::path::PathBuf,
    pub dev_mode: bool,
}

impl From<&StudioConfig> for ServerConfig {
    fn from(config: &StudioConfig) -> Self {
        Self {
            port: config.port,
            db_path: config.db_path.clone(),
            dev_mode: config.dev_mode,
        }
    }
}

/// Wire the pipeline together over one model client and one database.
pub fn build_state(
    config: &StudioConfig,
    db: DbHandle,
    service: Arc<dyn TextGenerationService>,
) -> SharedState {
    let server_key = Credential::from_optional(config.api_key.as_deref());
    let llm = &config.toml.llm;

    let expander = PromptExpander::new(Arc::clone(&service), llm.expansion_model.clone())
        .with_timeout(config.expand_timeout());
    let generator = ArtifactGenerator::new(service).with_timeout(config.generate_timeout());

    let orchestrator = GenerationOrchestrator::new(
        db.clone(),
        expander,
        generator.clone(),
        server_key.clone(),
        config.default_model(),
    );
    let reviser = ArtifactReviser::new(
        db.clone(),
        generator,
        server_key,
        config.default_model(),
        config.free_mode,
    );

    Arc::new(AppState {
        db,
        orchestrator,
        reviser,
    })
}

pub fn build_router(state: SharedState) -> Router {
    api::api_router().with_state(state)
}

/// Start the studio server. Returns after a graceful shutdown.
pub async fn start_server(server: ServerConfig, config: &StudioConfig) -> Result<()> {
    // Ensure parent directory exists for DB
    if let Some(parent) = server.db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }

    let db = StudioDb::new(&server.db_path).context("Failed to initialize studio database")?;
    let client = OpenRouterClient::new(OpenRouterSettings::from(&config.toml.llm))
        .context("Failed to build OpenRouter client")?;
    let state = build_state(config, DbHandle::new(db), Arc::new(client));

    state
        .orchestrator
        .recover_stale()
        .await
        .context("Failed to recover stale posts")?;

    let mut app = build_router(Arc::clone(&state));
    if server.dev_mode {
        app = app.layer(CorsLayer::permissive());
    }

    let host = if server.dev_mode { "0.0.0.0" } else { "127.0.0.1" };
    let addr = format!("{}:{}", host, server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    info!(free_mode = config.free_mode, "vibecode studio running at http://{}", local_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    state.orchestrator.shutdown().await;
    info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    info!("Shutting down...");
}
