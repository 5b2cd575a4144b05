//! `vibecode serve`: run the studio HTTP server.

use anyhow::Result;
use std::path::{Path, PathBuf};

pub async fn cmd_serve(
    config_path: Option<&Path>,
    port: Option<u16>,
    db_path: Option<PathBuf>,
    open: bool,
    dev: bool,
) -> Result<()> {
    use vibecode::config::StudioConfig;
    use vibecode::studio::server::{ServerConfig, start_server};

    let config = StudioConfig::load(config_path)?;
    for warning in config.validate() {
        tracing::warn!("{}", warning);
    }

    let mut server = ServerConfig::from(&config);
    if let Some(port) = port {
        server.port = port;
    }
    if let Some(db_path) = db_path {
        server.db_path = db_path;
    }
    server.dev_mode |= dev;

    // Spawn browser open before starting the server (which blocks)
    if open && !server.dev_mode {
        // No bundled UI; /health confirms the server answers.
        let url = format!("http://localhost:{}/health", server.port);
        tokio::spawn(async move {
            // Small delay to let the server start binding
            tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;
            if let Err(e) = open::that(&url) {
                tracing::warn!("Failed to open browser: {}", e);
            }
        });
    }

    start_server(server, &config).await
}
