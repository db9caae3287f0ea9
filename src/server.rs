//! Server initialization for the HTTP and stdio transports.
//!
//! Provides [`serve_http`] and [`serve_stdio`] entry points that wire up the
//! database, embedding provider, and memory service into a running server.

use crate::api::{self, AppState};
use crate::config::RecollectConfig;
use crate::embedding;
use crate::memory::{MemoryService, MemoryStore};
use crate::tools::MemoryTools;
use anyhow::{Context, Result};
use rmcp::ServiceExt;
use std::sync::Arc;

/// Shared setup: open DB, create embedding provider, record the model.
pub fn build_service(config: &RecollectConfig) -> Result<Arc<MemoryService>> {
    let db_path = config.resolved_db_path();
    let store = Arc::new(
        MemoryStore::open(&db_path)
            .with_context(|| format!("failed to open database at {}", db_path.display()))?,
    );
    tracing::info!(db = %db_path.display(), "database ready");

    let provider: Arc<dyn embedding::EmbeddingProvider> =
        Arc::from(embedding::create_provider(&config.embedding)?);

    if store.sync_embedding_model(provider.model_name())? {
        tracing::info!(model = provider.model_name(), "embedding model recorded");
    }
    tracing::info!(
        provider = %config.embedding.provider,
        model = provider.model_name(),
        "embedding provider ready"
    );

    Ok(Arc::new(MemoryService::from_config(store, provider, config)))
}

/// Start the REST API, tool server and MCP endpoint over HTTP.
pub async fn serve_http(config: RecollectConfig) -> Result<()> {
    let bind_addr = config.bind_addr();
    tracing::info!(addr = %bind_addr, "starting recollect HTTP server");

    let service = build_service(&config)?;
    let default_user = config.storage.default_user.clone();

    let mcp_service = Arc::clone(&service);
    let mcp_user = default_user.clone();
    let mcp = rmcp::transport::streamable_http_server::StreamableHttpService::new(
        move || Ok(MemoryTools::new(Arc::clone(&mcp_service), mcp_user.clone())),
        rmcp::transport::streamable_http_server::session::local::LocalSessionManager::default()
            .into(),
        Default::default(),
    );

    let state = AppState::new(service, &default_user);
    let router = api::router(state, config.server.cors).nest_service("/mcp", mcp);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, "listening at http://{bind_addr} (MCP at /mcp)");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("HTTP server shut down");
    Ok(())
}

/// Start the MCP server over stdio.
pub async fn serve_stdio(config: RecollectConfig) -> Result<()> {
    tracing::info!("starting recollect MCP server on stdio");

    let service = build_service(&config)?;
    let tools = MemoryTools::new(service, config.storage.default_user.clone());
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running, waiting for client");

    server.waiting().await?;
    tracing::info!("MCP server shut down");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down HTTP server");
}
