mod agent;
mod config;
mod errors;
mod models;
mod providers;
mod routes;
mod service;
mod store;
mod tools;

use std::sync::Arc;

use tracing::{info, warn};

use crate::agent::OllamaRunner;
use crate::config::AppConfig;
use crate::service::chat_service::ChatService;
use crate::store::session_store::{spawn_sweeper, SessionStore};
use crate::tools::ToolSet;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (development convenience)
    dotenvy::dotenv().ok();

    // Initialise tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tool_chat_gateway=debug,tower_http=debug".into()),
        )
        .init();

    let config = AppConfig::from_env()?;
    if config.amap_key.is_empty() {
        warn!("AMAP_KEY is not set; location and weather lookups will fail");
    }

    // ── Dependency wiring: built once, shared read-only ───────────────────────
    let tools = ToolSet::from_config(&config)?;
    let runner = OllamaRunner::new(&config, tools)?;
    let sessions = SessionStore::new();

    if let Some(ttl) = config.session_ttl {
        info!(ttl_secs = ttl.as_secs(), "idle sessions will be evicted");
        spawn_sweeper(sessions.clone(), ttl, config.session_sweep_interval);
    }

    let chat_service = ChatService::new(sessions, Arc::new(runner), &config.newline_placeholder);
    let app = routes::router(chat_service);

    // ── Listen ────────────────────────────────────────────────────────────────
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{addr}/");

    axum::serve(listener, app).await?;
    Ok(())
}
