//! pipeline_agent_server: REST server answering questions over MongoDB.
//!
//! Reads config from env vars (a `.env` file is loaded first):
//!   API_KEY            bearer secret for /analyze_db (required)
//!   OPENAI_API_KEY     enables gpt-4-turbo-2024-04-09
//!   MISTRALAI_API_KEY  enables codestral-latest
//!   BIND_ADDR          listen address (default: 0.0.0.0:9000)
//! See `pipeline_agent::config` for the rest.

use std::sync::Arc;

use anyhow::Context;
use pipeline_agent::api::{build_router, AppState};
use pipeline_agent::config::AppConfig;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "pipeline_agent=info,pipeline_agentic=info,tower_http=debug".into()
            }),
        )
        .init();

    let config = AppConfig::from_env()?;
    if config.llm.openai_api_key.is_none() && config.llm.mistral_api_key.is_none() {
        tracing::warn!("Neither OPENAI_API_KEY nor MISTRALAI_API_KEY is set; every query will fail");
    }

    let state = AppState::from_config(&config).context("failed to build application state")?;
    let app = build_router(Arc::new(state));

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;
    tracing::info!("pipeline_agent_server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
