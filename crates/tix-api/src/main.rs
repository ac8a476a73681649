//! tix-api: REST API server for the tix ticket tracker
//!
//! Exposes the tix-core operations over HTTP. All responses use the
//! `{ success, data, error }` envelope.

mod response;
mod routes;
mod state;

use std::sync::Arc;

use anyhow::Context;
use tix_core::{Config, Database};

use crate::state::AppState;

fn init_tracing(default_filter: &str) {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::resolve(None).context("Failed to load config")?;
    init_tracing(&config.log_filter);

    let db = Database::open(&config.database_path).with_context(|| {
        format!(
            "Failed to open database {}",
            config.database_path.display()
        )
    })?;
    let state = Arc::new(AppState::new(db, config.queries));
    let app = routes::app(state);

    let addr = format!("{}:{}", config.bind_address, config.port);
    tracing::info!("Starting tix-api on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
