//! Arcade ledger API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod api_services;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use arcade_ledger_core::AppError;
use tracing::info;

use crate::api_config::{ApiConfig, StoreBackend, init_tracing};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;

    let needs_database = config.store_backend == StoreBackend::Postgres || config.migrate_only;
    let pool = match config.database_url.as_deref() {
        Some(database_url) if needs_database => {
            Some(api_services::connect_and_migrate(database_url).await?)
        }
        _ => None,
    };

    if config.migrate_only {
        info!("database migrations applied successfully");
        return Ok(());
    }

    let app_state = api_services::build_app_state(pool, &config);

    info!(
        store = ?config.store_backend,
        max_conflict_retries = config.engine.max_conflict_retries,
        journal_append_attempts = config.engine.journal_append_attempts,
        "ledger engine configured"
    );

    let app = api_router::build_router(app_state, config.frontend_url.as_deref())?;
    let address = config.socket_address()?;

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "arcade-ledger-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}
