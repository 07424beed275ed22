use arcade_ledger_application::LedgerService;
use sqlx::PgPool;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub ledger_service: LedgerService,
    pub postgres_pool: Option<PgPool>,
}
