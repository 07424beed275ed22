use std::sync::Arc;

use arcade_ledger_application::{
    AuditLogRepository, LedgerService, LedgerStore, TransactionJournal,
};
use arcade_ledger_infrastructure::{
    InMemoryAuditLogRepository, InMemoryLedgerStore, InMemoryTransactionJournal,
    PostgresAuditLogRepository, PostgresLedgerStore, PostgresTransactionJournal,
};
use sqlx::PgPool;

use crate::api_config::ApiConfig;
use crate::state::AppState;

/// Wires the ledger ports. A pool selects the PostgreSQL adapters; without
/// one every port is held in process memory.
pub fn build_app_state(pool: Option<PgPool>, config: &ApiConfig) -> AppState {
    let (ledger_store, journal, audit_log): (
        Arc<dyn LedgerStore>,
        Arc<dyn TransactionJournal>,
        Arc<dyn AuditLogRepository>,
    ) = match pool.clone() {
        Some(pool) => (
            Arc::new(PostgresLedgerStore::new(pool.clone())),
            Arc::new(PostgresTransactionJournal::new(pool.clone())),
            Arc::new(PostgresAuditLogRepository::new(pool)),
        ),
        None => (
            Arc::new(InMemoryLedgerStore::new()),
            Arc::new(InMemoryTransactionJournal::new()),
            Arc::new(InMemoryAuditLogRepository::new()),
        ),
    };

    AppState {
        ledger_service: LedgerService::new(ledger_store, journal, audit_log)
            .with_config(config.engine),
        postgres_pool: pool,
    }
}
