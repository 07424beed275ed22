use async_trait::async_trait;
use arcade_ledger_core::AppResult;
use arcade_ledger_domain::AuditLogEntry;

use crate::TenantScope;

use super::LedgerListQuery;

/// Port for best-effort operational log entries.
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Persists one entry.
    async fn append_entry(&self, entry: AuditLogEntry) -> AppResult<()>;

    /// Lists entries visible in `scope`, newest first.
    async fn list_recent_entries(
        &self,
        scope: TenantScope,
        query: LedgerListQuery,
    ) -> AppResult<Vec<AuditLogEntry>>;
}
