use async_trait::async_trait;
use arcade_ledger_application::{AuditLogRepository, LedgerListQuery, TenantScope};
use arcade_ledger_core::AppResult;
use arcade_ledger_domain::AuditLogEntry;
use tokio::sync::RwLock;

/// In-memory audit log implementation.
#[derive(Debug, Default)]
pub struct InMemoryAuditLogRepository {
    entries: RwLock<Vec<AuditLogEntry>>,
}

impl InMemoryAuditLogRepository {
    /// Creates an empty audit log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditLogRepository for InMemoryAuditLogRepository {
    async fn append_entry(&self, entry: AuditLogEntry) -> AppResult<()> {
        self.entries.write().await.push(entry);
        Ok(())
    }

    async fn list_recent_entries(
        &self,
        scope: TenantScope,
        query: LedgerListQuery,
    ) -> AppResult<Vec<AuditLogEntry>> {
        let entries = self.entries.read().await;

        let mut values: Vec<AuditLogEntry> = entries
            .iter()
            .rev()
            .filter(|entry| scope.includes(entry.tenant_id))
            .cloned()
            .collect();
        values.sort_by(|left, right| right.created_at.cmp(&left.created_at));

        Ok(values
            .into_iter()
            .skip(query.capped_offset())
            .take(query.capped_limit())
            .collect())
    }
}
