use async_trait::async_trait;
use arcade_ledger_core::AppResult;
use arcade_ledger_domain::TransactionRecord;

use crate::TenantScope;

use super::TransactionListQuery;

/// Port for the append-only transaction journal.
#[async_trait]
pub trait TransactionJournal: Send + Sync {
    /// Appends one entry. Re-appending an existing transaction id is a no-op.
    async fn append(&self, record: TransactionRecord) -> AppResult<()>;

    /// Lists entries visible in `scope`, newest first; ties resolve to the
    /// most recently appended entry.
    async fn list_recent(
        &self,
        scope: TenantScope,
        query: TransactionListQuery,
    ) -> AppResult<Vec<TransactionRecord>>;
}
