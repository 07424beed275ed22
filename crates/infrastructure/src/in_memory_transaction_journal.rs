use async_trait::async_trait;
use arcade_ledger_application::{TenantScope, TransactionJournal, TransactionListQuery};
use arcade_ledger_core::AppResult;
use arcade_ledger_domain::TransactionRecord;
use tokio::sync::RwLock;

/// In-memory append-only journal kept in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryTransactionJournal {
    records: RwLock<Vec<TransactionRecord>>,
}

impl InMemoryTransactionJournal {
    /// Creates an empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionJournal for InMemoryTransactionJournal {
    async fn append(&self, record: TransactionRecord) -> AppResult<()> {
        let mut records = self.records.write().await;

        if records
            .iter()
            .any(|existing| existing.transaction_id() == record.transaction_id())
        {
            return Ok(());
        }

        records.push(record);
        Ok(())
    }

    async fn list_recent(
        &self,
        scope: TenantScope,
        query: TransactionListQuery,
    ) -> AppResult<Vec<TransactionRecord>> {
        let records = self.records.read().await;

        let mut values: Vec<TransactionRecord> = records
            .iter()
            .rev()
            .filter(|record| scope.includes(record.tenant_id()))
            .filter(|record| {
                query
                    .card_id
                    .as_ref()
                    .is_none_or(|card_id| record.card_id() == card_id)
            })
            .filter(|record| query.kind.is_none_or(|kind| record.kind() == kind))
            .cloned()
            .collect();
        // Stable sort: full ties keep latest-insert-first order.
        values.sort_by(|left, right| {
            (right.recorded_at(), right.card_version())
                .cmp(&(left.recorded_at(), left.card_version()))
        });

        Ok(values
            .into_iter()
            .skip(query.page.capped_offset())
            .take(query.page.capped_limit())
            .collect())
    }
}
