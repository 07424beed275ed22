use arcade_ledger_core::{AppError, AppResult};
use arcade_ledger_domain::{AuditLogEntry, AuditLogType, TransactionRecord};
use tracing::{error, warn};

use super::{AUDIT_SOURCE_LEDGER, LedgerService};

impl LedgerService {
    /// Appends a committed entry, retrying with linear backoff.
    ///
    /// Appends are idempotent on the transaction id, so a retry after an
    /// ambiguous failure never duplicates the entry.
    pub(super) async fn append_to_journal(&self, record: TransactionRecord) -> AppResult<()> {
        let attempts = self.config.journal_append_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.journal.append(record.clone()).await {
                Ok(()) => return Ok(()),
                Err(append_error) => {
                    warn!(
                        tenant_id = %record.tenant_id(),
                        transaction_id = %record.transaction_id(),
                        attempt,
                        attempts,
                        error = %append_error,
                        "journal append failed"
                    );
                    last_error = Some(append_error);
                }
            }

            if attempt < attempts {
                tokio::time::sleep(self.config.journal_retry_backoff * attempt).await;
            }
        }

        let cause = last_error
            .map(|value| value.to_string())
            .unwrap_or_else(|| "no attempt was made".to_owned());

        error!(
            tenant_id = %record.tenant_id(),
            transaction_id = %record.transaction_id(),
            card_id = %record.card_id(),
            machine_id = ?record.machine_id().map(|value| value.as_str()),
            kind = record.kind().as_str(),
            amount = %record.amount(),
            terminal = record.terminal(),
            card_version = record.card_version(),
            recorded_at = %record.recorded_at(),
            error = %cause,
            "balance committed without journal entry; manual reconciliation required"
        );

        self.record_audit(AuditLogEntry::now(
            record.tenant_id(),
            AuditLogType::Error,
            AUDIT_SOURCE_LEDGER,
            format!(
                "Journal entry {} ({} {} on card {}) missing after committed balance change",
                record.transaction_id(),
                record.kind().as_str(),
                record.amount(),
                record.card_id()
            ),
        ))
        .await;

        Err(AppError::JournalWriteFailure(format!(
            "transaction '{}' for card '{}' committed but was not journaled: {cause}",
            record.transaction_id(),
            record.card_id()
        )))
    }
}
