use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

use arcade_ledger_application::{TenantScope, TransactionJournal, TransactionListQuery};
use arcade_ledger_core::{AppError, AppResult, TenantId};
use arcade_ledger_domain::{
    CardId, MachineId, Money, TransactionId, TransactionRecord, TransactionRecordInput,
};

use crate::postgres_errors::map_database_error;

/// PostgreSQL-backed append-only transaction journal.
#[derive(Clone)]
pub struct PostgresTransactionJournal {
    pool: PgPool,
}

impl PostgresTransactionJournal {
    /// Creates a journal with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct TransactionRow {
    id: Uuid,
    tenant_id: Uuid,
    card_id: String,
    machine_id: Option<String>,
    amount: Decimal,
    kind: String,
    status: String,
    terminal: String,
    card_version: i64,
    recorded_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for TransactionRecord {
    type Error = AppError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        TransactionRecord::new(TransactionRecordInput {
            transaction_id: TransactionId::from_uuid(row.id),
            tenant_id: TenantId::from_uuid(row.tenant_id),
            card_id: CardId::new(row.card_id)?,
            machine_id: row.machine_id.map(MachineId::new).transpose()?,
            amount: Money::new(row.amount)?,
            kind: row.kind.parse()?,
            status: row.status.parse()?,
            terminal: row.terminal,
            card_version: u64::try_from(row.card_version).map_err(|_| {
                AppError::Internal(format!("invalid card version '{}'", row.card_version))
            })?,
            recorded_at: row.recorded_at,
        })
    }
}

#[async_trait]
impl TransactionJournal for PostgresTransactionJournal {
    async fn append(&self, record: TransactionRecord) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO ledger_transactions (
                id,
                tenant_id,
                card_id,
                machine_id,
                amount,
                kind,
                status,
                terminal,
                card_version,
                recorded_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(record.transaction_id().as_uuid())
        .bind(record.tenant_id().as_uuid())
        .bind(record.card_id().as_str())
        .bind(record.machine_id().map(MachineId::as_str))
        .bind(record.amount().amount())
        .bind(record.kind().as_str())
        .bind(record.status().as_str())
        .bind(record.terminal())
        .bind(i64::try_from(record.card_version()).map_err(|_| {
            AppError::Validation(format!(
                "card version '{}' exceeds the storage range",
                record.card_version()
            ))
        })?)
        .bind(record.recorded_at())
        .execute(&self.pool)
        .await
        .map_err(|error| map_database_error(error, "failed to append journal entry"))?;

        if result.rows_affected() == 0 {
            debug!(
                transaction_id = %record.transaction_id(),
                "journal entry already present, append replay ignored"
            );
        }

        Ok(())
    }

    async fn list_recent(
        &self,
        scope: TenantScope,
        query: TransactionListQuery,
    ) -> AppResult<Vec<TransactionRecord>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT
                id, tenant_id, card_id, machine_id, amount, kind, status, terminal,
                card_version, recorded_at
            FROM ledger_transactions
            WHERE ($1::UUID IS NULL OR tenant_id = $1)
                AND ($2::TEXT IS NULL OR card_id = $2)
                AND ($3::TEXT IS NULL OR kind = $3)
            ORDER BY recorded_at DESC, card_version DESC, sequence DESC
            LIMIT $4
            OFFSET $5
            "#,
        )
        .bind(scope.tenant_id().map(|tenant_id| tenant_id.as_uuid()))
        .bind(query.card_id.as_ref().map(CardId::as_str))
        .bind(query.kind.map(|kind| kind.as_str()))
        .bind(query.page.capped_limit() as i64)
        .bind(query.page.capped_offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_database_error(error, "failed to list journal entries"))?;

        rows.into_iter().map(TransactionRecord::try_from).collect()
    }
}
