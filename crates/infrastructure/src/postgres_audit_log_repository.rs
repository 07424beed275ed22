use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use arcade_ledger_application::{AuditLogRepository, LedgerListQuery, TenantScope};
use arcade_ledger_core::{AppError, AppResult, TenantId};
use arcade_ledger_domain::AuditLogEntry;

use crate::postgres_errors::map_database_error;

/// PostgreSQL-backed repository for operational audit entries.
#[derive(Clone)]
pub struct PostgresAuditLogRepository {
    pool: PgPool,
}

impl PostgresAuditLogRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AuditLogRow {
    id: uuid::Uuid,
    tenant_id: uuid::Uuid,
    entry_type: String,
    message: String,
    source: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<AuditLogRow> for AuditLogEntry {
    type Error = AppError;

    fn try_from(row: AuditLogRow) -> Result<Self, Self::Error> {
        Ok(AuditLogEntry {
            entry_id: row.id,
            tenant_id: TenantId::from_uuid(row.tenant_id),
            entry_type: row.entry_type.parse()?,
            message: row.message,
            source: row.source,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl AuditLogRepository for PostgresAuditLogRepository {
    async fn append_entry(&self, entry: AuditLogEntry) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_log_entries (id, tenant_id, entry_type, message, source, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(entry.entry_id)
        .bind(entry.tenant_id.as_uuid())
        .bind(entry.entry_type.as_str())
        .bind(entry.message.as_str())
        .bind(entry.source.as_str())
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(|error| map_database_error(error, "failed to append audit log entry"))?;

        Ok(())
    }

    async fn list_recent_entries(
        &self,
        scope: TenantScope,
        query: LedgerListQuery,
    ) -> AppResult<Vec<AuditLogEntry>> {
        let rows = sqlx::query_as::<_, AuditLogRow>(
            r#"
            SELECT id, tenant_id, entry_type, message, source, created_at
            FROM audit_log_entries
            WHERE ($1::UUID IS NULL OR tenant_id = $1)
            ORDER BY created_at DESC, sequence DESC
            LIMIT $2
            OFFSET $3
            "#,
        )
        .bind(scope.tenant_id().map(|tenant_id| tenant_id.as_uuid()))
        .bind(query.capped_limit() as i64)
        .bind(query.capped_offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_database_error(error, "failed to list audit log entries"))?;

        rows.into_iter().map(AuditLogEntry::try_from).collect()
    }
}
