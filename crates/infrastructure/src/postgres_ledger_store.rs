use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

use arcade_ledger_application::{
    BalanceCommit, BalanceSwap, LedgerListQuery, LedgerStore, TenantScope,
};
use arcade_ledger_core::{AppError, AppResult, TenantId};
use arcade_ledger_domain::{Card, CardId, Machine, MachineId, Money, PositiveAmount};

use crate::postgres_errors::{is_unique_violation, map_database_error};


/// PostgreSQL-backed store for cards and machines.
///
/// Balance changes are single conditional `UPDATE` statements on the card
/// version and balance; the row lock taken by the update serializes concurrent
/// writers on one card and the database clock stamps each commit.
#[derive(Clone)]
pub struct PostgresLedgerStore {
    pool: PgPool,
}

impl PostgresLedgerStore {
    /// Creates a store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct CardRow {
    tenant_id: Uuid,
    card_id: String,
    owner_name: String,
    contact: Option<String>,
    balance: Decimal,
    status: String,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CardRow> for Card {
    type Error = AppError;

    fn try_from(row: CardRow) -> Result<Self, Self::Error> {
        let version = stored_version(row.version)?;
        Ok(Card::from_parts(
            TenantId::from_uuid(row.tenant_id),
            CardId::new(row.card_id)?,
            row.owner_name,
            row.contact,
            Money::new(row.balance)?,
            row.status.parse()?,
            row.created_at,
        )?
        .with_revision(version, row.updated_at))
    }
}

#[derive(Debug, FromRow)]
struct CommitRow {
    version: i64,
    updated_at: DateTime<Utc>,
}

fn stored_version(value: i64) -> AppResult<u64> {
    u64::try_from(value)
        .map_err(|_| AppError::Internal(format!("invalid stored card version '{value}'")))
}

#[derive(Debug, FromRow)]
struct MachineRow {
    tenant_id: Uuid,
    machine_id: String,
    name: String,
    cost_per_play: Decimal,
    status: String,
    secret_key: String,
}

impl TryFrom<MachineRow> for Machine {
    type Error = AppError;

    fn try_from(row: MachineRow) -> Result<Self, Self::Error> {
        Machine::new(
            TenantId::from_uuid(row.tenant_id),
            MachineId::new(row.machine_id)?,
            row.name,
            PositiveAmount::new(row.cost_per_play)?,
            row.status.parse()?,
            row.secret_key,
        )
    }
}

fn scope_filter(scope: TenantScope) -> Option<Uuid> {
    scope.tenant_id().map(|tenant_id| tenant_id.as_uuid())
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    async fn find_card(&self, scope: TenantScope, card_id: &CardId) -> AppResult<Option<Card>> {
        let rows = sqlx::query_as::<_, CardRow>(
            r#"
            SELECT
                tenant_id, card_id, owner_name, contact, balance, status, version,
                created_at, updated_at
            FROM cards
            WHERE ($1::UUID IS NULL OR tenant_id = $1)
                AND card_id = $2
            LIMIT 2
            "#,
        )
        .bind(scope_filter(scope))
        .bind(card_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_database_error(error, "failed to find card"))?;

        if rows.len() > 1 {
            return Err(AppError::Conflict(format!(
                "card '{card_id}' exists in several arcades; name the arcade"
            )));
        }

        rows.into_iter().next().map(Card::try_from).transpose()
    }

    async fn find_machine(
        &self,
        tenant_id: TenantId,
        machine_id: &MachineId,
    ) -> AppResult<Option<Machine>> {
        let row = sqlx::query_as::<_, MachineRow>(
            r#"
            SELECT tenant_id, machine_id, name, cost_per_play, status, secret_key
            FROM machines
            WHERE tenant_id = $1 AND machine_id = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(machine_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| map_database_error(error, "failed to find machine"))?;

        row.map(Machine::try_from).transpose()
    }

    async fn compare_and_swap_balance(
        &self,
        swap: BalanceSwap<'_>,
    ) -> AppResult<Option<BalanceCommit>> {
        let expected_version = i64::try_from(swap.expected_version).map_err(|_| {
            AppError::Validation(format!(
                "card version '{}' exceeds the storage range",
                swap.expected_version
            ))
        })?;

        let row = sqlx::query_as::<_, CommitRow>(
            r#"
            UPDATE cards
            SET balance = $5,
                version = version + 1,
                updated_at = GREATEST(clock_timestamp(), updated_at + INTERVAL '1 microsecond')
            WHERE tenant_id = $1
                AND card_id = $2
                AND version = $3
                AND balance = $4
            RETURNING version, updated_at
            "#,
        )
        .bind(swap.tenant_id.as_uuid())
        .bind(swap.card_id.as_str())
        .bind(expected_version)
        .bind(swap.expected_balance.amount())
        .bind(swap.next_balance.amount())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| map_database_error(error, "failed to update card balance"))?;

        let Some(row) = row else {
            debug!(
                tenant_id = %swap.tenant_id,
                card_id = %swap.card_id,
                expected_version = swap.expected_version,
                "card changed since it was read"
            );
            return Ok(None);
        };

        Ok(Some(BalanceCommit {
            version: stored_version(row.version)?,
            committed_at: row.updated_at,
        }))
    }

    async fn insert_card(&self, card: Card) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO cards (
                tenant_id,
                card_id,
                owner_name,
                contact,
                balance,
                status,
                version,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(card.tenant_id().as_uuid())
        .bind(card.card_id().as_str())
        .bind(card.owner_name().as_str())
        .bind(card.contact())
        .bind(card.balance().amount())
        .bind(card.status().as_str())
        .bind(i64::try_from(card.version()).map_err(|_| {
            AppError::Validation(format!(
                "card version '{}' exceeds the storage range",
                card.version()
            ))
        })?)
        .bind(card.created_at())
        .bind(card.updated_at())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(error) if is_unique_violation(&error) => Err(AppError::Conflict(format!(
                "card '{}' already exists for tenant '{}'",
                card.card_id(),
                card.tenant_id()
            ))),
            Err(error) => Err(map_database_error(error, "failed to insert card")),
        }
    }

    async fn insert_machine(&self, machine: Machine) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO machines (tenant_id, machine_id, name, cost_per_play, status, secret_key)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(machine.tenant_id().as_uuid())
        .bind(machine.machine_id().as_str())
        .bind(machine.name().as_str())
        .bind(machine.cost_per_play().amount())
        .bind(machine.status().as_str())
        .bind(machine.secret_key())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(error) if is_unique_violation(&error) => Err(AppError::Conflict(format!(
                "machine '{}' already exists for tenant '{}'",
                machine.machine_id(),
                machine.tenant_id()
            ))),
            Err(error) => Err(map_database_error(error, "failed to insert machine")),
        }
    }

    async fn list_cards(&self, scope: TenantScope, query: LedgerListQuery) -> AppResult<Vec<Card>> {
        let rows = sqlx::query_as::<_, CardRow>(
            r#"
            SELECT
                tenant_id, card_id, owner_name, contact, balance, status, version,
                created_at, updated_at
            FROM cards
            WHERE ($1::UUID IS NULL OR tenant_id = $1)
            ORDER BY tenant_id, card_id
            LIMIT $2
            OFFSET $3
            "#,
        )
        .bind(scope_filter(scope))
        .bind(query.capped_limit() as i64)
        .bind(query.capped_offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_database_error(error, "failed to list cards"))?;

        rows.into_iter().map(Card::try_from).collect()
    }

    async fn list_machines(
        &self,
        scope: TenantScope,
        query: LedgerListQuery,
    ) -> AppResult<Vec<Machine>> {
        let rows = sqlx::query_as::<_, MachineRow>(
            r#"
            SELECT tenant_id, machine_id, name, cost_per_play, status, secret_key
            FROM machines
            WHERE ($1::UUID IS NULL OR tenant_id = $1)
            ORDER BY tenant_id, machine_id
            LIMIT $2
            OFFSET $3
            "#,
        )
        .bind(scope_filter(scope))
        .bind(query.capped_limit() as i64)
        .bind(query.capped_offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_database_error(error, "failed to list machines"))?;

        rows.into_iter().map(Machine::try_from).collect()
    }
}
