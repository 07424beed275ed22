use async_trait::async_trait;
use arcade_ledger_core::{AppResult, TenantId};
use arcade_ledger_domain::{Card, CardId, Machine, MachineId, Money};
use chrono::{DateTime, Utc};

use crate::TenantScope;

use super::LedgerListQuery;

/// Conditional balance update for one card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceSwap<'a> {
    /// Owning arcade.
    pub tenant_id: TenantId,
    /// Card to update.
    pub card_id: &'a CardId,
    /// Card version read before the change was computed.
    pub expected_version: u64,
    /// Balance read before the change was computed.
    pub expected_balance: Money,
    /// Balance to store.
    pub next_balance: Money,
}

/// Position the store assigned to a committed balance change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceCommit {
    /// Card version after the change.
    pub version: u64,
    /// Commit time, strictly increasing per card.
    pub committed_at: DateTime<Utc>,
}

/// Port for durable card and machine records.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Finds a card visible in `scope`.
    ///
    /// Cards outside the scope are reported as absent. An unrestricted lookup
    /// that matches the same card id in several arcades fails with a conflict.
    async fn find_card(&self, scope: TenantScope, card_id: &CardId) -> AppResult<Option<Card>>;

    /// Finds a machine inside one arcade.
    async fn find_machine(
        &self,
        tenant_id: TenantId,
        machine_id: &MachineId,
    ) -> AppResult<Option<Machine>>;

    /// Stores `swap.next_balance` only if the card still carries the expected
    /// version and balance, advancing the version by one.
    ///
    /// Returns `None` when any change committed since the card was read,
    /// including one that left the balance where it was.
    async fn compare_and_swap_balance(
        &self,
        swap: BalanceSwap<'_>,
    ) -> AppResult<Option<BalanceCommit>>;

    /// Inserts a new card; duplicates within an arcade are conflicts.
    async fn insert_card(&self, card: Card) -> AppResult<()>;

    /// Inserts a new machine; duplicates within an arcade are conflicts.
    async fn insert_machine(&self, machine: Machine) -> AppResult<()>;

    /// Lists cards visible in `scope`, ordered by arcade then card id.
    async fn list_cards(&self, scope: TenantScope, query: LedgerListQuery) -> AppResult<Vec<Card>>;

    /// Lists machines visible in `scope`, ordered by arcade then machine id.
    async fn list_machines(
        &self,
        scope: TenantScope,
        query: LedgerListQuery,
    ) -> AppResult<Vec<Machine>>;
}
