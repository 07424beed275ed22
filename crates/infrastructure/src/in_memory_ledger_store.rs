use std::collections::HashMap;

use async_trait::async_trait;
use arcade_ledger_application::{
    BalanceCommit, BalanceSwap, LedgerListQuery, LedgerStore, TenantScope,
};
use arcade_ledger_core::{AppError, AppResult, TenantId};
use arcade_ledger_domain::{Card, CardId, Machine, MachineId};
use chrono::Utc;
use tokio::sync::RwLock;


/// In-memory ledger store implementation.
///
/// The compare-and-swap runs under the card map write lock, which makes it
/// atomic with respect to every other store call. Commit times are taken under
/// the same lock.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    cards: RwLock<HashMap<(TenantId, CardId), Card>>,
    machines: RwLock<HashMap<(TenantId, MachineId), Machine>>,
}

impl InMemoryLedgerStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn find_card(&self, scope: TenantScope, card_id: &CardId) -> AppResult<Option<Card>> {
        let cards = self.cards.read().await;

        if let TenantScope::Tenant(tenant_id) = scope {
            return Ok(cards.get(&(tenant_id, card_id.clone())).cloned());
        }

        let mut matches = cards
            .iter()
            .filter_map(|((_, stored_card_id), card)| (stored_card_id == card_id).then_some(card));
        let found = matches.next().cloned();
        if matches.next().is_some() {
            return Err(AppError::Conflict(format!(
                "card '{card_id}' exists in several arcades; name the arcade"
            )));
        }

        Ok(found)
    }

    async fn find_machine(
        &self,
        tenant_id: TenantId,
        machine_id: &MachineId,
    ) -> AppResult<Option<Machine>> {
        Ok(self
            .machines
            .read()
            .await
            .get(&(tenant_id, machine_id.clone()))
            .cloned())
    }

    async fn compare_and_swap_balance(
        &self,
        swap: BalanceSwap<'_>,
    ) -> AppResult<Option<BalanceCommit>> {
        let mut cards = self.cards.write().await;
        let Some(card) = cards.get_mut(&(swap.tenant_id, swap.card_id.clone())) else {
            return Ok(None);
        };

        if card.version() != swap.expected_version || card.balance() != swap.expected_balance {
            return Ok(None);
        }

        *card = card.with_committed_balance(swap.next_balance, Utc::now());
        Ok(Some(BalanceCommit {
            version: card.version(),
            committed_at: card.updated_at(),
        }))
    }

    async fn insert_card(&self, card: Card) -> AppResult<()> {
        let key = (card.tenant_id(), card.card_id().clone());
        let mut cards = self.cards.write().await;

        if cards.contains_key(&key) {
            return Err(AppError::Conflict(format!(
                "card '{}' already exists for tenant '{}'",
                key.1, key.0
            )));
        }

        cards.insert(key, card);
        Ok(())
    }

    async fn insert_machine(&self, machine: Machine) -> AppResult<()> {
        let key = (machine.tenant_id(), machine.machine_id().clone());
        let mut machines = self.machines.write().await;

        if machines.contains_key(&key) {
            return Err(AppError::Conflict(format!(
                "machine '{}' already exists for tenant '{}'",
                key.1, key.0
            )));
        }

        machines.insert(key, machine);
        Ok(())
    }

    async fn list_cards(&self, scope: TenantScope, query: LedgerListQuery) -> AppResult<Vec<Card>> {
        let cards = self.cards.read().await;

        let mut values: Vec<Card> = cards
            .values()
            .filter(|card| scope.includes(card.tenant_id()))
            .cloned()
            .collect();
        values.sort_by(|left, right| {
            (left.tenant_id(), left.card_id()).cmp(&(right.tenant_id(), right.card_id()))
        });

        Ok(values
            .into_iter()
            .skip(query.capped_offset())
            .take(query.capped_limit())
            .collect())
    }

    async fn list_machines(
        &self,
        scope: TenantScope,
        query: LedgerListQuery,
    ) -> AppResult<Vec<Machine>> {
        let machines = self.machines.read().await;

        let mut values: Vec<Machine> = machines
            .values()
            .filter(|machine| scope.includes(machine.tenant_id()))
            .cloned()
            .collect();
        values.sort_by(|left, right| {
            (left.tenant_id(), left.machine_id()).cmp(&(right.tenant_id(), right.machine_id()))
        });

        Ok(values
            .into_iter()
            .skip(query.capped_offset())
            .take(query.capped_limit())
            .collect())
    }
}
