use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::Mutex;

use arcade_ledger_core::{AppError, AppResult, CallerIdentity, TenantId};
use arcade_ledger_domain::{
    AuditLogEntry, AuditLogType, Card, CardId, CardStatus, Machine, MachineId, MachineStatus,
    Money, PositiveAmount, TransactionKind, TransactionRecord, TransactionStatus,
};

use crate::{
    AuditLogRepository, BalanceCommit, BalanceSwap, LedgerListQuery, LedgerStore, TenantScope,
    TransactionJournal, TransactionListQuery,
};

use super::{LedgerEngineConfig, LedgerService, RegisterCardInput};

const CARD: &str = "CARD-0001";
const MACHINE: &str = "M-1";

#[derive(Default)]
struct FakeLedgerStore {
    cards: Mutex<HashMap<(TenantId, CardId), Card>>,
    machines: Mutex<HashMap<(TenantId, MachineId), Machine>>,
    calls: AtomicUsize,
    swap_attempts: AtomicUsize,
    interleaved_writes: Mutex<Vec<Money>>,
    always_conflict: AtomicBool,
}

#[async_trait]
impl LedgerStore for FakeLedgerStore {
    async fn find_card(&self, scope: TenantScope, card_id: &CardId) -> AppResult<Option<Card>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let cards = self.cards.lock().await;
        let mut matches = cards
            .values()
            .filter(|card| scope.includes(card.tenant_id()) && card.card_id() == card_id);
        let found = matches.next().cloned();
        if matches.next().is_some() {
            return Err(AppError::Conflict(format!("card '{card_id}' is ambiguous")));
        }

        Ok(found)
    }

    async fn find_machine(
        &self,
        tenant_id: TenantId,
        machine_id: &MachineId,
    ) -> AppResult<Option<Machine>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .machines
            .lock()
            .await
            .get(&(tenant_id, machine_id.clone()))
            .cloned())
    }

    async fn compare_and_swap_balance(
        &self,
        swap: BalanceSwap<'_>,
    ) -> AppResult<Option<BalanceCommit>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.swap_attempts.fetch_add(1, Ordering::SeqCst);
        if self.always_conflict.load(Ordering::SeqCst) {
            return Ok(None);
        }

        let mut cards = self.cards.lock().await;
        let Some(card) = cards.get_mut(&(swap.tenant_id, swap.card_id.clone())) else {
            return Ok(None);
        };

        if let Some(concurrent) = self.interleaved_writes.lock().await.pop() {
            *card = card.with_committed_balance(concurrent, Utc::now());
        }

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
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut cards = self.cards.lock().await;
        let key = (card.tenant_id(), card.card_id().clone());
        if cards.contains_key(&key) {
            return Err(AppError::Conflict(format!(
                "card '{}' already exists",
                card.card_id()
            )));
        }
        cards.insert(key, card);
        Ok(())
    }

    async fn insert_machine(&self, machine: Machine) -> AppResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.machines
            .lock()
            .await
            .insert((machine.tenant_id(), machine.machine_id().clone()), machine);
        Ok(())
    }

    async fn list_cards(&self, scope: TenantScope, query: LedgerListQuery) -> AppResult<Vec<Card>> {
        let mut cards: Vec<Card> = self
            .cards
            .lock()
            .await
            .values()
            .filter(|card| scope.includes(card.tenant_id()))
            .cloned()
            .collect();
        cards.sort_by(|left, right| left.card_id().cmp(right.card_id()));
        Ok(cards
            .into_iter()
            .skip(query.capped_offset())
            .take(query.capped_limit())
            .collect())
    }

    async fn list_machines(
        &self,
        scope: TenantScope,
        _query: LedgerListQuery,
    ) -> AppResult<Vec<Machine>> {
        Ok(self
            .machines
            .lock()
            .await
            .values()
            .filter(|machine| scope.includes(machine.tenant_id()))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
struct FakeJournal {
    records: Mutex<Vec<TransactionRecord>>,
    append_calls: AtomicUsize,
    failures_remaining: AtomicUsize,
    persist_on_failure: AtomicBool,
    append_delay: Mutex<Option<Duration>>,
}

impl FakeJournal {
    async fn store(&self, record: TransactionRecord) {
        let mut records = self.records.lock().await;
        if records
            .iter()
            .all(|existing| existing.transaction_id() != record.transaction_id())
        {
            records.push(record);
        }
    }
}

#[async_trait]
impl TransactionJournal for FakeJournal {
    async fn append(&self, record: TransactionRecord) -> AppResult<()> {
        self.append_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.append_delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let failing = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |value| {
                value.checked_sub(1)
            })
            .is_ok();

        if failing {
            if self.persist_on_failure.load(Ordering::SeqCst) {
                self.store(record).await;
            }
            return Err(AppError::Unavailable("journal timed out".to_owned()));
        }

        self.store(record).await;
        Ok(())
    }

    async fn list_recent(
        &self,
        scope: TenantScope,
        query: TransactionListQuery,
    ) -> AppResult<Vec<TransactionRecord>> {
        Ok(self
            .records
            .lock()
            .await
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
            .take(query.page.capped_limit())
            .cloned()
            .collect())
    }
}

#[derive(Default)]
struct FakeAuditLog {
    entries: Mutex<Vec<AuditLogEntry>>,
    fail: AtomicBool,
}

#[async_trait]
impl AuditLogRepository for FakeAuditLog {
    async fn append_entry(&self, entry: AuditLogEntry) -> AppResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Internal("audit sink offline".to_owned()));
        }
        self.entries.lock().await.push(entry);
        Ok(())
    }

    async fn list_recent_entries(
        &self,
        scope: TenantScope,
        _query: LedgerListQuery,
    ) -> AppResult<Vec<AuditLogEntry>> {
        Ok(self
            .entries
            .lock()
            .await
            .iter()
            .rev()
            .filter(|entry| scope.includes(entry.tenant_id))
            .cloned()
            .collect())
    }
}

struct Harness {
    store: Arc<FakeLedgerStore>,
    journal: Arc<FakeJournal>,
    audit_log: Arc<FakeAuditLog>,
    service: LedgerService,
}

fn harness(config: LedgerEngineConfig) -> Harness {
    let store = Arc::new(FakeLedgerStore::default());
    let journal = Arc::new(FakeJournal::default());
    let audit_log = Arc::new(FakeAuditLog::default());
    let service =
        LedgerService::new(store.clone(), journal.clone(), audit_log.clone()).with_config(config);

    Harness {
        store,
        journal,
        audit_log,
        service,
    }
}

fn fast_config() -> LedgerEngineConfig {
    LedgerEngineConfig {
        journal_retry_backoff: Duration::ZERO,
        ..LedgerEngineConfig::default()
    }
}

fn money(value: Decimal) -> Money {
    Money::new(value).unwrap_or_else(|_| unreachable!())
}

fn card_id(value: &str) -> CardId {
    CardId::new(value).unwrap_or_else(|_| unreachable!())
}

async fn seed_card(
    store: &FakeLedgerStore,
    tenant_id: TenantId,
    id: &str,
    balance: Decimal,
    status: CardStatus,
) {
    let card = Card::from_parts(
        tenant_id,
        card_id(id),
        "Ada Lovelace",
        None,
        money(balance),
        status,
        Utc::now(),
    )
    .unwrap_or_else(|_| unreachable!());
    store
        .cards
        .lock()
        .await
        .insert((tenant_id, card.card_id().clone()), card);
}

async fn seed_machine(
    store: &FakeLedgerStore,
    tenant_id: TenantId,
    id: &str,
    cost: Decimal,
    status: MachineStatus,
) {
    let machine = Machine::new(
        tenant_id,
        MachineId::new(id).unwrap_or_else(|_| unreachable!()),
        "Galaga Deluxe",
        PositiveAmount::new(cost).unwrap_or_else(|_| unreachable!()),
        status,
        Machine::issue_secret_key(),
    )
    .unwrap_or_else(|_| unreachable!());
    store
        .machines
        .lock()
        .await
        .insert((tenant_id, machine.machine_id().clone()), machine);
}

async fn balance_of(store: &FakeLedgerStore, tenant_id: TenantId, id: &str) -> Money {
    store
        .cards
        .lock()
        .await
        .get(&(tenant_id, card_id(id)))
        .map(Card::balance)
        .unwrap_or_else(|| unreachable!())
}

#[tokio::test]
async fn punch_debits_cost_and_journals_one_entry() {
    let tenant_id = TenantId::new();
    let harness = harness(fast_config());
    seed_card(&harness.store, tenant_id, CARD, dec!(450), CardStatus::Active).await;
    seed_machine(&harness.store, tenant_id, MACHINE, dec!(50), MachineStatus::Online).await;

    let receipt = harness
        .service
        .punch(&CallerIdentity::machine(MACHINE, tenant_id), None, CARD, MACHINE)
        .await;

    let Ok(receipt) = receipt else {
        panic!("punch should succeed: {receipt:?}");
    };
    assert_eq!(receipt.remaining_balance, money(dec!(400)));
    assert_eq!(receipt.machine_name, "Galaga Deluxe");
    assert_eq!(balance_of(&harness.store, tenant_id, CARD).await, money(dec!(400)));

    let records = harness.journal.records.lock().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].transaction_id(), receipt.transaction_id);
    assert_eq!(records[0].kind(), TransactionKind::Punch);
    assert_eq!(records[0].status(), TransactionStatus::Success);
    assert_eq!(records[0].amount(), money(dec!(50)));
    assert_eq!(records[0].terminal(), "Galaga Deluxe");
    assert_eq!(records[0].machine_id().map(MachineId::as_str), Some(MACHINE));
}

#[tokio::test]
async fn punch_with_insufficient_balance_changes_nothing() {
    let tenant_id = TenantId::new();
    let harness = harness(fast_config());
    seed_card(&harness.store, tenant_id, CARD, dec!(30), CardStatus::Active).await;
    seed_machine(&harness.store, tenant_id, MACHINE, dec!(50), MachineStatus::Online).await;

    let result = harness
        .service
        .punch(&CallerIdentity::machine(MACHINE, tenant_id), None, CARD, MACHINE)
        .await;

    assert!(matches!(result, Err(AppError::InsufficientBalance(_))));
    assert_eq!(balance_of(&harness.store, tenant_id, CARD).await, money(dec!(30)));
    assert_eq!(harness.store.swap_attempts.load(Ordering::SeqCst), 0);
    assert!(harness.journal.records.lock().await.is_empty());
    assert!(harness.audit_log.entries.lock().await.is_empty());
}

#[tokio::test]
async fn rejected_punch_is_audited_when_enabled() {
    let tenant_id = TenantId::new();
    let harness = harness(LedgerEngineConfig {
        audit_rejected_punches: true,
        ..fast_config()
    });
    seed_card(&harness.store, tenant_id, CARD, dec!(30), CardStatus::Active).await;
    seed_machine(&harness.store, tenant_id, MACHINE, dec!(50), MachineStatus::Online).await;

    let result = harness
        .service
        .punch(&CallerIdentity::machine(MACHINE, tenant_id), None, CARD, MACHINE)
        .await;

    assert!(matches!(result, Err(AppError::InsufficientBalance(_))));
    let entries = harness.audit_log.entries.lock().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].entry_type, AuditLogType::Warning);
    assert_eq!(entries[0].source, "Machine Ops");
    assert!(harness.journal.records.lock().await.is_empty());
}

#[tokio::test]
async fn non_positive_recharge_is_rejected_before_any_lookup() {
    let tenant_id = TenantId::new();
    let harness = harness(fast_config());
    let manager = CallerIdentity::manager("alice", tenant_id);

    for amount in [dec!(-5), Decimal::ZERO] {
        let result = harness.service.recharge(&manager, None, CARD, amount).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    assert_eq!(harness.store.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn recharge_then_refund_pays_out_full_balance() {
    let tenant_id = TenantId::new();
    let harness = harness(fast_config());
    let manager = CallerIdentity::manager("alice", tenant_id);
    seed_card(&harness.store, tenant_id, CARD, dec!(0), CardStatus::Active).await;

    let recharged = harness
        .service
        .recharge(&manager, None, CARD, dec!(100))
        .await;
    assert!(matches!(recharged, Ok(ref receipt) if receipt.new_balance == money(dec!(100))));

    let refunded = harness
        .service
        .refund(&manager, None, CARD, Some("moving away"))
        .await;
    let Ok(refunded) = refunded else {
        panic!("refund should succeed: {refunded:?}");
    };
    assert_eq!(refunded.refunded_amount, money(dec!(100)));
    assert!(refunded.new_balance.is_zero());
    assert!(balance_of(&harness.store, tenant_id, CARD).await.is_zero());

    let records = harness.journal.records.lock().await;
    let movements: Vec<(TransactionKind, Money, &str)> = records
        .iter()
        .map(|record| (record.kind(), record.amount(), record.terminal()))
        .collect();
    assert_eq!(
        movements,
        vec![
            (TransactionKind::Credit, money(dec!(100)), "Manager Panel"),
            (TransactionKind::Debit, money(dec!(100)), "Manager Panel"),
        ]
    );

    let entries = harness.audit_log.entries.lock().await;
    assert_eq!(entries.len(), 2);
    assert!(entries[1].message.contains("moving away"));
}

#[tokio::test]
async fn refund_of_empty_card_journals_zero_debit() {
    let tenant_id = TenantId::new();
    let harness = harness(fast_config());
    seed_card(&harness.store, tenant_id, CARD, dec!(0), CardStatus::Active).await;

    let result = harness
        .service
        .refund(&CallerIdentity::manager("alice", tenant_id), None, CARD, None)
        .await;

    assert!(matches!(result, Ok(ref receipt) if receipt.refunded_amount.is_zero()));
    let records = harness.journal.records.lock().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind(), TransactionKind::Debit);
    assert!(records[0].amount().is_zero());
}

#[tokio::test]
async fn cards_of_other_tenants_are_reported_missing() {
    let own = TenantId::new();
    let other = TenantId::new();
    let harness = harness(fast_config());
    seed_card(&harness.store, other, CARD, dec!(100), CardStatus::Active).await;
    seed_machine(&harness.store, other, MACHINE, dec!(10), MachineStatus::Online).await;

    let manager = CallerIdentity::manager("alice", own);
    let recharge = harness
        .service
        .recharge(&manager, Some(other), CARD, dec!(5))
        .await;
    assert!(matches!(recharge, Err(AppError::NotFound(_))));

    let status = harness.service.card_status(&manager, Some(other), CARD).await;
    assert!(matches!(status, Err(AppError::NotFound(_))));

    let punch = harness
        .service
        .punch(&CallerIdentity::machine(MACHINE, own), None, CARD, MACHINE)
        .await;
    assert!(matches!(punch, Err(AppError::NotFound(_))));

    assert_eq!(balance_of(&harness.store, other, CARD).await, money(dec!(100)));
    assert!(harness.journal.records.lock().await.is_empty());
}

#[tokio::test]
async fn admin_can_recharge_card_in_any_tenant() {
    let tenant_id = TenantId::new();
    let harness = harness(fast_config());
    seed_card(&harness.store, tenant_id, CARD, dec!(10), CardStatus::Active).await;

    let result = harness
        .service
        .recharge(&CallerIdentity::admin("root"), None, CARD, dec!(15.5))
        .await;

    assert!(matches!(result, Ok(ref receipt) if receipt.new_balance == money(dec!(25.5))));
    let records = harness.journal.records.lock().await;
    assert_eq!(records[0].tenant_id(), tenant_id);
    assert_eq!(records[0].terminal(), "Admin Panel");
}

#[tokio::test]
async fn machine_terminals_cannot_use_operator_actions() {
    let tenant_id = TenantId::new();
    let harness = harness(fast_config());
    seed_card(&harness.store, tenant_id, CARD, dec!(10), CardStatus::Active).await;
    let machine = CallerIdentity::machine(MACHINE, tenant_id);

    let recharge = harness.service.recharge(&machine, None, CARD, dec!(5)).await;
    let refund = harness.service.refund(&machine, None, CARD, None).await;
    let listing = harness
        .service
        .list_transactions(&machine, None, TransactionListQuery::default())
        .await;

    assert!(matches!(recharge, Err(AppError::Forbidden(_))));
    assert!(matches!(refund, Err(AppError::Forbidden(_))));
    assert!(matches!(listing, Err(AppError::Forbidden(_))));

    let status = harness.service.card_status(&machine, None, CARD).await;
    assert!(matches!(status, Ok(ref view) if view.balance == money(dec!(10))));
}

#[tokio::test]
async fn interleaved_write_is_retried_against_fresh_balance() {
    let tenant_id = TenantId::new();
    let harness = harness(fast_config());
    seed_card(&harness.store, tenant_id, CARD, dec!(450), CardStatus::Active).await;
    seed_machine(&harness.store, tenant_id, MACHINE, dec!(50), MachineStatus::Online).await;
    harness
        .store
        .interleaved_writes
        .lock()
        .await
        .push(money(dec!(300)));

    let result = harness
        .service
        .punch(&CallerIdentity::machine(MACHINE, tenant_id), None, CARD, MACHINE)
        .await;

    assert!(matches!(result, Ok(ref receipt) if receipt.remaining_balance == money(dec!(250))));
    assert_eq!(harness.store.swap_attempts.load(Ordering::SeqCst), 2);
    assert_eq!(balance_of(&harness.store, tenant_id, CARD).await, money(dec!(250)));
    assert_eq!(harness.journal.records.lock().await.len(), 1);
}

#[tokio::test]
async fn write_that_restores_the_balance_still_forces_a_retry() {
    let tenant_id = TenantId::new();
    let harness = harness(fast_config());
    seed_card(&harness.store, tenant_id, CARD, dec!(450), CardStatus::Active).await;
    seed_machine(&harness.store, tenant_id, MACHINE, dec!(50), MachineStatus::Online).await;
    harness
        .store
        .interleaved_writes
        .lock()
        .await
        .push(money(dec!(450)));

    let result = harness
        .service
        .punch(&CallerIdentity::machine(MACHINE, tenant_id), None, CARD, MACHINE)
        .await;

    assert!(matches!(result, Ok(ref receipt) if receipt.remaining_balance == money(dec!(400))));
    assert_eq!(harness.store.swap_attempts.load(Ordering::SeqCst), 2);

    let records = harness.journal.records.lock().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].card_version(), 2);
}

#[tokio::test]
async fn journal_entries_follow_commit_order() {
    let tenant_id = TenantId::new();
    let harness = harness(fast_config());
    let manager = CallerIdentity::manager("alice", tenant_id);
    seed_card(&harness.store, tenant_id, CARD, dec!(0), CardStatus::Active).await;
    seed_machine(&harness.store, tenant_id, MACHINE, dec!(50), MachineStatus::Online).await;

    assert!(harness.service.recharge(&manager, None, CARD, dec!(120)).await.is_ok());
    assert!(
        harness
            .service
            .punch(&CallerIdentity::machine(MACHINE, tenant_id), None, CARD, MACHINE)
            .await
            .is_ok()
    );
    assert!(harness.service.refund(&manager, None, CARD, None).await.is_ok());

    let records = harness.journal.records.lock().await;
    let versions: Vec<u64> = records.iter().map(TransactionRecord::card_version).collect();
    assert_eq!(versions, vec![1, 2, 3]);
    assert!(
        records
            .windows(2)
            .all(|pair| pair[0].recorded_at() < pair[1].recorded_at())
    );
}

#[tokio::test]
async fn punch_abandoned_by_its_caller_still_journals_the_debit() {
    let tenant_id = TenantId::new();
    let harness = harness(fast_config());
    seed_card(&harness.store, tenant_id, CARD, dec!(450), CardStatus::Active).await;
    seed_machine(&harness.store, tenant_id, MACHINE, dec!(50), MachineStatus::Online).await;
    *harness.journal.append_delay.lock().await = Some(Duration::from_millis(150));

    let caller = CallerIdentity::machine(MACHINE, tenant_id);
    let abandoned = tokio::time::timeout(
        Duration::from_millis(20),
        harness.service.punch(&caller, None, CARD, MACHINE),
    )
    .await;
    assert!(abandoned.is_err(), "punch should outlive the caller's deadline");

    for _ in 0..100 {
        if !harness.journal.records.lock().await.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert_eq!(balance_of(&harness.store, tenant_id, CARD).await, money(dec!(400)));
    let records = harness.journal.records.lock().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind(), TransactionKind::Punch);
    assert_eq!(records[0].amount(), money(dec!(50)));
    assert_eq!(records[0].card_version(), 1);
}

#[tokio::test]
async fn conflict_retries_are_bounded() {
    let tenant_id = TenantId::new();
    let harness = harness(LedgerEngineConfig {
        max_conflict_retries: 3,
        ..fast_config()
    });
    seed_card(&harness.store, tenant_id, CARD, dec!(450), CardStatus::Active).await;
    harness.store.always_conflict.store(true, Ordering::SeqCst);

    let result = harness
        .service
        .recharge(&CallerIdentity::manager("alice", tenant_id), None, CARD, dec!(10))
        .await;

    assert!(matches!(result, Err(AppError::ConflictRetryExhausted(_))));
    assert_eq!(harness.store.swap_attempts.load(Ordering::SeqCst), 4);
    assert_eq!(balance_of(&harness.store, tenant_id, CARD).await, money(dec!(450)));
    assert!(harness.journal.records.lock().await.is_empty());
}

#[tokio::test]
async fn ambiguous_journal_failure_is_replayed_once() {
    let tenant_id = TenantId::new();
    let harness = harness(fast_config());
    seed_card(&harness.store, tenant_id, CARD, dec!(0), CardStatus::Active).await;
    harness.journal.failures_remaining.store(2, Ordering::SeqCst);
    harness.journal.persist_on_failure.store(true, Ordering::SeqCst);

    let result = harness
        .service
        .recharge(&CallerIdentity::manager("alice", tenant_id), None, CARD, dec!(20))
        .await;

    let Ok(receipt) = result else {
        panic!("recharge should succeed after journal retries: {result:?}");
    };
    assert_eq!(harness.journal.append_calls.load(Ordering::SeqCst), 3);
    let records = harness.journal.records.lock().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].transaction_id(), receipt.transaction_id);
}

#[tokio::test]
async fn exhausted_journal_retries_surface_failure_with_committed_balance() {
    let tenant_id = TenantId::new();
    let harness = harness(LedgerEngineConfig {
        journal_append_attempts: 3,
        ..fast_config()
    });
    seed_card(&harness.store, tenant_id, CARD, dec!(450), CardStatus::Active).await;
    seed_machine(&harness.store, tenant_id, MACHINE, dec!(50), MachineStatus::Online).await;
    harness
        .journal
        .failures_remaining
        .store(usize::MAX, Ordering::SeqCst);

    let result = harness
        .service
        .punch(&CallerIdentity::machine(MACHINE, tenant_id), None, CARD, MACHINE)
        .await;

    assert!(matches!(result, Err(AppError::JournalWriteFailure(_))));
    assert_eq!(harness.journal.append_calls.load(Ordering::SeqCst), 3);
    assert_eq!(balance_of(&harness.store, tenant_id, CARD).await, money(dec!(400)));

    let entries = harness.audit_log.entries.lock().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].entry_type, AuditLogType::Error);
    assert_eq!(entries[0].source, "Ledger Engine");
}

#[tokio::test]
async fn audit_sink_failure_does_not_fail_recharge() {
    let tenant_id = TenantId::new();
    let harness = harness(fast_config());
    seed_card(&harness.store, tenant_id, CARD, dec!(0), CardStatus::Active).await;
    harness.audit_log.fail.store(true, Ordering::SeqCst);

    let result = harness
        .service
        .recharge(&CallerIdentity::manager("alice", tenant_id), None, CARD, dec!(40))
        .await;

    assert!(matches!(result, Ok(ref receipt) if receipt.new_balance == money(dec!(40))));
    assert_eq!(harness.journal.records.lock().await.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_punches_never_overdraw() {
    let tenant_id = TenantId::new();
    let harness = harness(LedgerEngineConfig {
        max_conflict_retries: 32,
        ..fast_config()
    });
    seed_card(&harness.store, tenant_id, CARD, dec!(500), CardStatus::Active).await;
    seed_machine(&harness.store, tenant_id, MACHINE, dec!(50), MachineStatus::Online).await;

    let mut handles = Vec::new();
    for _ in 0..25 {
        let service = harness.service.clone();
        let caller = CallerIdentity::machine(MACHINE, tenant_id);
        handles.push(tokio::spawn(async move {
            service.punch(&caller, None, CARD, MACHINE).await
        }));
    }

    let mut successes = 0;
    let mut rejections = 0;
    for handle in handles {
        match handle.await {
            Ok(Ok(_)) => successes += 1,
            Ok(Err(AppError::InsufficientBalance(_))) => rejections += 1,
            other => panic!("unexpected punch outcome: {other:?}"),
        }
    }

    assert_eq!(successes, 10);
    assert_eq!(rejections, 15);
    assert!(balance_of(&harness.store, tenant_id, CARD).await.is_zero());

    let records = harness.journal.records.lock().await;
    assert_eq!(records.len(), 10);
    let journaled: Decimal = records.iter().map(|record| record.amount().amount()).sum();
    assert_eq!(journaled, dec!(500));
}

#[tokio::test]
async fn blocked_card_rejects_plays_but_can_be_refunded() {
    let tenant_id = TenantId::new();
    let harness = harness(fast_config());
    seed_card(&harness.store, tenant_id, CARD, dec!(80), CardStatus::Blocked).await;
    seed_machine(&harness.store, tenant_id, MACHINE, dec!(50), MachineStatus::Online).await;

    let punch = harness
        .service
        .punch(&CallerIdentity::machine(MACHINE, tenant_id), None, CARD, MACHINE)
        .await;
    assert!(matches!(punch, Err(AppError::Validation(_))));

    let manager = CallerIdentity::manager("alice", tenant_id);
    let recharge = harness.service.recharge(&manager, None, CARD, dec!(5)).await;
    assert!(matches!(recharge, Err(AppError::Validation(_))));

    let refund = harness.service.refund(&manager, None, CARD, None).await;
    assert!(matches!(refund, Ok(ref receipt) if receipt.refunded_amount == money(dec!(80))));
}

#[tokio::test]
async fn offline_machine_rejects_punch() {
    let tenant_id = TenantId::new();
    let harness = harness(fast_config());
    seed_card(&harness.store, tenant_id, CARD, dec!(100), CardStatus::Active).await;
    seed_machine(&harness.store, tenant_id, MACHINE, dec!(50), MachineStatus::Offline).await;

    let result = harness
        .service
        .punch(&CallerIdentity::machine(MACHINE, tenant_id), None, CARD, MACHINE)
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(balance_of(&harness.store, tenant_id, CARD).await, money(dec!(100)));
}

#[tokio::test]
async fn unknown_machine_is_not_found() {
    let tenant_id = TenantId::new();
    let harness = harness(fast_config());
    seed_card(&harness.store, tenant_id, CARD, dec!(100), CardStatus::Active).await;

    let result = harness
        .service
        .punch(&CallerIdentity::machine(MACHINE, tenant_id), None, CARD, "M-404")
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn register_card_requires_unique_id_and_named_tenant() {
    let tenant_id = TenantId::new();
    let harness = harness(fast_config());
    let input = RegisterCardInput {
        card_id: CARD.to_owned(),
        owner_name: "Grace Hopper".to_owned(),
        contact: Some("grace@example.com".to_owned()),
    };

    let admin = harness
        .service
        .register_card(&CallerIdentity::admin("root"), None, input.clone())
        .await;
    assert!(matches!(admin, Err(AppError::Validation(_))));

    let manager = CallerIdentity::manager("alice", tenant_id);
    let created = harness
        .service
        .register_card(&manager, None, input.clone())
        .await;
    assert!(matches!(created, Ok(ref card) if card.balance().is_zero() && card.tenant_id() == tenant_id));

    let duplicate = harness.service.register_card(&manager, None, input).await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    let entries = harness.audit_log.entries.lock().await;
    assert_eq!(entries.len(), 1);
    assert!(entries[0].message.starts_with("New card registered"));
}

#[tokio::test]
async fn card_history_is_limited_to_visible_card() {
    let tenant_id = TenantId::new();
    let harness = harness(fast_config());
    let manager = CallerIdentity::manager("alice", tenant_id);
    seed_card(&harness.store, tenant_id, CARD, dec!(0), CardStatus::Active).await;
    seed_card(&harness.store, tenant_id, "CARD-0002", dec!(0), CardStatus::Active).await;

    for (id, amount) in [(CARD, dec!(10)), ("CARD-0002", dec!(20)), (CARD, dec!(30))] {
        let result = harness.service.recharge(&manager, None, id, amount).await;
        assert!(result.is_ok());
    }

    let history = harness
        .service
        .card_history(&manager, None, CARD, LedgerListQuery::default())
        .await;
    let Ok(history) = history else {
        panic!("history should load: {history:?}");
    };
    let amounts: Vec<Money> = history.iter().map(TransactionRecord::amount).collect();
    assert_eq!(amounts, vec![money(dec!(30)), money(dec!(10))]);

    let outsider = CallerIdentity::manager("bob", TenantId::new());
    let hidden = harness
        .service
        .card_history(&outsider, None, CARD, LedgerListQuery::default())
        .await;
    assert!(matches!(hidden, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn listings_are_scoped_to_caller_tenant() {
    let own = TenantId::new();
    let other = TenantId::new();
    let harness = harness(fast_config());
    seed_card(&harness.store, own, CARD, dec!(1), CardStatus::Active).await;
    seed_card(&harness.store, other, "CARD-0009", dec!(1), CardStatus::Active).await;

    let manager = CallerIdentity::manager("alice", own);
    let cards = harness
        .service
        .list_cards(&manager, Some(other), LedgerListQuery::default())
        .await;
    assert!(matches!(cards, Ok(ref cards) if cards.len() == 1 && cards[0].tenant_id() == own));

    let all = harness
        .service
        .list_cards(&CallerIdentity::admin("root"), None, LedgerListQuery::default())
        .await;
    assert!(matches!(all, Ok(ref cards) if cards.len() == 2));
}
