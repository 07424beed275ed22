//! Balance mutation engine and ledger read models.
//!
//! Every balance change runs as fetch, validate, conditional update, journal
//! append. The conditional update is a compare-and-swap on the card version and
//! balance, so concurrent operations on one card serialize in the order the
//! store accepts their swaps, while operations on distinct cards never contend.
//! Journal entries carry the version and commit time the store assigned.

use std::sync::Arc;
use std::time::Duration;

use arcade_ledger_core::{AppError, CallerIdentity, CallerRole};
use arcade_ledger_domain::{
    AuditLogEntry, CardId, CardStatus, MachineId, Money, TransactionId,
};
use tracing::warn;

use crate::{AuditLogRepository, LedgerStore, TransactionJournal};

mod journal_append;
mod mutation;
mod queries;
mod registration;

#[cfg(test)]
mod tests;

const AUDIT_SOURCE_MANAGER_OPS: &str = "Manager Ops";
const AUDIT_SOURCE_MACHINE_OPS: &str = "Machine Ops";
const AUDIT_SOURCE_LEDGER: &str = "Ledger Engine";

/// Tunables for the mutation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerEngineConfig {
    /// Extra compare-and-swap attempts after the first conflicting one.
    pub max_conflict_retries: u32,
    /// Total journal append attempts after a committed balance change.
    pub journal_append_attempts: u32,
    /// Base delay between journal append attempts, multiplied by the attempt number.
    pub journal_retry_backoff: Duration,
    /// Writes a warning audit entry for punches rejected on balance.
    pub audit_rejected_punches: bool,
}

impl Default for LedgerEngineConfig {
    fn default() -> Self {
        Self {
            max_conflict_retries: 16,
            journal_append_attempts: 5,
            journal_retry_backoff: Duration::from_millis(25),
            audit_rejected_punches: false,
        }
    }
}

/// Result of a committed punch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PunchReceipt {
    /// Journal entry identifier.
    pub transaction_id: TransactionId,
    /// Punched card.
    pub card_id: CardId,
    /// Charged machine.
    pub machine_id: MachineId,
    /// Charged machine display name.
    pub machine_name: String,
    /// Balance after the play.
    pub remaining_balance: Money,
}

/// Result of a committed recharge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RechargeReceipt {
    /// Journal entry identifier.
    pub transaction_id: TransactionId,
    /// Credited card.
    pub card_id: CardId,
    /// Balance after the credit.
    pub new_balance: Money,
}

/// Result of a committed refund.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundReceipt {
    /// Journal entry identifier.
    pub transaction_id: TransactionId,
    /// Refunded card.
    pub card_id: CardId,
    /// Balance paid out.
    pub refunded_amount: Money,
    /// Balance after the refund; always zero.
    pub new_balance: Money,
}

/// Kiosk view of a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardStatusView {
    /// Card identifier.
    pub card_id: CardId,
    /// Card holder name.
    pub owner_name: String,
    /// Current balance.
    pub balance: Money,
    /// Lifecycle status.
    pub status: CardStatus,
}

/// Input payload for registering a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterCardInput {
    /// Card identifier printed on the RFID tag.
    pub card_id: String,
    /// Card holder name.
    pub owner_name: String,
    /// Optional contact detail.
    pub contact: Option<String>,
}

/// Application service owning every card balance change.
#[derive(Clone)]
pub struct LedgerService {
    store: Arc<dyn LedgerStore>,
    journal: Arc<dyn TransactionJournal>,
    audit_log: Arc<dyn AuditLogRepository>,
    config: LedgerEngineConfig,
}

impl LedgerService {
    /// Creates a service with default engine tunables.
    #[must_use]
    pub fn new(
        store: Arc<dyn LedgerStore>,
        journal: Arc<dyn TransactionJournal>,
        audit_log: Arc<dyn AuditLogRepository>,
    ) -> Self {
        Self {
            store,
            journal,
            audit_log,
            config: LedgerEngineConfig::default(),
        }
    }

    /// Replaces the engine tunables.
    #[must_use]
    pub fn with_config(mut self, config: LedgerEngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the active engine tunables.
    #[must_use]
    pub fn config(&self) -> LedgerEngineConfig {
        self.config
    }

    async fn record_audit(&self, entry: AuditLogEntry) {
        let tenant_id = entry.tenant_id;
        if let Err(error) = self.audit_log.append_entry(entry).await {
            warn!(%tenant_id, error = %error, "failed to write audit log entry");
        }
    }
}

fn operator_terminal(caller: &CallerIdentity) -> &'static str {
    match caller.role() {
        CallerRole::Admin => "Admin Panel",
        CallerRole::Manager => "Manager Panel",
        CallerRole::Machine => "Machine Terminal",
    }
}

fn card_not_found(card_id: &CardId) -> AppError {
    AppError::NotFound(format!("card '{card_id}' not found"))
}

fn machine_not_found(machine_id: &MachineId) -> AppError {
    AppError::NotFound(format!("machine '{machine_id}' not found"))
}
