use arcade_ledger_core::{AppError, AppResult, CallerIdentity, TenantId};
use arcade_ledger_domain::{
    AppliedBalanceChange, AuditLogEntry, AuditLogType, BalanceChange, Card, CardId, MachineId,
    Money, PositiveAmount, TransactionId, TransactionRecord, TransactionRecordInput,
    TransactionStatus,
};
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::{BalanceSwap, TenantScope, TenantScopePolicy};

use super::{
    AUDIT_SOURCE_MACHINE_OPS, AUDIT_SOURCE_MANAGER_OPS, LedgerService, PunchReceipt,
    RechargeReceipt, RefundReceipt, card_not_found, machine_not_found, operator_terminal,
};

struct CommittedChange {
    transaction_id: TransactionId,
    applied: AppliedBalanceChange,
}

impl LedgerService {
    /// Charges one play of `machine_id` to `card_id`.
    ///
    /// The machine is resolved inside the card's arcade, so a card can only be
    /// punched on machines of the arcade that issued it.
    pub async fn punch(
        &self,
        caller: &CallerIdentity,
        requested_tenant: Option<TenantId>,
        card_id: &str,
        machine_id: &str,
    ) -> AppResult<PunchReceipt> {
        let card_id = CardId::new(card_id)?;
        let machine_id = MachineId::new(machine_id)?;
        let scope = TenantScopePolicy::resolve(caller, requested_tenant)?;

        let card = self.load_card(scope, &card_id).await?;
        let tenant_id = card.tenant_id();
        let machine = self
            .store
            .find_machine(tenant_id, &machine_id)
            .await?
            .ok_or_else(|| machine_not_found(&machine_id))?;
        machine.ensure_accepts_plays()?;

        let change = BalanceChange::Punch {
            cost: machine.cost_per_play(),
        };
        let committed = match self
            .commit_balance_change(
                card,
                change,
                Some(machine_id.clone()),
                machine.name().as_str(),
            )
            .await
        {
            Ok(committed) => committed,
            Err(error @ AppError::InsufficientBalance(_)) => {
                if self.config.audit_rejected_punches {
                    self.record_audit(AuditLogEntry::now(
                        tenant_id,
                        AuditLogType::Warning,
                        AUDIT_SOURCE_MACHINE_OPS,
                        format!("Punch rejected for card {card_id} on {machine_id}: {error}"),
                    ))
                    .await;
                }
                return Err(error);
            }
            Err(error) => return Err(error),
        };

        info!(
            %tenant_id,
            card_id = %card_id,
            machine_id = %machine_id,
            transaction_id = %committed.transaction_id,
            cost = %committed.applied.journal_amount,
            remaining_balance = %committed.applied.next,
            "card punched"
        );

        Ok(PunchReceipt {
            transaction_id: committed.transaction_id,
            card_id,
            machine_id,
            machine_name: machine.name().to_string(),
            remaining_balance: committed.applied.next,
        })
    }

    /// Credits `amount` to a card. Operators only.
    pub async fn recharge(
        &self,
        caller: &CallerIdentity,
        requested_tenant: Option<TenantId>,
        card_id: &str,
        amount: Decimal,
    ) -> AppResult<RechargeReceipt> {
        TenantScopePolicy::require_operator(caller)?;
        let amount = PositiveAmount::new(amount)?;
        let card_id = CardId::new(card_id)?;
        let scope = TenantScopePolicy::resolve(caller, requested_tenant)?;

        let card = self.load_card(scope, &card_id).await?;
        let tenant_id = card.tenant_id();
        let committed = self
            .commit_balance_change(
                card,
                BalanceChange::Recharge { amount },
                None,
                operator_terminal(caller),
            )
            .await?;

        self.record_audit(AuditLogEntry::now(
            tenant_id,
            AuditLogType::Info,
            AUDIT_SOURCE_MANAGER_OPS,
            format!("Card {card_id} recharged with {amount}"),
        ))
        .await;

        info!(
            %tenant_id,
            card_id = %card_id,
            subject = %caller.subject(),
            transaction_id = %committed.transaction_id,
            amount = %amount,
            new_balance = %committed.applied.next,
            "card recharged"
        );

        Ok(RechargeReceipt {
            transaction_id: committed.transaction_id,
            card_id,
            new_balance: committed.applied.next,
        })
    }

    /// Pays out the whole balance and resets it to zero. Operators only.
    pub async fn refund(
        &self,
        caller: &CallerIdentity,
        requested_tenant: Option<TenantId>,
        card_id: &str,
        reason: Option<&str>,
    ) -> AppResult<RefundReceipt> {
        TenantScopePolicy::require_operator(caller)?;
        let card_id = CardId::new(card_id)?;
        let scope = TenantScopePolicy::resolve(caller, requested_tenant)?;

        let card = self.load_card(scope, &card_id).await?;
        let tenant_id = card.tenant_id();
        let committed = self
            .commit_balance_change(card, BalanceChange::Refund, None, operator_terminal(caller))
            .await?;

        let refunded_amount = committed.applied.journal_amount;
        let reason = reason
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or("Customer request");
        self.record_audit(AuditLogEntry::now(
            tenant_id,
            AuditLogType::Info,
            AUDIT_SOURCE_MANAGER_OPS,
            format!("Refund processed for card {card_id}. Amount: {refunded_amount} ({reason})"),
        ))
        .await;

        info!(
            %tenant_id,
            card_id = %card_id,
            subject = %caller.subject(),
            transaction_id = %committed.transaction_id,
            refunded_amount = %refunded_amount,
            "card refunded"
        );

        Ok(RefundReceipt {
            transaction_id: committed.transaction_id,
            card_id,
            refunded_amount,
            new_balance: Money::ZERO,
        })
    }

    pub(super) async fn load_card(&self, scope: TenantScope, card_id: &CardId) -> AppResult<Card> {
        self.store
            .find_card(scope, card_id)
            .await?
            .ok_or_else(|| card_not_found(card_id))
    }

    /// Commits one balance change and its journal entry.
    ///
    /// The work runs on its own task, so a caller that stops waiting once the
    /// balance may have moved cannot strand the change without its entry.
    async fn commit_balance_change(
        &self,
        card: Card,
        change: BalanceChange,
        machine_id: Option<MachineId>,
        terminal: &str,
    ) -> AppResult<CommittedChange> {
        let service = self.clone();
        let terminal = terminal.to_owned();

        tokio::spawn(async move {
            service
                .run_commit_loop(card, change, machine_id, terminal)
                .await
        })
        .await
        .map_err(|error| AppError::Internal(format!("balance commit task failed: {error}")))?
    }

    /// Runs the validate, compare-and-swap, journal loop for one card.
    ///
    /// The transaction id is fixed before the first attempt so journal retries
    /// replay the same entry. The entry takes its version and timestamp from
    /// the store's commit, so journal order follows commit order.
    async fn run_commit_loop(
        &self,
        mut card: Card,
        change: BalanceChange,
        machine_id: Option<MachineId>,
        terminal: String,
    ) -> AppResult<CommittedChange> {
        let transaction_id = TransactionId::new();
        let tenant_id = card.tenant_id();
        let card_id = card.card_id().clone();
        let max_attempts = self.config.max_conflict_retries.saturating_add(1);

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                card = self
                    .load_card(TenantScope::Tenant(tenant_id), &card_id)
                    .await?;
            }

            if change.requires_active_card() {
                card.ensure_active()?;
            }

            let applied = change.apply(&card_id, card.balance())?;
            let draft = TransactionRecord::new(TransactionRecordInput {
                transaction_id,
                tenant_id,
                card_id: card_id.clone(),
                machine_id: machine_id.clone(),
                amount: applied.journal_amount,
                kind: applied.kind,
                status: TransactionStatus::Success,
                terminal: terminal.clone(),
                card_version: card.version().saturating_add(1),
                recorded_at: Utc::now(),
            })?;

            let swap = BalanceSwap {
                tenant_id,
                card_id: &card_id,
                expected_version: card.version(),
                expected_balance: applied.previous,
                next_balance: applied.next,
            };
            if let Some(commit) = self.store.compare_and_swap_balance(swap).await? {
                self.append_to_journal(draft.at_commit(commit.version, commit.committed_at))
                    .await?;
                return Ok(CommittedChange {
                    transaction_id,
                    applied,
                });
            }

            warn!(
                %tenant_id,
                card_id = %card_id,
                attempt,
                max_attempts,
                expected_version = card.version(),
                "card changed concurrently, retrying"
            );
        }

        Err(AppError::ConflictRetryExhausted(format!(
            "card '{card_id}' is busy: {max_attempts} conflicting commit attempts"
        )))
    }
}
