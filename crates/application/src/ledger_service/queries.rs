use arcade_ledger_core::{AppResult, CallerIdentity, TenantId};
use arcade_ledger_domain::{AuditLogEntry, Card, CardId, Machine, TransactionRecord};

use crate::{LedgerListQuery, TenantScope, TenantScopePolicy, TransactionListQuery};

use super::{CardStatusView, LedgerService};

impl LedgerService {
    /// Reads a card balance without mutating anything. Open to every role.
    pub async fn card_status(
        &self,
        caller: &CallerIdentity,
        requested_tenant: Option<TenantId>,
        card_id: &str,
    ) -> AppResult<CardStatusView> {
        let card_id = CardId::new(card_id)?;
        let scope = TenantScopePolicy::resolve(caller, requested_tenant)?;
        let card = self.load_card(scope, &card_id).await?;

        Ok(CardStatusView {
            card_id,
            owner_name: card.owner_name().to_string(),
            balance: card.balance(),
            status: card.status(),
        })
    }

    /// Lists cards visible to an operator.
    pub async fn list_cards(
        &self,
        caller: &CallerIdentity,
        requested_tenant: Option<TenantId>,
        query: LedgerListQuery,
    ) -> AppResult<Vec<Card>> {
        TenantScopePolicy::require_operator(caller)?;
        let scope = TenantScopePolicy::resolve(caller, requested_tenant)?;
        self.store.list_cards(scope, query).await
    }

    /// Lists machines visible to an operator.
    pub async fn list_machines(
        &self,
        caller: &CallerIdentity,
        requested_tenant: Option<TenantId>,
        query: LedgerListQuery,
    ) -> AppResult<Vec<Machine>> {
        TenantScopePolicy::require_operator(caller)?;
        let scope = TenantScopePolicy::resolve(caller, requested_tenant)?;
        self.store.list_machines(scope, query).await
    }

    /// Lists journal entries visible to an operator, newest first.
    pub async fn list_transactions(
        &self,
        caller: &CallerIdentity,
        requested_tenant: Option<TenantId>,
        query: TransactionListQuery,
    ) -> AppResult<Vec<TransactionRecord>> {
        TenantScopePolicy::require_operator(caller)?;
        let scope = TenantScopePolicy::resolve(caller, requested_tenant)?;
        self.journal.list_recent(scope, query).await
    }

    /// Lists the journal of one card, newest first.
    ///
    /// The card must be visible to the caller; a card in another arcade is
    /// reported as missing rather than as an empty history.
    pub async fn card_history(
        &self,
        caller: &CallerIdentity,
        requested_tenant: Option<TenantId>,
        card_id: &str,
        page: LedgerListQuery,
    ) -> AppResult<Vec<TransactionRecord>> {
        TenantScopePolicy::require_operator(caller)?;
        let card_id = CardId::new(card_id)?;
        let scope = TenantScopePolicy::resolve(caller, requested_tenant)?;
        let card = self.load_card(scope, &card_id).await?;

        self.journal
            .list_recent(
                TenantScope::Tenant(card.tenant_id()),
                TransactionListQuery {
                    page,
                    card_id: Some(card_id),
                    kind: None,
                },
            )
            .await
    }

    /// Lists audit log entries visible to an operator, newest first.
    pub async fn list_audit_log(
        &self,
        caller: &CallerIdentity,
        requested_tenant: Option<TenantId>,
        query: LedgerListQuery,
    ) -> AppResult<Vec<AuditLogEntry>> {
        TenantScopePolicy::require_operator(caller)?;
        let scope = TenantScopePolicy::resolve(caller, requested_tenant)?;
        self.audit_log.list_recent_entries(scope, query).await
    }
}
