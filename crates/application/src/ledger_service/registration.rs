use arcade_ledger_core::{AppResult, CallerIdentity, TenantId};
use arcade_ledger_domain::{AuditLogEntry, AuditLogType, Card, CardId};
use tracing::info;

use crate::TenantScopePolicy;

use super::{AUDIT_SOURCE_MANAGER_OPS, LedgerService, RegisterCardInput};

impl LedgerService {
    /// Issues a new card with a zero balance in the caller's arcade.
    pub async fn register_card(
        &self,
        caller: &CallerIdentity,
        requested_tenant: Option<TenantId>,
        input: RegisterCardInput,
    ) -> AppResult<Card> {
        TenantScopePolicy::require_operator(caller)?;
        let tenant_id = TenantScopePolicy::target_tenant(caller, requested_tenant)?;
        let card = Card::register(
            tenant_id,
            CardId::new(input.card_id)?,
            input.owner_name,
            input.contact,
        )?;

        self.store.insert_card(card.clone()).await?;

        self.record_audit(AuditLogEntry::now(
            tenant_id,
            AuditLogType::Info,
            AUDIT_SOURCE_MANAGER_OPS,
            format!(
                "New card registered: {} for {}",
                card.card_id(),
                card.owner_name()
            ),
        ))
        .await;

        info!(
            %tenant_id,
            card_id = %card.card_id(),
            subject = %caller.subject(),
            "card registered"
        );

        Ok(card)
    }
}
