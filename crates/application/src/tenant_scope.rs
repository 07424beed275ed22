//! Tenant scoping policy consulted by every ledger lookup and listing.

use arcade_ledger_core::{AppError, AppResult, CallerIdentity, CallerRole, TenantId};
use tracing::debug;

/// Effective tenant filter for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TenantScope {
    /// Unrestricted; only reachable by administrators.
    AllTenants,
    /// Restricted to exactly one arcade.
    Tenant(TenantId),
}

impl TenantScope {
    /// Returns true when `tenant_id` is visible in this scope.
    #[must_use]
    pub fn includes(&self, tenant_id: TenantId) -> bool {
        match self {
            Self::AllTenants => true,
            Self::Tenant(scoped) => *scoped == tenant_id,
        }
    }

    /// Returns the single tenant for restricted scopes.
    #[must_use]
    pub fn tenant_id(&self) -> Option<TenantId> {
        match self {
            Self::AllTenants => None,
            Self::Tenant(tenant_id) => Some(*tenant_id),
        }
    }
}

/// Derives tenant filters and role gates from the caller credential.
#[derive(Debug, Clone, Copy, Default)]
pub struct TenantScopePolicy;

impl TenantScopePolicy {
    /// Resolves the effective tenant filter.
    ///
    /// Administrators get the requested tenant or every tenant. Managers and
    /// machine terminals are pinned to their own arcade; a requested tenant is
    /// ignored for them.
    pub fn resolve(
        caller: &CallerIdentity,
        requested_tenant: Option<TenantId>,
    ) -> AppResult<TenantScope> {
        match caller.role() {
            CallerRole::Admin => Ok(requested_tenant
                .map(TenantScope::Tenant)
                .unwrap_or(TenantScope::AllTenants)),
            CallerRole::Manager | CallerRole::Machine => {
                let tenant_id = caller.tenant_id().ok_or_else(|| {
                    AppError::Unauthorized(format!(
                        "{} caller '{}' is not bound to an arcade",
                        caller.role(),
                        caller.subject()
                    ))
                })?;

                if requested_tenant.is_some_and(|requested| requested != tenant_id) {
                    debug!(
                        subject = %caller.subject(),
                        role = %caller.role(),
                        %tenant_id,
                        "ignoring requested tenant outside caller scope"
                    );
                }

                Ok(TenantScope::Tenant(tenant_id))
            }
        }
    }

    /// Resolves the single arcade that receives newly registered records.
    pub fn target_tenant(
        caller: &CallerIdentity,
        requested_tenant: Option<TenantId>,
    ) -> AppResult<TenantId> {
        Self::resolve(caller, requested_tenant)?
            .tenant_id()
            .ok_or_else(|| {
                AppError::Validation("administrators must name the target arcade".to_owned())
            })
    }

    /// Requires a manager or administrator caller.
    pub fn require_operator(caller: &CallerIdentity) -> AppResult<()> {
        match caller.role() {
            CallerRole::Admin | CallerRole::Manager => Ok(()),
            CallerRole::Machine => Err(AppError::Forbidden(format!(
                "machine terminal '{}' may not perform operator actions",
                caller.subject()
            ))),
        }
    }
}
