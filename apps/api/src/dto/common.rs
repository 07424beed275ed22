use arcade_ledger_application::{LedgerListQuery, TransactionListQuery};
use arcade_ledger_core::{AppError, AppResult, CallerIdentity, CallerRole, TenantId};
use arcade_ledger_domain::{CardId, TransactionKind};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Health response payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/health-response.ts"
)]
pub struct HealthResponse {
    pub status: &'static str,
    pub ready: bool,
    pub postgres: HealthDependencyStatus,
}

/// Reachability of one backing dependency.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/health-dependency-status.ts"
)]
pub struct HealthDependencyStatus {
    pub status: &'static str,
    pub detail: Option<String>,
}

/// Optional arcade selector; only honored for administrators.
#[derive(Debug, Default, Deserialize)]
pub struct TenantQuery {
    pub tenant: Option<String>,
}

impl TenantQuery {
    pub fn requested_tenant(&self, caller: &CallerIdentity) -> AppResult<Option<TenantId>> {
        parse_tenant(caller, self.tenant.as_deref())
    }
}

/// Pagination plus arcade selector for dashboard listings.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub tenant: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl PageQuery {
    pub fn requested_tenant(&self, caller: &CallerIdentity) -> AppResult<Option<TenantId>> {
        parse_tenant(caller, self.tenant.as_deref())
    }

    pub fn page(&self) -> LedgerListQuery {
        page(self.limit, self.offset)
    }
}

/// Journal listing filters.
#[derive(Debug, Default, Deserialize)]
pub struct TransactionFilterQuery {
    pub tenant: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub card_id: Option<String>,
    pub kind: Option<String>,
}

impl TransactionFilterQuery {
    pub fn requested_tenant(&self, caller: &CallerIdentity) -> AppResult<Option<TenantId>> {
        parse_tenant(caller, self.tenant.as_deref())
    }

    pub fn to_query(&self) -> AppResult<TransactionListQuery> {
        Ok(TransactionListQuery {
            page: page(self.limit, self.offset),
            card_id: self
                .card_id
                .as_deref()
                .filter(|value| !value.trim().is_empty())
                .map(CardId::new)
                .transpose()?,
            kind: self
                .kind
                .as_deref()
                .filter(|value| !value.trim().is_empty())
                .map(str::parse::<TransactionKind>)
                .transpose()?,
        })
    }
}

fn page(limit: Option<usize>, offset: Option<usize>) -> LedgerListQuery {
    let defaults = LedgerListQuery::default();
    LedgerListQuery {
        limit: limit.unwrap_or(defaults.limit),
        offset: offset.unwrap_or(defaults.offset),
    }
}

/// Parses the arcade selector. Non-administrators are pinned to their own
/// arcade, so their selector is ignored without being read.
fn parse_tenant(caller: &CallerIdentity, value: Option<&str>) -> AppResult<Option<TenantId>> {
    if caller.role() != CallerRole::Admin {
        return Ok(None);
    }

    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| {
            value
                .parse::<TenantId>()
                .map_err(|error| AppError::Validation(format!("invalid tenant '{value}': {error}")))
        })
        .transpose()
}
