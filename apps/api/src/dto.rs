mod common;
mod ledger;

pub use common::{
    HealthDependencyStatus, HealthResponse, PageQuery, TenantQuery, TransactionFilterQuery,
};
pub use ledger::{
    AuditLogEntryResponse, CardResponse, CardStatusResponse, MachineResponse, PunchRequest,
    PunchResponse, RechargeRequest, RechargeResponse, RefundRequest, RefundResponse,
    RegisterCardRequest, TransactionResponse,
};
