//! Application services and ports for the arcade ledger.

#![forbid(unsafe_code)]

mod ledger_ports;
mod ledger_service;
mod tenant_scope;

pub use ledger_ports::{
    AuditLogRepository, BalanceCommit, BalanceSwap, LedgerListQuery, LedgerStore,
    TransactionJournal, TransactionListQuery,
};
pub use ledger_service::{
    CardStatusView, LedgerEngineConfig, LedgerService, PunchReceipt, RechargeReceipt,
    RefundReceipt, RegisterCardInput,
};
pub use tenant_scope::{TenantScope, TenantScopePolicy};
