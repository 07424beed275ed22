mod audit_log;
mod journal;
mod queries;
mod store;

pub use audit_log::AuditLogRepository;
pub use journal::TransactionJournal;
pub use queries::{LedgerListQuery, TransactionListQuery};
pub use store::{BalanceCommit, BalanceSwap, LedgerStore};
