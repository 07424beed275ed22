//! Infrastructure adapters for ledger ports.

#![forbid(unsafe_code)]

mod in_memory_audit_log_repository;
mod in_memory_ledger_store;
mod in_memory_transaction_journal;
mod postgres_audit_log_repository;
mod postgres_errors;
mod postgres_ledger_store;
mod postgres_transaction_journal;

pub use in_memory_audit_log_repository::InMemoryAuditLogRepository;
pub use in_memory_ledger_store::InMemoryLedgerStore;
pub use in_memory_transaction_journal::InMemoryTransactionJournal;
pub use postgres_audit_log_repository::PostgresAuditLogRepository;
pub use postgres_ledger_store::PostgresLedgerStore;
pub use postgres_transaction_journal::PostgresTransactionJournal;
