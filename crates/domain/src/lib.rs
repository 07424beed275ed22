//! Ledger domain entities and invariants.

#![forbid(unsafe_code)]

mod audit;
mod balance;
mod card;
mod machine;
mod money;
mod transaction;

pub use audit::{AuditLogEntry, AuditLogType};
pub use balance::{AppliedBalanceChange, BalanceChange};
pub use card::{CARD_ID_MAX_LENGTH, CARD_ID_MIN_LENGTH, Card, CardId, CardStatus};
pub use machine::{Machine, MachineId, MachineStatus};
pub use money::{Money, PositiveAmount};
pub use transaction::{
    TransactionId, TransactionKind, TransactionRecord, TransactionRecordInput, TransactionStatus,
};
