use std::fmt::{Display, Formatter};
use std::str::FromStr;

use arcade_ledger_core::{AppError, AppResult, TenantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CardId, MachineId, Money};

/// Time-ordered journal entry identifier.
///
/// Generated once per operation before the balance commit, so it doubles as the
/// replay key for journal append retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransactionId(Uuid);

impl TransactionId {
    /// Creates a new time-ordered identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates an identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for TransactionId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Kind of balance movement recorded in the journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    /// Operator recharge.
    Credit,
    /// Operator refund (balance reset).
    Debit,
    /// Machine play.
    Punch,
}

impl TransactionKind {
    /// Returns a stable storage value for this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Credit => "CREDIT",
            Self::Debit => "DEBIT",
            Self::Punch => "PUNCH",
        }
    }
}

impl FromStr for TransactionKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "CREDIT" => Ok(Self::Credit),
            "DEBIT" => Ok(Self::Debit),
            "PUNCH" => Ok(Self::Punch),
            _ => Err(AppError::Validation(format!(
                "unknown transaction kind '{value}'"
            ))),
        }
    }
}

/// Outcome recorded for a journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    /// Balance change committed.
    Success,
    /// Attempt rejected.
    Failed,
}

impl TransactionStatus {
    /// Returns a stable storage value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "SUCCESS" => Ok(Self::Success),
            "FAILED" => Ok(Self::Failed),
            _ => Err(AppError::Validation(format!(
                "unknown transaction status '{value}'"
            ))),
        }
    }
}

/// Input payload for building a journal entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecordInput {
    /// Replay-stable identifier.
    pub transaction_id: TransactionId,
    /// Owning arcade.
    pub tenant_id: TenantId,
    /// Card whose balance moved.
    pub card_id: CardId,
    /// Machine charged, present only for punches.
    pub machine_id: Option<MachineId>,
    /// Moved amount.
    pub amount: Money,
    /// Movement kind.
    pub kind: TransactionKind,
    /// Outcome.
    pub status: TransactionStatus,
    /// Source label (machine name or operator panel).
    pub terminal: String,
    /// Card version produced by this change; orders entries per card.
    pub card_version: u64,
    /// Commit timestamp.
    pub recorded_at: DateTime<Utc>,
}

/// Immutable journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    transaction_id: TransactionId,
    tenant_id: TenantId,
    card_id: CardId,
    machine_id: Option<MachineId>,
    amount: Money,
    kind: TransactionKind,
    status: TransactionStatus,
    terminal: String,
    card_version: u64,
    recorded_at: DateTime<Utc>,
}

impl TransactionRecord {
    /// Creates a validated journal entry.
    pub fn new(input: TransactionRecordInput) -> AppResult<Self> {
        match (input.kind, input.machine_id.is_some()) {
            (TransactionKind::Punch, false) => {
                return Err(AppError::Validation(
                    "punch transactions must reference a machine".to_owned(),
                ));
            }
            (TransactionKind::Credit | TransactionKind::Debit, true) => {
                return Err(AppError::Validation(format!(
                    "{} transactions must not reference a machine",
                    input.kind.as_str()
                )));
            }
            _ => {}
        }

        let terminal = input.terminal.trim().to_owned();
        if terminal.is_empty() {
            return Err(AppError::Validation(
                "transaction terminal label must not be empty".to_owned(),
            ));
        }

        if input.card_version == 0 {
            return Err(AppError::Validation(
                "transaction card version must be positive".to_owned(),
            ));
        }

        Ok(Self {
            transaction_id: input.transaction_id,
            tenant_id: input.tenant_id,
            card_id: input.card_id,
            machine_id: input.machine_id,
            amount: input.amount,
            kind: input.kind,
            status: input.status,
            terminal,
            card_version: input.card_version,
            recorded_at: input.recorded_at,
        })
    }

    /// Places the entry at the position the store assigned to its balance change.
    #[must_use]
    pub fn at_commit(self, card_version: u64, recorded_at: DateTime<Utc>) -> Self {
        Self {
            card_version: card_version.max(1),
            recorded_at,
            ..self
        }
    }

    /// Returns the replay-stable identifier.
    #[must_use]
    pub fn transaction_id(&self) -> TransactionId {
        self.transaction_id
    }

    /// Returns the owning arcade.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Returns the card identifier.
    #[must_use]
    pub fn card_id(&self) -> &CardId {
        &self.card_id
    }

    /// Returns the machine identifier for punches.
    #[must_use]
    pub fn machine_id(&self) -> Option<&MachineId> {
        self.machine_id.as_ref()
    }

    /// Returns the moved amount.
    #[must_use]
    pub fn amount(&self) -> Money {
        self.amount
    }

    /// Returns the movement kind.
    #[must_use]
    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    /// Returns the outcome.
    #[must_use]
    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    /// Returns the source label.
    #[must_use]
    pub fn terminal(&self) -> &str {
        self.terminal.as_str()
    }

    /// Returns the card version this change committed.
    #[must_use]
    pub fn card_version(&self) -> u64 {
        self.card_version
    }

    /// Returns the commit timestamp.
    #[must_use]
    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }
}
