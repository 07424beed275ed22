use std::fmt::{Display, Formatter};
use std::str::FromStr;

use arcade_ledger_core::{AppError, AppResult, NonEmptyString, TenantId};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::Money;

/// Minimum accepted card identifier length.
pub const CARD_ID_MIN_LENGTH: usize = 4;

/// Maximum accepted card identifier length.
pub const CARD_ID_MAX_LENGTH: usize = 16;

/// Card identifier, unique within one arcade.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CardId(String);

impl CardId {
    /// Creates a validated card identifier.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into().trim().to_owned();
        let length = value.chars().count();

        if !(CARD_ID_MIN_LENGTH..=CARD_ID_MAX_LENGTH).contains(&length) {
            return Err(AppError::Validation(format!(
                "card id must be between {CARD_ID_MIN_LENGTH} and {CARD_ID_MAX_LENGTH} characters"
            )));
        }

        if value.chars().any(char::is_whitespace) {
            return Err(AppError::Validation(
                "card id must not contain whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for CardId {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CardId> for String {
    fn from(value: CardId) -> Self {
        value.0
    }
}

impl Display for CardId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Card lifecycle status. Blocking a card models its removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardStatus {
    /// Card can be punched and recharged.
    Active,
    /// Card is withdrawn from circulation.
    Blocked,
}

impl CardStatus {
    /// Returns a stable storage value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Blocked => "BLOCKED",
        }
    }
}

impl FromStr for CardStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(Self::Active),
            "BLOCKED" => Ok(Self::Blocked),
            _ => Err(AppError::Validation(format!(
                "unknown card status '{value}'"
            ))),
        }
    }
}

/// Stored-value card owned by one arcade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    tenant_id: TenantId,
    card_id: CardId,
    owner_name: NonEmptyString,
    contact: Option<String>,
    balance: Money,
    status: CardStatus,
    created_at: DateTime<Utc>,
    version: u64,
    updated_at: DateTime<Utc>,
}

impl Card {
    /// Registers a new card with a zero balance.
    pub fn register(
        tenant_id: TenantId,
        card_id: CardId,
        owner_name: impl Into<String>,
        contact: Option<String>,
    ) -> AppResult<Self> {
        Self::from_parts(
            tenant_id,
            card_id,
            owner_name,
            contact,
            Money::ZERO,
            CardStatus::Active,
            Utc::now(),
        )
    }

    /// Rehydrates a card from persisted state.
    pub fn from_parts(
        tenant_id: TenantId,
        card_id: CardId,
        owner_name: impl Into<String>,
        contact: Option<String>,
        balance: Money,
        status: CardStatus,
        created_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        Ok(Self {
            tenant_id,
            card_id,
            owner_name: NonEmptyString::new(owner_name)?,
            contact: contact
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty()),
            balance,
            status,
            created_at,
            version: 0,
            updated_at: created_at,
        })
    }

    /// Restores the commit counter and last commit time of a persisted card.
    #[must_use]
    pub fn with_revision(self, version: u64, updated_at: DateTime<Utc>) -> Self {
        Self {
            version,
            updated_at,
            ..self
        }
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

    /// Returns the card holder name.
    #[must_use]
    pub fn owner_name(&self) -> &NonEmptyString {
        &self.owner_name
    }

    /// Returns the optional contact detail.
    #[must_use]
    pub fn contact(&self) -> Option<&str> {
        self.contact.as_deref()
    }

    /// Returns the current balance.
    #[must_use]
    pub fn balance(&self) -> Money {
        self.balance
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub fn status(&self) -> CardStatus {
        self.status
    }

    /// Returns the registration timestamp.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the number of balance changes committed to this card.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Returns the time of the last committed balance change, or registration.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns a copy carrying a balance the store commits at `now`.
    ///
    /// The version moves forward by one and the commit time is strictly later
    /// than the previous one, even when the wall clock stalls or steps back.
    #[must_use]
    pub fn with_committed_balance(&self, balance: Money, now: DateTime<Utc>) -> Self {
        Self {
            balance,
            version: self.version.saturating_add(1),
            updated_at: now.max(self.updated_at + TimeDelta::microseconds(1)),
            ..self.clone()
        }
    }

    /// Fails when the card may not be debited or credited.
    pub fn ensure_active(&self) -> AppResult<()> {
        if self.status == CardStatus::Blocked {
            return Err(AppError::Validation(format!(
                "card '{}' is blocked",
                self.card_id
            )));
        }

        Ok(())
    }
}
