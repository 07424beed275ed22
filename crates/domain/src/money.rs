use std::fmt::{Display, Formatter};

use arcade_ledger_core::{AppError, AppResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Non-negative monetary value held on a card or moved by a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// Zero balance.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Creates a validated non-negative amount.
    pub fn new(value: Decimal) -> AppResult<Self> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(AppError::Validation(format!(
                "amount must not be negative, got {value}"
            )));
        }

        Ok(Self(value.normalize()))
    }

    /// Returns the underlying decimal value.
    #[must_use]
    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns true when the value is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Subtracts `other`, returning `None` when the result would be negative.
    #[must_use]
    pub fn checked_sub(self, other: Money) -> Option<Money> {
        if other.0 > self.0 {
            return None;
        }

        self.0.checked_sub(other.0).map(|value| Self(value.normalize()))
    }

    /// Adds `other`, failing on decimal overflow.
    pub fn checked_add(self, other: Money) -> AppResult<Money> {
        self.0
            .checked_add(other.0)
            .map(|value| Self(value.normalize()))
            .ok_or_else(|| AppError::Validation("amount overflows the ledger range".to_owned()))
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::ZERO
    }
}

impl TryFrom<Decimal> for Money {
    type Error = AppError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl Display for Money {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Strictly positive amount, used for recharges and per-play costs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct PositiveAmount(Decimal);

impl PositiveAmount {
    /// Creates a validated amount greater than zero.
    pub fn new(value: Decimal) -> AppResult<Self> {
        if value <= Decimal::ZERO {
            return Err(AppError::Validation(format!(
                "amount must be greater than zero, got {value}"
            )));
        }

        Ok(Self(value.normalize()))
    }

    /// Returns the underlying decimal value.
    #[must_use]
    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Widens the amount into a ledger value.
    #[must_use]
    pub fn as_money(&self) -> Money {
        Money(self.0)
    }
}

impl TryFrom<Decimal> for PositiveAmount {
    type Error = AppError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PositiveAmount> for Decimal {
    fn from(value: PositiveAmount) -> Self {
        value.0
    }
}

impl Display for PositiveAmount {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}
