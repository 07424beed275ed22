//! Pure balance transition rules applied by the mutation engine.
//!
//! Every rule is evaluated against the balance that was just fetched; the
//! resulting [`AppliedBalanceChange`] carries the expected prior value used for
//! the conditional store update.

use arcade_ledger_core::{AppError, AppResult};

use crate::{CardId, Money, PositiveAmount, TransactionKind};

/// Requested balance transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceChange {
    /// Debit one play at the machine's fixed cost.
    Punch {
        /// Cost per play.
        cost: PositiveAmount,
    },
    /// Credit a positive amount.
    Recharge {
        /// Credited amount.
        amount: PositiveAmount,
    },
    /// Reset the balance to zero, paying out the remainder.
    Refund,
}

/// Outcome of applying a [`BalanceChange`] to a fetched balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedBalanceChange {
    /// Balance observed before the change; the compare-and-swap expectation.
    pub previous: Money,
    /// Balance after the change.
    pub next: Money,
    /// Amount recorded in the journal.
    pub journal_amount: Money,
    /// Journal entry kind.
    pub kind: TransactionKind,
}

impl BalanceChange {
    /// Returns true when a blocked card must reject the change.
    ///
    /// Refunds stay available so a withdrawn card can still be paid out.
    #[must_use]
    pub fn requires_active_card(self) -> bool {
        !matches!(self, Self::Refund)
    }

    /// Applies the change to `current`, enforcing the non-negative invariant.
    pub fn apply(self, card_id: &CardId, current: Money) -> AppResult<AppliedBalanceChange> {
        match self {
            Self::Punch { cost } => {
                let next = current.checked_sub(cost.as_money()).ok_or_else(|| {
                    AppError::InsufficientBalance(format!(
                        "card '{card_id}' has balance {current}, play costs {cost}"
                    ))
                })?;

                Ok(AppliedBalanceChange {
                    previous: current,
                    next,
                    journal_amount: cost.as_money(),
                    kind: TransactionKind::Punch,
                })
            }
            Self::Recharge { amount } => Ok(AppliedBalanceChange {
                previous: current,
                next: current.checked_add(amount.as_money())?,
                journal_amount: amount.as_money(),
                kind: TransactionKind::Credit,
            }),
            Self::Refund => Ok(AppliedBalanceChange {
                previous: current,
                next: Money::ZERO,
                journal_amount: current,
                kind: TransactionKind::Debit,
            }),
        }
    }
}
