use arcade_ledger_domain::{CardId, TransactionKind};

const MAX_PAGE_SIZE: usize = 200;
const MAX_OFFSET: usize = 5_000;

/// Offset pagination for dashboard listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerListQuery {
    /// Maximum rows returned.
    pub limit: usize,
    /// Number of rows skipped.
    pub offset: usize,
}

impl LedgerListQuery {
    /// Returns the limit clamped to the supported page size.
    #[must_use]
    pub fn capped_limit(&self) -> usize {
        self.limit.clamp(1, MAX_PAGE_SIZE)
    }

    /// Returns the offset clamped to the supported window.
    #[must_use]
    pub fn capped_offset(&self) -> usize {
        self.offset.min(MAX_OFFSET)
    }
}

impl Default for LedgerListQuery {
    fn default() -> Self {
        Self {
            limit: 100,
            offset: 0,
        }
    }
}

/// Journal listing filters. Results are newest first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransactionListQuery {
    /// Pagination window.
    pub page: LedgerListQuery,
    /// Restricts entries to one card.
    pub card_id: Option<CardId>,
    /// Restricts entries to one movement kind.
    pub kind: Option<TransactionKind>,
}
