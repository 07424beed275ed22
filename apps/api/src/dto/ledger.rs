use arcade_ledger_application::{
    CardStatusView, PunchReceipt, RechargeReceipt, RefundReceipt, RegisterCardInput,
};
use arcade_ledger_domain::{AuditLogEntry, Card, Machine, TransactionRecord};
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

fn timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Machine terminal request to charge one play.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/punch-request.ts"
)]
pub struct PunchRequest {
    pub card_id: String,
    pub machine_id: String,
}

/// Committed play.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/punch-response.ts"
)]
pub struct PunchResponse {
    pub transaction_id: String,
    pub card_id: String,
    pub machine_id: String,
    pub machine_name: String,
    #[ts(type = "string")]
    pub remaining_balance: Decimal,
}

impl From<PunchReceipt> for PunchResponse {
    fn from(value: PunchReceipt) -> Self {
        Self {
            transaction_id: value.transaction_id.to_string(),
            card_id: value.card_id.to_string(),
            machine_id: value.machine_id.to_string(),
            machine_name: value.machine_name,
            remaining_balance: value.remaining_balance.amount(),
        }
    }
}

/// Kiosk balance lookup.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/card-status-response.ts"
)]
pub struct CardStatusResponse {
    pub card_id: String,
    pub owner_name: String,
    #[ts(type = "string")]
    pub balance: Decimal,
    pub status: String,
}

impl From<CardStatusView> for CardStatusResponse {
    fn from(value: CardStatusView) -> Self {
        Self {
            card_id: value.card_id.to_string(),
            owner_name: value.owner_name,
            balance: value.balance.amount(),
            status: value.status.as_str().to_owned(),
        }
    }
}

/// Incoming payload for card registration.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/register-card-request.ts"
)]
pub struct RegisterCardRequest {
    pub card_id: String,
    pub owner_name: String,
    pub contact: Option<String>,
}

impl From<RegisterCardRequest> for RegisterCardInput {
    fn from(value: RegisterCardRequest) -> Self {
        Self {
            card_id: value.card_id,
            owner_name: value.owner_name,
            contact: value.contact,
        }
    }
}

/// Incoming payload for a recharge.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/recharge-request.ts"
)]
pub struct RechargeRequest {
    pub card_id: String,
    #[ts(type = "string")]
    pub amount: Decimal,
}

/// Committed recharge.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/recharge-response.ts"
)]
pub struct RechargeResponse {
    pub transaction_id: String,
    pub card_id: String,
    #[ts(type = "string")]
    pub new_balance: Decimal,
}

impl From<RechargeReceipt> for RechargeResponse {
    fn from(value: RechargeReceipt) -> Self {
        Self {
            transaction_id: value.transaction_id.to_string(),
            card_id: value.card_id.to_string(),
            new_balance: value.new_balance.amount(),
        }
    }
}

/// Incoming payload for a refund.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/refund-request.ts"
)]
pub struct RefundRequest {
    pub card_id: String,
    pub reason: Option<String>,
}

/// Committed refund.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/refund-response.ts"
)]
pub struct RefundResponse {
    pub transaction_id: String,
    pub card_id: String,
    #[ts(type = "string")]
    pub refunded_amount: Decimal,
    #[ts(type = "string")]
    pub new_balance: Decimal,
}

impl From<RefundReceipt> for RefundResponse {
    fn from(value: RefundReceipt) -> Self {
        Self {
            transaction_id: value.transaction_id.to_string(),
            card_id: value.card_id.to_string(),
            refunded_amount: value.refunded_amount.amount(),
            new_balance: value.new_balance.amount(),
        }
    }
}

/// API representation of a card.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/card-response.ts"
)]
pub struct CardResponse {
    pub tenant_id: String,
    pub card_id: String,
    pub owner_name: String,
    pub contact: Option<String>,
    #[ts(type = "string")]
    pub balance: Decimal,
    pub status: String,
    pub created_at: String,
}

impl From<Card> for CardResponse {
    fn from(value: Card) -> Self {
        Self {
            tenant_id: value.tenant_id().to_string(),
            card_id: value.card_id().to_string(),
            owner_name: value.owner_name().to_string(),
            contact: value.contact().map(ToOwned::to_owned),
            balance: value.balance().amount(),
            status: value.status().as_str().to_owned(),
            created_at: timestamp(value.created_at()),
        }
    }
}

/// API representation of a machine. The terminal secret is never exposed.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/machine-response.ts"
)]
pub struct MachineResponse {
    pub tenant_id: String,
    pub machine_id: String,
    pub name: String,
    #[ts(type = "string")]
    pub cost_per_play: Decimal,
    pub status: String,
}

impl From<Machine> for MachineResponse {
    fn from(value: Machine) -> Self {
        Self {
            tenant_id: value.tenant_id().to_string(),
            machine_id: value.machine_id().to_string(),
            name: value.name().to_string(),
            cost_per_play: value.cost_per_play().amount(),
            status: value.status().as_str().to_owned(),
        }
    }
}

/// API representation of a journal entry.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/transaction-response.ts"
)]
pub struct TransactionResponse {
    pub transaction_id: String,
    pub tenant_id: String,
    pub card_id: String,
    pub machine_id: Option<String>,
    #[ts(type = "string")]
    pub amount: Decimal,
    pub kind: String,
    pub status: String,
    pub terminal: String,
    #[ts(type = "number")]
    pub card_version: u64,
    pub recorded_at: String,
}

impl From<TransactionRecord> for TransactionResponse {
    fn from(value: TransactionRecord) -> Self {
        Self {
            transaction_id: value.transaction_id().to_string(),
            tenant_id: value.tenant_id().to_string(),
            card_id: value.card_id().to_string(),
            machine_id: value.machine_id().map(ToString::to_string),
            amount: value.amount().amount(),
            kind: value.kind().as_str().to_owned(),
            status: value.status().as_str().to_owned(),
            terminal: value.terminal().to_owned(),
            card_version: value.card_version(),
            recorded_at: timestamp(value.recorded_at()),
        }
    }
}

/// API representation of an audit log entry.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/audit-log-entry-response.ts"
)]
pub struct AuditLogEntryResponse {
    pub entry_id: String,
    pub tenant_id: String,
    pub entry_type: String,
    pub message: String,
    pub source: String,
    pub created_at: String,
}

impl From<AuditLogEntry> for AuditLogEntryResponse {
    fn from(value: AuditLogEntry) -> Self {
        Self {
            entry_id: value.entry_id.to_string(),
            tenant_id: value.tenant_id.to_string(),
            entry_type: value.entry_type.as_str().to_owned(),
            message: value.message,
            source: value.source,
            created_at: timestamp(value.created_at),
        }
    }
}
