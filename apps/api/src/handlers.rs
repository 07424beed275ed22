use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;

use arcade_ledger_core::CallerIdentity;

use crate::dto::{
    AuditLogEntryResponse, CardResponse, CardStatusResponse, HealthDependencyStatus,
    HealthResponse, MachineResponse, PageQuery, PunchRequest, PunchResponse, RechargeRequest,
    RechargeResponse, RefundRequest, RefundResponse, RegisterCardRequest, TenantQuery,
    TransactionFilterQuery, TransactionResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

mod health;
mod manager;
mod operations;


pub use health::health_handler;
pub use manager::{
    card_history_handler, list_audit_log_handler, list_cards_handler, list_machines_handler,
    list_transactions_handler, recharge_handler, refund_handler, register_card_handler,
};
pub use operations::{card_status_handler, punch_handler};
