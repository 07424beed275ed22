use std::str::FromStr;

use arcade_ledger_core::{AppError, TenantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Severity label of an operational log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditLogType {
    /// Routine operation.
    Info,
    /// Rejected or unusual operation.
    Warning,
    /// Failure requiring operator attention.
    Error,
}

impl AuditLogType {
    /// Returns a stable storage value for this type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

impl FromStr for AuditLogType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "INFO" => Ok(Self::Info),
            "WARNING" | "WARN" => Ok(Self::Warning),
            "ERROR" => Ok(Self::Error),
            _ => Err(AppError::Validation(format!(
                "unknown audit log type '{value}'"
            ))),
        }
    }
}

/// Free-text operational note. Not part of the balance invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    /// Entry identifier.
    pub entry_id: Uuid,
    /// Owning arcade.
    pub tenant_id: TenantId,
    /// Severity label.
    pub entry_type: AuditLogType,
    /// Human-readable message.
    pub message: String,
    /// Component that emitted the entry.
    pub source: String,
    /// Emission timestamp.
    pub created_at: DateTime<Utc>,
}

impl AuditLogEntry {
    /// Creates an entry stamped with the current time.
    #[must_use]
    pub fn now(
        tenant_id: TenantId,
        entry_type: AuditLogType,
        source: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            entry_id: Uuid::now_v7(),
            tenant_id,
            entry_type,
            message: message.into(),
            source: source.into(),
            created_at: Utc::now(),
        }
    }
}
