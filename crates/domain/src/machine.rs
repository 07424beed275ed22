use std::fmt::{Display, Formatter};
use std::str::FromStr;

use arcade_ledger_core::{AppError, AppResult, NonEmptyString, TenantId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::PositiveAmount;

/// Machine identifier, unique within one arcade.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MachineId(String);

impl MachineId {
    /// Creates a validated machine identifier.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into().trim().to_owned();
        if value.is_empty() {
            return Err(AppError::Validation(
                "machine id must not be empty".to_owned(),
            ));
        }

        if value.chars().count() > 64 {
            return Err(AppError::Validation(
                "machine id must not exceed 64 characters".to_owned(),
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

impl TryFrom<String> for MachineId {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MachineId> for String {
    fn from(value: MachineId) -> Self {
        value.0
    }
}

impl Display for MachineId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Operational status reported for a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MachineStatus {
    /// Idle and ready for play.
    Online,
    /// In a game session.
    Busy,
    /// Powered off or disconnected.
    Offline,
    /// Taken out of service.
    Maintenance,
}

impl MachineStatus {
    /// Returns a stable storage value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "ONLINE",
            Self::Busy => "BUSY",
            Self::Offline => "OFFLINE",
            Self::Maintenance => "MAINTENANCE",
        }
    }

    /// Returns true when plays may be charged on the machine.
    #[must_use]
    pub fn accepts_plays(&self) -> bool {
        matches!(self, Self::Online | Self::Busy)
    }
}

impl FromStr for MachineStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ONLINE" | "ACTIVE" => Ok(Self::Online),
            "BUSY" => Ok(Self::Busy),
            "OFFLINE" => Ok(Self::Offline),
            "MAINTENANCE" => Ok(Self::Maintenance),
            _ => Err(AppError::Validation(format!(
                "unknown machine status '{value}'"
            ))),
        }
    }
}

/// Play machine with a fixed cost per play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    tenant_id: TenantId,
    machine_id: MachineId,
    name: NonEmptyString,
    cost_per_play: PositiveAmount,
    status: MachineStatus,
    secret_key: String,
}

impl Machine {
    /// Creates a machine record with validated fields.
    pub fn new(
        tenant_id: TenantId,
        machine_id: MachineId,
        name: impl Into<String>,
        cost_per_play: PositiveAmount,
        status: MachineStatus,
        secret_key: impl Into<String>,
    ) -> AppResult<Self> {
        let secret_key = secret_key.into();
        if secret_key.trim().is_empty() {
            return Err(AppError::Validation(
                "machine secret key must not be empty".to_owned(),
            ));
        }

        Ok(Self {
            tenant_id,
            machine_id,
            name: NonEmptyString::new(name)?,
            cost_per_play,
            status,
            secret_key,
        })
    }

    /// Issues a fresh opaque credential for a machine terminal.
    #[must_use]
    pub fn issue_secret_key() -> String {
        Uuid::new_v4().simple().to_string()
    }

    /// Returns the owning arcade.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Returns the machine identifier.
    #[must_use]
    pub fn machine_id(&self) -> &MachineId {
        &self.machine_id
    }

    /// Returns the display name, also used as the punch terminal label.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }

    /// Returns the fixed cost charged per play.
    #[must_use]
    pub fn cost_per_play(&self) -> PositiveAmount {
        self.cost_per_play
    }

    /// Returns the operational status.
    #[must_use]
    pub fn status(&self) -> MachineStatus {
        self.status
    }

    /// Returns the opaque terminal credential.
    #[must_use]
    pub fn secret_key(&self) -> &str {
        self.secret_key.as_str()
    }

    /// Fails when the machine is not accepting plays.
    pub fn ensure_accepts_plays(&self) -> AppResult<()> {
        if !self.status.accepts_plays() {
            return Err(AppError::Validation(format!(
                "machine '{}' is {} and not accepting plays",
                self.machine_id,
                self.status.as_str()
            )));
        }

        Ok(())
    }
}
