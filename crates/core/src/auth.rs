use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{AppError, AppResult, TenantId};

/// Role carried by the caller credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallerRole {
    /// Platform administrator; not bound to a single arcade.
    Admin,
    /// Arcade manager bound to one arcade.
    Manager,
    /// Machine terminal bound to one arcade.
    Machine,
}

impl CallerRole {
    /// Returns a stable transport value for this role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Machine => "machine",
        }
    }
}

impl Display for CallerRole {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for CallerRole {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" | "administrator" => Ok(Self::Admin),
            "manager" => Ok(Self::Manager),
            "machine" => Ok(Self::Machine),
            _ => Err(AppError::Unauthorized(format!(
                "unknown caller role '{value}'"
            ))),
        }
    }
}

/// Trusted caller credential resolved by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    subject: String,
    role: CallerRole,
    tenant_id: Option<TenantId>,
}

impl CallerIdentity {
    /// Creates a caller identity.
    ///
    /// Managers and machine terminals must carry an arcade; admins may omit it.
    pub fn new(
        subject: impl Into<String>,
        role: CallerRole,
        tenant_id: Option<TenantId>,
    ) -> AppResult<Self> {
        let subject = subject.into();
        if subject.trim().is_empty() {
            return Err(AppError::Unauthorized(
                "caller subject must not be empty".to_owned(),
            ));
        }

        if role != CallerRole::Admin && tenant_id.is_none() {
            return Err(AppError::Unauthorized(format!(
                "{role} caller '{subject}' is not bound to an arcade"
            )));
        }

        Ok(Self {
            subject,
            role,
            tenant_id,
        })
    }

    /// Convenience constructor for an arcade manager.
    #[must_use]
    pub fn manager(subject: impl Into<String>, tenant_id: TenantId) -> Self {
        Self {
            subject: subject.into(),
            role: CallerRole::Manager,
            tenant_id: Some(tenant_id),
        }
    }

    /// Convenience constructor for a machine terminal.
    #[must_use]
    pub fn machine(subject: impl Into<String>, tenant_id: TenantId) -> Self {
        Self {
            subject: subject.into(),
            role: CallerRole::Machine,
            tenant_id: Some(tenant_id),
        }
    }

    /// Convenience constructor for an unbound administrator.
    #[must_use]
    pub fn admin(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            role: CallerRole::Admin,
            tenant_id: None,
        }
    }

    /// Returns the stable subject claim.
    #[must_use]
    pub fn subject(&self) -> &str {
        self.subject.as_str()
    }

    /// Returns the caller role.
    #[must_use]
    pub fn role(&self) -> CallerRole {
        self.role
    }

    /// Returns the arcade the caller is bound to, if any.
    #[must_use]
    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    /// Returns true for administrators.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == CallerRole::Admin
    }
}
