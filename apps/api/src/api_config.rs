use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use arcade_ledger_application::LedgerEngineConfig;
use arcade_ledger_core::AppError;
use tracing_subscriber::EnvFilter;

/// Persistence backend selected with `LEDGER_STORE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" | "in-memory" => Ok(Self::Memory),
            other => Err(AppError::Validation(format!(
                "LEDGER_STORE must be either 'postgres' or 'memory', got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub frontend_url: Option<String>,
    pub api_host: String,
    pub api_port: u16,
    pub engine: LedgerEngineConfig,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let first_argument = env::args().nth(1);
        Self::from_lookup(first_argument.as_deref(), |name| env::var(name).ok())
    }

    fn from_lookup(
        first_argument: Option<&str>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AppError> {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let migrate_only = first_argument == Some("migrate");
        let store_backend = non_empty("LEDGER_STORE")
            .map(|value| value.parse::<StoreBackend>())
            .transpose()?
            .unwrap_or(StoreBackend::Postgres);

        let database_url = non_empty("DATABASE_URL");
        if database_url.is_none() && (store_backend == StoreBackend::Postgres || migrate_only) {
            return Err(AppError::Validation(
                "DATABASE_URL is required for the postgres store".to_owned(),
            ));
        }

        let api_host = non_empty("API_HOST").unwrap_or_else(|| "127.0.0.1".to_owned());
        let api_port = non_empty("API_PORT")
            .map(|value| parse_number::<u16>("API_PORT", &value))
            .transpose()?
            .unwrap_or(3001);

        let defaults = LedgerEngineConfig::default();
        let engine = LedgerEngineConfig {
            max_conflict_retries: non_empty("LEDGER_MAX_CONFLICT_RETRIES")
                .map(|value| parse_number("LEDGER_MAX_CONFLICT_RETRIES", &value))
                .transpose()?
                .unwrap_or(defaults.max_conflict_retries),
            journal_append_attempts: non_empty("LEDGER_JOURNAL_APPEND_ATTEMPTS")
                .map(|value| parse_number::<u32>("LEDGER_JOURNAL_APPEND_ATTEMPTS", &value))
                .transpose()?
                .map(|attempts| attempts.max(1))
                .unwrap_or(defaults.journal_append_attempts),
            journal_retry_backoff: non_empty("LEDGER_JOURNAL_RETRY_BACKOFF_MS")
                .map(|value| parse_number("LEDGER_JOURNAL_RETRY_BACKOFF_MS", &value))
                .transpose()?
                .map(Duration::from_millis)
                .unwrap_or(defaults.journal_retry_backoff),
            audit_rejected_punches: non_empty("LEDGER_AUDIT_REJECTED_PUNCHES")
                .map(|value| parse_flag("LEDGER_AUDIT_REJECTED_PUNCHES", &value))
                .transpose()?
                .unwrap_or(defaults.audit_rejected_punches),
        };

        Ok(Self {
            migrate_only,
            store_backend,
            database_url,
            frontend_url: non_empty("FRONTEND_URL"),
            api_host,
            api_port,
            engine,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn parse_number<T>(name: &str, value: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|error| AppError::Validation(format!("invalid {name} '{value}': {error}")))
}

fn parse_flag(name: &str, value: &str) -> Result<bool, AppError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(AppError::Validation(format!(
            "{name} must be a boolean, got '{value}'"
        ))),
    }
}
