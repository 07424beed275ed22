use arcade_ledger_core::AppError;

const UNIQUE_VIOLATION: &str = "23505";

/// Maps a sqlx failure, separating retryable connectivity errors from defects.
pub(crate) fn map_database_error(error: sqlx::Error, context: &str) -> AppError {
    match &error {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            AppError::Unavailable(format!("{context}: {error}"))
        }
        _ => AppError::Internal(format!("{context}: {error}")),
    }
}

/// Returns true for primary key or unique constraint violations.
pub(crate) fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(
        error,
        sqlx::Error::Database(database_error)
            if database_error.code().as_deref() == Some(UNIQUE_VIOLATION)
    )
}
