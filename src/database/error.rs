use thiserror::Error;

/// Errors raised by the persistence layer
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{operation} exceeded its statement timeout")]
    Timeout { operation: &'static str },

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    #[error("Invalid stored value: {0}")]
    Decode(String),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

/// Postgres SQLSTATE for a statement cancelled by `statement_timeout`
const QUERY_CANCELED: &str = "57014";

impl StoreError {
    /// Whether retrying the same idempotent call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Timeout { .. } | StoreError::Unavailable(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.is_unique_violation() {
                return StoreError::UniqueViolation {
                    constraint: db_err.constraint().unwrap_or_default().to_string(),
                };
            }
            if db_err.code().as_deref() == Some(QUERY_CANCELED) {
                return StoreError::Timeout { operation: "statement" };
            }
        }

        match err {
            sqlx::Error::PoolTimedOut => StoreError::Unavailable("connection pool timed out".to_string()),
            sqlx::Error::PoolClosed => StoreError::Unavailable("connection pool closed".to_string()),
            sqlx::Error::Io(e) => StoreError::Unavailable(e.to_string()),
            other => StoreError::Sqlx(other),
        }
    }
}
