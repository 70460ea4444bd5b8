use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use std::future::Future;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::config::DatabaseConfig;
use crate::database::error::StoreError;

/// Builds and maintains the PostgreSQL pool
pub struct DatabaseManager;

impl DatabaseManager {
    /// Connect with the configured pool size, acquire timeout and a
    /// server-side `statement_timeout` on every connection.
    pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, StoreError> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| StoreError::Unavailable("DATABASE_URL is not configured".to_string()))?;

        let options = PgConnectOptions::from_str(url)?
            .options([("statement_timeout", config.statement_timeout_ms.to_string())]);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect_with(options)
            .await?;

        info!(database = %Self::redact_url(url), "Connected to database");
        Ok(pool)
    }

    pub async fn migrate(pool: &PgPool) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(pool: &PgPool) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }

    /// Connection string with the password masked, for logs.
    pub fn redact_url(raw: &str) -> String {
        match url::Url::parse(raw) {
            Ok(mut url) => {
                if url.password().is_some() {
                    let _ = url.set_password(Some("****"));
                }
                url.to_string()
            }
            Err(_) => "<invalid database url>".to_string(),
        }
    }
}

/// Upper bound applied to every store call, independent of the backend.
#[derive(Debug, Clone, Copy)]
pub struct QueryBudget {
    pub timeout: Duration,
    pub slow_threshold: Duration,
}

impl QueryBudget {
    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self {
            timeout: config.statement_timeout(),
            slow_threshold: config.slow_query_threshold(),
        }
    }

    pub async fn run<T, F>(self, operation: &'static str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        let started = Instant::now();
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => {
                let elapsed = started.elapsed();
                if elapsed > self.slow_threshold {
                    warn!(operation, elapsed_ms = elapsed.as_millis() as u64, "Slow storage operation");
                }
                result
            }
            Err(_) => {
                warn!(operation, timeout_ms = self.timeout.as_millis() as u64, "Storage operation timed out");
                Err(StoreError::Timeout { operation })
            }
        }
    }
}

impl Default for QueryBudget {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            slow_threshold: Duration::from_millis(500),
        }
    }
}
