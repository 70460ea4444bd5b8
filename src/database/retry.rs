use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::DatabaseConfig;
use crate::database::error::StoreError;

/// Bounded linear backoff for idempotent storage calls
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self {
            max_retries: config.retry_attempts,
            backoff: config.retry_backoff(),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Duration::from_millis(50),
        }
    }
}

/// Re-runs `op` while it fails with a transient error. Only for operations
/// that are safe to repeat (reads, upserts).
pub async fn retry_idempotent<T, F, Fut>(policy: RetryPolicy, operation: &'static str, mut op: F) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(operation, attempt, "Storage operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if e.is_transient() && attempt < policy.max_retries => {
                attempt += 1;
                let backoff = policy.backoff * attempt;
                warn!(operation, attempt, backoff_ms = backoff.as_millis() as u64, error = %e, "Retrying storage operation");
                tokio::time::sleep(backoff).await;
            }
            Err(e) => return Err(e),
        }
    }
}
