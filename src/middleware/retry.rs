//! Retry middleware
//!
//! Re-runs the remainder of the chain on transient failures (connection
//! errors and timeouts) with exponential backoff, up to a fixed maximum.
//! Non-transient failures propagate immediately; after the last attempt
//! the final failure is surfaced unchanged.

use super::{Middleware, MiddlewareContext, Next, Outcome};
use crate::config::RetryConfig;
use crate::error::ServerError;
use async_trait::async_trait;
use std::time::Duration;

pub struct RetryMiddleware {
    max_retries: u32,
    base_delay: Duration,
}

impl RetryMiddleware {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
        }
    }
}

#[async_trait]
impl Middleware for RetryMiddleware {
    async fn handle(&self, cx: &MiddlewareContext, next: Next<'_>) -> Result<Outcome, ServerError> {
        let mut retries = 0u32;

        loop {
            match next.run(cx).await {
                Ok(outcome) => return Ok(outcome),
                Err(err) if err.is_transient() && retries < self.max_retries => {
                    let delay = self.base_delay * 2u32.pow(retries);
                    retries += 1;
                    tracing::warn!(
                        "Transient failure on {} (retry {}/{} in {:?}): {}",
                        cx.method,
                        retries,
                        self.max_retries,
                        delay,
                        err
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
