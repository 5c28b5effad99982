//! Rate limiting middleware
//!
//! A single token bucket shared by all concurrent requests: sustained rate
//! R tokens/second, burst capacity B, starting full. A request that finds
//! the bucket empty is rejected immediately with a rate-limit error rather
//! than queued, which bounds worst-case latency. Bucket state is mutated
//! under a mutex because interleaved requests cannot update it atomically
//! otherwise.
//!
//! The bucket reads `tokio::time::Instant`, so paused-clock tests can
//! control refill deterministically.

use super::{Middleware, MiddlewareContext, Next, Outcome};
use crate::config::RateLimitConfig;
use crate::error::ServerError;
use async_trait::async_trait;
use std::sync::Mutex;
use tokio::time::Instant;

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

pub struct RateLimitMiddleware {
    capacity: f64,
    refill_per_second: f64,
    bucket: Mutex<Bucket>,
}

impl RateLimitMiddleware {
    pub fn new(config: RateLimitConfig) -> Self {
        let capacity = f64::from(config.burst_capacity);
        Self {
            capacity,
            refill_per_second: config.requests_per_second,
            bucket: Mutex::new(Bucket {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Refill by elapsed time, then try to take one token.
    pub(crate) fn try_acquire(&self) -> bool {
        let mut bucket = self.bucket.lock().unwrap();

        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_second).min(self.capacity);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[async_trait]
impl Middleware for RateLimitMiddleware {
    async fn handle(&self, cx: &MiddlewareContext, next: Next<'_>) -> Result<Outcome, ServerError> {
        if !self.try_acquire() {
            tracing::warn!("Rate limit exceeded for {} from {}", cx.method, cx.source);
            return Err(ServerError::RateLimited);
        }

        next.run(cx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{methods, FnEndpoint, MiddlewareChain};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn limiter(rate: f64, burst: u32) -> RateLimitMiddleware {
        RateLimitMiddleware::new(RateLimitConfig {
            requests_per_second: rate,
            burst_capacity: burst,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_capacity_then_rejection() {
        let limiter = limiter(10.0, 5);

        // With the clock paused no refill happens between calls: exactly
        // B requests succeed and the (B+1)-th is rejected.
        for _ in 0..5 {
            assert!(limiter.try_acquire());
        }
        assert!(!limiter.try_acquire());
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_token_refill_admits_one_request() {
        let limiter = limiter(10.0, 2);

        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());

        // One token refills after 100ms at 10 tokens/second
        tokio::time::advance(Duration::from_millis(100)).await;
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[tokio::test(start_paused = true)]
    async fn test_bucket_never_exceeds_capacity() {
        let limiter = limiter(10.0, 3);

        tokio::time::advance(Duration::from_secs(60)).await;
        for _ in 0..3 {
            assert!(limiter.try_acquire());
        }
        assert!(!limiter.try_acquire());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejection_short_circuits_the_chain() {
        let mut chain = MiddlewareChain::new();
        chain.add(Arc::new(limiter(1.0, 1)));

        let endpoint = FnEndpoint(|| async { Ok(Outcome::Body(json!({"ok": true}))) });
        let cx = MiddlewareContext::new(methods::TOOLS_CALL, "test-client", None);

        assert!(chain.dispatch(&cx, &endpoint).await.is_ok());
        let err = chain.dispatch(&cx, &endpoint).await.unwrap_err();
        assert!(matches!(err, ServerError::RateLimited));
    }
}
