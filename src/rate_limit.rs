//! Fixed-window rate limiting keyed on an opaque identifier (IP or wallet).

use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, RejectReason};
use crate::store::RateLimitStore;

const WINDOW: Duration = Duration::from_secs(60);

pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    max_per_window: i64,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, max_per_window: i64) -> Self {
        Self {
            store,
            max_per_window,
        }
    }

    /// Count one request; errors with `RateLimited` once the window budget
    /// is spent.
    pub async fn check(&self, identifier: &str) -> Result<(), Error> {
        let count = self.store.hit(identifier, WINDOW).await?;
        if count > self.max_per_window {
            debug!(identifier, count, "Rate limit exceeded");
            return Err(RejectReason::RateLimited.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn limiter(max: i64) -> RateLimiter {
        RateLimiter::new(Arc::new(MemoryStore::new()), max)
    }

    #[tokio::test]
    async fn test_allows_up_to_limit() {
        let limiter = limiter(3);
        for _ in 0..3 {
            limiter.check("10.0.0.1").await.unwrap();
        }
        match limiter.check("10.0.0.1").await {
            Err(Error::Rejected(RejectReason::RateLimited)) => {}
            other => panic!("expected rate limit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_identifiers_are_independent() {
        let limiter = limiter(1);
        limiter.check("10.0.0.1").await.unwrap();
        limiter.check("10.0.0.2").await.unwrap();
        assert!(limiter.check("10.0.0.1").await.is_err());
        assert!(limiter.check("10.0.0.2").await.is_err());
    }
}
