use std::time::Duration;

use async_trait::async_trait;

/// Suspends the caller. Injected so retry timing can be tested without
/// real delays.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Source of backoff jitter.
pub trait JitterSource: Send + Sync {
    /// Uniform draw from `[0, max]` seconds.
    fn jitter(&self, max: f64) -> f64;
}
