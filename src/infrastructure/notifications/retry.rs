use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use crate::domain::entities::notification::{DeliveryOutcome, DeliveryReport};
use crate::domain::ports::notifier::NotificationError;
use crate::domain::ports::timing::{JitterSource, Sleeper};
use crate::domain::value_objects::retry_policy::{DeliveryState, RetryPolicy};

/// Real-time sleeper backed by the tokio timer.
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Uniform jitter from the thread-local RNG.
pub struct ThreadRngJitter;

impl JitterSource for ThreadRngJitter {
    fn jitter(&self, max: f64) -> f64 {
        if max.is_finite() && max > 0.0 {
            rand::rng().random_range(0.0..=max)
        } else {
            0.0
        }
    }
}

/// Drive `send` through the retry state machine of `policy`.
///
/// `send` receives the 0-based attempt index. Every attempt is recorded in
/// the returned report; the last failed attempt is recorded as terminal.
/// Sleeps happen only between attempts, never after the final one.
pub async fn deliver_with_retry<F, Fut>(
    channel: &'static str,
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    jitter: &dyn JitterSource,
    mut send: F,
) -> DeliveryReport
where
    F: FnMut(u32) -> Fut + Send,
    Fut: Future<Output = Result<(), NotificationError>> + Send,
{
    let mut report = DeliveryReport::new(channel);
    let mut state = DeliveryState::initial();

    while let DeliveryState::Attempting(attempt) = state {
        match send(attempt).await {
            Ok(()) => {
                report.record(DeliveryOutcome::Success);
                state = state.on_success();
            }
            Err(e) => {
                state = state.on_failure(policy);
                if !state.is_terminal() {
                    let delay = policy.delay(attempt, jitter.jitter(policy.max_jitter));
                    tracing::warn!(
                        channel,
                        attempt = attempt + 1,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "Delivery attempt failed, retrying"
                    );
                    report.record(DeliveryOutcome::TransientFailure(e.to_string()));
                    sleeper.sleep(delay).await;
                } else {
                    tracing::error!(
                        channel,
                        attempts = attempt + 1,
                        error = %e,
                        "Delivery failed after all retries"
                    );
                    report.record(DeliveryOutcome::TerminalFailure(e.to_string()));
                }
            }
        }
    }

    report
}
