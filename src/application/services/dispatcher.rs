use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};

use crate::domain::entities::notification::NotificationEvent;
use crate::domain::ports::notifier::NotificationChannel;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DispatchError {
    #[error("dispatcher saturated: {0} deliveries already in flight")]
    Saturated(usize),
    #[error("dispatcher is shut down")]
    Closed,
}

/// Fans one notification event out to every configured channel.
///
/// Channels run concurrently as independent tasks; a failing or panicking
/// channel never affects the others. The dispatcher holds no state across
/// invocations besides the in-flight permit pool.
pub struct NotificationDispatcher {
    channels: Vec<Arc<dyn NotificationChannel>>,
    in_flight: Arc<Semaphore>,
    max_in_flight: usize,
}

impl NotificationDispatcher {
    #[must_use]
    pub fn new(channels: Vec<Arc<dyn NotificationChannel>>, max_in_flight: usize) -> Self {
        // `wait_idle` acquires the whole pool at once, which takes a u32.
        let cap = Semaphore::MAX_PERMITS.min(usize::try_from(u32::MAX).unwrap_or(usize::MAX));
        let max_in_flight = max_in_flight.clamp(1, cap);
        Self {
            channels,
            in_flight: Arc::new(Semaphore::new(max_in_flight)),
            max_in_flight,
        }
    }

    #[must_use]
    pub fn channel_names(&self) -> Vec<&'static str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// Deliver `event` on all channels and wait for every channel to finish.
    ///
    /// Returns `false` only when a channel task died outside its retry
    /// protocol (panic or abort). Exhausted deliveries are logged, not
    /// reported as failure.
    pub async fn dispatch(&self, event: NotificationEvent) -> bool {
        record_locally(&event);

        let mut tasks = JoinSet::new();
        for channel in &self.channels {
            let channel = Arc::clone(channel);
            tasks.spawn(async move { channel.deliver(&event).await });
        }

        let mut completed = true;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(report) if report.succeeded() => {
                    tracing::debug!(
                        channel = report.channel,
                        attempts = report.attempt_count(),
                        "Notification delivered"
                    );
                }
                Ok(report) => {
                    tracing::warn!(
                        channel = report.channel,
                        attempts = report.attempt_count(),
                        error = report.last_failure().unwrap_or("no attempt made"),
                        "Notification delivery failed"
                    );
                }
                Err(e) => {
                    tracing::error!(error = %e, "Notification channel task aborted");
                    completed = false;
                }
            }
        }
        completed
    }

    /// Spawn a dispatch for `event` without waiting for it.
    ///
    /// The spawned task is not tied to the caller's lifecycle. At most
    /// `max_in_flight` dispatches run at once; beyond that the event is
    /// rejected so an alert storm cannot grow the task set without bound.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Saturated` when every permit is taken and
    /// `DispatchError::Closed` after [`close`](Self::close).
    pub fn submit(self: &Arc<Self>, event: NotificationEvent) -> Result<JoinHandle<bool>, DispatchError> {
        let permit = Arc::clone(&self.in_flight)
            .try_acquire_owned()
            .map_err(|e| match e {
                tokio::sync::TryAcquireError::NoPermits => {
                    DispatchError::Saturated(self.max_in_flight)
                }
                tokio::sync::TryAcquireError::Closed => DispatchError::Closed,
            })?;
        let dispatcher = Arc::clone(self);
        Ok(tokio::spawn(async move {
            let _permit = permit;
            dispatcher.dispatch(event).await
        }))
    }

    /// Number of submitted dispatches still running.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.max_in_flight
            .saturating_sub(self.in_flight.available_permits())
    }

    /// Wait until every submitted dispatch has finished, up to `timeout`.
    /// Returns `true` if the dispatcher went idle in time.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let permits = u32::try_from(self.max_in_flight).unwrap_or(u32::MAX);
        match tokio::time::timeout(timeout, self.in_flight.acquire_many(permits)).await {
            Ok(Ok(_all)) => true,
            Ok(Err(_closed)) => self.in_flight() == 0,
            Err(_elapsed) => {
                tracing::warn!(
                    pending = self.in_flight(),
                    "Timed out waiting for in-flight notifications"
                );
                false
            }
        }
    }

    /// Reject further submissions. Already running dispatches continue.
    pub fn close(&self) {
        self.in_flight.close();
    }
}

/// Best-effort local record of every event, independent of channels.
fn record_locally(event: &NotificationEvent) {
    tracing::warn!(
        kind = %event.kind,
        value = event.value,
        ts = %event.timestamp.to_rfc3339(),
        "[ALERT] {} value={} at {}",
        event.kind.as_str().to_uppercase(),
        event.value,
        event.timestamp.to_rfc3339()
    );
}
