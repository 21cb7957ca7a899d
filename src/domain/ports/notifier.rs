use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::notification::{DeliveryReport, NotificationEvent};

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("failed to send notification: {0}")]
    SendFailed(String),
    #[error("notification channel unavailable: {0}")]
    ChannelUnavailable(String),
    #[error("notification endpoint returned HTTP {0}")]
    HttpStatus(u16),
    #[error("notification timed out after {0}s")]
    Timeout(u64),
}

/// A notification transport (webhook, email, ...).
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Short stable name used in logs and delivery reports.
    fn name(&self) -> &'static str;

    /// Deliver `event`, applying the channel's own retry policy.
    ///
    /// Delivery failures are recorded in the returned report, never raised.
    async fn deliver(&self, event: &NotificationEvent) -> DeliveryReport;
}
