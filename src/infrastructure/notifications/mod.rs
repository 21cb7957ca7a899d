pub mod email;
pub mod log_file;
pub mod retry;
pub mod webhook;

use std::sync::Arc;
use std::time::Duration;

use crate::application::config::AppConfig;
use crate::domain::ports::NotificationChannel;

use self::email::EmailChannel;
use self::log_file::LogFileChannel;
use self::webhook::WebhookChannel;

/// Build every channel the configuration enables.
///
/// A channel that is configured but cannot be constructed (bad address, TLS
/// backend failure) is logged and skipped; the others still run.
#[must_use]
pub fn build_channels(config: &AppConfig) -> Vec<Arc<dyn NotificationChannel>> {
    let mut channels: Vec<Arc<dyn NotificationChannel>> = Vec::new();

    if let Some(url) = config.webhook.url.as_deref().filter(|u| !u.trim().is_empty()) {
        match WebhookChannel::new(
            url.trim().to_string(),
            config.webhook.retry_policy(),
            Duration::from_secs(config.webhook.timeout_secs),
        ) {
            Ok(channel) => channels.push(Arc::new(channel)),
            Err(e) => tracing::warn!(error = %e, "Webhook channel disabled"),
        }
    }

    match EmailChannel::from_config(&config.email) {
        Ok(Some(channel)) => channels.push(Arc::new(channel)),
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "Email channel disabled"),
    }

    if let Some(path) = config
        .notifications
        .log_file
        .as_deref()
        .filter(|p| !p.trim().is_empty())
    {
        channels.push(Arc::new(LogFileChannel::new(path.trim())));
    }

    tracing::debug!(
        channels = ?channels.iter().map(|c| c.name()).collect::<Vec<_>>(),
        "Notification channels configured"
    );
    channels
}
