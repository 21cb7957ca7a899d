use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::SecondsFormat;
use serde_json::{json, Value};

use super::retry::{deliver_with_retry, ThreadRngJitter, TokioSleeper};
use crate::domain::entities::alert::AlertKind;
use crate::domain::entities::notification::{DeliveryReport, NotificationEvent};
use crate::domain::ports::notifier::{NotificationChannel, NotificationError};
use crate::domain::ports::timing::{JitterSource, Sleeper};
use crate::domain::value_objects::retry_policy::RetryPolicy;

/// Webhook notification format, auto-detected from the URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WebhookFormat {
    Slack,
    Discord,
    Generic,
}

impl WebhookFormat {
    fn detect(url: &str) -> Self {
        // Match on the host only, a path mentioning slack is still generic.
        let host = url
            .split("//")
            .nth(1)
            .and_then(|s| s.split('/').next())
            .and_then(|h| h.split(':').next())
            .unwrap_or("");

        if host == "hooks.slack.com" {
            Self::Slack
        } else if host == "discord.com" || host == "discordapp.com" {
            Self::Discord
        } else {
            Self::Generic
        }
    }
}

/// POSTs alert notifications to an HTTP endpoint with exponential-backoff
/// retry.
///
/// Slack and Discord URLs get their native message shape; anything else
/// receives the generic `{type, value, ts, generated_at}` document. A 2xx
/// status is success; any other status, a transport error or a timeout is a
/// failed attempt.
pub struct WebhookChannel {
    url: String,
    client: reqwest::Client,
    format: WebhookFormat,
    policy: RetryPolicy,
    timeout: Duration,
    sleeper: Arc<dyn Sleeper>,
    jitter: Arc<dyn JitterSource>,
}

impl WebhookChannel {
    /// Creates a channel targeting `url`. `timeout` bounds each attempt
    /// (connect, request and response).
    ///
    /// # Errors
    ///
    /// Returns `NotificationError::ChannelUnavailable` if the HTTP client
    /// cannot be initialized (e.g. TLS backend failure).
    pub fn new(url: String, policy: RetryPolicy, timeout: Duration) -> Result<Self, NotificationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                NotificationError::ChannelUnavailable(format!("cannot build HTTP client: {e}"))
            })?;

        Ok(Self {
            format: WebhookFormat::detect(&url),
            url,
            client,
            policy,
            timeout,
            sleeper: Arc::new(TokioSleeper),
            jitter: Arc::new(ThreadRngJitter),
        })
    }

    /// Replace the timing sources used between retries.
    #[must_use]
    pub fn with_timing(mut self, sleeper: Arc<dyn Sleeper>, jitter: Arc<dyn JitterSource>) -> Self {
        self.sleeper = sleeper;
        self.jitter = jitter;
        self
    }

    async fn try_send(&self, payload: &Value) -> Result<(), NotificationError> {
        let response = self
            .client
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NotificationError::Timeout(self.timeout.as_secs())
                } else {
                    NotificationError::SendFailed(e.to_string())
                }
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(NotificationError::HttpStatus(response.status().as_u16()))
        }
    }

    // --- Color helpers ---

    const fn kind_color_hex(kind: AlertKind) -> &'static str {
        match kind {
            AlertKind::Cpu => "#E74C3C",
            AlertKind::Memory => "#E67E22",
        }
    }

    const fn kind_color_decimal(kind: AlertKind) -> u32 {
        match kind {
            AlertKind::Cpu => 0x00_E7_4C_3C,
            AlertKind::Memory => 0x00_E6_7E_22,
        }
    }

    // --- Payload formatting ---

    fn format_event(&self, event: &NotificationEvent) -> Value {
        match self.format {
            WebhookFormat::Slack => Self::format_slack(event),
            WebhookFormat::Discord => Self::format_discord(event),
            WebhookFormat::Generic => Self::format_generic(event),
        }
    }

    fn title(event: &NotificationEvent) -> String {
        format!(
            "{} usage {:.1}% above threshold",
            event.kind.as_str().to_uppercase(),
            event.value
        )
    }

    fn format_slack(event: &NotificationEvent) -> Value {
        json!({
            "text": Self::title(event),
            "attachments": [{
                "color": Self::kind_color_hex(event.kind),
                "blocks": [
                    {
                        "type": "header",
                        "text": { "type": "plain_text", "text": Self::title(event) }
                    },
                    {
                        "type": "section",
                        "fields": [
                            { "type": "mrkdwn", "text": format!("*Type:*\n{}", event.kind) },
                            { "type": "mrkdwn", "text": format!("*Value:*\n{:.1}%", event.value) },
                            { "type": "mrkdwn", "text": format!("*Sampled at:*\n{}", rfc3339(event.timestamp)) }
                        ]
                    }
                ]
            }]
        })
    }

    fn format_discord(event: &NotificationEvent) -> Value {
        json!({
            "username": "hostwatch",
            "embeds": [{
                "title": Self::title(event),
                "color": Self::kind_color_decimal(event.kind),
                "fields": [
                    { "name": "Type", "value": event.kind.as_str(), "inline": true },
                    { "name": "Value", "value": format!("{:.1}%", event.value), "inline": true }
                ],
                "timestamp": rfc3339(event.timestamp)
            }]
        })
    }

    fn format_generic(event: &NotificationEvent) -> Value {
        json!({
            "type": event.kind.as_str(),
            "value": event.value,
            "ts": rfc3339(event.timestamp),
            "generated_at": rfc3339(event.generated_at)
        })
    }
}

fn rfc3339(ts: chrono::DateTime<chrono::Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn deliver(&self, event: &NotificationEvent) -> DeliveryReport {
        let payload = self.format_event(event);
        let report = deliver_with_retry(
            self.name(),
            &self.policy,
            self.sleeper.as_ref(),
            self.jitter.as_ref(),
            |_| self.try_send(&payload),
        )
        .await;

        if report.succeeded() {
            tracing::debug!(
                kind = %event.kind,
                attempts = report.attempt_count(),
                "Webhook delivered"
            );
        }
        report
    }
}
