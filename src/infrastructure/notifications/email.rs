use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::application::config::EmailConfig;
use crate::domain::entities::notification::{DeliveryReport, NotificationEvent};
use crate::domain::ports::notifier::{NotificationChannel, NotificationError};

/// Sends one plain-text email per alert over SMTP with STARTTLS.
///
/// Single attempt, no retry. Login happens only when both user and password
/// are configured.
pub struct EmailChannel {
    from: Mailbox,
    to: Mailbox,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailChannel {
    /// Build the channel from config. Returns `Ok(None)` when host, sender or
    /// recipient is missing: the channel is then not configured at all.
    ///
    /// # Errors
    ///
    /// Returns `NotificationError::ChannelUnavailable` if an address does not
    /// parse or the SMTP relay cannot be set up.
    pub fn from_config(config: &EmailConfig) -> Result<Option<Self>, NotificationError> {
        if !config.is_complete() {
            return Ok(None);
        }
        let (Some(host), Some(from), Some(to)) = (&config.smtp_host, &config.from, &config.to)
        else {
            return Ok(None);
        };

        let from: Mailbox = from
            .trim()
            .parse()
            .map_err(|e| NotificationError::ChannelUnavailable(format!("invalid sender: {e}")))?;
        let to: Mailbox = to
            .trim()
            .parse()
            .map_err(|e| NotificationError::ChannelUnavailable(format!("invalid recipient: {e}")))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host.trim())
            .map_err(|e| NotificationError::ChannelUnavailable(format!("SMTP relay: {e}")))?
            .port(config.smtp_port)
            .timeout(Some(Duration::from_secs(config.timeout_secs)));

        if let (Some(user), Some(pass)) = (
            config.smtp_user.as_deref().filter(|s| !s.is_empty()),
            config.smtp_password.as_deref().filter(|s| !s.is_empty()),
        ) {
            builder = builder.credentials(Credentials::new(user.to_string(), pass.to_string()));
        }

        Ok(Some(Self {
            from,
            to,
            mailer: builder.build(),
        }))
    }

    fn build_message(&self, event: &NotificationEvent) -> Result<Message, NotificationError> {
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject(event))
            .header(ContentType::TEXT_PLAIN)
            .body(render_body(event))
            .map_err(|e| NotificationError::SendFailed(format!("cannot build message: {e}")))
    }

    async fn send(&self, event: &NotificationEvent) -> Result<(), NotificationError> {
        let message = self.build_message(event)?;
        self.mailer
            .send(message)
            .await
            .map_err(|e| NotificationError::SendFailed(e.to_string()))?;
        Ok(())
    }
}

/// `System Alert: CPU`
#[must_use]
pub fn subject(event: &NotificationEvent) -> String {
    format!("System Alert: {}", event.kind.as_str().to_uppercase())
}

#[must_use]
pub fn render_body(event: &NotificationEvent) -> String {
    format!(
        "Alert type: {}\nValue: {}\nTime: {}\nGenerated: {}",
        event.kind,
        event.value,
        event.timestamp.to_rfc3339(),
        event.generated_at.to_rfc3339()
    )
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn deliver(&self, event: &NotificationEvent) -> DeliveryReport {
        let result = self.send(event).await;
        match &result {
            Ok(()) => tracing::info!(to = %self.to, kind = %event.kind, "Alert email sent"),
            Err(e) => tracing::warn!(kind = %event.kind, error = %e, "Alert email failed"),
        }
        DeliveryReport::single(self.name(), result.map_err(|e| e.to_string()))
    }
}
