use std::path::PathBuf;

use async_trait::async_trait;
use chrono::SecondsFormat;
use tokio::io::AsyncWriteExt;

use crate::domain::entities::notification::{DeliveryReport, NotificationEvent};
use crate::domain::ports::notifier::{NotificationChannel, NotificationError};

/// Appends one JSON object per alert to a local file.
pub struct LogFileChannel {
    path: PathBuf,
}

impl LogFileChannel {
    #[must_use]
    pub fn new(path: &str) -> Self {
        let expanded = shellexpand::tilde(path);
        Self {
            path: PathBuf::from(expanded.as_ref()),
        }
    }

    async fn append_json_line(&self, value: &serde_json::Value) -> Result<(), NotificationError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                NotificationError::SendFailed(format!("cannot create log directory: {e}"))
            })?;
        }

        let mut line = serde_json::to_string(value)
            .map_err(|e| NotificationError::SendFailed(format!("JSON serialization: {e}")))?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| NotificationError::SendFailed(format!("cannot open log file: {e}")))?;

        file.write_all(line.as_bytes())
            .await
            .map_err(|e| NotificationError::SendFailed(format!("cannot write log file: {e}")))
    }
}

#[async_trait]
impl NotificationChannel for LogFileChannel {
    fn name(&self) -> &'static str {
        "log_file"
    }

    async fn deliver(&self, event: &NotificationEvent) -> DeliveryReport {
        let entry = serde_json::json!({
            "type": event.kind.as_str(),
            "value": event.value,
            "ts": event.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
            "generated_at": event.generated_at.to_rfc3339_opts(SecondsFormat::Micros, true),
        });

        let result = self.append_json_line(&entry).await;
        if let Err(e) = &result {
            tracing::warn!(path = %self.path.display(), error = %e, "Alert log write failed");
        }
        DeliveryReport::single(self.name(), result.map_err(|e| e.to_string()))
    }
}
