use std::future::Future;
use std::time::Duration;

use crate::application::services::collector::CollectorHandle;
use crate::application::services::dispatcher::NotificationDispatcher;

/// Run the collector (when `enabled`) until Ctrl+C, then stop it and give
/// in-flight notifications up to `drain_timeout` to finish.
///
/// Note: SIGTERM is not handled.
///
/// # Errors
///
/// Returns an error if the collector cannot be started.
pub async fn run_daemon(
    handle: &CollectorHandle,
    dispatcher: &NotificationDispatcher,
    enabled: bool,
    drain_timeout: Duration,
) -> anyhow::Result<()> {
    run_until(handle, dispatcher, enabled, drain_timeout, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Cannot listen for Ctrl+C");
        }
    })
    .await
}

/// [`run_daemon`] with an injectable shutdown signal.
///
/// # Errors
///
/// Returns an error if the collector cannot be started.
pub async fn run_until<S>(
    handle: &CollectorHandle,
    dispatcher: &NotificationDispatcher,
    enabled: bool,
    drain_timeout: Duration,
    shutdown: S,
) -> anyhow::Result<()>
where
    S: Future<Output = ()>,
{
    if enabled {
        handle.start()?;
        tracing::info!(channels = ?dispatcher.channel_names(), "Daemon started");
    } else {
        tracing::warn!("Collector disabled by configuration, idling until shutdown");
    }

    shutdown.await;
    tracing::info!("Shutdown signal received");
    println!("\nStopping hostwatch...");

    if enabled {
        if let Err(e) = handle.stop().await {
            tracing::warn!(error = %e, "Collector was not running at shutdown");
        }
    }

    let pending = dispatcher.in_flight();
    if pending > 0 {
        tracing::info!(pending, "Waiting for in-flight notifications");
    }
    if !dispatcher.wait_idle(drain_timeout).await {
        tracing::warn!(
            pending = dispatcher.in_flight(),
            "Notifications still in flight at shutdown, abandoning them"
        );
    }
    dispatcher.close();
    Ok(())
}
