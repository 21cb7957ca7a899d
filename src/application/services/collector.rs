use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::dispatcher::NotificationDispatcher;
use super::thresholds::ThresholdResolver;
use crate::domain::entities::alert::{Alert, AlertKind};
use crate::domain::entities::notification::NotificationEvent;
use crate::domain::entities::sample::Sample;
use crate::domain::ports::sample_source::{SampleSource, SamplingError};
use crate::domain::ports::store::{AlertStore, SampleStore};
use crate::domain::rules;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CollectorError {
    #[error("collector is already running")]
    AlreadyRunning,
    #[error("collector is not running")]
    NotRunning,
}

/// Lifecycle of the background sampling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    Stopped,
    Running,
    Cancelling,
}

/// Result of a single tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// `None` when sampling failed.
    pub sample: Option<Sample>,
    pub sample_saved: bool,
    pub fired: Vec<AlertKind>,
    /// Events accepted by the dispatcher.
    pub submitted: usize,
}

/// One sampling → evaluation → notification step, plus the loop driving it.
///
/// The collector evaluates against the global thresholds only; per-entity
/// overrides apply to the read path.
pub struct Collector {
    source: Arc<dyn SampleSource>,
    resolver: ThresholdResolver,
    samples: Arc<dyn SampleStore>,
    alerts: Arc<dyn AlertStore>,
    dispatcher: Arc<NotificationDispatcher>,
    interval: Duration,
    sample_timeout: Duration,
}

impl Collector {
    #[must_use]
    pub fn new(
        source: Arc<dyn SampleSource>,
        resolver: ThresholdResolver,
        samples: Arc<dyn SampleStore>,
        alerts: Arc<dyn AlertStore>,
        dispatcher: Arc<NotificationDispatcher>,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            resolver,
            samples,
            alerts,
            dispatcher,
            interval,
            sample_timeout: Duration::from_secs(10),
        }
    }

    #[must_use]
    pub const fn with_sample_timeout(mut self, timeout: Duration) -> Self {
        self.sample_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one tick: sample, resolve, persist, evaluate, submit.
    ///
    /// Never fails: every error is logged and the remaining steps still run
    /// where they can.
    pub async fn tick(&self) -> TickReport {
        let reading = match tokio::time::timeout(self.sample_timeout, self.source.sample()).await {
            Ok(Ok(reading)) => reading,
            Ok(Err(e)) => return Self::sampling_failed(&e),
            Err(_) => return Self::sampling_failed(&SamplingError::Timeout),
        };
        let sample = Sample::new(reading, Utc::now());

        let thresholds = self.resolver.resolve(None);

        let sample_saved = match self.samples.append_sample(&sample) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to save sample");
                false
            }
        };

        let fired = rules::evaluate(&sample, &thresholds);
        if fired.is_empty() {
            tracing::debug!(
                cpu = sample.cpu_percent,
                memory = sample.memory_percent,
                "System OK, no alerts"
            );
        }

        let mut submitted = 0;
        for kind in &fired {
            let alert = Alert::from_sample(*kind, &sample);
            if let Err(e) = self.alerts.append_alert(&alert) {
                tracing::warn!(kind = %alert.kind, error = %e, "Failed to save alert");
            }

            let event = NotificationEvent::from_alert(&alert, Utc::now());
            match self.dispatcher.submit(event) {
                Ok(_detached) => submitted += 1,
                Err(e) => {
                    tracing::warn!(kind = %alert.kind, error = %e, "Failed to submit notification");
                }
            }
        }

        TickReport {
            sample: Some(sample),
            sample_saved,
            fired,
            submitted,
        }
    }

    fn sampling_failed(error: &SamplingError) -> TickReport {
        tracing::warn!(error = %error, "Sampling failed, skipping tick");
        TickReport {
            sample: None,
            sample_saved: false,
            fired: Vec::new(),
            submitted: 0,
        }
    }

    /// Tick until `cancel` fires. Cancellation is only observed between
    /// ticks: before a tick starts and during the inter-tick sleep.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(interval_ms = self.interval.as_millis(), "Collector started");
        loop {
            if cancel.is_cancelled() {
                break;
            }

            let report = self.tick().await;
            tracing::debug!(
                sample_saved = report.sample_saved,
                alerts = report.fired.len(),
                submitted = report.submitted,
                "Tick complete"
            );

            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.interval) => {}
            }
        }
        tracing::info!("Collector stopped");
    }
}

struct HandleInner {
    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
}

/// Owned start/stop handle around a [`Collector`].
///
/// `Stopped → Running` on [`start`](Self::start), `Running → Cancelling →
/// Stopped` on [`stop`](Self::stop). Notifications already submitted keep
/// running after the collector stops.
pub struct CollectorHandle {
    collector: Arc<Collector>,
    state: Arc<Mutex<CollectorState>>,
    inner: Mutex<HandleInner>,
}

impl CollectorHandle {
    #[must_use]
    pub fn new(collector: Arc<Collector>) -> Self {
        Self {
            collector,
            state: Arc::new(Mutex::new(CollectorState::Stopped)),
            inner: Mutex::new(HandleInner {
                cancel: None,
                task: None,
            }),
        }
    }

    #[must_use]
    pub fn state(&self) -> CollectorState {
        *lock(&self.state)
    }

    /// Spawn the sampling loop.
    ///
    /// # Errors
    ///
    /// Returns `CollectorError::AlreadyRunning` unless the collector is stopped.
    pub fn start(&self) -> Result<(), CollectorError> {
        let mut inner = lock(&self.inner);
        {
            let mut state = lock(&self.state);
            if *state != CollectorState::Stopped {
                return Err(CollectorError::AlreadyRunning);
            }
            *state = CollectorState::Running;
        }

        let cancel = CancellationToken::new();
        let collector = Arc::clone(&self.collector);
        let state = Arc::clone(&self.state);
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            collector.run(token).await;
            *lock(&state) = CollectorState::Stopped;
        });

        inner.cancel = Some(cancel);
        inner.task = Some(task);
        drop(inner);
        Ok(())
    }

    /// Request cancellation and wait for the loop to finish its current tick.
    ///
    /// # Errors
    ///
    /// Returns `CollectorError::NotRunning` if the collector is not running.
    pub async fn stop(&self) -> Result<(), CollectorError> {
        let (cancel, task) = {
            let mut inner = lock(&self.inner);
            let mut state = lock(&self.state);
            if *state != CollectorState::Running {
                return Err(CollectorError::NotRunning);
            }
            *state = CollectorState::Cancelling;
            drop(state);
            (inner.cancel.take(), inner.task.take())
        };

        if let Some(cancel) = cancel {
            cancel.cancel();
        }
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Collector task ended abnormally");
            }
        }
        *lock(&self.state) = CollectorState::Stopped;
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::domain::entities::notification::DeliveryReport;
    use crate::domain::entities::sample::UtilizationReading;
    use crate::domain::ports::notifier::NotificationChannel;
    use crate::domain::ports::store::{StoreError, ThresholdStore};
    use crate::domain::value_objects::thresholds::ThresholdPair;
    use crate::infrastructure::persistence::in_memory_store::InMemoryStore;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedSource {
        readings: Mutex<VecDeque<Result<UtilizationReading, SamplingError>>>,
        fallback: UtilizationReading,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn constant(cpu: f64, memory: f64) -> Self {
            Self::scripted(vec![], cpu, memory)
        }

        fn scripted(
            script: Vec<Result<UtilizationReading, SamplingError>>,
            cpu: f64,
            memory: f64,
        ) -> Self {
            Self {
                readings: Mutex::new(script.into()),
                fallback: UtilizationReading {
                    cpu_percent: cpu,
                    memory_percent: memory,
                },
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SampleSource for ScriptedSource {
        async fn sample(&self) -> Result<UtilizationReading, SamplingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.readings.lock().expect("mutex poisoned").pop_front();
            next.unwrap_or(Ok(self.fallback))
        }
    }

    struct HangingSource;

    #[async_trait]
    impl SampleSource for HangingSource {
        async fn sample(&self) -> Result<UtilizationReading, SamplingError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Err(SamplingError::Unavailable("unreachable".into()))
        }
    }

    struct RecordingChannel {
        events: Mutex<Vec<NotificationEvent>>,
    }

    #[async_trait]
    impl NotificationChannel for RecordingChannel {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn deliver(&self, event: &NotificationEvent) -> DeliveryReport {
            self.events.lock().expect("mutex poisoned").push(*event);
            DeliveryReport::single("recording", Ok(()))
        }
    }

    struct ReadOnlyStore;

    impl SampleStore for ReadOnlyStore {
        fn append_sample(&self, _: &Sample) -> Result<(), StoreError> {
            Err(StoreError::WriteFailed("read-only".into()))
        }
        fn recent_samples(&self, _: usize) -> Result<Vec<Sample>, StoreError> {
            Ok(vec![])
        }
        fn samples_between(
            &self,
            _: chrono::DateTime<Utc>,
            _: chrono::DateTime<Utc>,
        ) -> Result<Vec<Sample>, StoreError> {
            Ok(vec![])
        }
    }

    impl AlertStore for ReadOnlyStore {
        fn append_alert(&self, _: &Alert) -> Result<(), StoreError> {
            Err(StoreError::WriteFailed("read-only".into()))
        }
        fn recent_alerts(&self, _: usize) -> Result<Vec<Alert>, StoreError> {
            Ok(vec![])
        }
        fn alert_counts(
            &self,
        ) -> Result<std::collections::BTreeMap<AlertKind, u64>, StoreError> {
            Ok(std::collections::BTreeMap::new())
        }
    }

    struct Fixture {
        store: Arc<InMemoryStore>,
        channel: Arc<RecordingChannel>,
        dispatcher: Arc<NotificationDispatcher>,
    }

    impl Fixture {
        fn new() -> Self {
            let channel = Arc::new(RecordingChannel {
                events: Mutex::new(Vec::new()),
            });
            let dispatcher = Arc::new(NotificationDispatcher::new(
                vec![Arc::clone(&channel) as Arc<dyn NotificationChannel>],
                16,
            ));
            Self {
                store: Arc::new(InMemoryStore::new()),
                channel,
                dispatcher,
            }
        }

        fn collector(&self, source: Arc<dyn SampleSource>, interval: Duration) -> Collector {
            Collector::new(
                source,
                ThresholdResolver::new(Arc::clone(&self.store) as Arc<dyn ThresholdStore>),
                Arc::clone(&self.store) as Arc<dyn SampleStore>,
                Arc::clone(&self.store) as Arc<dyn AlertStore>,
                Arc::clone(&self.dispatcher),
                interval,
            )
        }

        fn delivered(&self) -> Vec<NotificationEvent> {
            self.channel.events.lock().expect("mutex poisoned").clone()
        }
    }

    #[tokio::test]
    async fn cpu_breach_persists_one_alert_and_dispatches_once() {
        let fx = Fixture::new();
        fx.store
            .set_global_thresholds(&ThresholdPair::new(80.0, 75.0))
            .expect("set thresholds");
        let collector = fx.collector(
            Arc::new(ScriptedSource::constant(92.0, 40.0)),
            Duration::from_secs(1),
        );

        let report = collector.tick().await;
        assert!(report.sample_saved);
        assert_eq!(report.fired, vec![AlertKind::Cpu]);
        assert_eq!(report.submitted, 1);

        let alerts = fx.store.recent_alerts(10).expect("alerts");
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::Cpu);
        assert!((alerts[0].value - 92.0).abs() < f64::EPSILON);

        assert!(fx.dispatcher.wait_idle(Duration::from_secs(1)).await);
        let delivered = fx.delivered();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].kind, AlertKind::Cpu);
    }

    #[tokio::test]
    async fn boundary_sample_fires_nothing() {
        let fx = Fixture::new();
        let collector = fx.collector(
            Arc::new(ScriptedSource::constant(80.0, 75.0)),
            Duration::from_secs(1),
        );

        let report = collector.tick().await;
        assert!(report.fired.is_empty());
        assert_eq!(fx.store.recent_samples(10).expect("samples").len(), 1);
        assert!(fx.store.recent_alerts(10).expect("alerts").is_empty());
        assert!(fx.dispatcher.wait_idle(Duration::from_secs(1)).await);
        assert!(fx.delivered().is_empty());
    }

    #[tokio::test]
    async fn both_kinds_fire_in_one_tick() {
        let fx = Fixture::new();
        let collector = fx.collector(
            Arc::new(ScriptedSource::constant(99.0, 99.0)),
            Duration::from_secs(1),
        );
        let report = collector.tick().await;
        assert_eq!(report.fired, vec![AlertKind::Cpu, AlertKind::Memory]);
        assert_eq!(report.submitted, 2);
        assert!(fx.dispatcher.wait_idle(Duration::from_secs(1)).await);
        assert_eq!(fx.delivered().len(), 2);
    }

    #[tokio::test]
    async fn sampling_error_skips_tick() {
        let fx = Fixture::new();
        let collector = fx.collector(
            Arc::new(ScriptedSource::scripted(
                vec![Err(SamplingError::Unavailable("procfs".into()))],
                99.0,
                10.0,
            )),
            Duration::from_secs(1),
        );

        let first = collector.tick().await;
        assert!(first.sample.is_none());
        assert!(!first.sample_saved);

        let second = collector.tick().await;
        assert!(second.sample.is_some());
        assert_eq!(second.fired, vec![AlertKind::Cpu]);
    }

    #[tokio::test]
    async fn hanging_source_is_bounded_by_timeout() {
        let fx = Fixture::new();
        let collector = fx
            .collector(Arc::new(HangingSource), Duration::from_secs(1))
            .with_sample_timeout(Duration::from_millis(50));
        let report = tokio::time::timeout(Duration::from_secs(2), collector.tick())
            .await
            .expect("tick bounded");
        assert!(report.sample.is_none());
    }

    #[tokio::test]
    async fn persistence_failure_still_dispatches() {
        let fx = Fixture::new();
        let broken = Arc::new(ReadOnlyStore);
        let collector = Collector::new(
            Arc::new(ScriptedSource::constant(95.0, 10.0)),
            ThresholdResolver::new(Arc::clone(&fx.store) as Arc<dyn ThresholdStore>),
            Arc::clone(&broken) as Arc<dyn SampleStore>,
            broken as Arc<dyn AlertStore>,
            Arc::clone(&fx.dispatcher),
            Duration::from_secs(1),
        );

        let report = collector.tick().await;
        assert!(!report.sample_saved);
        assert_eq!(report.submitted, 1);
        assert!(fx.dispatcher.wait_idle(Duration::from_secs(1)).await);
        assert_eq!(fx.delivered().len(), 1);
    }

    #[tokio::test]
    async fn saturated_dispatcher_does_not_stop_tick() {
        let fx = Fixture::new();
        let dispatcher = Arc::new(NotificationDispatcher::new(vec![], 1));
        dispatcher.close();
        let collector = Collector::new(
            Arc::new(ScriptedSource::constant(95.0, 95.0)),
            ThresholdResolver::new(Arc::clone(&fx.store) as Arc<dyn ThresholdStore>),
            Arc::clone(&fx.store) as Arc<dyn SampleStore>,
            Arc::clone(&fx.store) as Arc<dyn AlertStore>,
            dispatcher,
            Duration::from_secs(1),
        );

        let report = collector.tick().await;
        assert_eq!(report.fired.len(), 2);
        assert_eq!(report.submitted, 0);
        assert_eq!(fx.store.recent_alerts(10).expect("alerts").len(), 2);
    }

    #[tokio::test]
    async fn samples_persist_in_tick_order() {
        let fx = Fixture::new();
        let collector = fx.collector(
            Arc::new(ScriptedSource::constant(1.0, 1.0)),
            Duration::from_secs(1),
        );
        for _ in 0..3 {
            collector.tick().await;
        }
        let samples = fx.store.recent_samples(10).expect("samples");
        assert_eq!(samples.len(), 3);
        assert!(samples[0].timestamp >= samples[1].timestamp);
        assert!(samples[1].timestamp >= samples[2].timestamp);
    }

    #[tokio::test]
    async fn handle_start_stop_lifecycle() {
        let fx = Fixture::new();
        let source = Arc::new(ScriptedSource::constant(1.0, 1.0));
        let handle = CollectorHandle::new(Arc::new(fx.collector(
            Arc::clone(&source) as Arc<dyn SampleSource>,
            Duration::from_millis(100),
        )));

        assert_eq!(handle.state(), CollectorState::Stopped);
        assert_eq!(handle.stop().await, Err(CollectorError::NotRunning));

        handle.start().expect("start");
        assert_eq!(handle.state(), CollectorState::Running);
        assert_eq!(handle.start(), Err(CollectorError::AlreadyRunning));

        tokio::time::sleep(Duration::from_millis(250)).await;
        handle.stop().await.expect("stop");
        assert_eq!(handle.state(), CollectorState::Stopped);
        assert!(source.calls.load(Ordering::SeqCst) >= 2);

        // Restartable after a clean stop.
        handle.start().expect("restart");
        handle.stop().await.expect("stop again");
    }

    #[tokio::test]
    async fn no_tick_runs_after_cancellation() {
        let fx = Fixture::new();
        let source = Arc::new(ScriptedSource::constant(1.0, 1.0));
        let handle = CollectorHandle::new(Arc::new(fx.collector(
            Arc::clone(&source) as Arc<dyn SampleSource>,
            Duration::from_millis(100),
        )));

        handle.start().expect("start");
        tokio::time::sleep(Duration::from_millis(150)).await;
        handle.stop().await.expect("stop");

        let ticks_at_stop = source.calls.load(Ordering::SeqCst);
        let samples_at_stop = fx.store.recent_samples(100).expect("samples").len();
        tokio::time::sleep(Duration::from_millis(350)).await;

        assert_eq!(source.calls.load(Ordering::SeqCst), ticks_at_stop);
        assert_eq!(
            fx.store.recent_samples(100).expect("samples").len(),
            samples_at_stop
        );
        assert_eq!(handle.state(), CollectorState::Stopped);
    }

    #[tokio::test]
    async fn stopping_collector_keeps_submitted_deliveries() {
        struct SlowChannel {
            done: AtomicUsize,
        }

        #[async_trait]
        impl NotificationChannel for SlowChannel {
            fn name(&self) -> &'static str {
                "slow"
            }
            async fn deliver(&self, _event: &NotificationEvent) -> DeliveryReport {
                tokio::time::sleep(Duration::from_millis(200)).await;
                self.done.fetch_add(1, Ordering::SeqCst);
                DeliveryReport::single("slow", Ok(()))
            }
        }

        let store = Arc::new(InMemoryStore::new());
        let slow = Arc::new(SlowChannel {
            done: AtomicUsize::new(0),
        });
        let dispatcher = Arc::new(NotificationDispatcher::new(
            vec![Arc::clone(&slow) as Arc<dyn NotificationChannel>],
            16,
        ));
        let collector = Collector::new(
            Arc::new(ScriptedSource::constant(99.0, 10.0)),
            ThresholdResolver::new(Arc::clone(&store) as Arc<dyn ThresholdStore>),
            Arc::clone(&store) as Arc<dyn SampleStore>,
            Arc::clone(&store) as Arc<dyn AlertStore>,
            Arc::clone(&dispatcher),
            Duration::from_secs(10),
        );
        let handle = CollectorHandle::new(Arc::new(collector));

        handle.start().expect("start");
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.stop().await.expect("stop");
        assert_eq!(slow.done.load(Ordering::SeqCst), 0);

        assert!(dispatcher.wait_idle(Duration::from_secs(2)).await);
        assert_eq!(slow.done.load(Ordering::SeqCst), 1);
    }
}
