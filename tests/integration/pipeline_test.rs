#![allow(clippy::expect_used)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use hostwatch::application::services::collector::{Collector, CollectorHandle, CollectorState};
use hostwatch::application::services::dispatcher::NotificationDispatcher;
use hostwatch::application::services::report::summarize;
use hostwatch::application::services::thresholds::ThresholdResolver;
use hostwatch::domain::entities::alert::AlertKind;
use hostwatch::domain::entities::notification::{DeliveryReport, NotificationEvent};
use hostwatch::domain::entities::sample::UtilizationReading;
use hostwatch::domain::ports::notifier::NotificationChannel;
use hostwatch::domain::ports::sample_source::{SampleSource, SamplingError};
use hostwatch::domain::ports::store::{AlertStore, SampleStore, ThresholdStore};
use hostwatch::domain::value_objects::thresholds::ThresholdPair;
use hostwatch::infrastructure::notifications::log_file::LogFileChannel;
use hostwatch::infrastructure::persistence::sqlite_store::SqliteStore;

/// Replays readings in order, then keeps returning the last one.
struct Replay(Mutex<VecDeque<UtilizationReading>>);

impl Replay {
    fn new(readings: &[(f64, f64)]) -> Self {
        Self(Mutex::new(
            readings
                .iter()
                .map(|&(cpu_percent, memory_percent)| UtilizationReading {
                    cpu_percent,
                    memory_percent,
                })
                .collect(),
        ))
    }
}

#[async_trait]
impl SampleSource for Replay {
    async fn sample(&self) -> Result<UtilizationReading, SamplingError> {
        let mut queue = self.0.lock().expect("lock");
        if queue.len() > 1 {
            queue
                .pop_front()
                .ok_or_else(|| SamplingError::Unavailable("empty".into()))
        } else {
            queue
                .front()
                .copied()
                .ok_or_else(|| SamplingError::Unavailable("empty".into()))
        }
    }
}

#[derive(Default)]
struct Recorder(Mutex<Vec<NotificationEvent>>);

#[async_trait]
impl NotificationChannel for Recorder {
    fn name(&self) -> &'static str {
        "recorder"
    }

    async fn deliver(&self, event: &NotificationEvent) -> DeliveryReport {
        self.0.lock().expect("lock").push(*event);
        DeliveryReport::single("recorder", Ok(()))
    }
}

struct AlwaysFails;

#[async_trait]
impl NotificationChannel for AlwaysFails {
    fn name(&self) -> &'static str {
        "broken"
    }

    async fn deliver(&self, _event: &NotificationEvent) -> DeliveryReport {
        DeliveryReport::single("broken", Err("connection refused".into()))
    }
}

struct Pipeline {
    _dir: tempfile::TempDir,
    store: Arc<SqliteStore>,
    recorder: Arc<Recorder>,
    dispatcher: Arc<NotificationDispatcher>,
    collector: Arc<Collector>,
    log_path: std::path::PathBuf,
}

fn pipeline(readings: &[(f64, f64)], thresholds: ThresholdPair) -> Pipeline {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("hostwatch.db");
    let log_path = dir.path().join("alerts.jsonl");
    let store = Arc::new(SqliteStore::new(db_path.to_str().expect("utf8")).expect("open"));
    store.set_global_thresholds(&thresholds).expect("thresholds");

    let recorder = Arc::new(Recorder::default());
    let channels: Vec<Arc<dyn NotificationChannel>> = vec![
        Arc::new(AlwaysFails),
        Arc::clone(&recorder) as Arc<dyn NotificationChannel>,
        Arc::new(LogFileChannel::new(log_path.to_str().expect("utf8"))),
    ];
    let dispatcher = Arc::new(NotificationDispatcher::new(channels, 16));
    let collector = Arc::new(Collector::new(
        Arc::new(Replay::new(readings)),
        ThresholdResolver::new(Arc::clone(&store) as Arc<dyn ThresholdStore>),
        Arc::clone(&store) as Arc<dyn SampleStore>,
        Arc::clone(&store) as Arc<dyn AlertStore>,
        Arc::clone(&dispatcher),
        Duration::from_millis(10),
    ));

    Pipeline {
        _dir: dir,
        store,
        recorder,
        dispatcher,
        collector,
        log_path,
    }
}

#[tokio::test]
async fn breach_is_persisted_and_fanned_out_despite_a_failing_channel() {
    let p = pipeline(&[(92.0, 81.0)], ThresholdPair::new(80.0, 75.0));

    let report = p.collector.tick().await;
    assert!(report.sample_saved);
    assert_eq!(report.fired, vec![AlertKind::Cpu, AlertKind::Memory]);
    assert_eq!(report.submitted, 2);
    assert!(p.dispatcher.wait_idle(Duration::from_secs(2)).await);

    let alerts = p.store.recent_alerts(10).expect("alerts");
    assert_eq!(alerts.len(), 2);

    let mut delivered: Vec<AlertKind> = p
        .recorder
        .0
        .lock()
        .expect("lock")
        .iter()
        .map(|e| e.kind)
        .collect();
    delivered.sort();
    assert_eq!(delivered, vec![AlertKind::Cpu, AlertKind::Memory]);

    let log = std::fs::read_to_string(&p.log_path).expect("log file");
    assert_eq!(log.lines().count(), 2);
    for line in log.lines() {
        let value: serde_json::Value = serde_json::from_str(line).expect("json line");
        assert!(value["type"] == "cpu" || value["type"] == "memory");
    }
}

#[tokio::test]
async fn value_equal_to_threshold_does_not_fire() {
    let p = pipeline(&[(80.0, 75.0)], ThresholdPair::new(80.0, 75.0));

    let report = p.collector.tick().await;
    assert!(report.sample_saved);
    assert!(report.fired.is_empty());
    assert_eq!(p.store.recent_samples(10).expect("samples").len(), 1);
    assert!(p.store.recent_alerts(10).expect("alerts").is_empty());
    assert!(!p.log_path.exists());
}

#[tokio::test]
async fn running_collector_fills_the_report() {
    let p = pipeline(
        &[(10.0, 10.0), (95.0, 10.0), (20.0, 90.0), (30.0, 20.0)],
        ThresholdPair::default(),
    );
    let handle = CollectorHandle::new(Arc::clone(&p.collector));

    handle.start().expect("start");
    assert_eq!(handle.state(), CollectorState::Running);
    tokio::time::sleep(Duration::from_millis(150)).await;
    handle.stop().await.expect("stop");
    assert_eq!(handle.state(), CollectorState::Stopped);
    assert!(p.dispatcher.wait_idle(Duration::from_secs(2)).await);

    let summary = summarize(p.store.as_ref(), p.store.as_ref(), 10).expect("summary");
    assert_eq!(summary.total_alerts, 2);
    assert_eq!(summary.breakdown.get(&AlertKind::Cpu), Some(&1));
    assert_eq!(summary.breakdown.get(&AlertKind::Memory), Some(&1));

    let samples = p.store.recent_samples(100).expect("samples");
    assert!(samples.len() >= 4);
    assert!(samples
        .windows(2)
        .all(|w| w[0].timestamp >= w[1].timestamp));
}
