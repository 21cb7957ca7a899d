use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use sysinfo::{MemoryRefreshKind, System};

use crate::domain::entities::sample::UtilizationReading;
use crate::domain::ports::sample_source::{SampleSource, SamplingError};

/// Returns `(numerator / denominator) * 100.0`, or `0.0` when `denominator` is zero.
#[allow(clippy::cast_precision_loss)]
fn safe_percent(numerator: u64, denominator: u64) -> f64 {
    if denominator > 0 {
        (numerator as f64 / denominator as f64) * 100.0
    } else {
        0.0
    }
}

/// Host-wide CPU and memory utilization via the `sysinfo` crate.
///
/// CPU usage is a delta between two refreshes, so each sample refreshes,
/// waits `window` (never less than sysinfo's minimum update interval) and
/// refreshes again. The lock is released while waiting.
pub struct SysinfoSampleSource {
    sys: Mutex<System>,
    window: Duration,
}

impl SysinfoSampleSource {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        let mut sys = System::new();
        sys.refresh_cpu_usage();
        sys.refresh_memory_specifics(MemoryRefreshKind::nothing().with_ram());
        Self {
            sys: Mutex::new(sys),
            window: window.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL),
        }
    }

    fn with_system<T>(&self, f: impl FnOnce(&mut System) -> T) -> Result<T, SamplingError> {
        let mut sys = self
            .sys
            .lock()
            .map_err(|e| SamplingError::Unavailable(format!("system lock poisoned: {e}")))?;
        Ok(f(&mut sys))
    }
}

impl Default for SysinfoSampleSource {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

#[async_trait]
impl SampleSource for SysinfoSampleSource {
    async fn sample(&self) -> Result<UtilizationReading, SamplingError> {
        self.with_system(System::refresh_cpu_usage)?;
        tokio::time::sleep(self.window).await;

        let (cpu, used, total) = self.with_system(|sys| {
            sys.refresh_cpu_usage();
            sys.refresh_memory_specifics(MemoryRefreshKind::nothing().with_ram());
            (sys.global_cpu_usage(), sys.used_memory(), sys.total_memory())
        })?;

        if total == 0 {
            return Err(SamplingError::Unavailable("total memory reported as zero".into()));
        }

        let reading = UtilizationReading {
            cpu_percent: f64::from(cpu).clamp(0.0, 100.0),
            memory_percent: safe_percent(used, total).clamp(0.0, 100.0),
        };
        tracing::trace!(
            cpu = reading.cpu_percent,
            memory = reading.memory_percent,
            "Sampled host utilization"
        );
        Ok(reading)
    }
}
