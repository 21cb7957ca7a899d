use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::sample::UtilizationReading;

#[derive(Error, Debug)]
pub enum SamplingError {
    #[error("failed to read utilization: {0}")]
    Unavailable(String),
    #[error("sampling timed out")]
    Timeout,
}

#[async_trait]
pub trait SampleSource: Send + Sync {
    /// Take one CPU/memory reading.
    ///
    /// Implementations may wait briefly to measure CPU over a window; that
    /// wait must stay short relative to the collector interval.
    ///
    /// # Errors
    ///
    /// Returns `SamplingError` if the reading cannot be obtained.
    async fn sample(&self) -> Result<UtilizationReading, SamplingError>;
}
