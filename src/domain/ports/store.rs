use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::entities::alert::{Alert, AlertKind};
use crate::domain::entities::sample::Sample;
use crate::domain::value_objects::thresholds::{EntityId, ThresholdPair};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage read failed: {0}")]
    ReadFailed(String),
    #[error("storage write failed: {0}")]
    WriteFailed(String),
}

pub trait SampleStore: Send + Sync {
    /// Append a sample.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the write operation fails.
    fn append_sample(&self, sample: &Sample) -> Result<(), StoreError>;

    /// Most recent samples, newest first, up to `limit`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the read operation fails.
    fn recent_samples(&self, limit: usize) -> Result<Vec<Sample>, StoreError>;

    /// Samples with `start <= timestamp <= end`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the read operation fails.
    fn samples_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Sample>, StoreError>;
}

pub trait AlertStore: Send + Sync {
    /// Append an alert.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the write operation fails.
    fn append_alert(&self, alert: &Alert) -> Result<(), StoreError>;

    /// Most recent alerts, newest first, up to `limit`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the read operation fails.
    fn recent_alerts(&self, limit: usize) -> Result<Vec<Alert>, StoreError>;

    /// Number of recorded alerts per kind. Kinds never recorded are absent.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the read operation fails.
    fn alert_counts(&self) -> Result<BTreeMap<AlertKind, u64>, StoreError>;
}

pub trait ThresholdStore: Send + Sync {
    /// Global threshold pair; the built-in default when never set.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the read operation fails.
    fn global_thresholds(&self) -> Result<ThresholdPair, StoreError>;

    /// Override for `entity`, if one exists.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the read operation fails.
    fn entity_thresholds(&self, entity: EntityId) -> Result<Option<ThresholdPair>, StoreError>;

    /// Replace the global pair.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the write operation fails.
    fn set_global_thresholds(&self, pair: &ThresholdPair) -> Result<(), StoreError>;

    /// Insert or replace the override for `entity`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the write operation fails.
    fn set_entity_thresholds(&self, entity: EntityId, pair: &ThresholdPair)
        -> Result<(), StoreError>;
}
