use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::domain::entities::alert::{Alert, AlertKind};
use crate::domain::entities::sample::Sample;
use crate::domain::ports::session::SessionResolver;
use crate::domain::ports::store::{AlertStore, SampleStore, StoreError, ThresholdStore};
use crate::domain::value_objects::thresholds::{EntityId, ThresholdPair};

struct Session {
    entity: EntityId,
    expires_at: DateTime<Utc>,
}

/// In-memory store for tests and ephemeral runs.
pub struct InMemoryStore {
    samples: Mutex<Vec<Sample>>,
    alerts: Mutex<Vec<Alert>>,
    global: Mutex<ThresholdPair>,
    overrides: Mutex<HashMap<EntityId, ThresholdPair>>,
    sessions: Mutex<HashMap<String, Session>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            samples: Mutex::new(Vec::new()),
            alerts: Mutex::new(Vec::new()),
            global: Mutex::new(ThresholdPair::default()),
            overrides: Mutex::new(HashMap::new()),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Register a session token for `entity`, valid until `expires_at`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::WriteFailed` if the lock is poisoned.
    pub fn insert_session(
        &self,
        token: &str,
        entity: EntityId,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.sessions
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?
            .insert(token.to_string(), Session { entity, expires_at });
        Ok(())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleStore for InMemoryStore {
    fn append_sample(&self, sample: &Sample) -> Result<(), StoreError> {
        self.samples
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?
            .push(*sample);
        Ok(())
    }

    fn recent_samples(&self, limit: usize) -> Result<Vec<Sample>, StoreError> {
        Ok(self
            .samples
            .lock()
            .map_err(|_| StoreError::ReadFailed("lock poisoned".into()))?
            .iter()
            .rev()
            .take(limit)
            .copied()
            .collect())
    }

    fn samples_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Sample>, StoreError> {
        let mut samples: Vec<Sample> = self
            .samples
            .lock()
            .map_err(|_| StoreError::ReadFailed("lock poisoned".into()))?
            .iter()
            .filter(|s| s.timestamp >= start && s.timestamp <= end)
            .copied()
            .collect();
        samples.sort_by_key(|s| s.timestamp);
        Ok(samples)
    }
}

impl AlertStore for InMemoryStore {
    fn append_alert(&self, alert: &Alert) -> Result<(), StoreError> {
        self.alerts
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?
            .push(*alert);
        Ok(())
    }

    fn recent_alerts(&self, limit: usize) -> Result<Vec<Alert>, StoreError> {
        Ok(self
            .alerts
            .lock()
            .map_err(|_| StoreError::ReadFailed("lock poisoned".into()))?
            .iter()
            .rev()
            .take(limit)
            .copied()
            .collect())
    }

    fn alert_counts(&self) -> Result<BTreeMap<AlertKind, u64>, StoreError> {
        let alerts = self
            .alerts
            .lock()
            .map_err(|_| StoreError::ReadFailed("lock poisoned".into()))?;
        let mut counts = BTreeMap::new();
        for alert in alerts.iter() {
            *counts.entry(alert.kind).or_insert(0) += 1;
        }
        drop(alerts);
        Ok(counts)
    }
}

impl ThresholdStore for InMemoryStore {
    fn global_thresholds(&self) -> Result<ThresholdPair, StoreError> {
        Ok(*self
            .global
            .lock()
            .map_err(|_| StoreError::ReadFailed("lock poisoned".into()))?)
    }

    fn entity_thresholds(&self, entity: EntityId) -> Result<Option<ThresholdPair>, StoreError> {
        Ok(self
            .overrides
            .lock()
            .map_err(|_| StoreError::ReadFailed("lock poisoned".into()))?
            .get(&entity)
            .copied())
    }

    fn set_global_thresholds(&self, pair: &ThresholdPair) -> Result<(), StoreError> {
        *self
            .global
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))? = *pair;
        Ok(())
    }

    fn set_entity_thresholds(
        &self,
        entity: EntityId,
        pair: &ThresholdPair,
    ) -> Result<(), StoreError> {
        self.overrides
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?
            .insert(entity, *pair);
        Ok(())
    }
}

impl SessionResolver for InMemoryStore {
    fn entity_for_token(&self, token: &str) -> Result<Option<EntityId>, StoreError> {
        let now = Utc::now();
        Ok(self
            .sessions
            .lock()
            .map_err(|_| StoreError::ReadFailed("lock poisoned".into()))?
            .get(token)
            .filter(|s| s.expires_at > now)
            .map(|s| s.entity))
    }
}
