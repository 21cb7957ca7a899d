use std::sync::Arc;

use crate::domain::ports::session::SessionResolver;
use crate::domain::ports::store::ThresholdStore;
use crate::domain::value_objects::thresholds::{EntityId, ThresholdPair};

/// Merges global and per-entity threshold configuration.
///
/// Resolution never fails: a missing override falls back to the global pair,
/// and a store read failure falls back to the built-in defaults.
#[derive(Clone)]
pub struct ThresholdResolver {
    store: Arc<dyn ThresholdStore>,
}

impl ThresholdResolver {
    #[must_use]
    pub fn new(store: Arc<dyn ThresholdStore>) -> Self {
        Self { store }
    }

    /// Effective thresholds for `entity`, or the global pair when `None`.
    #[must_use]
    pub fn resolve(&self, entity: Option<EntityId>) -> ThresholdPair {
        if let Some(entity) = entity {
            match self.store.entity_thresholds(entity) {
                Ok(Some(pair)) => return pair,
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(%entity, error = %e, "Failed to read threshold override, using global");
                }
            }
        }
        self.global()
    }

    /// Effective thresholds for the entity owning a session token.
    /// Unknown or expired tokens resolve to the global pair.
    #[must_use]
    pub fn resolve_for_session(&self, sessions: &dyn SessionResolver, token: &str) -> ThresholdPair {
        let entity = match sessions.entity_for_token(token) {
            Ok(entity) => entity,
            Err(e) => {
                tracing::warn!(error = %e, "Session lookup failed, using global thresholds");
                None
            }
        };
        self.resolve(entity)
    }

    fn global(&self) -> ThresholdPair {
        self.store.global_thresholds().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to read global thresholds, using defaults");
            ThresholdPair::default()
        })
    }
}
