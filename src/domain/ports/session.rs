use super::store::StoreError;
use crate::domain::value_objects::thresholds::EntityId;

/// Read-only view of the identity layer: maps an opaque session token to
/// the entity it was issued for.
pub trait SessionResolver: Send + Sync {
    /// Entity owning `token`, or `None` if the token is unknown or expired.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the lookup fails.
    fn entity_for_token(&self, token: &str) -> Result<Option<EntityId>, StoreError>;
}
