pub mod retry_policy;
pub mod thresholds;

pub use retry_policy::{DeliveryState, RetryPolicy};
pub use thresholds::{EntityId, ThresholdError, ThresholdPair};
