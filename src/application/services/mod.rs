pub mod collector;
pub mod dispatcher;
pub mod report;
pub mod thresholds;

pub use collector::{Collector, CollectorError, CollectorHandle, CollectorState, TickReport};
pub use dispatcher::{DispatchError, NotificationDispatcher};
pub use thresholds::ThresholdResolver;
