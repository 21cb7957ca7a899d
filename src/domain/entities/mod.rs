pub mod alert;
pub mod notification;
pub mod sample;
pub mod summary;

pub use alert::{Alert, AlertKind};
pub use notification::{DeliveryAttempt, DeliveryOutcome, DeliveryReport, NotificationEvent};
pub use sample::{Sample, UtilizationReading};
pub use summary::AlertSummary;
