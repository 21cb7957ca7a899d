pub mod notifier;
pub mod sample_source;
pub mod session;
pub mod store;
pub mod timing;

pub use notifier::{NotificationChannel, NotificationError};
pub use sample_source::{SampleSource, SamplingError};
pub use session::SessionResolver;
pub use store::{AlertStore, SampleStore, StoreError, ThresholdStore};
pub use timing::{JitterSource, Sleeper};
