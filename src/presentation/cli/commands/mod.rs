pub mod daemon;
pub mod history;
pub mod report;
pub mod status;
pub mod thresholds;
