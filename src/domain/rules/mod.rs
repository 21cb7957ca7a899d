pub mod cpu;
pub mod memory;

use crate::domain::entities::alert::AlertKind;
use crate::domain::entities::sample::Sample;
use crate::domain::value_objects::thresholds::ThresholdPair;

/// A threshold check for one alert kind.
/// Rules are pure functions: sample + thresholds in, verdict out. No I/O.
pub trait Rule: Send + Sync {
    fn kind(&self) -> AlertKind;

    /// Whether `sample` strictly exceeds the threshold for this kind.
    fn breached(&self, sample: &Sample, thresholds: &ThresholdPair) -> bool;
}

const RULES: [&dyn Rule; 2] = [&cpu::CpuRule, &memory::MemoryRule];

/// Alert kinds that fire for `sample` under `thresholds`, cpu before memory.
#[must_use]
pub fn evaluate(sample: &Sample, thresholds: &ThresholdPair) -> Vec<AlertKind> {
    RULES
        .iter()
        .filter(|rule| rule.breached(sample, thresholds))
        .map(|rule| rule.kind())
        .collect()
}
