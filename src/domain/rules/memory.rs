use crate::domain::entities::alert::AlertKind;
use crate::domain::entities::sample::Sample;
use crate::domain::value_objects::thresholds::ThresholdPair;

use super::Rule;

pub struct MemoryRule;

impl Rule for MemoryRule {
    fn kind(&self) -> AlertKind {
        AlertKind::Memory
    }

    fn breached(&self, sample: &Sample, thresholds: &ThresholdPair) -> bool {
        sample.memory_percent > thresholds.memory_threshold
    }
}
