use crate::domain::entities::alert::AlertKind;
use crate::domain::entities::sample::Sample;
use crate::domain::value_objects::thresholds::ThresholdPair;

use super::Rule;

pub struct CpuRule;

impl Rule for CpuRule {
    fn kind(&self) -> AlertKind {
        AlertKind::Cpu
    }

    fn breached(&self, sample: &Sample, thresholds: &ThresholdPair) -> bool {
        sample.cpu_percent > thresholds.cpu_threshold
    }
}
