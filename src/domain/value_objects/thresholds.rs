use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CPU_THRESHOLD: f64 = 80.0;
pub const DEFAULT_MEMORY_THRESHOLD: f64 = 75.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ThresholdError {
    #[error("{name} threshold must be a finite number, got {value}")]
    NotFinite { name: &'static str, value: f64 },
    #[error("{name} threshold must be between 0 and 100, got {value}")]
    OutOfRange { name: &'static str, value: f64 },
}

/// CPU and memory utilization percentages above which an alert fires.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdPair {
    pub cpu_threshold: f64,
    pub memory_threshold: f64,
}

impl Default for ThresholdPair {
    fn default() -> Self {
        Self {
            cpu_threshold: DEFAULT_CPU_THRESHOLD,
            memory_threshold: DEFAULT_MEMORY_THRESHOLD,
        }
    }
}

impl ThresholdPair {
    #[must_use]
    pub const fn new(cpu_threshold: f64, memory_threshold: f64) -> Self {
        Self {
            cpu_threshold,
            memory_threshold,
        }
    }

    /// Builds a pair from user input, rejecting values that are not
    /// finite percentages.
    ///
    /// # Errors
    ///
    /// Returns `ThresholdError` if either value is NaN, infinite, or
    /// outside `[0, 100]`.
    pub fn validated(cpu_threshold: f64, memory_threshold: f64) -> Result<Self, ThresholdError> {
        check("cpu", cpu_threshold)?;
        check("memory", memory_threshold)?;
        Ok(Self::new(cpu_threshold, memory_threshold))
    }
}

fn check(name: &'static str, value: f64) -> Result<(), ThresholdError> {
    if !value.is_finite() {
        return Err(ThresholdError::NotFinite { name, value });
    }
    if !(0.0..=100.0).contains(&value) {
        return Err(ThresholdError::OutOfRange { name, value });
    }
    Ok(())
}

/// Identifier of the entity (user) a threshold override belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub i64);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn default_pair_is_80_75() {
        let t = ThresholdPair::default();
        assert!((t.cpu_threshold - 80.0).abs() < f64::EPSILON);
        assert!((t.memory_threshold - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn validated_accepts_bounds() {
        assert!(ThresholdPair::validated(0.0, 100.0).is_ok());
        assert!(ThresholdPair::validated(55.5, 60.0).is_ok());
    }

    #[test]
    fn validated_rejects_out_of_range() {
        let err = ThresholdPair::validated(120.0, 50.0).expect_err("out of range");
        assert_eq!(
            err,
            ThresholdError::OutOfRange {
                name: "cpu",
                value: 120.0
            }
        );
        assert!(ThresholdPair::validated(50.0, -1.0).is_err());
    }

    #[test]
    fn validated_rejects_nan() {
        let err = ThresholdPair::validated(50.0, f64::NAN).expect_err("nan");
        assert!(err.to_string().contains("memory threshold must be a finite number"));
    }

    #[test]
    fn serde_roundtrip() {
        let original = ThresholdPair::new(90.0, 70.0);
        let json = serde_json::to_string(&original).expect("serialize");
        let deserialized: ThresholdPair = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(original, deserialized);
    }
}
