use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::sample::Sample;

/// Resource whose threshold was breached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Cpu,
    Memory,
}

impl AlertKind {
    pub const ALL: [Self; 2] = [Self::Cpu, Self::Memory];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Memory => "memory",
        }
    }

    /// Reading of this kind carried by `sample`.
    #[must_use]
    pub const fn value_of(&self, sample: &Sample) -> f64 {
        match self {
            Self::Cpu => sample.cpu_percent,
            Self::Memory => sample.memory_percent,
        }
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AlertKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cpu" => Ok(Self::Cpu),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown alert kind '{other}'")),
        }
    }
}

/// A recorded threshold breach. Append-only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

impl Alert {
    /// Builds the alert of `kind` for a breaching sample.
    #[must_use]
    pub const fn from_sample(kind: AlertKind, sample: &Sample) -> Self {
        Self {
            kind,
            value: kind.value_of(sample),
            timestamp: sample.timestamp,
        }
    }
}
