//! Playback speed tiers.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Fixed advancement cadence.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Speed {
    /// One snapshot every 2 s.
    Slow,
    /// One snapshot every second.
    #[default]
    Normal,
    /// One snapshot every 500 ms.
    Fast,
}

impl Speed {
    /// Every tier, slowest first.
    pub const ALL: [Speed; 3] = [Speed::Slow, Speed::Normal, Speed::Fast];

    /// Interval between two advancements.
    #[must_use]
    pub fn period(self) -> Duration {
        match self {
            Self::Slow => Duration::from_millis(2000),
            Self::Normal => Duration::from_millis(1000),
            Self::Fast => Duration::from_millis(500),
        }
    }

    /// Multiplier label shown next to the controls.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Slow => "0.5x",
            Self::Normal => "1.0x",
            Self::Fast => "2.0x",
        }
    }
}

impl fmt::Display for Speed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error for an unrecognised speed name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown playback speed {0:?} (expected slow, normal, fast, 0.5x, 1.0x or 2.0x)")]
pub struct ParseSpeedError(String);

impl FromStr for Speed {
    type Err = ParseSpeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "slow" | "0.5x" => Ok(Self::Slow),
            "normal" | "1x" | "1.0x" => Ok(Self::Normal),
            "fast" | "2x" | "2.0x" => Ok(Self::Fast),
            _ => Err(ParseSpeedError(s.to_string())),
        }
    }
}
