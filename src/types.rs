// =============================================================================
// Shared types used across the setup scanner
// =============================================================================

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Bar interval accepted by the intraday provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1min")]
    OneMin,
    #[serde(rename = "5min")]
    FiveMin,
    #[serde(rename = "15min")]
    FifteenMin,
    #[serde(rename = "30min")]
    ThirtyMin,
    #[serde(rename = "60min")]
    SixtyMin,
}

impl Interval {
    pub const ALL: [Interval; 5] = [
        Self::OneMin,
        Self::FiveMin,
        Self::FifteenMin,
        Self::ThirtyMin,
        Self::SixtyMin,
    ];

    /// Wire representation, e.g. `"5min"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneMin => "1min",
            Self::FiveMin => "5min",
            Self::FifteenMin => "15min",
            Self::ThirtyMin => "30min",
            Self::SixtyMin => "60min",
        }
    }
}

impl Default for Interval {
    fn default() -> Self {
        Self::FiveMin
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of the supported intervals.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported interval '{0}' (expected one of 1min, 5min, 15min, 30min, 60min)")]
pub struct UnsupportedInterval(pub String);

impl FromStr for Interval {
    type Err = UnsupportedInterval;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|iv| iv.as_str() == s)
            .ok_or_else(|| UnsupportedInterval(s.to_string()))
    }
}

/// Where the bars behind a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Provider,
    Synthetic,
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Provider => write!(f, "provider"),
            Self::Synthetic => write!(f, "synthetic"),
        }
    }
}
