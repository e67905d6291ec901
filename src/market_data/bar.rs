// =============================================================================
// Bar — one OHLCV observation for a fixed time bucket
// =============================================================================
//
// A series is an ordered `Vec<Bar>`, oldest first. Within a series `time`
// strictly increases, and every bar satisfies
//   high >= max(open, close)   and   low <= min(open, close).
// =============================================================================

use serde::{Deserialize, Serialize};

/// Number of most-recent bars checked after parsing a provider response.
pub const TRAILING_SAMPLE: usize = 5;

/// A single OHLCV bar. `time` is the bucket start in UNIX seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(time: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Check this bar against the schema in isolation (ordering is checked by
    /// [`validate_trailing`]).
    pub fn validate(&self) -> Result<(), BarValidationError> {
        let fields = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                return Err(BarValidationError::NonFinite {
                    time: self.time,
                    field,
                });
            }
        }
        for (field, value) in &fields[..4] {
            if *value <= 0.0 {
                return Err(BarValidationError::NonPositivePrice {
                    time: self.time,
                    field,
                    value: *value,
                });
            }
        }
        if self.volume < 0.0 {
            return Err(BarValidationError::NegativeVolume {
                time: self.time,
                volume: self.volume,
            });
        }
        if self.high < self.open.max(self.close) || self.low > self.open.min(self.close) {
            return Err(BarValidationError::RangeViolation { time: self.time });
        }
        Ok(())
    }
}

/// Structural defect found in a parsed bar series.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BarValidationError {
    #[error("bar at {time}: field '{field}' is not a finite number")]
    NonFinite { time: i64, field: &'static str },

    #[error("bar at {time}: price field '{field}' must be positive, got {value}")]
    NonPositivePrice {
        time: i64,
        field: &'static str,
        value: f64,
    },

    #[error("bar at {time}: volume must be non-negative, got {volume}")]
    NegativeVolume { time: i64, volume: f64 },

    #[error("bar at {time}: high/low do not bracket open/close")]
    RangeViolation { time: i64 },

    #[error("bar times not strictly increasing ({prev} then {next})")]
    OutOfOrder { prev: i64, next: i64 },
}

/// Validate the most recent [`TRAILING_SAMPLE`] bars of `bars`.
pub fn validate_trailing(bars: &[Bar]) -> Result<(), BarValidationError> {
    let start = bars.len().saturating_sub(TRAILING_SAMPLE);
    let sample = &bars[start..];

    for bar in sample {
        bar.validate()?;
    }
    for pair in sample.windows(2) {
        if pair[1].time <= pair[0].time {
            return Err(BarValidationError::OutOfOrder {
                prev: pair[0].time,
                next: pair[1].time,
            });
        }
    }
    Ok(())
}

/// Close prices of `bars`, oldest first.
pub fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}
