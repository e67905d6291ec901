// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free indicator math over a bar series (oldest first). The
// scanner only keeps the latest value of each indicator, collected into an
// `IndicatorSnapshot`.

pub mod atr;
pub mod ema;
pub mod rsi;

use serde::{Deserialize, Serialize};

use crate::market_data::bar::{closes, Bar};

/// Bars required before any indicator is reported.
pub const MIN_HISTORY: usize = 60;

pub const EMA_FAST: usize = 9;
pub const EMA_MID: usize = 21;
pub const EMA_SLOW: usize = 50;
pub const RSI_PERIOD: usize = 14;
pub const ATR_PERIOD: usize = 14;

/// Latest indicator values. Either every field is set or none is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ema9: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ema21: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ema50: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rsi14: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atr14: Option<f64>,
}

impl IndicatorSnapshot {
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.ema9.is_none()
            && self.ema21.is_none()
            && self.ema50.is_none()
            && self.rsi14.is_none()
            && self.atr14.is_none()
    }
}

/// Compute the snapshot for `bars`.
///
/// Empty below [`MIN_HISTORY`] bars, and also when any single indicator cannot
/// be computed (non-finite input), so that the fields stay all-or-nothing.
pub fn compute_indicators(bars: &[Bar]) -> IndicatorSnapshot {
    if bars.len() < MIN_HISTORY {
        return IndicatorSnapshot::default();
    }

    let close = closes(bars);
    let values = (
        ema::last_ema(bars, EMA_FAST),
        ema::last_ema(bars, EMA_MID),
        ema::last_ema(bars, EMA_SLOW),
        rsi::last_rsi(&close, RSI_PERIOD),
        atr::calculate_atr(bars, ATR_PERIOD),
    );

    match values {
        (Some(e9), Some(e21), Some(e50), Some(r), Some(a)) => IndicatorSnapshot {
            ema9: Some(e9),
            ema21: Some(e21),
            ema50: Some(e50),
            rsi14: Some(r),
            atr14: Some(a),
        },
        _ => IndicatorSnapshot::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trending(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let c = 100.0 + i as f64 * 0.5;
                Bar::new(i as i64 * 60, c - 0.5, c + 0.25, c - 0.75, c, 1_000.0)
            })
            .collect()
    }

    #[test]
    fn below_history_floor_is_empty() {
        let snap = compute_indicators(&trending(59));
        assert!(snap.is_empty());
        assert_eq!(snap, IndicatorSnapshot::default());
    }

    #[test]
    fn at_history_floor_all_fields_present() {
        let snap = compute_indicators(&trending(60));
        assert!(snap.ema9.is_some());
        assert!(snap.ema21.is_some());
        assert!(snap.ema50.is_some());
        assert!(snap.rsi14.is_some());
        assert!(snap.atr14.is_some());
    }

    #[test]
    fn uptrend_orders_emas() {
        let snap = compute_indicators(&trending(120));
        let (e9, e21, e50) = (snap.ema9.unwrap(), snap.ema21.unwrap(), snap.ema50.unwrap());
        assert!(e9 > e21 && e21 > e50);
        assert_eq!(snap.rsi14, Some(100.0));
        assert!((snap.atr14.unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn non_finite_input_empties_whole_snapshot() {
        let mut bars = trending(80);
        bars[79].high = f64::NAN;
        assert!(compute_indicators(&bars).is_empty());
    }

    #[test]
    fn mid_series_nan_close_leaves_no_stale_latest_values() {
        let mut bars = trending(80);
        bars[40].close = f64::NAN;
        assert!(ema::last_ema(&bars, EMA_FAST).is_none());
        assert!(ema::last_ema(&bars, EMA_SLOW).is_none());
        assert!(rsi::last_rsi(&closes(&bars), RSI_PERIOD).is_none());
        assert!(compute_indicators(&bars).is_empty());
    }

    #[test]
    fn empty_snapshot_serialises_to_empty_object() {
        let json = serde_json::to_string(&IndicatorSnapshot::default()).unwrap();
        assert_eq!(json, "{}");
        let full = compute_indicators(&trending(60));
        let value = serde_json::to_value(full).unwrap();
        for key in ["ema9", "ema21", "ema50", "rsi14", "atr14"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
    }
}
