// =============================================================================
// Average True Range (ATR) — Wilder's Smoothing
// =============================================================================
//
//   TR_i   = max(high_i - low_i, |high_i - close_{i-1}|, |low_i - close_{i-1}|)
//   ATR_0  = mean of the first `period` TR values
//   ATR_t  = (ATR_{t-1} * (period - 1) + TR_t) / period
//
// TR needs a previous close, so the first bar contributes no TR value.
// =============================================================================

use crate::market_data::Bar;

/// True range of every bar after the first.
pub fn true_ranges(bars: &[Bar]) -> Vec<f64> {
    bars.windows(2)
        .map(|w| {
            let (prev, cur) = (&w[0], &w[1]);
            (cur.high - cur.low)
                .max((cur.high - prev.close).abs())
                .max((cur.low - prev.close).abs())
        })
        .collect()
}

/// Most recent ATR value.
///
/// `None` when `period == 0`, there are fewer than `period + 1` bars, or any
/// intermediate value is non-finite.
pub fn calculate_atr(bars: &[Bar], period: usize) -> Option<f64> {
    if period == 0 || bars.len() < period + 1 {
        return None;
    }

    // f64::max drops NaN operands, so screen the inputs instead of the TR values.
    if bars
        .iter()
        .any(|b| !(b.high.is_finite() && b.low.is_finite() && b.close.is_finite()))
    {
        return None;
    }

    let tr = true_ranges(bars);

    let period_f = period as f64;
    let seed = tr[..period].iter().sum::<f64>() / period_f;
    let atr = tr[period..]
        .iter()
        .fold(seed, |atr, &t| (atr * (period_f - 1.0) + t) / period_f);

    atr.is_finite().then_some(atr)
}
