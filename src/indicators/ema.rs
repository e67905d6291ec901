// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
//   alpha  = 2 / (period + 1)
//   seed   = mean(close[0..period])
//   ema_i  = alpha * close_i + (1 - alpha) * ema_{i-1}
//
// The raw series holds `len - period + 1` values; the first one lines up with
// close index `period - 1`.
// =============================================================================

use crate::market_data::bar::{closes, Bar};

/// Raw EMA series over `closes`.
///
/// Empty when `period == 0` or there are fewer than `period` closes. A
/// non-finite intermediate value ends the series early.
pub fn calculate_ema(closes: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || closes.len() < period {
        return Vec::new();
    }

    let alpha = 2.0 / (period + 1) as f64;
    let seed = closes[..period].iter().sum::<f64>() / period as f64;
    if !seed.is_finite() {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(closes.len() - period + 1);
    out.push(seed);

    let mut prev = seed;
    for &close in &closes[period..] {
        // Same as alpha * close + (1 - alpha) * prev, exact when close == prev.
        let next = prev + alpha * (close - prev);
        if !next.is_finite() {
            break;
        }
        out.push(next);
        prev = next;
    }

    out
}

/// Most recent EMA value of the bar closes. `None` unless the series reaches
/// the last bar.
pub fn last_ema(bars: &[Bar], period: usize) -> Option<f64> {
    let ema = calculate_ema(&closes(bars), period);
    let complete = !ema.is_empty() && ema.len() + period == bars.len() + 1;
    ema.last().copied().filter(|_| complete)
}

/// EMA of the bar closes realigned to `bars`: one entry per bar, `None` where
/// the average is not defined (before the seed, and from the first non-finite
/// close onwards). Serialises as `null` for chart overlays.
pub fn ema_series(bars: &[Bar], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; bars.len()];
    for (i, value) in calculate_ema(&closes(bars), period).into_iter().enumerate() {
        out[period - 1 + i] = Some(value);
    }
    out
}
