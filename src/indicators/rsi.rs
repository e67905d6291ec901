// =============================================================================
// Relative Strength Index (RSI) — Wilder's Smoothing
// =============================================================================
//
// 1. deltas   d_i = close_i - close_{i-1}
// 2. seed     avg_gain / avg_loss = mean of the first `period` gains / losses
// 3. smooth   avg = (avg * (period - 1) + current) / period
// 4. RSI      100 - 100 / (1 + avg_gain / avg_loss)
//
// With no losses in the window RSI saturates at 100.
// =============================================================================

/// Full RSI series, one value per close from index `period` onwards.
///
/// Empty when `period == 0` or there are fewer than `period + 1` closes. A
/// non-finite delta ends the series.
pub fn calculate_rsi(closes: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || closes.len() < period + 1 {
        return Vec::new();
    }

    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    if deltas[..period].iter().any(|d| !d.is_finite()) {
        return Vec::new();
    }
    let period_f = period as f64;

    let (gain_sum, loss_sum) = deltas[..period]
        .iter()
        .fold((0.0_f64, 0.0_f64), |(g, l), &d| (g + d.max(0.0), l + (-d).max(0.0)));
    let mut avg_gain = gain_sum / period_f;
    let mut avg_loss = loss_sum / period_f;

    let mut out = Vec::with_capacity(deltas.len() - period + 1);
    match rsi_from_averages(avg_gain, avg_loss) {
        Some(v) => out.push(v),
        None => return out,
    }

    for &d in &deltas[period..] {
        if !d.is_finite() {
            break;
        }
        avg_gain = (avg_gain * (period_f - 1.0) + d.max(0.0)) / period_f;
        avg_loss = (avg_loss * (period_f - 1.0) + (-d).max(0.0)) / period_f;
        match rsi_from_averages(avg_gain, avg_loss) {
            Some(v) => out.push(v),
            None => break,
        }
    }

    out
}

/// Most recent RSI value. `None` unless the series reaches the last close.
pub fn last_rsi(closes: &[f64], period: usize) -> Option<f64> {
    let rsi = calculate_rsi(closes, period);
    let complete = !rsi.is_empty() && rsi.len() + period == closes.len();
    rsi.last().copied().filter(|_| complete)
}

/// RSI in [0, 100]; `None` for non-finite input.
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    if !avg_gain.is_finite() || !avg_loss.is_finite() {
        return None;
    }
    if avg_loss == 0.0 {
        return Some(100.0);
    }
    let rs = avg_gain / avg_loss;
    Some((100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0))
}
