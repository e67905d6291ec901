// =============================================================================
// Synthetic bar generator
// =============================================================================
//
// Placeholder data for when no provider credential is configured or the
// provider cannot deliver. A random walk starting at 100 with a slow sine
// drift and bounded noise:
//
//   drift_i = sin(k / 9) * 0.2          (k counts down to 0 at the last bar)
//   close_i = max(1, close_{i-1} + drift_i + U(-0.35, 0.35))
//   high_i  = max(open, close) + U(0, 0.4)
//   low_i   = min(open, close) - U(0, 0.4)
//
// Bars are one minute apart regardless of the requested interval.
// =============================================================================

use rand::Rng;

use super::bar::Bar;

/// Number of bars in every synthetic series.
pub const SYNTHETIC_BARS: usize = 121;
/// Spacing between synthetic bars in seconds.
pub const SYNTHETIC_STEP_SECS: i64 = 60;

const START_PRICE: f64 = 100.0;
const DRIFT_AMPLITUDE: f64 = 0.2;
const DRIFT_PERIOD: f64 = 9.0;
const NOISE_WIDTH: f64 = 0.7;
const WICK_MAX: f64 = 0.4;
const PRICE_FLOOR: f64 = 1.0;
const VOLUME_MIN: f64 = 900.0;
const VOLUME_SPAN: f64 = 600.0;

/// Generate a synthetic series whose last bar starts at `now_secs` truncated to
/// the minute.
pub fn generate<R: Rng + ?Sized>(rng: &mut R, now_secs: i64) -> Vec<Bar> {
    let end = now_secs - now_secs.rem_euclid(SYNTHETIC_STEP_SECS);
    let mut bars = Vec::with_capacity(SYNTHETIC_BARS);
    let mut price = START_PRICE;

    for k in (0..SYNTHETIC_BARS as i64).rev() {
        let time = end - k * SYNTHETIC_STEP_SECS;
        let drift = (k as f64 / DRIFT_PERIOD).sin() * DRIFT_AMPLITUDE;
        let noise = (rng.gen::<f64>() - 0.5) * NOISE_WIDTH;

        let open = price;
        let close = (price + drift + noise).max(PRICE_FLOOR);
        let high = open.max(close) + rng.gen::<f64>() * WICK_MAX;
        // PRICE_FLOOR > WICK_MAX, so low stays positive.
        let low = open.min(close) - rng.gen::<f64>() * WICK_MAX;
        let volume = (VOLUME_MIN + rng.gen::<f64>() * VOLUME_SPAN).floor();

        bars.push(Bar::new(time, open, high, low, close, volume));
        price = close;
    }

    bars
}
