// =============================================================================
// Setup Scoring — fixed rule table over the latest indicator snapshot
// =============================================================================
//
// Each rule is evaluated independently, in table order. A rule that fires adds
// its weight and appends its reason; a rule whose inputs are missing is
// skipped. The summed weight is clamped to 100.
//
//   #  condition                                         weight
//   1  close > EMA50                                       20
//   2  EMA9 > EMA21                                        15
//   3  50 < RSI14 < 70                                     15
//   4  close > previous close (more than 20 bars)           8
//   5  volume > 1.5 x mean volume of the last 20 bars      20
//   6  ATR14 / close < 3%                                  10
//   7  close > highest high of the 20 bars before last     12
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::indicators::{compute_indicators, IndicatorSnapshot, MIN_HISTORY};
use crate::market_data::Bar;

pub const SCORE_CAP: u32 = 100;
pub const INSUFFICIENT_HISTORY_REASON: &str = "Not enough bars to score (need 60+)";

const LOOKBACK: usize = 20;
const VOLUME_SPIKE_FACTOR: f64 = 1.5;
const MAX_ATR_FRACTION: f64 = 0.03;
const RSI_BULL_LOW: f64 = 50.0;
const RSI_BULL_HIGH: f64 = 70.0;

/// Scored assessment of one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupResult {
    pub symbol: String,
    pub score: u32,
    pub last: f64,
    pub reasons: Vec<String>,
    pub indicators: IndicatorSnapshot,
}

/// Everything a rule may look at.
struct RuleInput<'a> {
    bars: &'a [Bar],
    last: &'a Bar,
    ind: &'a IndicatorSnapshot,
}

struct Rule {
    weight: u32,
    reason: &'static str,
    /// `None` when an input is unavailable; the rule is then skipped.
    check: fn(&RuleInput) -> Option<bool>,
}

const RULES: [Rule; 7] = [
    Rule {
        weight: 20,
        reason: "Price above EMA50 (trend positive)",
        check: above_slow_ema,
    },
    Rule {
        weight: 15,
        reason: "EMA9 > EMA21 (short-term bullish)",
        check: fast_over_mid_ema,
    },
    Rule {
        weight: 15,
        reason: "RSI in bullish zone (50-70)",
        check: rsi_in_bull_zone,
    },
    Rule {
        weight: 8,
        reason: "Last close higher than previous close",
        check: up_tick,
    },
    Rule {
        weight: 20,
        reason: "Volume spike > 1.5x 20-bar average",
        check: volume_spike,
    },
    Rule {
        weight: 10,
        reason: "ATR% < 3% (controlled volatility)",
        check: controlled_volatility,
    },
    Rule {
        weight: 12,
        reason: "Breakout above last 20-bar high",
        check: breakout_above_resistance,
    },
];

fn above_slow_ema(x: &RuleInput) -> Option<bool> {
    Some(x.last.close > x.ind.ema50?)
}

fn fast_over_mid_ema(x: &RuleInput) -> Option<bool> {
    Some(x.ind.ema9? > x.ind.ema21?)
}

fn rsi_in_bull_zone(x: &RuleInput) -> Option<bool> {
    let rsi = x.ind.rsi14?;
    Some(rsi > RSI_BULL_LOW && rsi < RSI_BULL_HIGH)
}

fn up_tick(x: &RuleInput) -> Option<bool> {
    if x.bars.len() <= LOOKBACK {
        return Some(false);
    }
    let prev = &x.bars[x.bars.len() - 2];
    Some(x.last.close > prev.close)
}

/// Mean includes the last bar itself.
fn volume_spike(x: &RuleInput) -> Option<bool> {
    let window = &x.bars[x.bars.len().saturating_sub(LOOKBACK)..];
    if window.is_empty() {
        return None;
    }
    let mean = window.iter().map(|b| b.volume).sum::<f64>() / window.len() as f64;
    Some(x.last.volume > VOLUME_SPIKE_FACTOR * mean)
}

fn controlled_volatility(x: &RuleInput) -> Option<bool> {
    let atr = x.ind.atr14?;
    if x.last.close <= 0.0 {
        return None;
    }
    Some(atr / x.last.close < MAX_ATR_FRACTION)
}

fn breakout_above_resistance(x: &RuleInput) -> Option<bool> {
    let end = x.bars.len().checked_sub(1)?;
    let prior = &x.bars[end.saturating_sub(LOOKBACK)..end];
    let resistance = prior.iter().map(|b| b.high).reduce(f64::max)?;
    Some(x.last.close > resistance)
}

/// Score `bars` for `symbol`.
pub fn score_setup(symbol: &str, bars: &[Bar]) -> SetupResult {
    let Some(last) = bars.last().filter(|_| bars.len() >= MIN_HISTORY) else {
        return SetupResult {
            symbol: symbol.to_string(),
            score: 0,
            last: bars.last().map_or(0.0, |b| b.close),
            reasons: vec![INSUFFICIENT_HISTORY_REASON.to_string()],
            indicators: IndicatorSnapshot::default(),
        };
    };

    let ind = compute_indicators(bars);
    let input = RuleInput {
        bars,
        last,
        ind: &ind,
    };

    let mut raw = 0;
    let mut reasons = Vec::new();
    for rule in &RULES {
        if (rule.check)(&input) == Some(true) {
            raw += rule.weight;
            reasons.push(rule.reason.to_string());
        }
    }

    SetupResult {
        symbol: symbol.to_string(),
        score: cap_score(raw),
        last: last.close,
        reasons,
        indicators: ind,
    }
}

fn cap_score(raw: u32) -> u32 {
    raw.min(SCORE_CAP)
}
