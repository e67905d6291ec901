// =============================================================================
// Alpha Vantage REST Client — TIME_SERIES_INTRADAY
// =============================================================================
//
// SECURITY: The API key is sent as a query parameter (the only mechanism the
// provider supports) and is never logged or serialized.
//
// Response shape:
//   {
//     "Meta Data": { ..., "6. Time Zone": "US/Eastern" },
//     "Time Series (5min)": {
//       "2024-01-05 19:55:00": { "1. open": "161.1", ..., "5. volume": "120" },
//       ...
//     }
//   }
//
// Declines arrive as a 200 with "Error Message", "Note" (rate limit) or
// "Information" instead of the series.
// =============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::{BarProvider, ProviderError, ProviderReply};
use crate::market_data::bar::TRAILING_SAMPLE;
use crate::market_data::Bar;
use crate::types::Interval;

pub const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/query";

const ADVISORY_KEYS: [&str; 3] = ["Error Message", "Note", "Information"];
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DEFAULT_TZ: Tz = chrono_tz::US::Eastern;

/// Alpha Vantage intraday client.
#[derive(Clone)]
pub struct AlphaVantageClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl AlphaVantageClient {
    /// Create a client for `base_url` authenticating with `api_key`.
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build reqwest client")?;

        let base_url = base_url.into();
        debug!(base_url = %base_url, "AlphaVantageClient initialised");

        Ok(Self {
            api_key: api_key.into(),
            base_url,
            client,
        })
    }

    async fn get_intraday_body(&self, symbol: &str, interval: Interval) -> Result<Value> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("function", "TIME_SERIES_INTRADAY"),
                ("symbol", symbol),
                ("interval", interval.as_str()),
                ("outputsize", "compact"),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await
            .context("TIME_SERIES_INTRADAY request failed")?;

        let status = resp.status();
        let body: Value = resp
            .json()
            .await
            .context("failed to parse intraday response")?;

        if !status.is_success() {
            anyhow::bail!("Alpha Vantage intraday returned {status}");
        }
        Ok(body)
    }
}

#[async_trait]
impl BarProvider for AlphaVantageClient {
    /// GET ?function=TIME_SERIES_INTRADAY (compact output size).
    #[instrument(skip(self), name = "alpha_vantage::intraday")]
    async fn intraday(
        &self,
        symbol: &str,
        interval: Interval,
    ) -> Result<ProviderReply, ProviderError> {
        let body = self
            .get_intraday_body(symbol, interval)
            .await
            .map_err(ProviderError::Transport)?;

        let reply = parse_intraday(&body, interval)?;
        if let ProviderReply::Series(bars) = &reply {
            debug!(symbol, %interval, count = bars.len(), "intraday bars fetched");
        }
        Ok(reply)
    }
}

impl std::fmt::Debug for AlphaVantageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlphaVantageClient")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Response parsing
// -----------------------------------------------------------------------------

/// Turn an intraday response body into a [`ProviderReply`].
///
/// Numeric fields that fail to parse become NaN so that trailing-sample
/// validation reports them. An unparseable timestamp among the most recent
/// [`TRAILING_SAMPLE`] keys is [`ProviderError::Malformed`]; older ones are
/// dropped with a warning.
pub fn parse_intraday(body: &Value, interval: Interval) -> Result<ProviderReply, ProviderError> {
    for key in ADVISORY_KEYS {
        if let Some(msg) = body.get(key) {
            let text = msg.as_str().map(str::to_owned).unwrap_or_else(|| msg.to_string());
            return Ok(ProviderReply::Advisory(text));
        }
    }

    let series_key = format!("Time Series ({interval})");
    let Some(series) = body.get(&series_key).and_then(Value::as_object) else {
        return Ok(ProviderReply::MissingSeries);
    };

    let tz = body
        .get("Meta Data")
        .and_then(|m| m.get("6. Time Zone"))
        .and_then(Value::as_str)
        .and_then(|name| name.parse::<Tz>().ok())
        .unwrap_or(DEFAULT_TZ);

    // Fixed-width stamps sort lexically in time order.
    let mut stamps: Vec<&String> = series.keys().collect();
    stamps.sort_unstable();
    let trailing_from = stamps.len().saturating_sub(TRAILING_SAMPLE);

    let mut bars = Vec::with_capacity(stamps.len());
    for (pos, stamp) in stamps.into_iter().enumerate() {
        let time = match parse_timestamp(stamp, tz) {
            Ok(time) => time,
            Err(e) if pos >= trailing_from => {
                return Err(ProviderError::Malformed(format!("{e:#}")));
            }
            Err(e) => {
                let error = format!("{e:#}");
                warn!(error = %error, "skipping intraday entry");
                continue;
            }
        };
        let fields = &series[stamp.as_str()];
        bars.push(Bar::new(
            time,
            coerce_f64(fields.get("1. open")),
            coerce_f64(fields.get("2. high")),
            coerce_f64(fields.get("3. low")),
            coerce_f64(fields.get("4. close")),
            coerce_f64(fields.get("5. volume")),
        ));
    }
    bars.sort_by_key(|b| b.time);

    Ok(ProviderReply::Series(bars))
}

/// Local exchange time `YYYY-MM-DD HH:MM:SS` in `tz` to UNIX seconds.
fn parse_timestamp(stamp: &str, tz: Tz) -> Result<i64> {
    let naive = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT)
        .with_context(|| format!("invalid bar timestamp '{stamp}'"))?;
    let local = tz
        .from_local_datetime(&naive)
        .earliest()
        .with_context(|| format!("bar timestamp '{stamp}' does not exist in {tz}"))?;
    Ok(local.timestamp())
}

/// Accept either a numeric string or a JSON number; anything else is NaN.
fn coerce_f64(val: Option<&Value>) -> f64 {
    match val {
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(o: &str, h: &str, l: &str, c: &str, v: &str) -> Value {
        json!({ "1. open": o, "2. high": h, "3. low": l, "4. close": c, "5. volume": v })
    }

    #[test]
    fn error_message_is_advisory() {
        let body = json!({ "Error Message": "Invalid API call." });
        assert_eq!(
            parse_intraday(&body, Interval::FiveMin).unwrap(),
            ProviderReply::Advisory("Invalid API call.".into())
        );
    }

    #[test]
    fn rate_limit_note_is_advisory() {
        let body = json!({ "Note": "Thank you for using Alpha Vantage! ..." });
        assert!(matches!(
            parse_intraday(&body, Interval::FiveMin).unwrap(),
            ProviderReply::Advisory(_)
        ));
        let body = json!({ "Information": "premium endpoint" });
        assert!(matches!(
            parse_intraday(&body, Interval::FiveMin).unwrap(),
            ProviderReply::Advisory(_)
        ));
    }

    #[test]
    fn series_for_other_interval_is_missing() {
        let body = json!({
            "Meta Data": {},
            "Time Series (1min)": { "2024-01-05 19:55:00": entry("1", "1", "1", "1", "1") }
        });
        assert_eq!(
            parse_intraday(&body, Interval::FiveMin).unwrap(),
            ProviderReply::MissingSeries
        );
    }

    #[test]
    fn entries_are_sorted_and_coerced() {
        let body = json!({
            "Meta Data": { "6. Time Zone": "UTC" },
            "Time Series (5min)": {
                "2024-01-05 10:05:00": entry("2.0", "2.5", "1.5", "2.2", "300"),
                "2024-01-05 10:00:00": entry("1.0", "1.5", "0.5", "1.2", "200"),
            }
        });
        let ProviderReply::Series(bars) = parse_intraday(&body, Interval::FiveMin).unwrap() else {
            panic!("expected a series");
        };
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].time, 1_704_448_800);
        assert_eq!(bars[1].time - bars[0].time, 300);
        assert_eq!(bars[0].close, 1.2);
        assert_eq!(bars[1].volume, 300.0);
    }

    #[test]
    fn eastern_time_is_default_zone() {
        let body = json!({
            "Time Series (5min)": {
                "2024-01-05 10:00:00": entry("1", "1", "1", "1", "1"),
            }
        });
        let ProviderReply::Series(bars) = parse_intraday(&body, Interval::FiveMin).unwrap() else {
            panic!("expected a series");
        };
        // 10:00 EST == 15:00 UTC
        assert_eq!(bars[0].time, 1_704_448_800 + 5 * 3600);
    }

    #[test]
    fn non_numeric_field_becomes_nan() {
        let body = json!({
            "Time Series (5min)": {
                "2024-01-05 10:00:00": entry("abc", "1", "1", "1", "1"),
            }
        });
        let ProviderReply::Series(bars) = parse_intraday(&body, Interval::FiveMin).unwrap() else {
            panic!("expected a series");
        };
        assert!(bars[0].open.is_nan());
        assert!(bars[0].validate().is_err());
    }

    #[test]
    fn bad_old_timestamp_is_skipped() {
        let mut series = serde_json::Map::new();
        series.insert("2024-01-04 25:00:00".into(), entry("1", "1", "1", "1", "1"));
        for minute in 0..6 {
            let stamp = format!("2024-01-05 10:{minute:02}:00");
            series.insert(stamp, entry("2", "2", "2", "2", "2"));
        }
        let body = json!({
            "Meta Data": { "6. Time Zone": "UTC" },
            "Time Series (5min)": series,
        });
        let Ok(ProviderReply::Series(bars)) = parse_intraday(&body, Interval::FiveMin) else {
            panic!("expected a series");
        };
        assert_eq!(bars.len(), 6);
        assert_eq!(bars[0].time, 1_704_448_800);
    }

    #[test]
    fn bad_recent_timestamp_is_an_error() {
        let mut series = serde_json::Map::new();
        for minute in 0..6 {
            let stamp = format!("2024-01-05 10:{minute:02}:00");
            series.insert(stamp, entry("2", "2", "2", "2", "2"));
        }
        series.insert("2024-01-05 10:07:99".into(), entry("1", "1", "1", "1", "1"));
        let body = json!({ "Time Series (5min)": series });
        assert!(matches!(
            parse_intraday(&body, Interval::FiveMin),
            Err(ProviderError::Malformed(_))
        ));
    }

    #[test]
    fn bad_timestamp_is_an_error() {
        let body = json!({
            "Time Series (5min)": { "yesterday": entry("1", "1", "1", "1", "1") }
        });
        assert!(matches!(
            parse_intraday(&body, Interval::FiveMin),
            Err(ProviderError::Malformed(_))
        ));
    }

    #[test]
    fn debug_redacts_api_key() {
        let client = AlphaVantageClient::new("super-secret", DEFAULT_BASE_URL).unwrap();
        let dbg = format!("{client:?}");
        assert!(!dbg.contains("super-secret"));
        assert!(dbg.contains("<redacted>"));
    }
}
