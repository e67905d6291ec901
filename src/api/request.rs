// =============================================================================
// Request validation — symbol lists and intervals arriving over HTTP
// =============================================================================
//
// Everything the core receives has been normalised here: symbols trimmed,
// uppercased and de-duplicated (first occurrence wins), intervals parsed into
// `Interval`. A bad request is rejected as a whole.
// =============================================================================

use serde::Deserialize;

use crate::types::{Interval, UnsupportedInterval};

pub const MAX_SYMBOL_LEN: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("symbols must contain between 1 and {max} entries (got {got})")]
    BatchSize { got: usize, max: usize },

    #[error("symbol at position {index} is empty")]
    EmptySymbol { index: usize },

    #[error("malformed symbol '{0}'")]
    MalformedSymbol(String),

    #[error(transparent)]
    Interval(#[from] UnsupportedInterval),
}

/// Body of `POST /api/v1/scan`.
#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    pub symbols: Vec<String>,
    #[serde(default)]
    pub interval: Option<String>,
}

/// A scan request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidScan {
    pub symbols: Vec<String>,
    pub interval: Interval,
}

impl ScanRequest {
    pub fn validate(self, max_batch: usize, default_interval: Interval) -> Result<ValidScan, RequestError> {
        if self.symbols.is_empty() || self.symbols.len() > max_batch {
            return Err(RequestError::BatchSize {
                got: self.symbols.len(),
                max: max_batch,
            });
        }

        let mut symbols: Vec<String> = Vec::with_capacity(self.symbols.len());
        for (index, raw) in self.symbols.iter().enumerate() {
            let symbol = normalize_symbol(raw).map_err(|e| match e {
                RequestError::EmptySymbol { .. } => RequestError::EmptySymbol { index },
                other => other,
            })?;
            if !symbols.contains(&symbol) {
                symbols.push(symbol);
            }
        }

        Ok(ValidScan {
            symbols,
            interval: parse_interval(self.interval.as_deref(), default_interval)?,
        })
    }
}

/// Trim and uppercase a ticker. Accepts ASCII letters, digits, `.` and `-`
/// (e.g. `BRK.B`, `TSCO.LON`).
pub fn normalize_symbol(raw: &str) -> Result<String, RequestError> {
    let symbol = raw.trim().to_ascii_uppercase();
    if symbol.is_empty() {
        return Err(RequestError::EmptySymbol { index: 0 });
    }
    let well_formed = symbol.len() <= MAX_SYMBOL_LEN
        && symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    if !well_formed {
        return Err(RequestError::MalformedSymbol(raw.trim().to_string()));
    }
    Ok(symbol)
}

/// Parse an optional interval, falling back to `default` when absent.
pub fn parse_interval(raw: Option<&str>, default: Interval) -> Result<Interval, RequestError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(default),
        Some(s) => Ok(s.parse()?),
    }
}
