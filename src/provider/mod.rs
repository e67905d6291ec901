// =============================================================================
// Bar Provider Module
// =============================================================================
//
// The capability the core depends on: given a symbol and interval, return raw
// intraday bars or signal that the provider declined. `BarSource` treats a
// decline and a transport failure the same way; a malformed payload is not
// recoverable.

pub mod alpha_vantage;

use async_trait::async_trait;

use crate::market_data::Bar;
use crate::types::Interval;

pub use alpha_vantage::AlphaVantageClient;

/// Outcome of one provider request.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderReply {
    /// Parsed series, sorted ascending by time.
    Series(Vec<Bar>),
    /// Explicit error message, rate-limit note or informational notice.
    Advisory(String),
    /// The response carried no series under the expected key.
    MissingSeries,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Network failure, non-2xx status or undecodable body.
    #[error("provider transport failure: {0:#}")]
    Transport(anyhow::Error),
    /// The payload had the expected shape but its content could not be read.
    #[error("malformed provider payload: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait BarProvider: Send + Sync {
    async fn intraday(&self, symbol: &str, interval: Interval)
        -> Result<ProviderReply, ProviderError>;
}
