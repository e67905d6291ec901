// =============================================================================
// BarSource — cached provider access with synthetic fallback
// =============================================================================
//
//   no provider configured      -> synthetic series
//   fresh cache entry           -> cached series, unchanged
//   provider decline / failure  -> synthetic series (logged, not cached)
//   timeout                     -> synthetic series (logged, not cached)
//   malformed payload           -> FetchError
//   trailing sample invalid     -> FetchError
//   otherwise                   -> cache and return provider series
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, warn};

use super::bar::{validate_trailing, Bar, BarValidationError};
use super::cache::{BarCache, CacheKey};
use super::synthetic;
use crate::provider::{BarProvider, ProviderError, ProviderReply};
use crate::types::{DataSource, Interval};

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Defects surfaced by [`BarSource::fetch`]. Provider declines never show up
/// here.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid bars for {key}: {source}")]
    InvalidBars {
        key: String,
        #[source]
        source: BarValidationError,
    },

    #[error("malformed provider payload for {key}: {detail}")]
    Malformed { key: String, detail: String },
}

pub struct BarSource {
    provider: Option<Arc<dyn BarProvider>>,
    cache: BarCache,
    rng: Mutex<StdRng>,
    fetch_timeout: Duration,
}

impl BarSource {
    pub fn new(
        provider: Option<Arc<dyn BarProvider>>,
        cache: BarCache,
        rng: StdRng,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            cache,
            rng: Mutex::new(rng),
            fetch_timeout,
        }
    }

    /// A source with no provider; every fetch is synthetic.
    #[cfg(test)]
    pub fn synthetic_only(rng: StdRng) -> Self {
        Self::new(None, BarCache::default(), rng, DEFAULT_FETCH_TIMEOUT)
    }

    /// Build the synthetic RNG from an optional fixed seed.
    pub fn rng_from_seed(seed: Option<u64>) -> StdRng {
        match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    pub fn source(&self) -> DataSource {
        if self.provider.is_some() {
            DataSource::Provider
        } else {
            DataSource::Synthetic
        }
    }

    #[cfg(test)]
    pub fn cache(&self) -> &BarCache {
        &self.cache
    }

    /// Fresh synthetic series ending now.
    pub fn synthetic(&self) -> Vec<Bar> {
        let now = Utc::now().timestamp();
        let mut rng = self.rng.lock();
        synthetic::generate(&mut *rng, now)
    }

    /// Ordered bars for `(symbol, interval)`, oldest first.
    pub async fn fetch(&self, symbol: &str, interval: Interval) -> Result<Vec<Bar>, FetchError> {
        let Some(provider) = &self.provider else {
            return Ok(self.synthetic());
        };

        let key = CacheKey::new(symbol, interval);
        if let Some(bars) = self.cache.get_fresh(&key) {
            debug!(key = %key, count = bars.len(), "bar cache hit");
            return Ok(bars);
        }

        let request = provider.intraday(symbol, interval);
        let reply = match tokio::time::timeout(self.fetch_timeout, request).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(ProviderError::Transport(e))) => {
                let error = format!("{e:#}");
                warn!(key = %key, error = %error, "provider request failed — using synthetic bars");
                return Ok(self.synthetic());
            }
            Ok(Err(ProviderError::Malformed(detail))) => {
                return Err(FetchError::Malformed {
                    key: key.to_string(),
                    detail,
                });
            }
            Err(_) => {
                warn!(
                    key = %key,
                    timeout_ms = self.fetch_timeout.as_millis() as u64,
                    "provider request timed out — using synthetic bars"
                );
                return Ok(self.synthetic());
            }
        };

        let bars = match reply {
            ProviderReply::Series(bars) => bars,
            ProviderReply::Advisory(message) => {
                warn!(key = %key, message = %message, "provider advisory — using synthetic bars");
                return Ok(self.synthetic());
            }
            ProviderReply::MissingSeries => {
                warn!(key = %key, "provider response has no series — using synthetic bars");
                return Ok(self.synthetic());
            }
        };

        validate_trailing(&bars).map_err(|source| FetchError::InvalidBars {
            key: key.to_string(),
            source,
        })?;

        debug!(key = %key, count = bars.len(), "caching provider bars");
        self.cache.insert(key, bars.clone());
        Ok(bars)
    }
}

impl std::fmt::Debug for BarSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BarSource")
            .field("source", &self.source())
            .field("cache", &self.cache)
            .field("fetch_timeout", &self.fetch_timeout)
            .finish()
    }
}
