// =============================================================================
// Central Application State — Setup Scanner
// =============================================================================
//
// Built once at startup and shared with every request handler through
// `Arc<AppState>`. The bar cache lives inside the `BarSource`, so all requests
// see the same cache; nothing else here is mutable.
// =============================================================================

use std::sync::Arc;
use std::time::Instant;

use crate::market_data::{BarCache, BarSource};
use crate::provider::BarProvider;
use crate::runtime_config::ScannerConfig;
use crate::scanner::Scanner;
use crate::types::DataSource;

pub struct AppState {
    pub config: ScannerConfig,
    pub bar_source: Arc<BarSource>,
    pub scanner: Scanner,
    pub started_at: Instant,
}

impl AppState {
    /// Wire the bar source and scanner from `config`. Without a provider every
    /// fetch is served from the synthetic generator.
    pub fn new(mut config: ScannerConfig, provider: Option<Arc<dyn BarProvider>>) -> Self {
        config.clamp_limits();
        let bar_source = Arc::new(BarSource::new(
            provider,
            BarCache::new(config.cache_ttl()),
            BarSource::rng_from_seed(config.synthetic_seed),
            config.fetch_timeout(),
        ));
        let scanner = Scanner::new(bar_source.clone(), config.scan_concurrency);

        Self {
            config,
            bar_source,
            scanner,
            started_at: Instant::now(),
        }
    }

    pub fn source(&self) -> DataSource {
        self.bar_source.source()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
