// =============================================================================
// Scanner Configuration — JSON file with serde defaults and atomic save
// =============================================================================
//
// Every field carries `#[serde(default = "...")]` so a partial (or empty)
// config file still loads. A handful of settings can be overridden from the
// environment after loading; the provider API key only ever comes from the
// environment and is never written to disk.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash.
// =============================================================================

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::market_data::cache::DEFAULT_CACHE_TTL;
use crate::market_data::bar_source::DEFAULT_FETCH_TIMEOUT;
use crate::provider::alpha_vantage::DEFAULT_BASE_URL;
use crate::scanner::DEFAULT_SCAN_CONCURRENCY;
use crate::types::Interval;

pub const CONFIG_PATH: &str = "scanner_config.json";

/// Hard bounds on the scan batch size; `max_batch` is clamped into them.
pub const MAX_BATCH_RANGE: std::ops::RangeInclusive<usize> = 1..=25;

pub const ENV_API_KEY: &str = "ALPHAVANTAGE_API_KEY";
pub const ENV_BIND_ADDR: &str = "SCANNER_BIND_ADDR";
pub const ENV_DEFAULT_INTERVAL: &str = "SCANNER_DEFAULT_INTERVAL";
pub const ENV_SEED: &str = "SCANNER_SEED";

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_bind_addr() -> String {
    "0.0.0.0:3001".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL.as_secs()
}

fn default_fetch_timeout_secs() -> u64 {
    DEFAULT_FETCH_TIMEOUT.as_secs()
}

fn default_scan_concurrency() -> usize {
    DEFAULT_SCAN_CONCURRENCY
}

fn default_max_batch() -> usize {
    *MAX_BATCH_RANGE.end()
}

fn default_provider_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

// =============================================================================
// ScannerConfig
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Address the HTTP API listens on.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Interval used when a request does not name one.
    #[serde(default)]
    pub default_interval: Interval,

    /// How long a provider series stays fresh in the cache.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Upper bound on a single provider call before falling back.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Provider fetches in flight per scan. 1 keeps scans strictly sequential.
    #[serde(default = "default_scan_concurrency")]
    pub scan_concurrency: usize,

    /// Largest accepted scan batch, within [`MAX_BATCH_RANGE`].
    #[serde(default = "default_max_batch")]
    pub max_batch: usize,

    #[serde(default = "default_provider_base_url")]
    pub provider_base_url: String,

    /// Fixed seed for the synthetic generator; entropy-seeded when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthetic_seed: Option<u64>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            default_interval: Interval::default(),
            cache_ttl_secs: default_cache_ttl_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            scan_concurrency: default_scan_concurrency(),
            max_batch: default_max_batch(),
            provider_base_url: default_provider_base_url(),
            synthetic_seed: None,
        }
    }
}

impl ScannerConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scanner config from {}", path.display()))?;

        let mut config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse scanner config from {}", path.display()))?;
        config.clamp_limits();

        info!(
            path = %path.display(),
            bind_addr = %config.bind_addr,
            default_interval = %config.default_interval,
            scan_concurrency = config.scan_concurrency,
            "scanner config loaded"
        );

        Ok(config)
    }

    /// Persist the configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise scanner config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "scanner config saved (atomic)");
        Ok(())
    }

    /// Pull out-of-range limits back into bounds.
    pub fn clamp_limits(&mut self) {
        let clamped = self
            .max_batch
            .clamp(*MAX_BATCH_RANGE.start(), *MAX_BATCH_RANGE.end());
        if clamped != self.max_batch {
            warn!(configured = self.max_batch, using = clamped, "max_batch out of range");
            self.max_batch = clamped;
        }
        self.scan_concurrency = self.scan_concurrency.max(1);
    }

    /// Apply `SCANNER_*` overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Overrides from an arbitrary lookup. Unparseable values are ignored
    /// with a warning.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup(ENV_BIND_ADDR).filter(|s| !s.trim().is_empty()) {
            self.bind_addr = addr.trim().to_string();
        }

        if let Some(raw) = lookup(ENV_DEFAULT_INTERVAL) {
            match raw.trim().parse::<Interval>() {
                Ok(interval) => self.default_interval = interval,
                Err(e) => warn!(error = %e, "ignoring {ENV_DEFAULT_INTERVAL}"),
            }
        }

        if let Some(raw) = lookup(ENV_SEED) {
            match raw.trim().parse::<u64>() {
                Ok(seed) => self.synthetic_seed = Some(seed),
                Err(e) => warn!(value = %raw, error = %e, "ignoring {ENV_SEED}"),
            }
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

/// Provider credential from the environment. Absent or blank means no
/// provider is configured.
pub fn api_key_from_env() -> Option<String> {
    std::env::var(ENV_API_KEY)
        .ok()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}
