// =============================================================================
// Scanner — score a batch of symbols and rank them
// =============================================================================
//
// Symbols are fetched through the shared `BarSource` with at most
// `concurrency` requests in flight (default 1: strictly one after another, to
// stay inside the provider's request budget). Results come back in input order
// and are then stable-sorted by score, so equal scores keep input order.
// =============================================================================

use std::sync::Arc;
use std::time::Instant;

use futures_util::stream::{self, StreamExt, TryStreamExt};
use tracing::info;

use crate::market_data::{BarSource, FetchError};
use crate::scoring::{score_setup, SetupResult};
use crate::types::Interval;

pub const DEFAULT_SCAN_CONCURRENCY: usize = 1;

pub struct Scanner {
    bars: Arc<BarSource>,
    concurrency: usize,
}

impl Scanner {
    /// `concurrency` is clamped to at least 1.
    pub fn new(bars: Arc<BarSource>, concurrency: usize) -> Self {
        Self {
            bars,
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Score every symbol and return the results ranked by score, highest
    /// first. `symbols` are expected to be normalised and distinct already.
    pub async fn scan(
        &self,
        symbols: &[String],
        interval: Interval,
    ) -> Result<Vec<SetupResult>, FetchError> {
        let started = Instant::now();

        // Per-symbol futures own their inputs; handlers need a lifetime-free future.
        let source = self.bars.clone();
        let mut results: Vec<SetupResult> = stream::iter(symbols.to_vec())
            .map(move |symbol| {
                let source = source.clone();
                async move {
                    let bars = source.fetch(&symbol, interval).await?;
                    Ok::<_, FetchError>(score_setup(&symbol, &bars))
                }
            })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        rank(&mut results);

        info!(
            symbols = results.len(),
            %interval,
            top_score = results.first().map(|r| r.score),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "scan complete"
        );
        Ok(results)
    }
}

/// Highest score first; ties keep their current relative order.
pub fn rank(results: &mut [SetupResult]) {
    results.sort_by(|a, b| b.score.cmp(&a.score));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::IndicatorSnapshot;
    use crate::market_data::{Bar, BarCache};
    use crate::provider::{BarProvider, ProviderError, ProviderReply};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn result(symbol: &str, score: u32) -> SetupResult {
        SetupResult {
            symbol: symbol.into(),
            score,
            last: 1.0,
            reasons: vec![],
            indicators: IndicatorSnapshot::default(),
        }
    }

    /// Flat series: scores exactly 10 (volatility rule only).
    fn flat(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| Bar::new(i as i64 * 60, 20.0, 20.0, 20.0, 20.0, 500.0))
            .collect()
    }

    /// Flat series with a final volume spike: scores 30.
    fn spiking(n: usize) -> Vec<Bar> {
        let mut bars = flat(n);
        bars[n - 1].volume = 5_000.0;
        bars
    }

    /// Per-symbol scripted bars; records call order and peak concurrency.
    #[derive(Default)]
    struct RecordingProvider {
        series: HashMap<String, Vec<Bar>>,
        order: Mutex<Vec<String>>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl BarProvider for RecordingProvider {
        async fn intraday(
            &self,
            symbol: &str,
            _interval: Interval,
        ) -> Result<ProviderReply, ProviderError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.order.lock().push(symbol.to_string());
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            Ok(match self.series.get(symbol) {
                Some(bars) => ProviderReply::Series(bars.clone()),
                None => ProviderReply::Advisory("unknown symbol".into()),
            })
        }
    }

    fn scanner_for(provider: Arc<RecordingProvider>, concurrency: usize) -> Scanner {
        let source = BarSource::new(
            Some(provider),
            BarCache::default(),
            StdRng::seed_from_u64(11),
            Duration::from_secs(5),
        );
        Scanner::new(Arc::new(source), concurrency)
    }

    fn symbols(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn rank_is_descending_and_stable() {
        let mut results = vec![
            result("A", 10),
            result("B", 50),
            result("C", 10),
            result("D", 50),
            result("E", 0),
        ];
        rank(&mut results);
        let order: Vec<&str> = results.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(order, vec!["B", "D", "A", "C", "E"]);
    }

    #[test]
    fn concurrency_is_at_least_one() {
        let source = Arc::new(BarSource::synthetic_only(StdRng::seed_from_u64(1)));
        assert_eq!(Scanner::new(source.clone(), 0).concurrency(), 1);
        assert_eq!(Scanner::new(source, 4).concurrency(), 4);
    }

    #[tokio::test]
    async fn sequential_scan_ranks_results() {
        let mut provider = RecordingProvider::default();
        provider.series.insert("AAA".into(), flat(60));
        provider.series.insert("BBB".into(), spiking(60));
        provider.series.insert("CCC".into(), flat(30));
        let provider = Arc::new(provider);

        let scanner = scanner_for(provider.clone(), DEFAULT_SCAN_CONCURRENCY);
        let results = scanner
            .scan(&symbols(&["AAA", "BBB", "CCC"]), Interval::FiveMin)
            .await
            .unwrap();

        let ranked: Vec<(&str, u32)> = results.iter().map(|r| (r.symbol.as_str(), r.score)).collect();
        assert_eq!(ranked, vec![("BBB", 30), ("AAA", 10), ("CCC", 0)]);
        assert_eq!(*provider.order.lock(), symbols(&["AAA", "BBB", "CCC"]));
        assert_eq!(provider.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn ties_keep_input_order() {
        let mut provider = RecordingProvider::default();
        for s in ["ZZZ", "MMM", "AAA"] {
            provider.series.insert(s.into(), flat(60));
        }
        let scanner = scanner_for(Arc::new(provider), 1);
        let results = scanner
            .scan(&symbols(&["ZZZ", "MMM", "AAA"]), Interval::OneMin)
            .await
            .unwrap();
        let order: Vec<&str> = results.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(order, vec!["ZZZ", "MMM", "AAA"]);
    }

    #[tokio::test]
    async fn parallel_scan_respects_cap_and_order() {
        let mut provider = RecordingProvider::default();
        let names: Vec<String> = (0..8).map(|i| format!("S{i}")).collect();
        for name in &names {
            provider.series.insert(name.clone(), flat(60));
        }
        let provider = Arc::new(provider);

        let scanner = scanner_for(provider.clone(), 3);
        let results = scanner.scan(&names, Interval::FiveMin).await.unwrap();

        assert_eq!(results.len(), names.len());
        let order: Vec<String> = results.iter().map(|r| r.symbol.clone()).collect();
        assert_eq!(order, names);
        let peak = provider.peak.load(Ordering::SeqCst);
        assert!(peak <= 3 && peak >= 2, "peak in-flight {peak}");
    }

    #[tokio::test]
    async fn scan_runs_on_a_spawned_task() {
        let mut provider = RecordingProvider::default();
        provider.series.insert("AAA".into(), spiking(60));
        provider.series.insert("BBB".into(), flat(60));
        let scanner = Arc::new(scanner_for(Arc::new(provider), 2));

        let handle = tokio::spawn({
            let scanner = scanner.clone();
            async move {
                let names = symbols(&["BBB", "AAA"]);
                scanner.scan(&names, Interval::FiveMin).await
            }
        });
        let results = handle.await.unwrap().unwrap();
        let ranked: Vec<(&str, u32)> = results.iter().map(|r| (r.symbol.as_str(), r.score)).collect();
        assert_eq!(ranked, vec![("AAA", 30), ("BBB", 10)]);
    }

    #[tokio::test]
    async fn provider_advisory_still_yields_a_result() {
        let scanner = scanner_for(Arc::new(RecordingProvider::default()), 1);
        let results = scanner
            .scan(&symbols(&["NOPE"]), Interval::FiveMin)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].symbol, "NOPE");
        assert!(results[0].score <= 100);
    }

    #[tokio::test]
    async fn invalid_bars_abort_the_scan() {
        let mut provider = RecordingProvider::default();
        let mut broken = flat(60);
        broken[59].high = 1.0;
        provider.series.insert("GOOD".into(), flat(60));
        provider.series.insert("BAD".into(), broken);

        let scanner = scanner_for(Arc::new(provider), 1);
        let err = scanner
            .scan(&symbols(&["GOOD", "BAD"]), Interval::FiveMin)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::InvalidBars { .. }));
    }
}
