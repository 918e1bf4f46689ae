//! USD/CNY conversion with a short-lived rate cache.
//!
//! Rate lookup order: fresh cache entry, live fetch, stale cache entry for
//! the same direction, hardcoded default. A live fetch also fills the
//! reverse direction with the reciprocal, so swapping right after a lookup
//! never hits the network.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::api::RateSource;
use crate::error::{Result, RolysError};
use crate::host::Clock;

/// Fallback when USD->CNY has never been fetched and the network is down.
pub const DEFAULT_USD_TO_CNY: f64 = 7.2;
/// Fallback when CNY->USD has never been fetched and the network is down.
pub const DEFAULT_CNY_TO_USD: f64 = 0.14;

/// Default freshness window for cached rates.
pub const RATE_CACHE_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Cny,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Cny => "CNY",
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = RolysError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "CNY" | "RMB" => Ok(Currency::Cny),
            other => Err(RolysError::Parse(format!(
                "Unsupported currency '{}' (expected USD or CNY)",
                other
            ))),
        }
    }
}

/// Directional currency pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyPair {
    pub from: Currency,
    pub to: Currency,
}

impl Default for CurrencyPair {
    fn default() -> Self {
        Self {
            from: Currency::Usd,
            to: Currency::Cny,
        }
    }
}

impl CurrencyPair {
    pub fn new(from: Currency, to: Currency) -> Result<Self> {
        if from == to {
            return Err(RolysError::Parse(format!(
                "Cannot convert {} to itself",
                from
            )));
        }
        Ok(Self { from, to })
    }

    pub fn reversed(&self) -> Self {
        Self {
            from: self.to,
            to: self.from,
        }
    }

    /// Cache key such as `usdToCny`.
    pub fn key(&self) -> String {
        let to = self.to.code().to_ascii_lowercase();
        let mut chars = to.chars();
        let to = match chars.next() {
            Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
            None => String::new(),
        };
        format!("{}To{}", self.from.code().to_ascii_lowercase(), to)
    }

    /// Hardcoded rate used when nothing better is available.
    pub fn default_rate(&self) -> f64 {
        match (self.from, self.to) {
            (Currency::Usd, Currency::Cny) => DEFAULT_USD_TO_CNY,
            _ => DEFAULT_CNY_TO_USD,
        }
    }
}

impl std::fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}→{}", self.from, self.to)
    }
}

/// Rates keyed by direction with one shared fetch timestamp.
#[derive(Debug, Clone)]
pub struct RateCache {
    rates: HashMap<CurrencyPair, f64>,
    fetched_at: Option<u64>,
    ttl: Duration,
}

impl Default for RateCache {
    fn default() -> Self {
        Self::new(RATE_CACHE_TTL)
    }
}

impl RateCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            rates: HashMap::new(),
            fetched_at: None,
            ttl,
        }
    }

    fn is_fresh(&self, now_millis: u64) -> bool {
        match self.fetched_at {
            Some(at) => now_millis.saturating_sub(at) < self.ttl.as_millis() as u64,
            None => false,
        }
    }

    /// Rate for `pair` if it was stored within the freshness window.
    pub fn fresh(&self, pair: CurrencyPair, now_millis: u64) -> Option<f64> {
        if self.is_fresh(now_millis) {
            self.rates.get(&pair).copied()
        } else {
            None
        }
    }

    /// Rate for `pair` regardless of age.
    pub fn any(&self, pair: CurrencyPair) -> Option<f64> {
        self.rates.get(&pair).copied()
    }

    /// Record a live rate and its reciprocal for the reverse direction.
    pub fn store(&mut self, pair: CurrencyPair, rate: f64, now_millis: u64) {
        self.rates.insert(pair, rate);
        self.rates.insert(pair.reversed(), 1.0 / rate);
        self.fetched_at = Some(now_millis);
    }
}

/// Where a quoted rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteSource {
    Live,
    Fresh,
    Cached,
    Default,
}

impl QuoteSource {
    pub fn label(&self) -> &'static str {
        match self {
            QuoteSource::Live => "live",
            QuoteSource::Fresh => "live, cached",
            QuoteSource::Cached => "cached",
            QuoteSource::Default => "default",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub pair: CurrencyPair,
    pub rate: f64,
    pub source: QuoteSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversion {
    pub amount: f64,
    pub result: f64,
    /// `result` formatted with two decimals
    pub display: String,
    pub quote: Quote,
}

/// Parse a user-entered amount; `None` unless it is a positive number.
pub fn parse_amount(input: &str) -> Option<f64> {
    input
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite() && *amount > 0.0)
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Currency widget state: direction, input, output and rate cache.
pub struct CurrencyConverter {
    pair: CurrencyPair,
    input: String,
    output: Option<Conversion>,
    cache: RateCache,
    source: Arc<dyn RateSource>,
    clock: Arc<dyn Clock>,
}

impl CurrencyConverter {
    pub fn new(source: Arc<dyn RateSource>, clock: Arc<dyn Clock>) -> Self {
        Self::with_cache(source, clock, RateCache::default())
    }

    pub fn with_cache(source: Arc<dyn RateSource>, clock: Arc<dyn Clock>, cache: RateCache) -> Self {
        Self {
            pair: CurrencyPair::default(),
            input: String::new(),
            output: None,
            cache,
            source,
            clock,
        }
    }

    pub fn pair(&self) -> CurrencyPair {
        self.pair
    }

    pub fn set_pair(&mut self, pair: CurrencyPair) {
        self.pair = pair;
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn output(&self) -> Option<&Conversion> {
        self.output.as_ref()
    }

    /// Reverse the direction and clear both fields.
    pub fn swap(&mut self) {
        self.pair = self.pair.reversed();
        self.input.clear();
        self.output = None;
        tracing::debug!("Currency direction swapped to {}", self.pair);
    }

    /// Rate for the current direction. Never fails; degrades to cache or default.
    pub async fn quote(&mut self) -> Quote {
        let pair = self.pair;
        let now = self.clock.now_millis();

        if let Some(rate) = self.cache.fresh(pair, now) {
            return Quote {
                pair,
                rate,
                source: QuoteSource::Fresh,
            };
        }

        match self.source.fetch_rate(pair).await {
            Ok(rate) => {
                self.cache.store(pair, rate, self.clock.now_millis());
                Quote {
                    pair,
                    rate,
                    source: QuoteSource::Live,
                }
            }
            Err(e) => {
                tracing::warn!("Exchange rate fetch for {} failed: {}", pair.key(), e);
                match self.cache.any(pair) {
                    Some(rate) => Quote {
                        pair,
                        rate,
                        source: QuoteSource::Cached,
                    },
                    None => Quote {
                        pair,
                        rate: pair.default_rate(),
                        source: QuoteSource::Default,
                    },
                }
            }
        }
    }

    /// Convert `input` in the current direction and remember the result.
    ///
    /// A non-positive or unparsable amount clears the output and skips the
    /// rate lookup.
    pub async fn convert(&mut self, input: &str) -> Option<Conversion> {
        self.input = input.to_string();

        let Some(amount) = parse_amount(input) else {
            self.output = None;
            return None;
        };

        let quote = self.quote().await;
        let result = round_cents(amount * quote.rate);
        let conversion = Conversion {
            amount,
            result,
            display: format!("{:.2}", amount * quote.rate),
            quote,
        };

        self.output = Some(conversion.clone());
        Some(conversion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ManualClock;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct FakeRates {
        rate: f64,
        calls: AtomicUsize,
        offline: AtomicBool,
    }

    impl FakeRates {
        fn new(rate: f64) -> Arc<Self> {
            Arc::new(Self {
                rate,
                calls: AtomicUsize::new(0),
                offline: AtomicBool::new(false),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RateSource for FakeRates {
        async fn fetch_rate(&self, pair: CurrencyPair) -> Result<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.offline.load(Ordering::SeqCst) {
                return Err(RolysError::RemoteService("offline".to_string()));
            }
            Ok(match pair.from {
                Currency::Usd => self.rate,
                Currency::Cny => 1.0 / self.rate,
            })
        }
    }

    fn converter(rates: &Arc<FakeRates>, clock: &Arc<ManualClock>) -> CurrencyConverter {
        CurrencyConverter::new(rates.clone(), clock.clone())
    }

    #[test]
    fn pair_keys_and_defaults() {
        let pair = CurrencyPair::default();
        assert_eq!(pair.key(), "usdToCny");
        assert_eq!(pair.reversed().key(), "cnyToUsd");
        assert_eq!(pair.default_rate(), DEFAULT_USD_TO_CNY);
        assert_eq!(pair.reversed().default_rate(), DEFAULT_CNY_TO_USD);
        assert!(CurrencyPair::new(Currency::Usd, Currency::Usd).is_err());
    }

    #[test]
    fn currency_codes_parse_case_insensitively() {
        assert_eq!("usd".parse::<Currency>().unwrap(), Currency::Usd);
        assert_eq!(" CNY ".parse::<Currency>().unwrap(), Currency::Cny);
        assert!("eur".parse::<Currency>().is_err());
    }

    #[test]
    fn amounts_must_be_positive_numbers() {
        assert_eq!(parse_amount("10"), Some(10.0));
        assert_eq!(parse_amount(" 2.5 "), Some(2.5));
        assert_eq!(parse_amount("0"), None);
        assert_eq!(parse_amount("-3"), None);
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("NaN"), None);
    }

    #[test]
    fn cache_freshness_uses_shared_timestamp() {
        let mut cache = RateCache::new(Duration::from_secs(600));
        let pair = CurrencyPair::default();
        cache.store(pair, 7.2, 1_000);

        assert_eq!(cache.fresh(pair, 1_000 + 599_999), Some(7.2));
        assert_eq!(cache.fresh(pair, 1_000 + 600_000), None);
        assert_eq!(cache.any(pair), Some(7.2));
        assert_eq!(cache.any(pair.reversed()), Some(1.0 / 7.2));
    }

    #[tokio::test]
    async fn live_fetch_fills_reverse_direction() {
        let rates = FakeRates::new(7.2);
        let clock = Arc::new(ManualClock::new(0));
        let mut conv = converter(&rates, &clock);

        let first = conv.quote().await;
        assert_eq!(first.source, QuoteSource::Live);
        assert_eq!(first.rate, 7.2);

        clock.advance(Duration::from_secs(9 * 60));
        conv.swap();
        let reverse = conv.quote().await;

        assert_eq!(rates.calls(), 1);
        assert_eq!(reverse.source, QuoteSource::Fresh);
        assert_eq!(reverse.rate, 1.0 / 7.2);
    }

    #[tokio::test]
    async fn swap_then_reenter_amount_uses_reciprocal() {
        let rates = FakeRates::new(7.2);
        let clock = Arc::new(ManualClock::new(0));
        let mut conv = converter(&rates, &clock);

        assert_eq!(conv.convert("10").await.unwrap().display, "72.00");

        conv.swap();
        assert_eq!(conv.input(), "");
        assert!(conv.output().is_none());
        assert_eq!(conv.pair(), CurrencyPair::new(Currency::Cny, Currency::Usd).unwrap());

        let result = conv.convert("10").await.unwrap();
        assert_eq!(result.display, "1.39");
        assert_eq!(result.result, 1.39);
        assert_eq!(rates.calls(), 1);
    }

    #[tokio::test]
    async fn stale_cache_is_refreshed() {
        let rates = FakeRates::new(7.2);
        let clock = Arc::new(ManualClock::new(0));
        let mut conv = converter(&rates, &clock);

        conv.quote().await;
        clock.advance(Duration::from_secs(10 * 60));
        let quote = conv.quote().await;

        assert_eq!(quote.source, QuoteSource::Live);
        assert_eq!(rates.calls(), 2);
    }

    #[tokio::test]
    async fn network_failure_serves_stale_cache() {
        let rates = FakeRates::new(7.0);
        let clock = Arc::new(ManualClock::new(0));
        let mut conv = converter(&rates, &clock);

        conv.quote().await;
        clock.advance(Duration::from_secs(3600));
        rates.offline.store(true, Ordering::SeqCst);

        let quote = conv.quote().await;
        assert_eq!(quote.source, QuoteSource::Cached);
        assert_eq!(quote.rate, 7.0);
    }

    #[tokio::test]
    async fn network_failure_without_cache_serves_default() {
        let rates = FakeRates::new(7.0);
        rates.offline.store(true, Ordering::SeqCst);
        let clock = Arc::new(ManualClock::new(0));
        let mut conv = converter(&rates, &clock);

        let usd = conv.quote().await;
        assert_eq!(usd.source, QuoteSource::Default);
        assert_eq!(usd.rate, DEFAULT_USD_TO_CNY);

        conv.swap();
        let cny = conv.quote().await;
        assert_eq!(cny.rate, DEFAULT_CNY_TO_USD);
    }

    #[tokio::test]
    async fn invalid_amount_clears_output_without_fetching() {
        let rates = FakeRates::new(7.2);
        let clock = Arc::new(ManualClock::new(0));
        let mut conv = converter(&rates, &clock);

        conv.convert("5").await.unwrap();
        assert!(conv.output().is_some());

        assert!(conv.convert("-1").await.is_none());
        assert!(conv.output().is_none());
        assert_eq!(rates.calls(), 1);
    }
}
