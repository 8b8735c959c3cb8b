//! Market price collaborators for the revenue agent.

use async_trait::async_trait;
use luxrig_common::{LuxError, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const COINGECKO_URL: &str = "https://api.coingecko.com/api/v3";

/// Spot price of one asset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub usd: f64,
    #[serde(default)]
    pub usd_24h_change: f64,
}

/// Quotes keyed by asset id (`bitcoin`, `monero`, ...).
pub type PriceMap = BTreeMap<String, Quote>;

/// Polled source of market prices.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    async fn get_prices(&self, ids: &[&str]) -> Result<PriceMap>;

    async fn get_price(&self, id: &str) -> Result<Quote> {
        self.get_prices(&[id])
            .await?
            .remove(id)
            .ok_or_else(|| LuxError::Price(format!("no quote for {id}")))
    }
}

#[async_trait]
impl<T: PriceFeed + ?Sized> PriceFeed for Arc<T> {
    async fn get_prices(&self, ids: &[&str]) -> Result<PriceMap> {
        (**self).get_prices(ids).await
    }
}

/// Price configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceConfig {
    #[serde(default = "default_price_url")]
    pub api_url: String,
    #[serde(default = "default_price_timeout")]
    pub timeout_ms: u64,
    /// Use fixed reference quotes instead of the network.
    #[serde(default)]
    pub offline: bool,
    /// Answer with reference quotes when the live feed fails.
    #[serde(default = "default_fallback")]
    pub fallback: bool,
}

fn default_fallback() -> bool {
    true
}

fn default_price_url() -> String {
    COINGECKO_URL.to_string()
}

fn default_price_timeout() -> u64 {
    10_000
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            api_url: default_price_url(),
            timeout_ms: default_price_timeout(),
            offline: false,
            fallback: default_fallback(),
        }
    }
}

/// Build the feed described by `config`.
pub fn build_price_feed(config: &PriceConfig) -> Result<Arc<dyn PriceFeed>> {
    if config.offline {
        return Ok(Arc::new(StaticPriceFeed::reference()));
    }
    let feed = CoinGeckoFeed::new(Some(config.api_url.clone()))
        .with_timeout(Duration::from_millis(config.timeout_ms))?;
    if config.fallback {
        return Ok(Arc::new(FallbackPriceFeed::new(
            Arc::new(feed),
            Arc::new(StaticPriceFeed::reference()),
        )));
    }
    Ok(Arc::new(feed))
}

/// Live feed backed by a second source.
///
/// When the primary fails every quote comes from the fallback. When it
/// answers without some of the requested assets only those are filled in.
pub struct FallbackPriceFeed {
    primary: Arc<dyn PriceFeed>,
    fallback: Arc<dyn PriceFeed>,
}

impl FallbackPriceFeed {
    pub fn new(primary: Arc<dyn PriceFeed>, fallback: Arc<dyn PriceFeed>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl PriceFeed for FallbackPriceFeed {
    async fn get_prices(&self, ids: &[&str]) -> Result<PriceMap> {
        let mut prices = match self.primary.get_prices(ids).await {
            Ok(prices) => prices,
            Err(e) => {
                warn!(error = %e, "Live prices unavailable, using fallback quotes");
                return self.fallback.get_prices(ids).await;
            }
        };

        let missing: Vec<&str> = ids
            .iter()
            .copied()
            .filter(|id| !prices.contains_key(*id))
            .collect();
        if !missing.is_empty() {
            warn!(missing = ?missing, "Live prices incomplete, filling from fallback quotes");
            prices.extend(self.fallback.get_prices(&missing).await?);
        }
        Ok(prices)
    }
}

/// CoinGecko `/simple/price` client.
pub struct CoinGeckoFeed {
    base_url: String,
    http_client: reqwest::Client,
}

impl CoinGeckoFeed {
    pub fn new(base_url: Option<String>) -> Self {
        Self {
            base_url: base_url
                .unwrap_or_else(|| COINGECKO_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            http_client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LuxError::Price(format!("failed to build HTTP client: {e}")))?;
        Ok(self)
    }

    fn price_url(&self, ids: &[&str]) -> String {
        format!(
            "{}/simple/price?ids={}&vs_currencies=usd&include_24hr_change=true",
            self.base_url,
            ids.join(",")
        )
    }
}

#[async_trait]
impl PriceFeed for CoinGeckoFeed {
    async fn get_prices(&self, ids: &[&str]) -> Result<PriceMap> {
        let url = self.price_url(ids);
        debug!(url = %url, "Fetching prices");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| LuxError::Price(format!("CoinGecko request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LuxError::Price(format!("CoinGecko API error {status}")));
        }

        response
            .json::<PriceMap>()
            .await
            .map_err(|e| LuxError::Price(format!("Failed to parse CoinGecko response: {e}")))
    }
}

/// Fixed quotes, for offline runs and tests.
#[derive(Debug, Default)]
pub struct StaticPriceFeed {
    quotes: RwLock<PriceMap>,
}

impl StaticPriceFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Representative quotes for the assets the revenue agent tracks.
    pub fn reference() -> Self {
        Self::new()
            .with_quote("bitcoin", 95_000.0, 1.2)
            .with_quote("ethereum", 3_500.0, -0.8)
            .with_quote("solana", 150.0, 2.5)
            .with_quote("monero", 160.0, 0.4)
            .with_quote("ravencoin", 0.02, -1.1)
    }

    pub fn with_quote(self, id: &str, usd: f64, usd_24h_change: f64) -> Self {
        self.set_quote(id, usd, usd_24h_change);
        self
    }

    pub fn set_quote(&self, id: &str, usd: f64, usd_24h_change: f64) {
        self.quotes.write().insert(
            id.to_string(),
            Quote {
                usd,
                usd_24h_change,
            },
        );
    }
}

#[async_trait]
impl PriceFeed for StaticPriceFeed {
    async fn get_prices(&self, ids: &[&str]) -> Result<PriceMap> {
        let quotes = self.quotes.read();
        ids.iter()
            .map(|id| {
                quotes
                    .get(*id)
                    .map(|q| (id.to_string(), *q))
                    .ok_or_else(|| LuxError::Price(format!("no quote for {id}")))
            })
            .collect()
    }
}
