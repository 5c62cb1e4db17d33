//! CoinGecko Price Feed
//!
//! Uses the public `simple/price` endpoint with 24h change included.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::Deserialize;

use super::PriceFeed;
use crate::error::{IntelError, Result};
use crate::model::{AssetPrice, PriceBoard};

/// CoinGecko feed configuration
#[derive(Clone, Debug)]
pub struct CoinGeckoConfig {
    /// Full URL of the simple-price endpoint
    pub url: String,

    /// Quote currency
    pub vs_currency: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for CoinGeckoConfig {
    fn default() -> Self {
        Self {
            url: "https://api.coingecko.com/api/v3/simple/price".into(),
            vs_currency: "usd".into(),
            timeout_secs: 5,
        }
    }
}

/// CoinGecko HTTP client
pub struct CoinGeckoFeed {
    client: reqwest::Client,
    config: CoinGeckoConfig,
}

#[derive(Deserialize)]
struct WirePrice {
    #[serde(default)]
    usd: Option<f64>,
    #[serde(default)]
    usd_24h_change: Option<f64>,
}

impl CoinGeckoFeed {
    pub fn new(config: CoinGeckoConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    /// Convert the wire map, dropping entries without a usable price
    fn convert(body: HashMap<String, WirePrice>) -> PriceBoard {
        body.into_iter()
            .filter_map(|(id, wire)| {
                let usd = wire.usd.and_then(Decimal::from_f64)?;
                let mut price = AssetPrice::new(usd);
                if let Some(change) = wire.usd_24h_change.and_then(Decimal::from_f64) {
                    price = price.with_change(change.round_dp(4));
                }
                Some((id, price))
            })
            .collect()
    }
}

#[async_trait]
impl PriceFeed for CoinGeckoFeed {
    async fn fetch(&self, assets: &[&str]) -> Result<PriceBoard> {
        let ids = assets.join(",");
        let response = self
            .client
            .get(&self.config.url)
            .query(&[
                ("ids", ids.as_str()),
                ("vs_currencies", self.config.vs_currency.as_str()),
                ("include_24hr_change", "true"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(IntelError::PriceFeed(format!("CoinGecko returned {status}")));
        }

        let body: HashMap<String, WirePrice> = response.json().await?;
        let board = Self::convert(body);
        tracing::debug!(assets = board.len(), "CoinGecko prices fetched");
        Ok(board)
    }

    fn name(&self) -> &str {
        "coingecko"
    }
}
