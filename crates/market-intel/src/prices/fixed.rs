//! Static Price Feed
//!
//! Offline feed with realistic fixed prices, for demos and tests.

use async_trait::async_trait;
use rust_decimal_macros::dec;

use super::PriceFeed;
use crate::error::Result;
use crate::model::{AssetPrice, PriceBoard};

/// Price feed backed by a fixed table
#[derive(Clone, Debug, Default)]
pub struct StaticPriceFeed;

impl StaticPriceFeed {
    pub const fn new() -> Self {
        Self
    }

    fn lookup(asset: &str) -> Option<AssetPrice> {
        // (price, 24h_change)
        let (usd, change) = match asset.to_lowercase().as_str() {
            "bitcoin" => (dec!(97500), dec!(2.5)),
            "ethereum" => (dec!(3450), dec!(1.8)),
            "solana" => (dec!(195), dec!(4.2)),
            "sui" => (dec!(4.15), dec!(3.4)),
            "cardano" => (dec!(0.95), dec!(-1.2)),
            "polkadot" => (dec!(7.20), dec!(0.8)),
            "chainlink" => (dec!(24.50), dec!(3.1)),
            "avalanche-2" => (dec!(42.00), dec!(5.5)),
            "ripple" => (dec!(2.35), dec!(0.9)),
            "dogecoin" => (dec!(0.38), dec!(12.0)),
            "usd-coin" => (dec!(1.00), dec!(0.0)),
            _ => return None,
        };
        Some(AssetPrice::new(usd).with_change(change))
    }
}

#[async_trait]
impl PriceFeed for StaticPriceFeed {
    async fn fetch(&self, assets: &[&str]) -> Result<PriceBoard> {
        Ok(assets
            .iter()
            .filter_map(|a| Self::lookup(a).map(|p| ((*a).to_string(), p)))
            .collect())
    }

    fn name(&self) -> &str {
        "static"
    }
}
