//! Market Data Models

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Spot price of one asset in the quote currency
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetPrice {
    /// Price in USD
    pub usd: Decimal,

    /// 24h change (percentage), when the feed reports it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usd_24h_change: Option<Decimal>,
}

impl AssetPrice {
    pub const fn new(usd: Decimal) -> Self {
        Self {
            usd,
            usd_24h_change: None,
        }
    }

    pub const fn with_change(mut self, change: Decimal) -> Self {
        self.usd_24h_change = Some(change);
        self
    }
}

/// Prices keyed by feed asset id (`bitcoin`, `sui`, ...)
///
/// Ordered so the rendered context block is stable between turns.
pub type PriceBoard = BTreeMap<String, AssetPrice>;
