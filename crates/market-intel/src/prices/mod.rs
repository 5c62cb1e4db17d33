//! Price Feeds
//!
//! A [`PriceFeed`] turns a list of asset ids into a [`PriceBoard`]. The chat
//! pipeline only asks for prices when the query looks market related, and a
//! failing feed degrades to an empty board.

mod coingecko;
mod fixed;

pub use coingecko::{CoinGeckoConfig, CoinGeckoFeed};
pub use fixed::StaticPriceFeed;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::PriceBoard;

/// Assets priced for every market-related turn
pub const DEFAULT_ASSETS: [&str; 4] = ["bitcoin", "ethereum", "sui", "solana"];

/// Substrings that mark a query as market related
pub const MARKET_KEYWORDS: [&str; 12] = [
    "price", "market", "trading", "bitcoin", "btc", "ethereum", "eth", "sui", "solana", "sol",
    "crypto", "trend",
];

/// Price feed trait (Strategy pattern)
///
/// Implement this for each data source: CoinGecko, an exchange, a fixture.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Fetch USD prices for the given asset ids. Unknown ids are omitted.
    async fn fetch(&self, assets: &[&str]) -> Result<PriceBoard>;

    /// Feed name
    fn name(&self) -> &str;
}

/// True when the query mentions any market keyword (case-insensitive substring)
pub fn is_market_query(query: &str) -> bool {
    let query = query.to_lowercase();
    MARKET_KEYWORDS.iter().any(|k| query.contains(k))
}

/// Fetch the default assets, absorbing any failure into an empty board
pub async fn fetch_or_empty(feed: &dyn PriceFeed) -> PriceBoard {
    match feed.fetch(&DEFAULT_ASSETS).await {
        Ok(board) => board,
        Err(e) => {
            tracing::warn!(feed = feed.name(), error = %e, "Price fetch failed");
            PriceBoard::new()
        }
    }
}

/// Render the market-data block appended to the human turn.
///
/// Returns `None` for an empty board.
pub fn market_context(board: &PriceBoard) -> Option<String> {
    if board.is_empty() {
        return None;
    }
    let json = serde_json::to_string_pretty(board).ok()?;
    Some(format!(
        "\n[REAL-TIME MARKET DATA]: {json}\nUse this data to answer questions about current prices."
    ))
}
