//! # market-intel
//!
//! Trading domain for the avatar chat backend.
//!
//! ## Components
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  intent     regex fast path: swap → tp/sl → price check      │
//! │  prices     PriceFeed (CoinGecko | static) + keyword gating  │
//! │  quote      placeholder swap quote (5% deduction)            │
//! │  search     WebSearch: videos | articles | docs | images     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Upstream failures in `prices` and `search` are absorbed here: callers get
//! an empty board or empty categories, never an error.

pub mod error;
pub mod intent;
pub mod model;
pub mod prices;
pub mod quote;
pub mod search;

pub use error::{IntelError, Result};
pub use intent::{classify, Intent, IntentKind, IntentResponse};
pub use model::{AssetPrice, PriceBoard};
pub use prices::{CoinGeckoConfig, CoinGeckoFeed, PriceFeed, StaticPriceFeed};
pub use quote::SwapQuote;
pub use search::{
    DuckDuckGo, DuckDuckGoConfig, SearchBundle, SearchCategory, SearchHit, SearchProvider,
    WebSearch,
};
