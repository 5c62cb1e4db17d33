//! Server Configuration
//!
//! Read from the environment (after `.env` is loaded). Unset or unparsable
//! values fall back to defaults.

use std::path::PathBuf;
use std::time::Duration;

use agent_core::StoreLimits;
use agent_runtime::GroqConfig;
use market_intel::CoinGeckoConfig;

/// Which price feed backs market-data augmentation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PriceFeedKind {
    CoinGecko,
    Static,
}

impl PriceFeedKind {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "coingecko" => Some(Self::CoinGecko),
            "static" => Some(Self::Static),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: String,

    /// Directory holding the system prompt templates
    pub prompt_dir: PathBuf,
    pub prompt_primary: String,
    pub prompt_fallback: String,

    pub groq: GroqConfig,
    pub router_model: String,
    pub primary_model: String,

    pub price_feed: PriceFeedKind,
    pub coingecko: CoinGeckoConfig,

    pub store: StoreLimits,
    pub sweep_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let text = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let secs = |key: &str, default: u64| {
            lookup(key)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(default)
        };

        let groq_defaults = GroqConfig::default();
        let coingecko_defaults = CoinGeckoConfig::default();
        let store_defaults = StoreLimits::default();

        Self {
            bind_addr: text("BIND_ADDR", "0.0.0.0:5000"),
            prompt_dir: PathBuf::from(text("PROMPT_DIR", ".")),
            prompt_primary: text("PROMPT_PRIMARY", "sui_tent_prompt.txt"),
            prompt_fallback: text("PROMPT_FALLBACK", "web3_prompt.txt"),
            groq: GroqConfig {
                base_url: text("GROQ_BASE_URL", &groq_defaults.base_url),
                timeout_secs: secs("GROQ_TIMEOUT_SECS", groq_defaults.timeout_secs),
            },
            router_model: text("ROUTER_MODEL", "llama-3.1-8b-instant"),
            primary_model: text("PRIMARY_MODEL", "llama-3.3-70b-versatile"),
            price_feed: lookup("PRICE_FEED")
                .and_then(|v| PriceFeedKind::parse(&v))
                .unwrap_or(PriceFeedKind::CoinGecko),
            coingecko: CoinGeckoConfig {
                url: text("PRICE_API_URL", &coingecko_defaults.url),
                ..coingecko_defaults
            },
            store: StoreLimits {
                ttl: Duration::from_secs(secs(
                    "CONVERSATION_TTL_SECS",
                    store_defaults.ttl.as_secs(),
                )),
                max_conversations: lookup("MAX_CONVERSATIONS")
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(store_defaults.max_conversations),
            },
            sweep_interval: Duration::from_secs(secs("SWEEP_INTERVAL_SECS", 60).max(1)),
        }
    }
}
