//! Trading Intent Classifiers
//!
//! Fast-path detection of swap, take-profit/stop-loss and price-check
//! requests. Each category is an ordered list of (pattern, extractor) rules
//! evaluated against the lower-cased query; the first matching rule wins for
//! its category, and categories are tried in [`PRIORITY`] order. A match
//! short-circuits the chat pipeline, so no model or network call is made.
//!
//! Overlapping wording ("sell ... for ..." vs price wording) is settled by
//! category priority alone.

use std::fmt;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Serialize;

/// Placeholder for a missing numeric capture
const DEFAULT_AMOUNT: &str = "0";

/// Placeholder for a missing token capture
const DEFAULT_TOKEN: &str = "UNKNOWN";

/// Words that fill the token slot of price wording without naming an asset
const PRICE_STOPWORDS: &[&str] = &[
    "a", "an", "the", "this", "that", "it", "its", "my", "your", "our", "their", "what", "is",
    "of", "current", "market", "spot", "live", "latest", "real", "token", "coin", "crypto",
    "stock", "share", "gas", "best", "good", "fair", "low", "high", "lowest", "highest",
    "average", "floor", "target", "entry", "exit", "sale", "asking", "oracle",
];

/// Intent categories
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntentKind {
    Swap,
    TpSl,
    PriceCheck,
}

/// Category evaluation order; the first category with a matching rule wins
pub const PRIORITY: [IntentKind; 3] = [IntentKind::Swap, IntentKind::TpSl, IntentKind::PriceCheck];

impl IntentKind {
    /// Wire tag used in intent responses
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Swap => "swap",
            Self::TpSl => "tp_sl",
            Self::PriceCheck => "price_check",
        }
    }

    fn rules(self) -> &'static [Rule] {
        match self {
            Self::Swap => SWAP_RULES.as_slice(),
            Self::TpSl => TP_SL_RULES.as_slice(),
            Self::PriceCheck => PRICE_CHECK_RULES.as_slice(),
        }
    }
}

/// Token swap request
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SwapData {
    /// Decimal string as written by the user
    pub amount: String,
    pub from_token: String,
    pub to_token: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    TakeProfit,
    StopLoss,
}

impl OrderType {
    /// Trigger side relative to the current price
    pub const fn direction(self) -> Direction {
        match self {
            Self::TakeProfit => Direction::Above,
            Self::StopLoss => Direction::Below,
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TakeProfit => write!(f, "take profit"),
            Self::StopLoss => write!(f, "stop loss"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Above,
    Below,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Above => write!(f, "above"),
            Self::Below => write!(f, "below"),
        }
    }
}

/// Take-profit / stop-loss order request
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TpSlData {
    #[serde(rename = "type")]
    pub order_type: OrderType,
    /// Integer percentage as a string
    pub percentage: String,
    pub direction: Direction,
}

/// A classified query
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Intent {
    Swap(SwapData),
    TpSl(TpSlData),
    PriceCheck { token: String },
    /// No trading intent; handled by the chat pipeline
    Chat,
}

impl Intent {
    pub const fn kind(&self) -> Option<IntentKind> {
        match self {
            Self::Swap(_) => Some(IntentKind::Swap),
            Self::TpSl(_) => Some(IntentKind::TpSl),
            Self::PriceCheck { .. } => Some(IntentKind::PriceCheck),
            Self::Chat => None,
        }
    }
}

/// One pattern with its extractor. An extractor may reject a match.
struct Rule {
    pattern: Regex,
    extract: fn(&Captures<'_>) -> Option<Intent>,
}

impl Rule {
    fn new(pattern: &str, extract: fn(&Captures<'_>) -> Option<Intent>) -> Self {
        Self {
            pattern: Regex::new(pattern).expect("intent regex is valid"),
            extract,
        }
    }
}

fn capture(caps: &Captures<'_>, index: usize, default: &str) -> String {
    caps.get(index).map_or(default, |m| m.as_str()).to_string()
}

fn token(caps: &Captures<'_>, index: usize) -> String {
    capture(caps, index, DEFAULT_TOKEN).to_uppercase()
}

/// Build a swap from the capture indices of amount, source and target token
fn swap(caps: &Captures<'_>, amount: usize, from: usize, to: usize) -> Option<Intent> {
    Some(Intent::Swap(SwapData {
        amount: capture(caps, amount, DEFAULT_AMOUNT),
        from_token: token(caps, from),
        to_token: token(caps, to),
    }))
}

fn tp_sl(caps: &Captures<'_>, order_type: OrderType) -> Option<Intent> {
    Some(Intent::TpSl(TpSlData {
        order_type,
        percentage: capture(caps, 1, DEFAULT_AMOUNT),
        direction: order_type.direction(),
    }))
}

/// Price check on the captured token, unless it is filler like "the"
fn price_check(caps: &Captures<'_>) -> Option<Intent> {
    let word = caps.get(1)?.as_str();
    if PRICE_STOPWORDS.contains(&word) {
        return None;
    }
    Some(Intent::PriceCheck {
        token: word.to_uppercase(),
    })
}

static SWAP_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        // swap 10 sui to usdc
        Rule::new(
            r"\b(?:swap|convert|exchange|trade|sell)\s+(?:(\d+(?:\.\d+)?)\s+)?([a-z0-9]+)\s+(?:to|for|into)\s+([a-z0-9]+)",
            |c| swap(c, 1, 2, 3),
        ),
        // buy usdc with 5 sui
        Rule::new(
            r"\bbuy\s+([a-z0-9]+)\s+with\s+(\d+(?:\.\d+)?)\s+([a-z0-9]+)",
            |c| swap(c, 2, 3, 1),
        ),
        // get usdc for 5 sui
        Rule::new(
            r"\bget\s+(?:me\s+)?([a-z0-9]+)\s+for\s+(\d+(?:\.\d+)?)\s+([a-z0-9]+)",
            |c| swap(c, 2, 3, 1),
        ),
    ]
});

static TP_SL_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        Rule::new(r"\btake[\s_-]?profit(?:\D*?(\d+))?", |c| {
            tp_sl(c, OrderType::TakeProfit)
        }),
        Rule::new(r"\bstop[\s_-]?loss(?:\D*?(\d+))?", |c| {
            tp_sl(c, OrderType::StopLoss)
        }),
        Rule::new(r"\btp\b(?:\D*?(\d+))?", |c| tp_sl(c, OrderType::TakeProfit)),
        Rule::new(r"\bsl\b(?:\D*?(\d+))?", |c| tp_sl(c, OrderType::StopLoss)),
    ]
});

static PRICE_CHECK_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        Rule::new(r"\bprice\s+of\s+([a-z0-9]+)", price_check),
        Rule::new(r"\bhow\s+much\s+is\s+([a-z0-9]+)", price_check),
        Rule::new(r"\b([a-z0-9]+)\s+price\b", price_check),
    ]
});

/// Classify a raw query. Returns [`Intent::Chat`] when nothing matches.
///
/// Every match of a rule is offered to its extractor in order; a rejected
/// match moves on to the next one, then to the next rule.
pub fn classify(query: &str) -> Intent {
    let query = query.to_lowercase();
    for kind in PRIORITY {
        for rule in kind.rules() {
            let found = rule
                .pattern
                .captures_iter(&query)
                .find_map(|caps| (rule.extract)(&caps));
            if let Some(intent) = found {
                tracing::debug!(intent = kind.as_str(), "Intent matched");
                return intent;
            }
        }
    }
    Intent::Chat
}

/// Short-circuit reply for a matched intent
#[derive(Clone, Debug, Serialize)]
pub struct IntentResponse {
    #[serde(rename = "type")]
    pub kind: &'static str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub swap_data: Option<SwapData>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tp_sl_data: Option<TpSlData>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    pub message: String,

    /// Always empty; present for schema parity with chat replies
    pub assets: Vec<serde_json::Value>,
}

impl IntentResponse {
    /// Build the response for a trading intent; `None` for [`Intent::Chat`]
    pub fn from_intent(intent: Intent) -> Option<Self> {
        let kind = intent.kind()?.as_str();
        let mut response = Self {
            kind,
            swap_data: None,
            tp_sl_data: None,
            token: None,
            message: String::new(),
            assets: Vec::new(),
        };

        match intent {
            Intent::Swap(data) => {
                response.message = format!(
                    "Preparing to swap {} {} for {}.",
                    data.amount, data.from_token, data.to_token
                );
                response.swap_data = Some(data);
            }
            Intent::TpSl(data) => {
                response.message = format!(
                    "Setting a {} at {}% {} the current price.",
                    data.order_type, data.percentage, data.direction
                );
                response.tp_sl_data = Some(data);
            }
            Intent::PriceCheck { token } => {
                response.message = format!("Fetching the latest {token} price.");
                response.token = Some(token);
            }
            Intent::Chat => return None,
        }
        Some(response)
    }
}
