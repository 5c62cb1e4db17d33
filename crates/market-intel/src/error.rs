//! Error Types for Market Intel

use thiserror::Error;

pub type Result<T> = std::result::Result<T, IntelError>;

#[derive(Error, Debug)]
pub enum IntelError {
    #[error("Price feed error: {0}")]
    PriceFeed(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Invalid quote: {0}")]
    InvalidQuote(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
