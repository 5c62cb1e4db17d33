//! Swap Quotes
//!
//! Placeholder pricing: the output estimate is a flat 5% deduction from the
//! input amount. There is no pricing oracle behind it.

use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::error::{IntelError, Result};

/// Fraction of the input returned as output
const OUTPUT_RATIO: Decimal = dec!(0.95);

/// Reported slippage tolerance (percentage)
const SLIPPAGE_PERCENT: Decimal = dec!(0.5);

/// Reported price impact (percentage)
const PRICE_IMPACT_PERCENT: Decimal = dec!(5.0);

/// Estimated result of swapping `amount_in` of `token_in` into `token_out`
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SwapQuote {
    pub token_in: String,
    pub token_out: String,
    pub amount_in: Decimal,
    pub estimated_out: Decimal,
    pub slippage: Decimal,
    pub price_impact: Decimal,
}

impl SwapQuote {
    /// Quote a swap. `amount_in` must be a non-negative decimal.
    pub fn estimate(token_in: &str, token_out: &str, amount_in: &str) -> Result<Self> {
        let amount_in = Decimal::from_str(amount_in.trim())
            .map_err(|e| IntelError::InvalidQuote(format!("amount_in '{amount_in}': {e}")))?;
        if amount_in.is_sign_negative() {
            return Err(IntelError::InvalidQuote(format!(
                "amount_in must not be negative, got {amount_in}"
            )));
        }

        let estimated_out = amount_in
            .checked_mul(OUTPUT_RATIO)
            .ok_or_else(|| IntelError::InvalidQuote("amount_in is too large".into()))?
            .normalize();

        Ok(Self {
            token_in: token_in.to_string(),
            token_out: token_out.to_string(),
            amount_in,
            estimated_out,
            slippage: SLIPPAGE_PERCENT,
            price_impact: PRICE_IMPACT_PERCENT,
        })
    }
}
