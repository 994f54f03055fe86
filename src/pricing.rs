//! Cost estimation for usage accounting
//!
//! Prices are USD per million tokens, split by input/output. Estimates feed
//! the usage log and reports only; they never gate a request.

use std::collections::HashMap;

use lazy_static::lazy_static;
use serde::Serialize;

/// USD price per million input/output tokens
#[derive(Debug, Clone, Copy)]
pub struct ModelPrice {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

/// Fallback row for model identifiers missing from the table
pub const DEFAULT_PRICE: ModelPrice = ModelPrice {
    input_per_million: 1.0,
    output_per_million: 3.0,
};

lazy_static! {
    static ref PRICE_TABLE: HashMap<&'static str, ModelPrice> = {
        let mut t = HashMap::new();
        t.insert("gpt-4o", ModelPrice { input_per_million: 2.5, output_per_million: 10.0 });
        t.insert("gpt-4o-mini", ModelPrice { input_per_million: 0.15, output_per_million: 0.6 });
        t.insert("deepseek-chat", ModelPrice { input_per_million: 0.27, output_per_million: 1.1 });
        t.insert("deepseek-reasoner", ModelPrice { input_per_million: 0.55, output_per_million: 2.19 });
        t.insert("gemini-2.0-flash", ModelPrice { input_per_million: 0.1, output_per_million: 0.4 });
        t.insert("gemini-1.5-pro", ModelPrice { input_per_million: 1.25, output_per_million: 5.0 });
        t.insert("grok-2-latest", ModelPrice { input_per_million: 2.0, output_per_million: 10.0 });
        t.insert("grok-2-mini", ModelPrice { input_per_million: 0.3, output_per_million: 0.5 });
        t
    };
}

/// Price row for a model; unknown models fall back to [`DEFAULT_PRICE`]
pub fn price_for(model: &str) -> ModelPrice {
    PRICE_TABLE.get(model).copied().unwrap_or(DEFAULT_PRICE)
}

/// Estimated cost of a request in USD and the reporting currency
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostEstimate {
    /// USD, rounded to 6 decimal places
    pub usd: f64,
    /// Local currency (`usd * fx_rate`), rounded to 2 decimal places
    pub local: f64,
    pub currency: String,
}

/// Estimate the cost of a request from its token counts.
///
/// Pure arithmetic; monotonically non-decreasing in both token counts for a
/// fixed model, and exactly zero for zero tokens.
pub fn estimate(
    input_tokens: u64,
    output_tokens: u64,
    model: &str,
    fx_rate: f64,
    currency: &str,
) -> CostEstimate {
    let price = price_for(model);
    let usd = (input_tokens as f64 * price.input_per_million
        + output_tokens as f64 * price.output_per_million)
        / 1_000_000.0;
    CostEstimate {
        usd: round_to(usd, 6),
        local: round_to(usd * fx_rate, 2),
        currency: currency.to_string(),
    }
}

fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}
