//! Amount parsing and formatting at the edit boundary

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

static AMOUNT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(?:\.\d{0,2})?$").expect("amount pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Malformed amount: {0:?}")]
    Malformed(String),
}

/// Parses user text into an amount. Empty text clears the amount; at most two
/// decimal places are accepted.
pub fn parse_amount(text: &str) -> Result<Option<f64>, InputError> {
    if text.is_empty() {
        return Ok(None);
    }
    if !AMOUNT_PATTERN.is_match(text) {
        return Err(InputError::Malformed(text.to_string()));
    }
    text.trim_end_matches('.')
        .parse::<f64>()
        .map(Some)
        .map_err(|_| InputError::Malformed(text.to_string()))
}

pub fn format_amount(amount: Option<f64>) -> String {
    amount.map_or_else(String::new, |value| format!("{value:.2}"))
}
