//! Balance store abstraction used by the exchange widget

use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;

use super::currency::{Currency, CurrencyPair};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AccountError {
    #[error("Insufficient funds: requested {requested} {currency}, available {available}")]
    InsufficientFunds {
        currency: Currency,
        requested: f64,
        available: f64,
    },

    #[error("No exchange rates available to settle the exchange")]
    RatesUnavailable,
}

#[async_trait]
pub trait Account: Send + Sync {
    fn balance(&self, currency: Currency) -> f64;

    fn balances(&self) -> BTreeMap<Currency, f64>;

    /// Debits `amount` from `pair.from` and credits the converted amount to
    /// `pair.to`. Either both happen or neither does.
    async fn exchange(&self, amount: f64, pair: CurrencyPair) -> Result<(), AccountError>;
}
