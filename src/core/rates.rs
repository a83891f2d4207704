//! Rate tables, conversion functions and the rate source abstraction

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use super::currency::{Currency, CurrencyPair};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RateError {
    #[error("Missing rate for {0}")]
    MissingRate(Currency),

    #[error("Invalid rate {rate} for {currency}")]
    InvalidRate { currency: Currency, rate: f64 },
}

/// Snapshot of every currency's value relative to one base currency.
///
/// A table always carries a finite, positive rate for each member of
/// [`Currency::ALL`], and the base currency is pinned to exactly 1.
#[derive(Debug, Clone, PartialEq)]
pub struct RateTable {
    base: Currency,
    rates: BTreeMap<Currency, f64>,
    fetched_at: DateTime<Utc>,
}

impl RateTable {
    pub fn new(
        base: Currency,
        quotes: impl IntoIterator<Item = (Currency, f64)>,
    ) -> Result<Self, RateError> {
        Self::at(base, quotes, Utc::now())
    }

    pub fn at(
        base: Currency,
        quotes: impl IntoIterator<Item = (Currency, f64)>,
        fetched_at: DateTime<Utc>,
    ) -> Result<Self, RateError> {
        let mut rates: BTreeMap<Currency, f64> = quotes.into_iter().collect();
        rates.insert(base, 1.0);

        for currency in Currency::ALL {
            let rate = *rates
                .get(&currency)
                .ok_or(RateError::MissingRate(currency))?;
            if !rate.is_finite() || rate <= 0.0 {
                return Err(RateError::InvalidRate { currency, rate });
            }
        }

        Ok(Self {
            base,
            rates,
            fetched_at,
        })
    }

    pub fn base(&self) -> Currency {
        self.base
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn rate(&self, currency: Currency) -> f64 {
        self.rates[&currency]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Currency, f64)> + '_ {
        self.rates.iter().map(|(currency, rate)| (*currency, *rate))
    }
}

/// Pure conversion function closed over one rate table.
#[derive(Debug, Clone)]
pub struct Converter {
    rates: Arc<RateTable>,
}

impl Converter {
    pub fn convert(&self, amount: f64, pair: CurrencyPair) -> f64 {
        let in_base = amount / self.rates.rate(pair.from);
        in_base * self.rates.rate(pair.to)
    }

    pub fn rates(&self) -> &Arc<RateTable> {
        &self.rates
    }
}

pub fn make_converter(rates: Arc<RateTable>) -> Converter {
    Converter { rates }
}

#[async_trait]
pub trait RateSource: Send + Sync {
    /// Fetches a fresh table of every known currency against `base`.
    async fn fetch_rates(&self, base: Currency) -> Result<RateTable>;
}
