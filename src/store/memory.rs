use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::core::account::{Account, AccountError};
use crate::core::currency::{Currency, CurrencyPair};
use crate::feed::RateFeed;

/// In-memory balances, one pocket per currency. Exchanges are converted at
/// the feed's latest rates.
pub struct MemoryAccount {
    pockets: Mutex<BTreeMap<Currency, f64>>,
    rates: Arc<RateFeed>,
}

impl MemoryAccount {
    pub fn new(balances: BTreeMap<Currency, f64>, rates: Arc<RateFeed>) -> Self {
        Self {
            pockets: Mutex::new(balances),
            rates,
        }
    }
}

#[async_trait]
impl Account for MemoryAccount {
    fn balance(&self, currency: Currency) -> f64 {
        self.pockets.lock().get(&currency).copied().unwrap_or(0.0)
    }

    fn balances(&self) -> BTreeMap<Currency, f64> {
        self.pockets.lock().clone()
    }

    async fn exchange(&self, amount: f64, pair: CurrencyPair) -> Result<(), AccountError> {
        let converter = self.rates.converter().ok_or(AccountError::RatesUnavailable)?;

        let mut pockets = self.pockets.lock();
        let available = pockets.get(&pair.from).copied().unwrap_or(0.0);
        if amount > available {
            debug!(amount, available, currency = %pair.from, "Insufficient funds");
            return Err(AccountError::InsufficientFunds {
                currency: pair.from,
                requested: amount,
                available,
            });
        }

        let credited = converter.convert(amount, pair);
        *pockets.entry(pair.from).or_insert(0.0) -= amount;
        *pockets.entry(pair.to).or_insert(0.0) += credited;
        debug!(amount, credited, %pair, "Exchanged between pockets");
        Ok(())
    }
}
