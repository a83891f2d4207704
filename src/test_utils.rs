// Shared fakes for unit tests
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

use crate::core::account::{Account, AccountError};
use crate::core::currency::{Currency, CurrencyPair};
use crate::core::rates::{Converter, RateSource, RateTable, make_converter};

/// EUR-based table with the given GBP and USD rates.
pub fn table(gbp: f64, usd: f64) -> RateTable {
    RateTable::new(Currency::Eur, [(Currency::Gbp, gbp), (Currency::Usd, usd)])
        .expect("test rates are valid")
}

pub fn converter(gbp: f64, usd: f64) -> Converter {
    make_converter(Arc::new(table(gbp, usd)))
}

/// Replays a fixed sequence of fetch results, failing once exhausted.
pub struct ScriptedRateSource {
    responses: Mutex<VecDeque<Result<RateTable, String>>>,
    fetches: Arc<AtomicUsize>,
}

impl ScriptedRateSource {
    pub fn new(responses: Vec<Result<RateTable, String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn fetch_count(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.fetches)
    }
}

#[async_trait]
impl RateSource for ScriptedRateSource {
    async fn fetch_rates(&self, _base: Currency) -> Result<RateTable> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        match self.responses.lock().pop_front() {
            Some(Ok(table)) => Ok(table),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("No more scripted rates")),
        }
    }
}

/// Account that records exchange calls. When gated, each exchange waits
/// until [`RecordingAccount::release`] is called.
pub struct RecordingAccount {
    balances: Mutex<BTreeMap<Currency, f64>>,
    calls: Mutex<Vec<(f64, CurrencyPair)>>,
    gate: Option<Notify>,
}

impl RecordingAccount {
    pub fn new(balances: impl IntoIterator<Item = (Currency, f64)>) -> Self {
        Self {
            balances: Mutex::new(balances.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    pub fn gated(mut self) -> Self {
        self.gate = Some(Notify::new());
        self
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub fn calls(&self) -> Vec<(f64, CurrencyPair)> {
        self.calls.lock().clone()
    }

    pub fn set_balance(&self, currency: Currency, amount: f64) {
        self.balances.lock().insert(currency, amount);
    }
}

#[async_trait]
impl Account for RecordingAccount {
    fn balance(&self, currency: Currency) -> f64 {
        self.balances.lock().get(&currency).copied().unwrap_or(0.0)
    }

    fn balances(&self) -> BTreeMap<Currency, f64> {
        self.balances.lock().clone()
    }

    async fn exchange(&self, amount: f64, pair: CurrencyPair) -> Result<(), AccountError> {
        self.calls.lock().push((amount, pair));
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let available = self.balance(pair.from);
        if amount > available {
            return Err(AccountError::InsufficientFunds {
                currency: pair.from,
                requested: amount,
                available,
            });
        }
        Ok(())
    }
}
