//! At-most-one in-flight exchange per widget.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use super::buckets::Buckets;
use crate::core::currency::CurrencyPair;

#[derive(Debug, Default)]
pub struct SubmissionGuard {
    in_flight: AtomicBool,
}

// Clears the in-flight flag when dropped, however the exchange ended.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SubmissionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Whether the current buckets may be submitted against `balance`, the
    /// balance of the "from" currency.
    pub fn can_submit(&self, buckets: &Buckets, balance: f64) -> bool {
        if self.is_in_flight() {
            return false;
        }
        match buckets.from().effective_amount() {
            Some(amount) => amount <= balance,
            None => false,
        }
    }

    fn acquire(&self) -> Option<InFlight<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(&self.in_flight))
    }

    /// Runs `exchange` with the "from" amount and currency pair if submission
    /// is allowed. Returns `None` when it is not; nothing is called then.
    pub async fn submit<F, Fut, E>(
        &self,
        buckets: &Buckets,
        balance: f64,
        exchange: F,
    ) -> Option<Result<(), E>>
    where
        F: FnOnce(f64, CurrencyPair) -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        if !self.can_submit(buckets, balance) {
            debug!(in_flight = self.is_in_flight(), "Submission not allowed");
            return None;
        }
        let amount = buckets.from().effective_amount()?;
        let _in_flight = self.acquire()?;

        debug!(amount, pair = %buckets.pair(), "Submitting exchange");
        Some(exchange(amount, buckets.pair()).await)
    }
}
