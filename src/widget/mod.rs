//! Headless currency exchange widget.
//!
//! An [`ExchangeWidget`] owns one [`BucketMachine`] and one
//! [`SubmissionGuard`], reads balances from an [`Account`] and receives rate
//! tables from a [`RateFeed`]. Every operation runs under a single lock, so a
//! rate update never observes a half-applied edit.

pub mod buckets;
pub mod guard;

pub use buckets::{Action, Bucket, BucketMachine, Buckets, Side};
pub use guard::SubmissionGuard;

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::account::{Account, AccountError};
use crate::core::currency::Currency;
use crate::core::input::parse_amount;
use crate::core::rates::{RateTable, make_converter};
use crate::core::render::render_currency;
use crate::feed::{RateFeed, Subscription};

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Nothing was submitted: no amount, not enough balance or another
    /// submission still in flight.
    Skipped,
    Exchanged,
    Rejected(AccountError),
}

pub struct ExchangeWidget {
    machine: Mutex<BucketMachine>,
    guard: SubmissionGuard,
    account: Arc<dyn Account>,
}

impl ExchangeWidget {
    pub fn new(account: Arc<dyn Account>, from: Currency, to: Currency) -> Self {
        Self {
            machine: Mutex::new(BucketMachine::new(from, to)),
            guard: SubmissionGuard::new(),
            account,
        }
    }

    /// Subscribes to `feed` and applies its current table, if any. The
    /// returned subscription must be kept alive for as long as updates are
    /// wanted; the feed only holds a weak reference to the widget.
    pub fn attach(self: &Arc<Self>, feed: &Arc<RateFeed>) -> Subscription {
        let widget = Arc::downgrade(self);
        let subscription = feed.subscribe(move |rates| {
            if let Some(widget) = widget.upgrade() {
                widget.apply_rates(Arc::clone(rates));
            }
        });
        if let Some(rates) = feed.latest() {
            self.apply_rates(rates);
        }
        subscription
    }

    pub fn apply_rates(&self, rates: Arc<RateTable>) {
        let mut machine = self.machine.lock();
        let unchanged = machine
            .converter()
            .is_some_and(|current| Arc::ptr_eq(current.rates(), &rates));
        if unchanged {
            return;
        }
        debug!(fetched_at = %rates.fetched_at(), "Applying new rates");
        machine.set_converter(make_converter(rates));
    }

    pub fn snapshot(&self) -> Buckets {
        self.machine.lock().buckets().clone()
    }

    /// Whether conversion rates have arrived yet.
    pub fn is_ready(&self) -> bool {
        self.machine.lock().converter().is_some()
    }

    pub fn dispatch(&self, action: Action) {
        self.machine.lock().dispatch(action);
    }

    pub fn edit_amount(&self, side: Side, amount: Option<f64>) {
        self.machine.lock().edit_amount(side, amount);
    }

    /// Applies raw user text to `side`. Malformed text leaves the state
    /// untouched and returns false.
    pub fn edit_amount_text(&self, side: Side, text: &str) -> bool {
        match parse_amount(text) {
            Ok(amount) => {
                self.edit_amount(side, amount);
                true
            }
            Err(e) => {
                debug!(%side, "Ignoring edit: {}", e);
                false
            }
        }
    }

    pub fn set_currency(&self, side: Side, currency: Currency) {
        self.dispatch(Action::SetCurrency { side, currency });
    }

    pub fn focus(&self, side: Side) {
        self.dispatch(Action::SetLastFocused(side));
    }

    pub fn swap(&self) {
        self.dispatch(Action::Swap);
    }

    /// One unit of the "from" currency expressed in the "to" currency, e.g.
    /// `€1 = £0.8512`.
    pub fn rate_preview(&self) -> Option<String> {
        let machine = self.machine.lock();
        let converter = machine.converter()?;
        let pair = machine.buckets().pair();
        let rate = converter.convert(1.0, pair);
        Some(format!(
            "{} = {}",
            render_currency(1.0, pair.from, None),
            render_currency(rate, pair.to, Some(4))
        ))
    }

    pub fn balance(&self, side: Side) -> f64 {
        let currency = self.snapshot().get(side).currency;
        self.account.balance(currency)
    }

    pub fn is_exchanging(&self) -> bool {
        self.guard.is_in_flight()
    }

    pub fn can_submit(&self) -> bool {
        let buckets = self.snapshot();
        let balance = self.account.balance(buckets.from().currency);
        self.guard.can_submit(&buckets, balance)
    }

    /// Exchanges the "from" amount if allowed. A rejection from the account
    /// is reported in the outcome; the buckets keep their values either way.
    pub async fn submit(&self) -> SubmitOutcome {
        let buckets = self.snapshot();
        let balance = self.account.balance(buckets.from().currency);
        let account = Arc::clone(&self.account);
        let result = self
            .guard
            .submit(&buckets, balance, move |amount, pair| async move {
                account.exchange(amount, pair).await
            })
            .await;

        match result {
            None => SubmitOutcome::Skipped,
            Some(Ok(())) => {
                info!(pair = %buckets.pair(), "Exchange completed");
                SubmitOutcome::Exchanged
            }
            Some(Err(e)) => {
                warn!(pair = %buckets.pair(), "Exchange rejected: {}", e);
                SubmitOutcome::Rejected(e)
            }
        }
    }
}
