//! Live exchange rate feed.
//!
//! A [`RateFeed`] polls a [`RateSource`] on a fixed interval and pushes every
//! successfully fetched [`RateTable`] to its subscribers. A failed poll is
//! logged and the previous table stays in effect until the next tick.

use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::core::currency::Currency;
use crate::core::rates::{Converter, RateSource, RateTable, make_converter};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

pub type SubscriptionId = u64;

type Listener = Arc<dyn Fn(&Arc<RateTable>) + Send + Sync>;

pub struct RateFeed {
    source: Arc<dyn RateSource>,
    base: Currency,
    interval: Duration,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
    next_id: AtomicU64,
    latest: watch::Sender<Option<Arc<RateTable>>>,
    publishing: Mutex<()>,
}

impl RateFeed {
    pub fn new(source: Arc<dyn RateSource>, base: Currency, interval: Duration) -> Arc<Self> {
        let (latest, _) = watch::channel(None);
        Arc::new(Self {
            source,
            base,
            interval,
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            latest,
            publishing: Mutex::new(()),
        })
    }

    pub fn base(&self) -> Currency {
        self.base
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Registers `listener` for every table published from now on. Listeners
    /// run synchronously on the publishing task, in subscription order.
    ///
    /// Publishes are serialized by a non-reentrant lock held while listeners
    /// run, so a listener must not call [`RateFeed::publish`] or
    /// [`RateFeed::refresh`] itself; that deadlocks. Hand the table off to a
    /// channel or task instead.
    pub fn subscribe<F>(self: &Arc<Self>, listener: F) -> Subscription
    where
        F: Fn(&Arc<RateTable>) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().push((id, Arc::new(listener)));
        debug!(id, "Rate listener subscribed");
        Subscription {
            feed: Arc::downgrade(self),
            id,
        }
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        let removed = listeners.len() != before;
        if removed {
            debug!(id, "Rate listener unsubscribed");
        }
        removed
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn latest(&self) -> Option<Arc<RateTable>> {
        self.latest.borrow().clone()
    }

    pub fn converter(&self) -> Option<Converter> {
        self.latest().map(make_converter)
    }

    /// Resolves once the first table has been published.
    pub async fn wait_for_rates(&self) -> Result<Arc<RateTable>> {
        let mut receiver = self.latest.subscribe();
        let latest = receiver
            .wait_for(Option::is_some)
            .await
            .context("Rate feed closed before any rates arrived")?;
        latest.clone().context("Rate feed published an empty table")
    }

    /// Polls the source once and publishes the result.
    pub async fn refresh(&self) -> Result<Arc<RateTable>> {
        let table = self
            .source
            .fetch_rates(self.base)
            .await
            .context("Unable to refresh currency rates")?;
        Ok(self.publish(table))
    }

    /// Makes `table` the current table and notifies subscribers. A table
    /// older than the current one is dropped and the current one returned.
    pub fn publish(&self, table: RateTable) -> Arc<RateTable> {
        let _publishing = self.publishing.lock();

        if let Some(current) = self.latest() {
            if table.fetched_at() < current.fetched_at() {
                debug!(
                    stale = %table.fetched_at(),
                    current = %current.fetched_at(),
                    "Discarding stale rate table"
                );
                return current;
            }
        }

        let table = Arc::new(table);
        self.latest.send_replace(Some(Arc::clone(&table)));

        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        debug!(subscribers = listeners.len(), "Publishing rate table");
        for listener in listeners {
            listener(&table);
        }
        table
    }

    /// Spawns the polling task: one refresh right away, then one per interval.
    pub fn start(self: &Arc<Self>) -> PollTask {
        let feed = Arc::clone(self);
        info!(base = %self.base, interval = ?self.interval, "Starting live rate refresh");
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(feed.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = feed.refresh().await {
                    error!("Rate poll failed: {e:#}");
                }
            }
        });
        PollTask { handle }
    }
}

/// Handle to a registered listener; dropping it unsubscribes.
pub struct Subscription {
    feed: Weak<RateFeed>,
    id: SubscriptionId,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn cancel(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(feed) = self.feed.upgrade() {
            feed.unsubscribe(self.id);
        }
    }
}

/// Owned background polling task; dropping it stops polling.
pub struct PollTask {
    handle: JoinHandle<()>,
}

impl PollTask {
    pub fn stop(self) {}

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for PollTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ScriptedRateSource, table};
    use chrono::{Duration as ChronoDuration, Utc};
    use std::sync::atomic::AtomicUsize;

    fn feed_with(source: ScriptedRateSource) -> Arc<RateFeed> {
        RateFeed::new(Arc::new(source), Currency::Eur, DEFAULT_POLL_INTERVAL)
    }

    #[tokio::test]
    async fn test_refresh_publishes_to_subscribers_in_order() {
        let feed = feed_with(ScriptedRateSource::new(vec![Ok(table(2.0, 1.5))]));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::clone(&seen);
        let _a = feed.subscribe(move |rates| first.lock().push(("a", rates.rate(Currency::Gbp))));
        let second = Arc::clone(&seen);
        let _b = feed.subscribe(move |rates| second.lock().push(("b", rates.rate(Currency::Gbp))));

        feed.refresh().await.expect("refresh should succeed");

        assert_eq!(*seen.lock(), vec![("a", 2.0), ("b", 2.0)]);
        assert_eq!(feed.latest().unwrap().rate(Currency::Gbp), 2.0);
        assert_eq!(feed.latest().unwrap().rate(Currency::Eur), 1.0);
    }

    #[test]
    fn test_listener_sees_the_table_being_published() {
        let feed = feed_with(ScriptedRateSource::new(vec![]));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let weak = Arc::downgrade(&feed);
        let sink = Arc::clone(&seen);
        let _sub = feed.subscribe(move |rates| {
            // Reads are fine from a listener; only publishing would block
            let latest = weak.upgrade().and_then(|feed| feed.latest());
            sink.lock().push(latest.is_some_and(|latest| Arc::ptr_eq(&latest, rates)));
        });

        feed.publish(table(2.0, 1.5));
        feed.publish(table(3.0, 1.5));

        assert_eq!(*seen.lock(), vec![true, true]);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_table() {
        let feed = feed_with(ScriptedRateSource::new(vec![
            Ok(table(2.0, 1.5)),
            Err("Connection refused".to_string()),
        ]));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let _sub = feed.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        feed.refresh().await.unwrap();
        let err = feed.refresh().await.unwrap_err();

        assert!(format!("{err:#}").contains("Connection refused"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(feed.latest().unwrap().rate(Currency::Gbp), 2.0);
    }

    #[test]
    fn test_dropping_subscription_unsubscribes() {
        let feed = feed_with(ScriptedRateSource::new(vec![]));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let sub = feed.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(feed.subscriber_count(), 1);

        feed.publish(table(2.0, 1.5));
        sub.cancel();
        feed.publish(table(3.0, 1.5));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(feed.subscriber_count(), 0);
        assert!(!feed.unsubscribe(42));
    }

    #[test]
    fn test_stale_tables_are_never_delivered() {
        let feed = feed_with(ScriptedRateSource::new(vec![]));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = feed.subscribe(move |rates| sink.lock().push(rates.rate(Currency::Gbp)));

        let now = Utc::now();
        let newer = RateTable::at(Currency::Eur, [(Currency::Gbp, 2.0), (Currency::Usd, 1.0)], now)
            .unwrap();
        let older = RateTable::at(
            Currency::Eur,
            [(Currency::Gbp, 9.0), (Currency::Usd, 1.0)],
            now - ChronoDuration::seconds(10),
        )
        .unwrap();

        feed.publish(newer);
        let current = feed.publish(older);

        assert_eq!(current.rate(Currency::Gbp), 2.0);
        assert_eq!(*seen.lock(), vec![2.0]);
    }

    #[tokio::test]
    async fn test_wait_for_rates() {
        let feed = feed_with(ScriptedRateSource::new(vec![]));
        let waiter = {
            let feed = Arc::clone(&feed);
            tokio::spawn(async move { feed.wait_for_rates().await })
        };
        feed.publish(table(4.0, 1.5));

        let rates = waiter.await.unwrap().unwrap();
        assert_eq!(rates.rate(Currency::Gbp), 4.0);
        assert_eq!(feed.converter().unwrap().rates().rate(Currency::Gbp), 4.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_on_a_fixed_interval_until_stopped() {
        let source = ScriptedRateSource::new(vec![
            Ok(table(10.0, 20.0)),
            Err("Service unavailable".to_string()),
            Ok(table(5.0, 20.0)),
        ]);
        let fetches = source.fetch_count();
        let feed = feed_with(source);

        let task = feed.start();
        assert!(task.is_running());

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        assert_eq!(feed.latest().unwrap().rate(Currency::Gbp), 10.0);

        tokio::time::sleep(DEFAULT_POLL_INTERVAL).await;
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
        assert_eq!(feed.latest().unwrap().rate(Currency::Gbp), 10.0);

        tokio::time::sleep(DEFAULT_POLL_INTERVAL).await;
        assert_eq!(fetches.load(Ordering::SeqCst), 3);
        assert_eq!(feed.latest().unwrap().rate(Currency::Gbp), 5.0);

        task.stop();
        tokio::time::sleep(DEFAULT_POLL_INTERVAL * 3).await;
        assert_eq!(fetches.load(Ordering::SeqCst), 3);
    }
}
