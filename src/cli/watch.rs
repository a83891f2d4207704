use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::exchange::quote_line;
use super::ui::{self, StyleType};
use crate::core::account::Account;
use crate::core::config::WidgetDefaults;
use crate::core::currency::Currency;
use crate::feed::RateFeed;
use crate::widget::{ExchangeWidget, Side};

// Polls allowed to fail before giving up on the first table
const FIRST_RATES_POLLS: u32 = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct WatchRequest {
    pub amount: String,
    pub from: Option<Currency>,
    pub to: Option<Currency>,
}

/// Line printed for each rate update.
pub fn update_line(fetched_at: DateTime<Utc>, widget: &ExchangeWidget) -> String {
    let preview = widget.rate_preview().unwrap_or_default();
    format!(
        "{}  {}  {}",
        ui::style_text(&fetched_at.format("%H:%M:%S").to_string(), StyleType::Subtle),
        quote_line(&widget.snapshot()),
        ui::style_text(&format!("({preview})"), StyleType::Subtle)
    )
}

/// Keeps an exchange quote live, printing it after every rate refresh until
/// interrupted.
pub async fn run(
    feed: &Arc<RateFeed>,
    account: Arc<dyn Account>,
    request: &WatchRequest,
    defaults: &WidgetDefaults,
) -> Result<()> {
    let interrupted = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Unable to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    run_until(feed, account, request, defaults, interrupted).await?;
    Ok(())
}

/// Same as [`run`], stopping when `shutdown` resolves instead of on Ctrl-C.
/// Returns the number of updates printed.
pub async fn run_until<S>(
    feed: &Arc<RateFeed>,
    account: Arc<dyn Account>,
    request: &WatchRequest,
    defaults: &WidgetDefaults,
    shutdown: S,
) -> Result<usize>
where
    S: Future<Output = ()>,
{
    let from = request.from.unwrap_or(defaults.from);
    let to = request.to.unwrap_or(defaults.to);

    let widget = Arc::new(ExchangeWidget::new(account, from, to));
    if !widget.edit_amount_text(Side::From, &request.amount) {
        bail!(
            "Invalid amount '{}': expected digits with at most two decimals",
            request.amount
        );
    }

    // Listeners run in subscription order, so the widget has the new rates
    // by the time the printer hears about them.
    let _subscription = widget.attach(feed);
    let (tx, mut updates) = mpsc::unbounded_channel();
    let _printer = feed.subscribe(move |rates| {
        if tx.send(rates.fetched_at()).is_err() {
            debug!("Quote printer stopped, dropping rate update");
        }
    });
    let _poller = feed.start();

    let pb = ui::new_spinner("Waiting for exchange rates...");
    let patience = feed.interval() * FIRST_RATES_POLLS;
    let first = tokio::time::timeout(patience, feed.wait_for_rates()).await;
    pb.finish_and_clear();
    match first {
        Ok(rates) => {
            rates?;
        }
        Err(_) => bail!(
            "No exchange rates received within {}s, check the provider settings",
            patience.as_secs()
        ),
    }

    println!(
        "{}",
        ui::style_text(&format!("Watching {from} -> {to}, Ctrl-C to stop"), StyleType::Title)
    );
    Ok(follow_updates(&widget, &mut updates, shutdown).await)
}

/// Prints a quote line per received update until `shutdown` resolves or the
/// sending side goes away. Returns the number of lines printed.
pub async fn follow_updates<S>(
    widget: &ExchangeWidget,
    updates: &mut mpsc::UnboundedReceiver<DateTime<Utc>>,
    shutdown: S,
) -> usize
where
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut printed = 0;
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                debug!("Interrupted");
                break;
            }
            update = updates.recv() => match update {
                Some(fetched_at) => {
                    println!("{}", update_line(fetched_at, widget));
                    printed += 1;
                }
                None => break,
            },
        }
    }
    printed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::DEFAULT_POLL_INTERVAL;
    use crate::test_utils::{RecordingAccount, ScriptedRateSource, table};
    use std::time::Duration;

    fn widget() -> ExchangeWidget {
        let widget = ExchangeWidget::new(
            Arc::new(RecordingAccount::new([])),
            Currency::Eur,
            Currency::Gbp,
        );
        widget.apply_rates(Arc::new(table(0.85123, 1.1)));
        widget.edit_amount(Side::From, Some(10.0));
        widget
    }

    fn request(amount: &str) -> WatchRequest {
        WatchRequest {
            amount: amount.to_string(),
            from: None,
            to: None,
        }
    }

    #[test]
    fn test_update_line_shows_quote_and_rate() {
        console::set_colors_enabled(false);
        let widget = widget();

        let fetched_at = DateTime::parse_from_rfc3339("2026-10-17T09:30:00Z")
            .expect("valid timestamp")
            .with_timezone(&Utc);
        let line = update_line(fetched_at, &widget);

        assert!(line.contains("09:30:00"));
        assert!(line.contains("-€10.00 → +£8.51"));
        assert!(line.contains("(€1 = £0.8512)"));
    }

    #[tokio::test]
    async fn test_follow_updates_stops_when_sender_is_gone() {
        let widget = widget();
        let (tx, mut updates) = mpsc::unbounded_channel();
        tx.send(Utc::now()).unwrap();
        tx.send(Utc::now()).unwrap();
        drop(tx);

        let printed = follow_updates(&widget, &mut updates, std::future::pending()).await;

        assert_eq!(printed, 2);
    }

    #[tokio::test]
    async fn test_follow_updates_stops_on_shutdown() {
        let widget = widget();
        let (_tx, mut updates) = mpsc::unbounded_channel();

        let printed = follow_updates(&widget, &mut updates, async {}).await;

        assert_eq!(printed, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_prints_each_polled_table() {
        let source = ScriptedRateSource::new(vec![Ok(table(0.5, 1.5)), Ok(table(0.6, 1.5))]);
        let fetches = source.fetch_count();
        let feed = RateFeed::new(Arc::new(source), Currency::Eur, DEFAULT_POLL_INTERVAL);
        let account = Arc::new(RecordingAccount::new([(Currency::Eur, 100.0)]));
        // Polls at 0s and 10s land before the shutdown at 15s
        let shutdown = tokio::time::sleep(Duration::from_secs(15));

        let printed = run_until(
            &feed,
            account.clone(),
            &request("10"),
            &WidgetDefaults::default(),
            shutdown,
        )
        .await
        .expect("watch should stop cleanly");

        assert_eq!(printed, 2);
        assert_eq!(fetches.load(std::sync::atomic::Ordering::SeqCst), 2);
        assert!(account.calls().is_empty());
        // The poll task and the widget's listeners are released on return
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_run_until_rejects_malformed_amount() {
        let feed = RateFeed::new(
            Arc::new(ScriptedRateSource::new(vec![])),
            Currency::Eur,
            DEFAULT_POLL_INTERVAL,
        );
        let account = Arc::new(RecordingAccount::new([]));

        let result = run_until(
            &feed,
            account,
            &request("ten"),
            &WidgetDefaults::default(),
            async {},
        )
        .await;

        assert!(result.unwrap_err().to_string().starts_with("Invalid amount"));
        assert_eq!(feed.subscriber_count(), 0);
    }
}
