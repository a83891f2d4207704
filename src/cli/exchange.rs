use anyhow::{Context, Result, bail};
use comfy_table::Cell;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::ui::{self, StyleType};
use crate::core::account::Account;
use crate::core::config::WidgetDefaults;
use crate::core::currency::Currency;
use crate::feed::RateFeed;
use crate::widget::{Buckets, ExchangeWidget, Side, SubmitOutcome};

#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeRequest {
    /// Raw amount as typed, e.g. `10` or `10.50`.
    pub amount: String,
    pub from: Option<Currency>,
    pub to: Option<Currency>,
    /// The amount is what the "to" pocket receives rather than what the
    /// "from" pocket pays.
    pub into: bool,
}

impl ExchangeRequest {
    pub fn currencies(&self, defaults: &WidgetDefaults) -> (Currency, Currency) {
        (
            self.from.unwrap_or(defaults.from),
            self.to.unwrap_or(defaults.to),
        )
    }
}

/// One line summary of the pending exchange, e.g. `-€10.00 → +£8.51`.
pub fn quote_line(buckets: &Buckets) -> String {
    let from = buckets.from();
    let to = buckets.to();
    format!(
        "-{} → +{}",
        ui::format_amount(from.amount, from.currency),
        ui::format_amount(to.amount, to.currency)
    )
}

pub fn display_balances(balances: &BTreeMap<Currency, f64>) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Currency"), ui::header_cell("Balance")]);
    for (currency, balance) in balances {
        table.add_row(vec![
            Cell::new(currency.code()),
            ui::amount_cell(*balance, *currency),
        ]);
    }
    table.to_string()
}

/// Fills the widget from `request` and submits a single exchange.
pub async fn run(
    feed: &Arc<RateFeed>,
    account: Arc<dyn Account>,
    request: &ExchangeRequest,
    defaults: &WidgetDefaults,
) -> Result<()> {
    let (from, to) = request.currencies(defaults);

    let pb = ui::new_spinner("Fetching exchange rates...");
    let refreshed = feed.refresh().await;
    pb.finish_and_clear();
    refreshed?;

    let widget = Arc::new(ExchangeWidget::new(Arc::clone(&account), from, to));
    let _subscription = widget.attach(feed);

    let side = if request.into { Side::To } else { Side::From };
    widget.focus(side);
    if !widget.edit_amount_text(side, &request.amount) {
        bail!(
            "Invalid amount '{}': expected digits with at most two decimals",
            request.amount
        );
    }

    let buckets = widget.snapshot();
    if let Some(preview) = widget.rate_preview() {
        println!("{}", ui::style_text(&preview, StyleType::Subtle));
    }
    println!("{}", ui::style_text(&quote_line(&buckets), StyleType::Label));

    let Some(amount) = buckets.from().effective_amount() else {
        bail!("Nothing to exchange: amount must be greater than zero");
    };
    if !widget.can_submit() {
        bail!(
            "Cannot exchange {}: available balance is {}",
            ui::format_amount(Some(amount), from),
            ui::format_amount(Some(widget.balance(Side::From)), from)
        );
    }

    match widget.submit().await {
        SubmitOutcome::Exchanged => {
            println!("{}", ui::style_text("Exchanged", StyleType::Credit));
            println!("{}", display_balances(&account.balances()));
            Ok(())
        }
        SubmitOutcome::Rejected(e) => Err(e).context("Exchange rejected"),
        SubmitOutcome::Skipped => bail!("Exchange was not submitted"),
    }
}
