use anyhow::Result;
use comfy_table::{Cell, CellAlignment};

use super::ui::{self, StyleType};
use crate::core::rates::RateTable;
use crate::core::render::render_currency;
use crate::feed::RateFeed;

/// Renders a rate table: each currency's rate against the base and the
/// price of one unit in the base currency.
pub fn display_rates(rates: &RateTable) -> String {
    let base = rates.base();
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Currency"),
        ui::header_cell(&format!("Per {}", render_currency(1.0, base, None))),
        ui::header_cell(&format!("In {base}")),
    ]);

    for (currency, rate) in rates.iter() {
        table.add_row(vec![
            Cell::new(currency.code()),
            Cell::new(render_currency(rate, currency, Some(4))).set_alignment(CellAlignment::Right),
            Cell::new(render_currency(1.0 / rate, base, Some(4)))
                .set_alignment(CellAlignment::Right),
        ]);
    }
    table.to_string()
}

/// Fetches the current rates once and prints them.
pub async fn run(feed: &RateFeed) -> Result<()> {
    let pb = ui::new_spinner("Fetching exchange rates...");
    let result = feed.refresh().await;
    pb.finish_and_clear();
    let rates = result?;

    println!(
        "{}",
        ui::style_text(&format!("Exchange rates ({})", rates.base()), StyleType::Title)
    );
    println!("{}", display_rates(&rates));
    println!(
        "{}",
        ui::style_text(
            &format!("As of {}", rates.fetched_at().format("%Y-%m-%d %H:%M:%S UTC")),
            StyleType::Subtle
        )
    );
    Ok(())
}
