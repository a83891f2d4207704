use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::core::currency::Currency;
use crate::core::input;
use crate::core::render::render_currency;

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    Label,
    Credit,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::Label => style(text).bold(),
        StyleType::Credit => style(text).green().bold(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

/// Creates a new `comfy_table::Table` with standard styling.
pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Creates a styled header cell for a table.
pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

/// Right aligned amount rendered with its currency symbol and two decimals.
pub fn amount_cell(value: f64, currency: Currency) -> Cell {
    Cell::new(render_currency(value, currency, Some(2))).set_alignment(CellAlignment::Right)
}

/// Formats a bucket amount the way the amount field shows it, with two
/// decimals, or "N/A" for an empty bucket.
pub fn format_amount(amount: Option<f64>, currency: Currency) -> String {
    match amount {
        Some(_) => format!("{}{}", currency.symbol(), input::format_amount(amount)),
        None => "N/A".to_string(),
    }
}

/// Creates a ticking spinner shown while waiting on the network.
pub fn new_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
