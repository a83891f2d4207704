//! Rendering of amounts with currency symbols

use super::currency::Currency;

pub fn render_currency(value: f64, currency: Currency, precision: Option<usize>) -> String {
    format!("{}{}", currency.symbol(), format_value(value, precision))
}

/// Renders an amount for an arbitrary currency code, falling back to
/// `"<CODE> <value>"` for codes outside the known set.
pub fn render_code(value: f64, code: &str, precision: Option<usize>) -> String {
    match code.parse::<Currency>() {
        Ok(currency) => render_currency(value, currency, precision),
        Err(_) => format!("{code} {}", format_value(value, precision)),
    }
}

fn format_value(value: f64, precision: Option<usize>) -> String {
    match precision {
        None => value.to_string(),
        Some(digits) => drop_zero_fraction(format!("{value:.digits$}")),
    }
}

// `2.0000` becomes `2`; any non-zero digit keeps the whole fraction.
fn drop_zero_fraction(text: String) -> String {
    match text.split_once('.') {
        Some((whole, fraction)) if fraction.bytes().all(|digit| digit == b'0') => whole.to_string(),
        _ => text,
    }
}
