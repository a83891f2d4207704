//! Core domain types and abstractions

pub mod account;
pub mod config;
pub mod currency;
pub mod input;
pub mod log;
pub mod rates;
pub mod render;

// Re-export main types for cleaner imports
pub use account::{Account, AccountError};
pub use currency::{Currency, CurrencyPair};
pub use rates::{Converter, RateSource, RateTable, make_converter};
