//! Terminal front end driving the exchange widget

pub mod exchange;
pub mod rates;
pub mod setup;
pub mod ui;
pub mod watch;

pub use exchange::ExchangeRequest;
pub use watch::WatchRequest;
