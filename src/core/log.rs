// Logging initialization for the binary
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, filter::Targets, fmt, prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt,
};

const APP_TARGET: &str = "xchg";

/// Maps the number of `-v` flags to a level for this crate's events.
fn level_for(verbosity: u8) -> (LevelFilter, &'static str) {
    match verbosity {
        0 => (LevelFilter::WARN, "warn"),
        1 => (LevelFilter::DEBUG, "debug"),
        _ => (LevelFilter::TRACE, "trace"),
    }
}

pub fn init_logging(verbosity: u8) {
    let (level_filter, level) = level_for(verbosity);
    let app_filter = Targets::new().with_target(APP_TARGET, level_filter);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries the tables and quotes
    tracing_subscriber::registry()
        .with(fmt::layer().pretty().without_time().with_writer(std::io::stderr))
        .with(app_filter)
        .with(env_filter)
        .init();
}
