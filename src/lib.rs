pub mod cli;
pub mod core;
pub mod feed;
pub mod providers;
pub mod store;
pub mod widget;

#[cfg(test)]
mod test_utils;

use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

use crate::cli::{ExchangeRequest, WatchRequest};
use crate::core::account::Account;
use crate::core::config::AppConfig;
use crate::feed::RateFeed;
use crate::providers::ExchangeRatesApiProvider;
use crate::store::MemoryAccount;

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    Rates,
    Exchange(ExchangeRequest),
    Watch(WatchRequest),
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("xchg starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load_or_default()?,
    };
    debug!("Loaded config: {config:#?}");

    let provider = ExchangeRatesApiProvider::new(&config.provider.base_url);
    let feed = RateFeed::new(
        Arc::new(provider),
        config.base_currency,
        config.poll_interval(),
    );
    let account: Arc<dyn Account> = Arc::new(MemoryAccount::new(
        config.balances.clone(),
        Arc::clone(&feed),
    ));

    match command {
        AppCommand::Rates => cli::rates::run(&feed).await,
        AppCommand::Exchange(request) => {
            cli::exchange::run(&feed, account, &request, &config.defaults).await
        }
        AppCommand::Watch(request) => {
            cli::watch::run(&feed, account, &request, &config.defaults).await
        }
    }
}
