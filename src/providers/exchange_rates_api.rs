use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, instrument};

use crate::core::currency::Currency;
use crate::core::rates::{RateSource, RateTable};

// ExchangeRatesApiProvider implementation for RateSource
pub struct ExchangeRatesApiProvider {
    base_url: String,
}

impl ExchangeRatesApiProvider {
    pub fn new(base_url: &str) -> Self {
        ExchangeRatesApiProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    rates: HashMap<String, f64>,
}

#[async_trait]
impl RateSource for ExchangeRatesApiProvider {
    #[instrument(name = "LatestRatesFetch", skip(self), fields(base = %base))]
    async fn fetch_rates(&self, base: Currency) -> Result<RateTable> {
        let symbols = Currency::ALL
            .iter()
            .filter(|currency| **currency != base)
            .map(Currency::code)
            .collect::<Vec<_>>()
            .join(",");
        let url = format!("{}/latest?base={}&symbols={}", self.base_url, base, symbols);
        debug!("Requesting exchange rates from {}", url);

        let client = reqwest::Client::builder().user_agent("xchg/1.0").build()?;

        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for base currency: {}", e, base))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for base currency: {}",
                response.status(),
                base
            ));
        }

        let text = response.text().await?;

        let data: LatestRatesResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", base, e))?;

        let quotes = data.rates.iter().filter_map(|(code, rate)| match code.parse::<Currency>() {
            Ok(currency) => Some((currency, *rate)),
            Err(_) => {
                debug!("Ignoring rate for unsupported currency {}", code);
                None
            }
        });

        Ok(RateTable::new(base, quotes)?)
    }
}
