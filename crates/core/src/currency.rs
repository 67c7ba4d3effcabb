//! Currency conversion from exchangerate-api.com rates

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::AssistantError;
use crate::services::{http_client, read_json, Lookups};

const RATES_URL: &str = "https://api.exchangerate-api.com/v4/latest";

#[derive(Debug, Deserialize)]
struct RatesResponse {
    #[serde(default)]
    rates: HashMap<String, f64>,
}

pub struct CurrencyClient {
    client: Client,
}

impl CurrencyClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
        })
    }

    pub fn rates(&self, from: &str) -> Result<HashMap<String, f64>, AssistantError> {
        let code = from.to_uppercase();
        debug!(code = %code, "fetching exchange rates");
        let url = format!("{}/{}", RATES_URL, urlencoding::encode(&code));

        let data: RatesResponse = read_json(self.client.get(&url).send()?)?;
        Ok(data.rates)
    }
}

/// Convert through the rate table for `from`.
///
/// Result text: `<amount> <FROM> is <x.xx> <TO>`.
pub fn convert_currency(
    lookups: &dyn Lookups,
    amount: f64,
    from: &str,
    to: &str,
) -> Result<String, AssistantError> {
    let from = from.to_uppercase();
    let to = to.to_uppercase();

    let rates = lookups.currency_rates(&from)?;
    let rate = rates
        .get(&to)
        .copied()
        .ok_or_else(|| AssistantError::CurrencyNotFound { code: to.clone() })?;

    Ok(format!("{} {} is {:.2} {}", amount, from, amount * rate, to))
}
