//! Third-party lookups behind one seam
//!
//! [`Lookups`] is what the assistant needs from the outside world. The
//! production [`WebServices`] wires the individual HTTP clients together and
//! resolves their credentials lazily, so a key is only asked for when the
//! feature that needs it is used.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;

use crate::config::{
    CredentialChain, GNEWS_API_KEY, NEWS_API_KEY, OPENWEATHER_API_KEY, SPOTIFY_CLIENT_ID,
    SPOTIFY_CLIENT_SECRET,
};
use crate::currency::CurrencyClient;
use crate::error::AssistantError;
use crate::horoscope::HoroscopeClient;
use crate::news::NewsClient;
use crate::recipe::RecipeClient;
use crate::spotify::SpotifyClient;
use crate::weather::WeatherClient;
use crate::wikipedia::WikipediaClient;

/// Content lookups, each answering with text or a typed failure
pub trait Lookups: Send + Sync {
    fn weather(&self, city: &str) -> Result<String, AssistantError>;
    fn news(&self, category: &str, limit: usize) -> Result<Vec<String>, AssistantError>;
    fn wikipedia(&self, topic: &str) -> Result<String, AssistantError>;
    fn horoscope(&self, sign: &str, day: &str) -> Result<String, AssistantError>;
    fn recipe(&self, dish: &str) -> Result<String, AssistantError>;
    /// Rates from one currency to every other, keyed by upper-case code
    fn currency_rates(&self, from: &str) -> Result<HashMap<String, f64>, AssistantError>;
    /// Track id of the best match, `None` when nothing matched
    fn spotify_track(&self, query: &str) -> Result<Option<String>, AssistantError>;
}

// ============================================================================
// HTTP Helpers
// ============================================================================

pub(crate) fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to create HTTP client")
}

/// Map a non-success status to `Api{status}`, otherwise decode the body
pub(crate) fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, AssistantError> {
    let status = response.status();
    if !status.is_success() {
        return Err(AssistantError::Api {
            status: status.as_u16(),
        });
    }
    let body = response.text()?;
    serde_json::from_str(&body).map_err(AssistantError::other)
}

// ============================================================================
// Production Wiring
// ============================================================================

pub struct WebServices {
    credentials: Arc<CredentialChain>,
    weather: WeatherClient,
    news: NewsClient,
    wikipedia: WikipediaClient,
    horoscope: HoroscopeClient,
    recipe: RecipeClient,
    currency: CurrencyClient,
    spotify: SpotifyClient,
}

impl WebServices {
    pub fn new(credentials: Arc<CredentialChain>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            credentials,
            weather: WeatherClient::new(timeout)?,
            news: NewsClient::new(timeout)?,
            wikipedia: WikipediaClient::new(timeout)?,
            horoscope: HoroscopeClient::new(timeout)?,
            recipe: RecipeClient::new(timeout)?,
            currency: CurrencyClient::new(timeout)?,
            spotify: SpotifyClient::new(timeout)?,
        })
    }
}

impl Lookups for WebServices {
    fn weather(&self, city: &str) -> Result<String, AssistantError> {
        let key = self
            .credentials
            .resolve(OPENWEATHER_API_KEY)
            .ok_or(AssistantError::NoCredentials { what: "openweather" })?;
        self.weather.current(city, &key)
    }

    fn news(&self, category: &str, limit: usize) -> Result<Vec<String>, AssistantError> {
        let news_key = self.credentials.resolve_quiet(NEWS_API_KEY);
        let gnews_key = self.credentials.resolve_quiet(GNEWS_API_KEY);
        self.news
            .headlines(category, limit, news_key.as_deref(), gnews_key.as_deref())
    }

    fn wikipedia(&self, topic: &str) -> Result<String, AssistantError> {
        self.wikipedia.summary(topic)
    }

    fn horoscope(&self, sign: &str, day: &str) -> Result<String, AssistantError> {
        self.horoscope.reading(sign, day)
    }

    fn recipe(&self, dish: &str) -> Result<String, AssistantError> {
        self.recipe.search(dish)
    }

    fn currency_rates(&self, from: &str) -> Result<HashMap<String, f64>, AssistantError> {
        self.currency.rates(from)
    }

    fn spotify_track(&self, query: &str) -> Result<Option<String>, AssistantError> {
        let id = self.credentials.resolve_quiet(SPOTIFY_CLIENT_ID);
        let secret = self.credentials.resolve_quiet(SPOTIFY_CLIENT_SECRET);
        match (id, secret) {
            (Some(id), Some(secret)) => self.spotify.top_track(query, &id, &secret),
            _ => Err(AssistantError::NoCredentials { what: "spotify" }),
        }
    }
}
