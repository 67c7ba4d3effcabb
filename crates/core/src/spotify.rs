//! Spotify Web API track search (client-credentials flow)

use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::Result;
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::AssistantError;
use crate::services::{http_client, read_json};

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const SEARCH_URL: &str = "https://api.spotify.com/v1/search";

// ============================================================================
// Token Cache
// ============================================================================

/// Cached access token for one client id
struct CachedToken {
    client_id: String,
    token: String,
    obtained_at: Instant,
}

impl CachedToken {
    fn is_valid_for(&self, client_id: &str) -> bool {
        // Tokens last an hour; refresh five minutes early
        self.client_id == client_id && self.obtained_at.elapsed() < Duration::from_secs(55 * 60)
    }
}

#[derive(Deserialize, Debug)]
struct TokenResponse {
    access_token: String,
}

// ============================================================================
// Search Response
// ============================================================================

#[derive(Deserialize, Debug)]
pub struct SearchResponse {
    #[serde(default)]
    pub tracks: Option<TrackPage>,
}

#[derive(Deserialize, Debug)]
pub struct TrackPage {
    #[serde(default)]
    pub items: Vec<Track>,
}

#[derive(Deserialize, Debug)]
pub struct Track {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

pub fn track_url(id: &str) -> String {
    format!("https://open.spotify.com/track/{}", id)
}

pub fn search_url(query: &str) -> String {
    format!("https://open.spotify.com/search/{}", urlencoding::encode(query))
}

// ============================================================================
// Client
// ============================================================================

pub struct SpotifyClient {
    client: Client,
    cached_token: Mutex<Option<CachedToken>>,
}

impl SpotifyClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            cached_token: Mutex::new(None),
        })
    }

    fn access_token(&self, client_id: &str, client_secret: &str) -> Result<String, AssistantError> {
        let mut cached = self
            .cached_token
            .lock()
            .map_err(|_| AssistantError::other("token cache poisoned"))?;

        if let Some(ref token) = *cached {
            if token.is_valid_for(client_id) {
                return Ok(token.token.clone());
            }
        }

        debug!("obtaining new Spotify access token");
        let response = self
            .client
            .post(TOKEN_URL)
            .basic_auth(client_id, Some(client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()?;

        let token: TokenResponse = read_json(response)?;

        *cached = Some(CachedToken {
            client_id: client_id.to_string(),
            token: token.access_token.clone(),
            obtained_at: Instant::now(),
        });

        Ok(token.access_token)
    }

    /// Id of the top track for `query`
    pub fn top_track(
        &self,
        query: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<Option<String>, AssistantError> {
        let token = self.access_token(client_id, client_secret)?;

        let response = self
            .client
            .get(SEARCH_URL)
            .bearer_auth(token)
            .query(&[("q", query), ("type", "track"), ("limit", "1")])
            .send()?;

        let found: SearchResponse = read_json(response)?;
        let track = found.tracks.and_then(|page| page.items.into_iter().next());
        if let Some(ref t) = track {
            debug!(track = %t.name, "top Spotify match");
        }
        Ok(track.map(|t| t.id))
    }
}
