//! Wikipedia page summaries via the REST API

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::error::AssistantError;
use crate::services::read_json;

const SUMMARY_URL: &str = "https://en.wikipedia.org/api/rest_v1/page/summary";
const OPENSEARCH_URL: &str = "https://en.wikipedia.org/w/api.php";
const USER_AGENT: &str = "daduAssistant";

const SUMMARY_SENTENCES: usize = 2;
const DISAMBIGUATION_OPTIONS: usize = 3;

#[derive(Debug, Deserialize)]
pub struct PageSummary {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub extract: String,
}

/// The first `n` sentences of `text`. A sentence ends at '.', '!' or '?'
/// followed by whitespace or the end of the text.
pub fn first_sentences(text: &str, n: usize) -> String {
    let mut count = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            let at_boundary = chars.peek().map_or(true, |(_, next)| next.is_whitespace());
            if at_boundary {
                count += 1;
                if count == n {
                    return text[..i + c.len_utf8()].trim().to_string();
                }
            }
        }
    }
    text.trim().to_string()
}

pub struct WikipediaClient {
    client: Client,
}

impl WikipediaClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }

    /// Top opensearch titles for `topic`
    fn suggestions(&self, topic: &str) -> Vec<String> {
        let limit = DISAMBIGUATION_OPTIONS.to_string();
        let response = self
            .client
            .get(OPENSEARCH_URL)
            .query(&[
                ("action", "opensearch"),
                ("search", topic),
                ("limit", limit.as_str()),
                ("format", "json"),
            ])
            .send();

        response
            .ok()
            .and_then(|r| r.json::<serde_json::Value>().ok())
            .map(|body| opensearch_titles(&body))
            .unwrap_or_default()
    }

    /// The page for an exact title, `None` when it does not exist
    fn page(&self, title: &str) -> Result<Option<PageSummary>, AssistantError> {
        let url = format!("{}/{}", SUMMARY_URL, urlencoding::encode(&page_title(title)));
        let response = self.client.get(&url).send()?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(read_json(response)?))
    }

    /// First two sentences of the article for `topic`. A topic with no page
    /// of its own is retried once with the best search match.
    pub fn summary(&self, topic: &str) -> Result<String, AssistantError> {
        debug!(topic, "fetching Wikipedia summary");

        let page = match self.page(topic)? {
            Some(page) => page,
            None => {
                let Some(title) = fallback_title(topic, &self.suggestions(topic)) else {
                    return Err(AssistantError::NotFound);
                };
                debug!(topic, %title, "no exact page, using search match");
                self.page(&title)?.ok_or(AssistantError::NotFound)?
            }
        };

        if page.kind == "disambiguation" {
            return Err(AssistantError::Disambiguation {
                options: self.suggestions(topic),
            });
        }
        if page.extract.trim().is_empty() {
            return Err(AssistantError::NotFound);
        }

        Ok(first_sentences(&page.extract, SUMMARY_SENTENCES))
    }
}

/// REST path form of a title: trimmed, spaces as underscores
fn page_title(topic: &str) -> String {
    topic.trim().replace(' ', "_")
}

/// Titles from an opensearch body: `[query, [titles], [descriptions], [urls]]`
fn opensearch_titles(body: &serde_json::Value) -> Vec<String> {
    body.get(1)
        .and_then(|titles| titles.as_array())
        .map(|titles| {
            titles
                .iter()
                .filter_map(|t| t.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// The top search match, unless it names the page that was already missing
fn fallback_title(topic: &str, titles: &[String]) -> Option<String> {
    let missing = page_title(topic);
    titles
        .first()
        .filter(|title| page_title(title) != missing)
        .cloned()
}
