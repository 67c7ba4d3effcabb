//! Top headlines: NewsAPI first, GNews when it fails

use std::time::Duration;

use anyhow::Result;
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::AssistantError;
use crate::services::{http_client, read_json};

const NEWSAPI_URL: &str = "https://newsapi.org/v2/top-headlines";
const GNEWS_URL: &str = "https://gnews.io/api/v4/top-news";

#[derive(Debug, Deserialize)]
pub struct ArticleList {
    #[serde(default)]
    pub articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
pub struct Article {
    pub title: Option<String>,
}

pub fn titles(list: ArticleList, limit: usize) -> Vec<String> {
    list.articles
        .into_iter()
        .take(limit)
        .map(|a| a.title.unwrap_or_else(|| "Untitled".to_string()))
        .collect()
}

pub struct NewsClient {
    client: Client,
}

impl NewsClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
        })
    }

    fn newsapi(
        &self,
        category: &str,
        limit: usize,
        key: Option<&str>,
    ) -> Result<Vec<String>, AssistantError> {
        let limit_text = limit.to_string();
        let mut request = self.client.get(NEWSAPI_URL).query(&[
            ("country", "us"),
            ("category", category),
            ("sortBy", "publishedAt"),
            ("pageSize", limit_text.as_str()),
        ]);
        if let Some(key) = key {
            request = request.header("X-Api-Key", key);
        }
        let list: ArticleList = read_json(request.send()?)?;
        Ok(titles(list, limit))
    }

    fn gnews(
        &self,
        category: &str,
        limit: usize,
        key: Option<&str>,
    ) -> Result<Vec<String>, AssistantError> {
        let limit_text = limit.to_string();
        let mut request = self.client.get(GNEWS_URL).query(&[
            ("q", category),
            ("max", limit_text.as_str()),
            ("lang", "en"),
        ]);
        if let Some(key) = key {
            request = request.query(&[("token", key)]);
        }
        let list: ArticleList = read_json(request.send()?)?;
        Ok(titles(list, limit))
    }

    pub fn headlines(
        &self,
        category: &str,
        limit: usize,
        newsapi_key: Option<&str>,
        gnews_key: Option<&str>,
    ) -> Result<Vec<String>, AssistantError> {
        let category = category.to_lowercase();
        debug!(category = %category, limit, "fetching headlines");

        match self.newsapi(&category, limit, newsapi_key) {
            Ok(headlines) => Ok(headlines),
            Err(e) => {
                warn!("NewsAPI failed ({}), trying GNews", e.kind());
                self.gnews(&category, limit, gnews_key)
            }
        }
    }
}
