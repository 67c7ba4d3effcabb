//! Daily horoscope via the Aztro API

use std::time::Duration;

use anyhow::Result;
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::AssistantError;
use crate::services::{http_client, read_json};

const AZTRO_URL: &str = "https://aztro.sameerkumar.website/";

#[derive(Debug, Default, Deserialize)]
pub struct Reading {
    #[serde(default)]
    pub description: String,
    pub mood: Option<String>,
    pub compatibility: Option<String>,
    pub color: Option<String>,
    pub lucky_number: Option<String>,
    pub lucky_time: Option<String>,
}

/// Description, then each present detail, joined with ". "
pub fn render(reading: &Reading) -> String {
    let details = [
        ("Mood", &reading.mood),
        ("Compatibility", &reading.compatibility),
        ("Color", &reading.color),
        ("Lucky number", &reading.lucky_number),
        ("Lucky time", &reading.lucky_time),
    ];

    let mut parts = Vec::new();
    if !reading.description.is_empty() {
        parts.push(reading.description.clone());
    }
    for (label, value) in details {
        if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
            parts.push(format!("{}: {}", label, v));
        }
    }
    parts.join(". ")
}

pub struct HoroscopeClient {
    client: Client,
}

impl HoroscopeClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
        })
    }

    pub fn reading(&self, sign: &str, day: &str) -> Result<String, AssistantError> {
        let sign = sign.to_lowercase();
        debug!(sign = %sign, day, "fetching horoscope");

        let response = self
            .client
            .post(AZTRO_URL)
            .query(&[("sign", sign.as_str()), ("day", day)])
            .send()?;

        let reading: Reading = read_json(response)?;
        let text = render(&reading);
        if text.is_empty() {
            return Err(AssistantError::NotFound);
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_full() {
        let reading: Reading = serde_json::from_str(
            r#"{
                "description": "A good day to refactor",
                "mood": "Focused",
                "compatibility": "Virgo",
                "color": "Orange",
                "lucky_number": "7",
                "lucky_time": "9am"
            }"#,
        )
        .unwrap();

        assert_eq!(
            render(&reading),
            "A good day to refactor. Mood: Focused. Compatibility: Virgo. Color: Orange. Lucky number: 7. Lucky time: 9am"
        );
    }

    #[test]
    fn test_render_skips_missing() {
        let reading = Reading {
            description: "Calm".to_string(),
            color: Some("Blue".to_string()),
            ..Default::default()
        };
        assert_eq!(render(&reading), "Calm. Color: Blue");
    }
}
