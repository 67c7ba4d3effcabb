//! OpenWeatherMap current-weather client

use std::time::Duration;

use anyhow::Result;
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::AssistantError;
use crate::services::{http_client, read_json};
use crate::types::title_case;

const OPENWEATHER_URL: &str = "http://api.openweathermap.org/data/2.5/weather";

#[derive(Debug, Deserialize)]
pub struct WeatherResponse {
    #[serde(default)]
    pub weather: Vec<Condition>,
    #[serde(default)]
    pub main: Option<MainReadings>,
    #[serde(default)]
    pub wind: Option<Wind>,
}

#[derive(Debug, Deserialize)]
pub struct Condition {
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct MainReadings {
    pub temp: Option<f64>,
    pub feels_like: Option<f64>,
    pub humidity: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct Wind {
    pub speed: Option<f64>,
}

/// "Clear sky" from "clear sky"
fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// `Weather in <City>: <Description>, Temperature T°C, feels like F°C, humidity H%, wind W m/s`
///
/// Readings missing from the response are left out.
pub fn summarize(city: &str, data: &WeatherResponse) -> String {
    let mut parts = Vec::new();

    if let Some(desc) = data.weather.first().map(|c| c.description.as_str()) {
        if !desc.is_empty() {
            parts.push(capitalize_first(desc));
        }
    }
    if let Some(ref main) = data.main {
        if let Some(temp) = main.temp {
            parts.push(format!("Temperature {}°C", temp));
        }
        if let Some(feels) = main.feels_like {
            parts.push(format!("feels like {}°C", feels));
        }
        if let Some(humidity) = main.humidity {
            parts.push(format!("humidity {}%", humidity));
        }
    }
    if let Some(speed) = data.wind.as_ref().and_then(|w| w.speed) {
        parts.push(format!("wind {} m/s", speed));
    }

    format!("Weather in {}: {}", title_case(city), parts.join(", "))
}

pub struct WeatherClient {
    client: Client,
}

impl WeatherClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
        })
    }

    pub fn current(&self, city: &str, api_key: &str) -> Result<String, AssistantError> {
        debug!(city, "fetching weather");
        let response = self
            .client
            .get(OPENWEATHER_URL)
            .query(&[("q", city), ("appid", api_key), ("units", "metric")])
            .send()?;

        let data: WeatherResponse = read_json(response)?;
        Ok(summarize(city, &data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_format() {
        let data: WeatherResponse = serde_json::from_str(
            r#"{
                "weather": [{"description": "light rain"}],
                "main": {"temp": 12.5, "feels_like": 11.0, "humidity": 80},
                "wind": {"speed": 4.1}
            }"#,
        )
        .unwrap();

        assert_eq!(
            summarize("new york", &data),
            "Weather in New York: Light rain, Temperature 12.5°C, feels like 11°C, humidity 80%, wind 4.1 m/s"
        );
    }

    #[test]
    fn test_summary_partial() {
        let data: WeatherResponse = serde_json::from_str(r#"{"main": {"temp": -3.2}}"#).unwrap();
        assert_eq!(summarize("oslo", &data), "Weather in Oslo: Temperature -3.2°C");
    }
}
