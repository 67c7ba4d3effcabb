//! Domain models shared by the router, the slot extractor and the handlers
//!
//! This module contains:
//! - Intent categories and the handler keys the predicate table dispatches to
//! - Extracted slots and the intent payload
//! - Routing decisions
//! - Clock formatting helpers for the time/date replies

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};

// ============================================================================
// Intents and Commands
// ============================================================================

/// Intent categories an utterance can resolve to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Search,
    Media,
    Website,
    Weather,
    Volume,
    Wikipedia,
    SmallTalk,
    Currency,
    UnitConvert,
    Timer,
    Alarm,
    Recipe,
    Time,
    Date,
    Joke,
    News,
    Route,
    Exit,
    Horoscope,
    Unknown,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Search => "search",
            Intent::Media => "media",
            Intent::Website => "website",
            Intent::Weather => "weather",
            Intent::Volume => "volume",
            Intent::Wikipedia => "wikipedia",
            Intent::SmallTalk => "small_talk",
            Intent::Currency => "currency",
            Intent::UnitConvert => "unit_convert",
            Intent::Timer => "timer",
            Intent::Alarm => "alarm",
            Intent::Recipe => "recipe",
            Intent::Time => "time",
            Intent::Date => "date",
            Intent::Joke => "joke",
            Intent::News => "news",
            Intent::Route => "route",
            Intent::Exit => "exit",
            Intent::Horoscope => "horoscope",
            Intent::Unknown => "unknown",
        }
    }
}

/// Handler keys, one per row of the predicate table.
///
/// Several commands share an [`Intent`]: the intent is the category, the
/// command is which concrete handler runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Spotify,
    Youtube,
    Facebook,
    Instagram,
    Google,
    Weather,
    Mute,
    Unmute,
    VolumeUp,
    VolumeDown,
    Wikipedia,
    Stackoverflow,
    Name,
    Age,
    Tea,
    Currency,
    Convert,
    Timer,
    Alarm,
    PlayMusic,
    Recipe,
    Time,
    Date,
    Joke,
    News,
    Route,
    Exit,
    Horoscope,
    Unknown,
}

impl Command {
    pub fn intent(&self) -> Intent {
        match self {
            Command::Spotify | Command::Youtube | Command::PlayMusic => Intent::Media,
            Command::Facebook | Command::Instagram | Command::Stackoverflow => Intent::Website,
            Command::Google => Intent::Search,
            Command::Weather => Intent::Weather,
            Command::Mute | Command::Unmute | Command::VolumeUp | Command::VolumeDown => {
                Intent::Volume
            }
            Command::Wikipedia => Intent::Wikipedia,
            Command::Name | Command::Age | Command::Tea => Intent::SmallTalk,
            Command::Currency => Intent::Currency,
            Command::Convert => Intent::UnitConvert,
            Command::Timer => Intent::Timer,
            Command::Alarm => Intent::Alarm,
            Command::Recipe => Intent::Recipe,
            Command::Time => Intent::Time,
            Command::Date => Intent::Date,
            Command::Joke => Intent::Joke,
            Command::News => Intent::News,
            Command::Route => Intent::Route,
            Command::Exit => Intent::Exit,
            Command::Horoscope => Intent::Horoscope,
            Command::Unknown => Intent::Unknown,
        }
    }
}

// ============================================================================
// Slots
// ============================================================================

/// "<amount> <unit> to|into <unit>" parsed out of an utterance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionRequest {
    pub amount: f64,
    pub from_unit: String,
    pub to_unit: String,
}

/// A timer duration as spoken plus its length in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerRequest {
    pub amount: f64,
    pub unit: String,
    pub seconds: u64,
}

/// Wall-clock alarm time on a 24-hour clock.
///
/// Values come straight from the regex, so `hour` may be out of range
/// ("alarm at 27"); scheduling rejects those.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmTime {
    pub hour: u32,
    pub minute: u32,
}

/// Slots extracted from one utterance
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Slots {
    /// Free-text search query (web search, media)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    /// Destination, dish or topic left after stripping trigger phrases
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversion: Option<ConversionRequest>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timer: Option<TimerRequest>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub alarm: Option<AlarmTime>,

    /// News category
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Zodiac sign
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sign: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub day: Option<String>,
}

/// The classified utterance: which handler runs and with which slots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentPayload {
    pub utterance: String,
    pub command: Command,
    pub intent: Intent,
    #[serde(default)]
    pub slots: Slots,
}

// ============================================================================
// Decisions
// ============================================================================

/// Concrete actions a routed decision can invoke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    SpotifyPlay,
    YoutubePlay,
    OpenUrl,
    WebSearch,
    Weather,
    Volume,
    Wikipedia,
    Say,
    Convert,
    Timer,
    Alarm,
    PlayMusic,
    Recipe,
    Time,
    Date,
    Joke,
    News,
    Route,
    Horoscope,
    Exit,
}

/// Routing decision for one utterance
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Decision {
    Route {
        tool: Tool,
        args: serde_json::Value,
    },
    NeedInfo {
        question: String,
    },
    Reject {
        reason: String,
    },
}

// ============================================================================
// Geography
// ============================================================================

/// A point on the globe in degrees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            name: None,
        }
    }

    pub fn named(latitude: f64, longitude: f64, name: impl Into<String>) -> Self {
        Self {
            latitude,
            longitude,
            name: Some(name.into()),
        }
    }
}

// ============================================================================
// Clock Formatting
// ============================================================================

/// HH:MM:SS, as spoken by the time handler
pub fn format_clock<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format("%H:%M:%S").to_string()
}

/// DD:MM:YYYY, as spoken by the date handler
pub fn format_day<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format("%d:%m:%Y").to_string()
}

/// Current local time
pub fn now() -> DateTime<Local> {
    Local::now()
}

/// Title-case each word ("new york" -> "New York")
pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_command_intents() {
        assert_eq!(Command::Spotify.intent(), Intent::Media);
        assert_eq!(Command::Unmute.intent(), Intent::Volume);
        assert_eq!(Command::Convert.intent(), Intent::UnitConvert);
        assert_eq!(Command::Unknown.intent(), Intent::Unknown);
        assert_eq!(Command::Convert.intent().as_str(), "unit_convert");
        assert_eq!(Command::Tea.intent().as_str(), "small_talk");
    }

    #[test]
    fn test_decision_serialization() {
        let decision = Decision::NeedInfo {
            question: "Where to?".to_string(),
        };
        let json = serde_json::to_string(&decision).unwrap();
        assert!(json.contains("\"type\":\"need_info\""));

        let decision = Decision::Route {
            tool: Tool::WebSearch,
            args: serde_json::json!({"query": "rust"}),
        };
        let json = serde_json::to_string(&decision).unwrap();
        assert!(json.contains("\"tool\":\"web_search\""));
    }

    #[test]
    fn test_slots_skip_empty() {
        let slots = Slots {
            city: Some("paris".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&slots).unwrap();
        assert_eq!(json, "{\"city\":\"paris\"}");
    }

    #[test]
    fn test_clock_formats() {
        let at = chrono::Utc.with_ymd_and_hms(2026, 3, 7, 9, 5, 2).unwrap();
        assert_eq!(format_clock(&at), "09:05:02");
        assert_eq!(format_day(&at), "07:03:2026");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("new  york"), "New York");
        assert_eq!(title_case(""), "");
    }
}
