//! Slot extraction
//!
//! Deterministic pattern rules that pull parameters out of a lowercase
//! utterance. Every extractor returns `None` (or an empty string) when the
//! slot is absent; none of them fail.

use std::sync::LazyLock;

use chrono::{DateTime, Days, TimeZone};
use regex::Regex;

use crate::types::{AlarmTime, ConversionRequest, TimerRequest};

// ============================================================================
// Trigger Phrases
// ============================================================================

pub const SPOTIFY_TRIGGERS: &[&str] = &["spotify", "play"];

pub const YOUTUBE_TRIGGERS: &[&str] = &["youtube", "video", "song", "play"];

pub const SEARCH_TRIGGERS: &[&str] = &[
    "on google",
    "search for",
    "google",
    "search",
    "find",
    "please",
];

pub const WEATHER_STOP_WORDS: &[&str] = &[
    "what's",
    "whats",
    "what",
    "is",
    "the",
    "weather",
    "wether",
    "temperature",
    "temrature",
    "temp",
    "in",
    "at",
    "please",
    "show",
];

pub const WIKIPEDIA_TRIGGERS: &[&str] = &["wikipedia", "search", "about"];

pub const RECIPE_TRIGGERS: &[&str] = &[
    "recipe for",
    "recipe",
    "how to cook",
    "cook",
    "make",
    "please",
];

// Multi-word phrases come before their single-word parts
pub const ROUTE_TRIGGERS: &[&str] = &[
    "best route",
    "drive to",
    "route",
    "directions",
    "navigate",
    "to",
    "please",
];

pub const NEWS_CATEGORIES: &[&str] = &[
    "business",
    "entertainment",
    "health",
    "science",
    "sports",
    "technology",
];

pub const ZODIAC_SIGNS: &[&str] = &[
    "aries",
    "taurus",
    "gemini",
    "cancer",
    "leo",
    "virgo",
    "libra",
    "scorpio",
    "sagittarius",
    "capricorn",
    "aquarius",
    "pisces",
];

// ============================================================================
// Patterns
// ============================================================================

static CITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bin\s+([a-zA-Z \-]+)").expect("Invalid regex"));

static CONVERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+\.?\d*)\s+([a-zA-Z]+)\s+(?:to|into)\s+([a-zA-Z]+)").expect("Invalid regex")
});

static TIMER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:set )?(?:a )?timer(?: for)? (\d+\.?\d*)\s*(seconds|second|minutes|minute|hours|hour)?",
    )
    .expect("Invalid regex")
});

static ALARM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:set )?alarm (?:for|at)?\s*(\d{1,2})(?::(\d{2}))?\s*(am|pm)?")
        .expect("Invalid regex")
});

// ============================================================================
// Phrase Stripping
// ============================================================================

/// Remove each phrase, in order, wherever it occurs as whole words.
///
/// Matching is on word boundaries so "to" does not eat the front of
/// "toronto". Whitespace in the result is collapsed.
pub fn strip_phrases(text: &str, phrases: &[&str]) -> String {
    let mut words: Vec<&str> = text.split_whitespace().collect();

    for phrase in phrases {
        let needle: Vec<&str> = phrase.split_whitespace().collect();
        if needle.is_empty() {
            continue;
        }
        let mut i = 0;
        while i + needle.len() <= words.len() {
            if words[i..i + needle.len()] == needle[..] {
                words.drain(i..i + needle.len());
            } else {
                i += 1;
            }
        }
    }

    words.join(" ")
}

/// Strip trigger phrases and return what is left, or `None` when nothing is.
///
/// `None` means "ask the user to repeat with a target".
pub fn extract_target(utterance: &str, triggers: &[&str]) -> Option<String> {
    let rest = strip_phrases(utterance, triggers);
    if rest.is_empty() {
        None
    } else {
        Some(rest)
    }
}

// ============================================================================
// City
// ============================================================================

/// City for weather queries: "in <words>" first, else the utterance minus
/// stop words.
pub fn extract_city(utterance: &str) -> Option<String> {
    if let Some(caps) = CITY_RE.captures(utterance) {
        let city = caps[1].trim();
        if !city.is_empty() {
            return Some(city.to_string());
        }
    }
    extract_target(utterance, WEATHER_STOP_WORDS)
}

// ============================================================================
// Conversion
// ============================================================================

/// "<number> <word> to|into <word>"
pub fn extract_conversion(utterance: &str) -> Option<ConversionRequest> {
    let caps = CONVERSION_RE.captures(utterance)?;
    let amount: f64 = caps[1].parse().ok()?;

    Some(ConversionRequest {
        amount,
        from_unit: caps[2].to_lowercase(),
        to_unit: caps[3].to_lowercase(),
    })
}

// ============================================================================
// Timers and Alarms
// ============================================================================

/// Seconds per unit word. Prefix match on purpose: "min", "mins", "minute"
/// and "minutes" all count as minutes; anything else is seconds.
pub fn unit_multiplier(unit: &str) -> u64 {
    if unit.starts_with("min") {
        60
    } else if unit.starts_with("hour") {
        3600
    } else {
        1
    }
}

/// "set timer for 5 minutes", "timer 10 seconds". Unit defaults to seconds.
pub fn extract_timer(utterance: &str) -> Option<TimerRequest> {
    let caps = TIMER_RE.captures(utterance)?;
    let amount: f64 = caps[1].parse().ok()?;
    let unit = caps
        .get(2)
        .map(|m| m.as_str().to_lowercase())
        .unwrap_or_else(|| "seconds".to_string());

    let seconds = (amount * unit_multiplier(&unit) as f64) as u64;

    Some(TimerRequest {
        amount,
        unit,
        seconds,
    })
}

/// "set alarm for 7:30 pm", "alarm at 07:30", "alarm at 12 am".
///
/// 12-hour rule: pm with hour != 12 adds twelve, am with hour == 12 is
/// midnight. Range checking is left to [`alarm_today`].
pub fn extract_alarm(utterance: &str) -> Option<AlarmTime> {
    let caps = ALARM_RE.captures(utterance)?;
    let mut hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = match caps.get(2) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };

    match caps.get(3).map(|m| m.as_str()) {
        Some("pm") if hour != 12 => hour += 12,
        Some("am") if hour == 12 => hour = 0,
        _ => {}
    }

    Some(AlarmTime { hour, minute })
}

/// The alarm's time of day on `now`'s date. `None` if the time is invalid.
pub fn alarm_today<Tz: TimeZone>(now: &DateTime<Tz>, alarm: AlarmTime) -> Option<DateTime<Tz>> {
    let naive = now
        .date_naive()
        .and_hms_opt(alarm.hour, alarm.minute, 0)?;
    now.timezone().from_local_datetime(&naive).earliest()
}

/// Push an alarm exactly one day forward. Never further, even if the target
/// is still behind the clock.
pub fn roll_forward_one_day<Tz: TimeZone>(at: &DateTime<Tz>) -> Option<DateTime<Tz>> {
    at.clone().checked_add_days(Days::new(1))
}

// ============================================================================
// Categories
// ============================================================================

/// First known news category mentioned, else "general"
pub fn extract_news_category(utterance: &str) -> String {
    NEWS_CATEGORIES
        .iter()
        .find(|cat| utterance.contains(*cat))
        .map(|cat| cat.to_string())
        .unwrap_or_else(|| "general".to_string())
}

/// First zodiac sign named as a whole word
pub fn extract_sign(utterance: &str) -> Option<String> {
    utterance
        .split(|c: char| !c.is_alphabetic())
        .find(|word| ZODIAC_SIGNS.contains(word))
        .map(|word| word.to_string())
}

/// "today", "tomorrow" or "yesterday"; defaults to today
pub fn extract_day(utterance: &str) -> String {
    if utterance.contains("tomorrow") {
        "tomorrow".to_string()
    } else if utterance.contains("yesterday") {
        "yesterday".to_string()
    } else {
        "today".to_string()
    }
}

// ============================================================================
// Wake Word
// ============================================================================

/// If `text` starts with the wake word, return whatever follows it.
///
/// `Some("")` means the wake word was said on its own.
pub fn wake_command(text: &str, wake_word: &str) -> Option<String> {
    let lower = text.trim().to_lowercase();
    let wake = wake_word.trim().to_lowercase();
    if wake.is_empty() {
        return None;
    }

    let rest = lower.strip_prefix(&wake)?;
    if !rest.is_empty() && !rest.starts_with([',', ' ', '.', '!']) {
        // "daduism" is not the wake word
        return None;
    }
    Some(rest.trim_start_matches([',', ' ', '.', '!']).trim().to_string())
}
