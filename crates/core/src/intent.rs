//! Intent classification
//!
//! An ordered table of keyword rules, evaluated top to bottom; the first rule
//! with a keyword contained in the utterance wins. Keywords overlap on purpose
//! ("unmute volume" contains "mute volume", "play music" contains "play"), so
//! the table order is the behaviour and is pinned by tests.

use crate::slots::{
    extract_alarm, extract_city, extract_conversion, extract_day, extract_news_category,
    extract_sign, extract_target, extract_timer, RECIPE_TRIGGERS, ROUTE_TRIGGERS,
    SEARCH_TRIGGERS, SPOTIFY_TRIGGERS, WIKIPEDIA_TRIGGERS, YOUTUBE_TRIGGERS,
};
use crate::types::{Command, IntentPayload, Slots};

/// One row of the dispatch table: substring keywords and the handler key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub command: Command,
    pub keywords: &'static [&'static str],
}

impl Rule {
    pub const fn new(command: Command, keywords: &'static [&'static str]) -> Self {
        Self { command, keywords }
    }

    pub fn matches(&self, utterance: &str) -> bool {
        self.keywords.iter().any(|k| utterance.contains(k))
    }
}

pub const CANONICAL_RULES: &[Rule] = &[
    Rule::new(Command::Spotify, &["spotify"]),
    Rule::new(Command::Youtube, &["youtube", "video", "song", "play"]),
    Rule::new(Command::Facebook, &["facebook"]),
    Rule::new(Command::Instagram, &["instagram"]),
    Rule::new(Command::Google, &["google", "search", "search for"]),
    Rule::new(
        Command::Weather,
        &["weather", "wether", "temperature", "temrature", "temp"],
    ),
    Rule::new(Command::Mute, &["mute volume"]),
    // Never reached: "unmute volume" contains "mute volume"
    Rule::new(Command::Unmute, &["unmute volume"]),
    Rule::new(Command::VolumeUp, &["increase volume"]),
    Rule::new(Command::VolumeDown, &["decrease volume"]),
    Rule::new(Command::Wikipedia, &["wikipedia"]),
    Rule::new(Command::Stackoverflow, &["stackoverflow"]),
    Rule::new(Command::Name, &["name"]),
    Rule::new(Command::Age, &["age"]),
    Rule::new(Command::Tea, &["tea"]),
    Rule::new(Command::Currency, &["currency", "exchange"]),
    Rule::new(Command::Convert, &["convert"]),
    Rule::new(Command::Timer, &["timer", "set timer"]),
    Rule::new(Command::Alarm, &["alarm", "set alarm"]),
    // Shadowed by "play" in the youtube row
    Rule::new(Command::PlayMusic, &["play music"]),
    Rule::new(Command::Recipe, &["recipe", "cook"]),
    Rule::new(Command::Time, &["time"]),
    Rule::new(Command::Date, &["date"]),
    Rule::new(Command::Joke, &["joke"]),
    Rule::new(Command::News, &["news"]),
    Rule::new(
        Command::Route,
        &["route", "directions", "best route", "navigate", "drive to"],
    ),
    Rule::new(Command::Exit, &["exit"]),
    Rule::new(Command::Horoscope, &["horoscope"]),
];

// ============================================================================
// Router
// ============================================================================

#[derive(Debug, Clone)]
pub struct IntentRouter {
    rules: Vec<Rule>,
}

impl Default for IntentRouter {
    fn default() -> Self {
        Self::canonical()
    }
}

impl IntentRouter {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn canonical() -> Self {
        Self::new(CANONICAL_RULES.to_vec())
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Handler key of the first matching rule, or `Unknown`
    pub fn classify(&self, utterance: &str) -> Command {
        self.rules
            .iter()
            .find(|rule| rule.matches(utterance))
            .map(|rule| rule.command)
            .unwrap_or(Command::Unknown)
    }

    /// Classify and pull out the slots the chosen handler reads
    pub fn extract(&self, utterance: &str) -> IntentPayload {
        let text = utterance.trim().to_lowercase();
        let command = self.classify(&text);
        let slots = extract_slots(command, &text);

        IntentPayload {
            utterance: text,
            command,
            intent: command.intent(),
            slots,
        }
    }
}

fn extract_slots(command: Command, text: &str) -> Slots {
    let mut slots = Slots::default();

    match command {
        Command::Spotify => slots.query = extract_target(text, SPOTIFY_TRIGGERS),
        Command::Youtube => slots.query = extract_target(text, YOUTUBE_TRIGGERS),
        Command::Google => slots.query = extract_target(text, SEARCH_TRIGGERS),
        Command::Weather => slots.city = extract_city(text),
        Command::Wikipedia => slots.target = extract_target(text, WIKIPEDIA_TRIGGERS),
        Command::Currency | Command::Convert => slots.conversion = extract_conversion(text),
        // One handler for both; a duration wins over a clock time
        Command::Timer | Command::Alarm => {
            slots.timer = extract_timer(text);
            if slots.timer.is_none() {
                slots.alarm = extract_alarm(text);
            }
        }
        Command::Recipe => slots.target = extract_target(text, RECIPE_TRIGGERS),
        Command::News => slots.category = Some(extract_news_category(text)),
        Command::Route => slots.target = extract_target(text, ROUTE_TRIGGERS),
        Command::Horoscope => {
            slots.sign = extract_sign(text);
            slots.day = Some(extract_day(text));
        }
        _ => {}
    }

    slots
}

/// Classify with the canonical table
pub fn extract_intent(utterance: &str) -> IntentPayload {
    IntentRouter::canonical().extract(utterance)
}
