//! End-to-end dispatch with in-memory collaborators

use std::collections::HashMap;
use std::sync::Arc;

use dadu_core::actions::{RecordingLauncher, RecordingVolume, VolumeAction, VolumeControl};
use dadu_core::assistant::GOODBYE;
use dadu_core::currency::convert_currency;
use dadu_core::geo::{known_city, Geocoder, Located, LocationSource};
use dadu_core::router::NOT_UNDERSTOOD;
use dadu_core::routes::map_url;
use dadu_core::services::Lookups;
use dadu_core::speech::{RecordingSpeaker, ScriptedListener};
use dadu_core::{Assistant, AssistantConfig, AssistantError, Collaborators, Command, GeoPoint};

// ============================================================================
// Fakes
// ============================================================================

#[derive(Default)]
struct FakeLookups {
    weather: Option<Result<String, AssistantError>>,
    wikipedia: Option<Result<String, AssistantError>>,
    headlines: Vec<String>,
    rates: HashMap<String, HashMap<String, f64>>,
}

impl Lookups for FakeLookups {
    fn weather(&self, _city: &str) -> Result<String, AssistantError> {
        self.weather
            .clone()
            .unwrap_or(Err(AssistantError::NoCredentials { what: "openweather" }))
    }

    fn news(&self, _category: &str, limit: usize) -> Result<Vec<String>, AssistantError> {
        Ok(self.headlines.iter().take(limit).cloned().collect())
    }

    fn wikipedia(&self, _topic: &str) -> Result<String, AssistantError> {
        self.wikipedia.clone().unwrap_or(Err(AssistantError::NotFound))
    }

    fn horoscope(&self, sign: &str, day: &str) -> Result<String, AssistantError> {
        Ok(format!("{} {}: a good day", sign, day))
    }

    fn recipe(&self, _dish: &str) -> Result<String, AssistantError> {
        Err(AssistantError::NotFound)
    }

    fn currency_rates(&self, from: &str) -> Result<HashMap<String, f64>, AssistantError> {
        self.rates
            .get(from)
            .cloned()
            .ok_or(AssistantError::Api { status: 404 })
    }

    fn spotify_track(&self, _query: &str) -> Result<Option<String>, AssistantError> {
        Err(AssistantError::NoCredentials { what: "spotify" })
    }
}

struct TableGeocoder;

impl Geocoder for TableGeocoder {
    fn geocode(&self, place: &str) -> anyhow::Result<Option<GeoPoint>> {
        Ok(known_city(place))
    }
}

struct FixedLocation(Option<&'static str>);

impl LocationSource for FixedLocation {
    fn locate(&self) -> Option<Located> {
        self.0.map(|name| Located {
            name: name.to_string(),
            point: None,
        })
    }
}

struct SharedVolume(Arc<RecordingVolume>);

impl VolumeControl for SharedVolume {
    fn apply(&self, action: VolumeAction) -> anyhow::Result<()> {
        self.0.apply(action)
    }
}

struct Harness {
    assistant: Assistant,
    speaker: Arc<RecordingSpeaker>,
    volume: Arc<RecordingVolume>,
}

fn harness_with(lookups: FakeLookups, here: Option<&'static str>) -> Harness {
    let speaker = Arc::new(RecordingSpeaker::new());
    let volume = Arc::new(RecordingVolume::new());

    let collab = Collaborators {
        speaker: speaker.clone(),
        launcher: Box::new(RecordingLauncher::new()),
        volume: Box::new(SharedVolume(volume.clone())),
        lookups: Box::new(lookups),
        geocoder: Box::new(TableGeocoder),
        location: Box::new(FixedLocation(here)),
    };
    let assistant = Assistant::new(collab, &AssistantConfig::default()).unwrap();

    Harness {
        assistant,
        speaker,
        volume,
    }
}

fn harness() -> Harness {
    harness_with(FakeLookups::default(), Some("chicago"))
}

// ============================================================================
// Handlers
// ============================================================================

#[test]
fn test_weather_without_key_opens_site() {
    let h = harness();
    let outcome = h.assistant.handle("what's the weather in paris");

    assert_eq!(outcome.payload.command, Command::Weather);
    assert_eq!(outcome.opened, vec!["https://www.weather.com/search?q=paris"]);
    assert!(outcome.replies[0].contains("OpenWeather API key"));
}

#[test]
fn test_weather_summary_spoken() {
    let lookups = FakeLookups {
        weather: Some(Ok("Weather in Paris: Clear Sky".to_string())),
        ..FakeLookups::default()
    };
    let h = harness_with(lookups, None);
    let outcome = h.assistant.handle("weather in paris");

    assert_eq!(outcome.replies, vec!["Weather in Paris: Clear Sky"]);
    assert!(outcome.opened.is_empty());
    assert_eq!(h.speaker.lines(), outcome.replies);
}

#[test]
fn test_route_opens_cheapest_map() {
    let h = harness();
    let outcome = h.assistant.handle("directions to new york");

    assert_eq!(outcome.replies[0], "Finding best routes to new york");
    assert_eq!(outcome.replies[1], "Found 3 route options for you.");
    assert!(outcome.replies[2].starts_with("Option 1: Fastest Route."));
    assert!(outcome.replies[3].starts_with("Option 2: Cheapest Route."));
    assert!(outcome.replies[4].starts_with("Option 3: Balanced Route."));
    assert_eq!(outcome.opened, vec![map_url("chicago", "new york")]);
}

#[test]
fn test_route_unknown_destination_falls_back() {
    let h = harness();
    let outcome = h.assistant.handle("directions to atlantis");

    assert_eq!(
        outcome.replies.last().unwrap(),
        "Sorry, I couldn't find routes to atlantis. Error: destination not found: atlantis"
    );
    assert_eq!(
        outcome.opened,
        vec!["https://www.google.com/maps/dir/?daddr=atlantis"]
    );
}

#[test]
fn test_route_without_location() {
    let h = harness_with(FakeLookups::default(), None);
    let outcome = h.assistant.handle("navigate to boston");

    assert!(outcome.replies[1].contains("could not detect current location"));
    assert_eq!(outcome.opened.len(), 1);
}

#[test]
fn test_conversion_tries_currency_first() {
    let mut rates = HashMap::new();
    rates.insert(
        "USD".to_string(),
        HashMap::from([("EUR".to_string(), 0.9)]),
    );
    let h = harness_with(
        FakeLookups {
            rates,
            ..FakeLookups::default()
        },
        None,
    );

    let outcome = h.assistant.handle("convert 100 usd to eur");
    assert_eq!(outcome.replies, vec!["100 USD is 90.00 EUR"]);

    let outcome = h.assistant.handle("convert 100 km to miles");
    assert_eq!(outcome.replies, vec!["100 km is 62.14 miles"]);
}

#[test]
fn test_conversion_cross_family() {
    let h = harness();
    let outcome = h.assistant.handle("convert 5 km to kg");
    assert!(outcome.replies[0].starts_with("Sorry, I couldn't convert km to kg."));
}

#[test]
fn test_conversion_missing_slot_asks() {
    let h = harness();
    let outcome = h.assistant.handle("convert something");
    assert!(outcome.replies[0].starts_with("Please say something like"));
}

#[test]
fn test_timer_reply() {
    let h = harness();
    let outcome = h.assistant.handle("set timer for 5 minutes");
    assert_eq!(outcome.replies, vec!["Timer set for 5 minutes"]);
}

#[test]
fn test_pending_timer_announces_before_shutdown() {
    let h = harness();
    let outcome = h.assistant.handle("set timer for 1 seconds");
    assert_eq!(outcome.replies, vec!["Timer set for 1 seconds"]);
    assert_eq!(h.assistant.pending_timers(), 1);

    h.assistant.wait_for_timers();
    assert_eq!(h.assistant.pending_timers(), 0);
    assert_eq!(h.speaker.lines().last().map(String::as_str), Some("Timer finished"));
}

#[test]
fn test_alarm_in_past_rolls_forward() {
    let h = harness();
    // Midnight today is never in the future
    let outcome = h.assistant.handle("set alarm at 12 am");

    assert_eq!(
        outcome.replies,
        vec![
            "That time is in the past. I will set it for tomorrow at that time.",
            "Alarm set for 0:00 tomorrow.",
        ]
    );
    assert_eq!(h.assistant.pending_timers(), 1);
}

#[test]
fn test_volume_applied() {
    let h = harness();
    let outcome = h.assistant.handle("decrease volume");

    assert_eq!(outcome.replies, vec!["Decreasing volume"]);
    assert_eq!(h.volume.applied(), vec![VolumeAction::Down]);
}

#[test]
fn test_wikipedia_disambiguation() {
    let lookups = FakeLookups {
        wikipedia: Some(Err(AssistantError::Disambiguation {
            options: vec!["Mercury (planet)".to_string()],
        })),
        ..FakeLookups::default()
    };
    let h = harness_with(lookups, None);
    let outcome = h.assistant.handle("wikipedia mercury");

    assert_eq!(
        outcome.replies.last().unwrap(),
        "Multiple results for mercury. Opening Wikipedia to choose."
    );
    assert_eq!(outcome.opened, vec!["https://en.wikipedia.org/wiki/mercury"]);
}

#[test]
fn test_news_headlines_limited() {
    let lookups = FakeLookups {
        headlines: ["One", "Two", "Three", "Four"].map(String::from).to_vec(),
        ..FakeLookups::default()
    };
    let h = harness_with(lookups, None);
    let outcome = h.assistant.handle("news about sports");

    assert_eq!(outcome.replies[0], "Fetching sports news headlines for you.");
    assert_eq!(outcome.replies[1], "Headline 1: One");
    assert_eq!(outcome.replies[3], "Headline 3: Three");
    assert_eq!(outcome.replies.len(), 5);
    assert_eq!(outcome.opened, vec!["https://news.google.com/topstories"]);
}

#[test]
fn test_recipe_always_opens_search() {
    let h = harness();
    let outcome = h.assistant.handle("recipe for pancakes");

    assert_eq!(outcome.replies[0], "Finding recipe for pancakes");
    assert_eq!(
        outcome.opened,
        vec!["https://www.allrecipes.com/search/results/?wt=pancakes&sort=re"]
    );
}

#[test]
fn test_spotify_without_credentials_searches() {
    let h = harness();
    let outcome = h.assistant.handle("spotify bohemian rhapsody");
    assert_eq!(
        outcome.opened,
        vec!["https://open.spotify.com/search/bohemian%20rhapsody"]
    );
}

#[test]
fn test_horoscope() {
    let h = harness();
    let outcome = h.assistant.handle("horoscope for leo");
    assert_eq!(outcome.replies, vec!["leo today: a good day"]);
}

#[test]
fn test_exit_and_unknown() {
    let h = harness();

    let outcome = h.assistant.handle("exit");
    assert!(outcome.exit);
    assert_eq!(outcome.replies, vec![GOODBYE]);

    let outcome = h.assistant.handle("hello there");
    assert!(!outcome.exit);
    assert_eq!(outcome.replies, vec![NOT_UNDERSTOOD]);
    assert!(outcome.opened.is_empty());
}

// ============================================================================
// Session Loop
// ============================================================================

#[test]
fn test_session_waits_for_wake_word() {
    let h = harness();
    let mut input = ScriptedListener::new([
        "hello",
        "dadu",
        "what is the date",
        "exit",
        "tell me a joke",
    ]);
    let mut commands = Vec::new();

    let exited = h
        .assistant
        .run_session(&mut input, Some("dadu"), |o| commands.push(o.payload.command));

    assert!(exited);
    assert_eq!(commands, vec![Command::Date, Command::Exit]);
    assert_eq!(h.speaker.lines()[0], "Yes, how can I help you?");
}

#[test]
fn test_session_inline_command_then_close() {
    let h = harness();
    let mut input = ScriptedListener::new(["Dadu, what time is it"]);
    let mut commands = Vec::new();

    let exited = h
        .assistant
        .run_session(&mut input, Some("dadu"), |o| commands.push(o.payload.command));

    assert!(!exited);
    assert_eq!(commands, vec![Command::Time]);
}

#[test]
fn test_session_without_wake_word() {
    let h = harness();
    let mut input = ScriptedListener::new(["mute volume", "exit"]);

    assert!(h.assistant.run_session(&mut input, None, |_| {}));
    assert_eq!(h.volume.applied(), vec![VolumeAction::Mute]);
}

// ============================================================================
// Currency
// ============================================================================

#[test]
fn test_convert_currency_unknown_target() {
    let mut rates = HashMap::new();
    rates.insert("USD".to_string(), HashMap::from([("INR".to_string(), 83.0)]));
    let lookups = FakeLookups {
        rates,
        ..FakeLookups::default()
    };

    assert_eq!(
        convert_currency(&lookups, 2.0, "usd", "inr").unwrap(),
        "2 USD is 166.00 INR"
    );
    assert_eq!(
        convert_currency(&lookups, 2.0, "usd", "xyz"),
        Err(AssistantError::CurrencyNotFound {
            code: "XYZ".to_string()
        })
    );
    assert_eq!(
        convert_currency(&lookups, 2.0, "abc", "usd"),
        Err(AssistantError::Api { status: 404 })
    );
}
