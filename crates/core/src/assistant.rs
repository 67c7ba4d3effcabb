//! Dispatch: classify, decide, then run the handler for the decision
//!
//! Every handler recovers locally. Failures become a spoken fallback and,
//! where there is one, a browser action; nothing propagates to the loop.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::actions::{
    first_track, Launcher, RecordingLauncher, RecordingVolume, SystemLauncher, SystemVolume,
    VolumeAction, VolumeControl,
};
use crate::config::{AssistantConfig, CredentialChain};
use crate::currency::convert_currency;
use crate::error::AssistantError;
use crate::geo::{
    Geocoder, HomeLocation, IpLocation, LocationChain, LocationSource, NominatimGeocoder,
    PromptLocation,
};
use crate::intent::IntentRouter;
use crate::jokes;
use crate::router::{decide, decision_error};
use crate::routes::{RoutePlanner, VariantKind};
use crate::services::{Lookups, WebServices};
use crate::slots::{alarm_today, roll_forward_one_day, wake_command};
use crate::speech::{Heard, SpeechInput, SpeechOutput};
use crate::spotify;
use crate::timer::TimerScheduler;
use crate::types::{format_clock, format_day, now, AlarmTime, Decision, IntentPayload, Tool};
use crate::units;

pub const GOODBYE: &str = "Exiting, goodbye!";

// ============================================================================
// Collaborators
// ============================================================================

/// Everything the handlers touch outside the process
pub struct Collaborators {
    pub speaker: Arc<dyn SpeechOutput>,
    pub launcher: Box<dyn Launcher>,
    pub volume: Box<dyn VolumeControl>,
    pub lookups: Box<dyn Lookups>,
    pub geocoder: Box<dyn Geocoder + Send + Sync>,
    pub location: Box<dyn LocationSource + Send + Sync>,
}

impl Collaborators {
    /// Production wiring. `interactive` adds the terminal prompt as the last
    /// location layer; `dry_run` records browser and mixer actions instead of
    /// performing them.
    pub fn system(
        speaker: Arc<dyn SpeechOutput>,
        config: &AssistantConfig,
        credentials: Arc<CredentialChain>,
        interactive: bool,
        dry_run: bool,
    ) -> Result<Self> {
        let timeout = config.http_timeout();

        let mut location = LocationChain::new();
        if let Some(ref home) = config.home_location {
            location = location.with(HomeLocation { name: home.clone() });
        }
        location = location.with(IpLocation::new(timeout)?);
        if interactive {
            location = location.with(PromptLocation);
        }

        let launcher: Box<dyn Launcher> = if dry_run || !config.open_browser {
            Box::new(RecordingLauncher::new())
        } else {
            Box::new(SystemLauncher)
        };
        let volume: Box<dyn VolumeControl> = if dry_run {
            Box::new(RecordingVolume::new())
        } else {
            Box::new(SystemVolume)
        };

        Ok(Self {
            speaker,
            launcher,
            volume,
            lookups: Box::new(WebServices::new(credentials, timeout)?),
            geocoder: Box::new(NominatimGeocoder::new(timeout)?),
            location: Box::new(location),
        })
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// What one utterance produced
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    pub payload: IntentPayload,
    pub decision: Decision,
    pub replies: Vec<String>,
    pub opened: Vec<String>,
    pub exit: bool,
}

/// Side effects of one handler run, recorded as they happen
struct Turn<'a> {
    speaker: &'a dyn SpeechOutput,
    launcher: &'a dyn Launcher,
    replies: Vec<String>,
    opened: Vec<String>,
    exit: bool,
}

impl<'a> Turn<'a> {
    fn say(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.speaker.say(&text);
        self.replies.push(text);
    }

    fn open(&mut self, target: impl Into<String>) {
        let target = target.into();
        if let Err(e) = self.launcher.open(&target) {
            warn!("{:#}", e);
        }
        self.opened.push(target);
    }
}

fn arg_str<'v>(args: &'v Value, key: &str) -> Option<&'v str> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn arg_f64(args: &Value, key: &str) -> Option<f64> {
    args.get(key).and_then(Value::as_f64)
}

fn arg_u64(args: &Value, key: &str) -> Option<u64> {
    args.get(key).and_then(Value::as_u64)
}

fn enc(text: &str) -> String {
    urlencoding::encode(text).into_owned()
}

// ============================================================================
// Assistant
// ============================================================================

pub struct Assistant {
    router: IntentRouter,
    speaker: Arc<dyn SpeechOutput>,
    launcher: Box<dyn Launcher>,
    volume: Box<dyn VolumeControl>,
    lookups: Box<dyn Lookups>,
    planner: RoutePlanner,
    timers: TimerScheduler,
    music_dir: Option<PathBuf>,
    news_limit: usize,
    // Serialises handler runs; timers only share the speaker
    busy: Mutex<()>,
}

impl Assistant {
    pub fn new(collab: Collaborators, config: &AssistantConfig) -> Result<Self> {
        Self::with_router(IntentRouter::canonical(), collab, config)
    }

    pub fn with_router(
        router: IntentRouter,
        collab: Collaborators,
        config: &AssistantConfig,
    ) -> Result<Self> {
        let timers = TimerScheduler::new(Arc::clone(&collab.speaker))?;
        Ok(Self {
            router,
            speaker: collab.speaker,
            launcher: collab.launcher,
            volume: collab.volume,
            lookups: collab.lookups,
            planner: RoutePlanner::new(collab.geocoder, collab.location),
            timers,
            music_dir: config.music_dir.clone(),
            news_limit: config.news_limit,
            busy: Mutex::new(()),
        })
    }

    /// Timers and alarms that have not fired yet
    pub fn pending_timers(&self) -> usize {
        self.timers.pending()
    }

    /// Block until every pending timer and alarm has announced
    pub fn wait_for_timers(&self) {
        self.timers.wait_idle();
    }

    /// Classify without running anything
    pub fn classify(&self, utterance: &str) -> (IntentPayload, Decision) {
        let payload = self.router.extract(utterance);
        let decision = decide(&payload);
        (payload, decision)
    }

    /// Classify one utterance and run its handler
    pub fn handle(&self, utterance: &str) -> Outcome {
        let _guard = self.busy.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let (payload, decision) = self.classify(utterance);
        info!(intent = payload.intent.as_str(), command = ?payload.command, "dispatching");
        if let Some(e) = decision_error(&payload, &decision) {
            debug!(kind = %e.kind(), "{}", e);
        }

        let mut turn = Turn {
            speaker: self.speaker.as_ref(),
            launcher: self.launcher.as_ref(),
            replies: Vec::new(),
            opened: Vec::new(),
            exit: false,
        };

        match &decision {
            Decision::Route { tool, args } => self.run(&mut turn, *tool, args),
            Decision::NeedInfo { question } => turn.say(question.as_str()),
            Decision::Reject { reason } => turn.say(reason.as_str()),
        }

        Outcome {
            payload,
            decision,
            replies: turn.replies,
            opened: turn.opened,
            exit: turn.exit,
        }
    }

    /// Foreground loop: optionally wait for the wake word, then handle one
    /// utterance at a time until "exit" or the input closes.
    ///
    /// A command said in the same breath as the wake word ("dadu, what time
    /// is it") runs straight away. Returns true when the loop ended on exit.
    pub fn run_session(
        &self,
        input: &mut dyn SpeechInput,
        wake_word: Option<&str>,
        mut on_outcome: impl FnMut(&Outcome),
    ) -> bool {
        if let Some(wake) = wake_word {
            info!(wake_word = wake, "waiting for wake word");
            loop {
                match input.listen() {
                    Heard::Utterance(text) => {
                        let Some(rest) = wake_command(&text, wake) else {
                            continue;
                        };
                        self.speaker.say("Yes, how can I help you?");
                        if !rest.is_empty() {
                            let outcome = self.handle(&rest);
                            on_outcome(&outcome);
                            if outcome.exit {
                                return true;
                            }
                        }
                        break;
                    }
                    Heard::Unrecognized => continue,
                    Heard::Closed => return false,
                }
            }
        }

        loop {
            match input.listen() {
                Heard::Utterance(text) => {
                    let outcome = self.handle(&text);
                    on_outcome(&outcome);
                    if outcome.exit {
                        return true;
                    }
                }
                Heard::Unrecognized => debug!("nothing recognised, listening again"),
                Heard::Closed => return false,
            }
        }
    }

    fn run(&self, turn: &mut Turn<'_>, tool: Tool, args: &Value) {
        debug!(?tool, %args, "running tool");
        match tool {
            Tool::SpotifyPlay => self.spotify(turn, arg_str(args, "query")),
            Tool::YoutubePlay => youtube(turn, arg_str(args, "query")),
            Tool::OpenUrl => {
                let site = arg_str(args, "site").unwrap_or("website");
                turn.say(format!("Opening {}", site));
                if let Some(url) = arg_str(args, "url") {
                    turn.open(url);
                }
            }
            Tool::WebSearch => web_search(turn, arg_str(args, "query")),
            Tool::Weather => self.weather(turn, arg_str(args, "city")),
            Tool::Volume => self.volume(turn, args),
            Tool::Wikipedia => self.wikipedia(turn, arg_str(args, "topic")),
            Tool::Say => {
                let lines = args.get("lines").and_then(Value::as_array);
                for line in lines.into_iter().flatten().filter_map(Value::as_str) {
                    turn.say(line);
                }
            }
            Tool::Convert => self.convert(turn, args),
            Tool::Timer => self.timer(turn, args),
            Tool::Alarm => self.alarm(turn, args),
            Tool::PlayMusic => self.play_music(turn),
            Tool::Recipe => self.recipe(turn, arg_str(args, "dish").unwrap_or_default()),
            Tool::Time => turn.say(format!("The time is {}", format_clock(&now()))),
            Tool::Date => turn.say(format!("Today's date is {}", format_day(&now()))),
            Tool::Joke => turn.say(jokes::random_joke()),
            Tool::News => self.news(turn, arg_str(args, "category").unwrap_or("general")),
            Tool::Route => self.route(turn, arg_str(args, "destination").unwrap_or_default()),
            Tool::Horoscope => self.horoscope(
                turn,
                arg_str(args, "sign").unwrap_or_default(),
                arg_str(args, "day").unwrap_or("today"),
            ),
            Tool::Exit => {
                turn.say(GOODBYE);
                turn.exit = true;
            }
        }
    }

    // ------------------------------------------------------------------------
    // Media and search
    // ------------------------------------------------------------------------

    fn spotify(&self, turn: &mut Turn<'_>, query: Option<&str>) {
        let Some(query) = query else {
            turn.say("Opening Spotify");
            turn.open("https://www.spotify.com");
            return;
        };

        turn.say(format!("Playing {} on Spotify", query));
        match self.lookups.spotify_track(query) {
            Ok(Some(id)) => turn.open(spotify::track_url(&id)),
            Ok(None) => turn.open(spotify::search_url(query)),
            Err(e) => {
                debug!(kind = %e.kind(), "spotify search unavailable");
                turn.open(spotify::search_url(query));
            }
        }
    }

    fn weather(&self, turn: &mut Turn<'_>, city: Option<&str>) {
        let Some(city) = city else {
            turn.say("Opening weather report");
            turn.open("https://www.weather.com");
            return;
        };

        match self.lookups.weather(city) {
            Ok(summary) => turn.say(summary),
            Err(e) => {
                warn!(kind = %e.kind(), "weather lookup failed");
                match e {
                    AssistantError::NoCredentials { .. } => turn.say(
                        "I can open the weather website, \
                         or set an OpenWeather API key to get spoken results.",
                    ),
                    _ => turn.say(
                        "Sorry, I couldn't get live weather. Opening a weather website instead.",
                    ),
                }
                turn.open(format!("https://www.weather.com/search?q={}", enc(city)));
            }
        }
    }

    fn volume(&self, turn: &mut Turn<'_>, args: &Value) {
        let action = args
            .get("action")
            .cloned()
            .and_then(|v| serde_json::from_value::<VolumeAction>(v).ok());
        let Some(action) = action else {
            warn!(%args, "volume action missing");
            return;
        };

        turn.say(action.announcement());
        if let Err(e) = self.volume.apply(action) {
            warn!("volume control failed: {:#}", e);
        }
    }

    fn wikipedia(&self, turn: &mut Turn<'_>, topic: Option<&str>) {
        let Some(topic) = topic else {
            turn.say("Opening Wikipedia");
            turn.open("https://en.wikipedia.org/wiki/Main_Page");
            return;
        };

        turn.say(format!("Searching Wikipedia for {}", topic));
        let fallback = match self.lookups.wikipedia(topic) {
            Ok(summary) => {
                turn.say(summary);
                return;
            }
            Err(AssistantError::NotFound) => format!(
                "No Wikipedia article found for {}. Opening search results instead.",
                topic
            ),
            Err(AssistantError::Disambiguation { options }) => {
                debug!(?options, "ambiguous wikipedia topic");
                format!("Multiple results for {}. Opening Wikipedia to choose.", topic)
            }
            Err(e) => {
                warn!(kind = %e.kind(), "wikipedia lookup failed");
                "Could not fetch Wikipedia summary. Opening search instead.".to_string()
            }
        };

        turn.say(fallback);
        turn.open(format!("https://en.wikipedia.org/wiki/{}", enc(topic)));
    }

    // ------------------------------------------------------------------------
    // Conversion and clocks
    // ------------------------------------------------------------------------

    fn convert(&self, turn: &mut Turn<'_>, args: &Value) {
        let (Some(amount), Some(from), Some(to)) = (
            arg_f64(args, "amount"),
            arg_str(args, "from"),
            arg_str(args, "to"),
        ) else {
            turn.say(crate::router::CONVERSION_USAGE);
            return;
        };

        match convert_currency(self.lookups.as_ref(), amount, from, to) {
            Ok(text) => {
                turn.say(text);
                return;
            }
            Err(e) => debug!(kind = %e.kind(), "not a currency pair, trying units"),
        }

        match units::convert(amount, from, to) {
            Ok(conversion) => turn.say(conversion.to_string()),
            Err(e) => {
                debug!(kind = %e.kind(), "unit conversion failed");
                turn.say(format!(
                    "Sorry, I couldn't convert {} to {}. \
                     Supported: km/miles, kg/lbs, USD/INR/EUR/GBP and temperature.",
                    from, to
                ));
            }
        }
    }

    fn timer(&self, turn: &mut Turn<'_>, args: &Value) {
        let Some(seconds) = arg_u64(args, "seconds") else {
            turn.say(crate::router::TIMER_USAGE);
            return;
        };
        let amount = arg_f64(args, "amount").unwrap_or(seconds as f64);
        let unit = arg_str(args, "unit").unwrap_or("seconds");

        self.timers.schedule_after(Duration::from_secs(seconds), None);
        turn.say(format!("Timer set for {} {}", amount as u64, unit));
    }

    fn alarm(&self, turn: &mut Turn<'_>, args: &Value) {
        let alarm = arg_u64(args, "hour")
            .zip(arg_u64(args, "minute"))
            .and_then(|(h, m)| Some(AlarmTime {
                hour: u32::try_from(h).ok()?,
                minute: u32::try_from(m).ok()?,
            }));
        let Some(target) = alarm.and_then(|a| alarm_today(&now(), a)) else {
            turn.say("I couldn't parse that time. Please say for example 'set alarm for 7:30 am'.");
            return;
        };
        let clock = format!("{}:{:02}", target.format("%-H"), target.format("%M"));
        // Alarms announce like unlabelled timers
        match self.timers.schedule_at(target, None) {
            Ok(_) => turn.say(format!("Alarm set for {}", clock)),
            Err(AssistantError::PastTime) => {
                turn.say("That time is in the past. I will set it for tomorrow at that time.");
                let scheduled = roll_forward_one_day(&target)
                    .ok_or(AssistantError::PastTime)
                    .and_then(|tomorrow| self.timers.schedule_at(tomorrow, None));
                match scheduled {
                    Ok(_) => turn.say(format!("Alarm set for {} tomorrow.", clock)),
                    Err(e) => {
                        warn!(kind = %e.kind(), "alarm roll-forward failed");
                        turn.say("Sorry, I couldn't set that alarm.");
                    }
                }
            }
            Err(e) => {
                warn!(kind = %e.kind(), "alarm scheduling failed");
                turn.say("Sorry, I couldn't set that alarm.");
            }
        }
    }

    fn play_music(&self, turn: &mut Turn<'_>) {
        let Some(ref dir) = self.music_dir else {
            turn.say("No music directory is configured.");
            return;
        };

        match first_track(dir) {
            Ok(track) => {
                turn.say("Playing music");
                turn.open(track.display().to_string());
            }
            Err(e) => {
                warn!("{:#}", e);
                turn.say("Sorry, I couldn't find any music to play.");
            }
        }
    }

    // ------------------------------------------------------------------------
    // Content lookups
    // ------------------------------------------------------------------------

    fn recipe(&self, turn: &mut Turn<'_>, dish: &str) {
        turn.say(format!("Finding recipe for {}", dish));
        match self.lookups.recipe(dish) {
            Ok(text) => turn.say(text),
            Err(e) => {
                debug!(kind = %e.kind(), "recipe lookup failed");
                turn.say(format!(
                    "Sorry, I couldn't find a recipe for {}. Opening recipe search instead.",
                    dish
                ));
            }
        }
        turn.open(format!(
            "https://www.allrecipes.com/search/results/?wt={}&sort=re",
            enc(dish)
        ));
    }

    fn news(&self, turn: &mut Turn<'_>, category: &str) {
        turn.say(format!("Fetching {} news headlines for you.", category));
        match self.lookups.news(category, self.news_limit) {
            Ok(headlines) if !headlines.is_empty() => {
                for (i, headline) in headlines.iter().enumerate() {
                    turn.say(format!("Headline {}: {}", i + 1, headline));
                }
                turn.say("For more details, opening news website.");
            }
            other => {
                if let Err(e) = other {
                    warn!(kind = %e.kind(), "news lookup failed");
                }
                turn.say("Sorry, I couldn't fetch news. Opening Google News instead.");
            }
        }
        turn.open("https://news.google.com/topstories");
    }

    fn route(&self, turn: &mut Turn<'_>, destination: &str) {
        turn.say(format!("Finding best routes to {}", destination));
        match self.planner.plan(None, destination) {
            Ok(plan) => {
                turn.say(format!("Found {} route options for you.", plan.variants.len()));
                for (i, variant) in plan.variants.iter().enumerate() {
                    turn.say(variant.summary(i + 1));
                }
                turn.say("Opening the cheapest route on Google Maps.");
                turn.open(plan.variant(VariantKind::Cheapest).map_url.clone());
            }
            Err(e) => {
                warn!(kind = %e.kind(), "route planning failed");
                turn.say(format!(
                    "Sorry, I couldn't find routes to {}. Error: {}",
                    destination, e
                ));
                turn.open(format!(
                    "https://www.google.com/maps/dir/?daddr={}",
                    enc(destination)
                ));
            }
        }
    }

    fn horoscope(&self, turn: &mut Turn<'_>, sign: &str, day: &str) {
        match self.lookups.horoscope(sign, day) {
            Ok(text) => turn.say(text),
            Err(e) => {
                warn!(kind = %e.kind(), "horoscope lookup failed");
                turn.say(format!("Sorry, I couldn't get the horoscope for {}.", sign));
            }
        }
    }
}

fn youtube(turn: &mut Turn<'_>, query: Option<&str>) {
    match query {
        Some(q) => {
            turn.say(format!("Playing {} on YouTube", q));
            turn.open(format!(
                "https://www.youtube.com/results?search_query={}",
                enc(q)
            ));
        }
        None => {
            turn.say("Opening YouTube");
            turn.open("https://www.youtube.com");
        }
    }
}

fn web_search(turn: &mut Turn<'_>, query: Option<&str>) {
    match query {
        Some(q) => {
            turn.say(format!("Searching Google for {}", q));
            turn.open(format!("https://www.google.com/search?q={}", enc(q)));
        }
        None => {
            turn.say("Opening Google");
            turn.open("https://www.google.com");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_arg_helpers() {
        let args = json!({ "query": "  ", "amount": 2.5, "seconds": 30 });
        assert_eq!(arg_str(&args, "query"), None);
        assert_eq!(arg_str(&args, "missing"), None);
        assert!((arg_f64(&args, "amount").unwrap() - 2.5).abs() < 1e-9);
        assert_eq!(arg_u64(&args, "seconds"), Some(30));
    }

    #[test]
    fn test_encoding() {
        assert_eq!(enc("new york"), "new%20york");
    }
}
