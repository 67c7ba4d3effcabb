//! Decision routing
//!
//! Turns a classified payload into a [`Decision`]: which tool runs with which
//! arguments, a follow-up question when a required slot is missing, or a
//! rejection for unknown utterances.

use serde_json::json;
use tracing::debug;

use crate::actions::VolumeAction;
use crate::error::AssistantError;
use crate::types::{Command, Decision, IntentPayload, Tool};

pub const CONVERSION_USAGE: &str =
    "Please say something like: convert 100 kilometers to miles, or 50 dollars to euros.";
pub const TIMER_USAGE: &str = "Please tell me how long for the timer, \
     for example 'set timer for 5 minutes', or 'set alarm for 7:30 am'.";
pub const RECIPE_USAGE: &str = "Please tell me which dish you want the recipe for.";
pub const ROUTE_USAGE: &str =
    "Please tell me where you want to go. For example, 'directions to New York'.";
pub const HOROSCOPE_USAGE: &str = "Which zodiac sign? For example, 'horoscope for leo'.";
pub const NOT_UNDERSTOOD: &str = "Sorry, I did not understand that.";

fn route(tool: Tool, args: serde_json::Value) -> Decision {
    Decision::Route { tool, args }
}

fn need(question: &str) -> Decision {
    Decision::NeedInfo {
        question: question.to_string(),
    }
}

fn open_site(name: &str, url: &str) -> Decision {
    route(Tool::OpenUrl, json!({ "site": name, "url": url }))
}

fn volume(action: VolumeAction) -> Decision {
    route(Tool::Volume, json!({ "action": action }))
}

/// Slot a command cannot run without
fn required_slot(command: Command) -> &'static str {
    match command {
        Command::Currency | Command::Convert => "conversion",
        Command::Timer | Command::Alarm => "duration",
        Command::Recipe => "dish",
        Command::Route => "destination",
        Command::Horoscope => "sign",
        _ => "query",
    }
}

/// The failure behind a decision that does not route to a tool
pub fn decision_error(payload: &IntentPayload, decision: &Decision) -> Option<AssistantError> {
    match decision {
        Decision::Route { .. } => None,
        Decision::NeedInfo { .. } => Some(AssistantError::SlotNotFound {
            slot: required_slot(payload.command),
        }),
        Decision::Reject { .. } => Some(AssistantError::UnknownIntent),
    }
}

/// Decide what to do with a classified utterance
pub fn decide(payload: &IntentPayload) -> Decision {
    let slots = &payload.slots;
    debug!(command = ?payload.command, "routing");

    match payload.command {
        Command::Spotify => route(Tool::SpotifyPlay, json!({ "query": slots.query })),
        Command::Youtube => route(Tool::YoutubePlay, json!({ "query": slots.query })),
        Command::Facebook => open_site("Facebook", "https://www.facebook.com"),
        Command::Instagram => open_site("Instagram", "https://www.instagram.com"),
        Command::Stackoverflow => open_site("Stackoverflow", "https://www.stackoverflow.com"),
        Command::Google => route(Tool::WebSearch, json!({ "query": slots.query })),

        Command::Weather => route(Tool::Weather, json!({ "city": slots.city })),

        Command::Mute => volume(VolumeAction::Mute),
        Command::Unmute => volume(VolumeAction::Unmute),
        Command::VolumeUp => volume(VolumeAction::Up),
        Command::VolumeDown => volume(VolumeAction::Down),

        Command::Wikipedia => route(Tool::Wikipedia, json!({ "topic": slots.target })),

        Command::Name => route(
            Tool::Say,
            json!({ "lines": ["My name is Dadu, your personal voice assistant."] }),
        ),
        Command::Age => route(Tool::Say, json!({ "lines": ["I am timeless."] })),
        Command::Tea => route(
            Tool::Say,
            json!({ "lines": [
                "Making tea for you.",
                "Please wait a moment while I prepare your tea. I hope you enjoy it!",
                "Your tea is ready. Enjoy!"
            ] }),
        ),

        Command::Currency | Command::Convert => match slots.conversion {
            Some(ref c) => route(
                Tool::Convert,
                json!({ "amount": c.amount, "from": c.from_unit, "to": c.to_unit }),
            ),
            None => need(CONVERSION_USAGE),
        },

        Command::Timer | Command::Alarm => match (&slots.timer, slots.alarm) {
            (Some(timer), _) => route(
                Tool::Timer,
                json!({ "seconds": timer.seconds, "amount": timer.amount, "unit": timer.unit }),
            ),
            (None, Some(alarm)) => route(
                Tool::Alarm,
                json!({ "hour": alarm.hour, "minute": alarm.minute }),
            ),
            (None, None) => need(TIMER_USAGE),
        },

        Command::PlayMusic => route(Tool::PlayMusic, json!({})),

        Command::Recipe => match slots.target {
            Some(ref dish) => route(Tool::Recipe, json!({ "dish": dish })),
            None => need(RECIPE_USAGE),
        },

        Command::Time => route(Tool::Time, json!({})),
        Command::Date => route(Tool::Date, json!({})),
        Command::Joke => route(Tool::Joke, json!({})),

        Command::News => route(
            Tool::News,
            json!({ "category": slots.category.as_deref().unwrap_or("general") }),
        ),

        Command::Route => match slots.target {
            Some(ref destination) => route(Tool::Route, json!({ "destination": destination })),
            None => need(ROUTE_USAGE),
        },

        Command::Exit => route(Tool::Exit, json!({})),

        Command::Horoscope => match slots.sign {
            Some(ref sign) => route(
                Tool::Horoscope,
                json!({ "sign": sign, "day": slots.day.as_deref().unwrap_or("today") }),
            ),
            None => need(HOROSCOPE_USAGE),
        },

        Command::Unknown => Decision::Reject {
            reason: NOT_UNDERSTOOD.to_string(),
        },
    }
}
