//! Dadu voice assistant core library
//!
//! This crate provides the core functionality for the assistant:
//! - Intent classification over an ordered keyword table, and slot extraction
//! - Decision routing and the handlers behind each decision
//! - Unit conversion, route planning, timers and alarms
//! - Web lookups (weather, news, Wikipedia, horoscope, recipes, currency, Spotify)
//! - Layered configuration and credential resolution

pub mod types;
pub mod error;

pub mod actions;
pub mod assistant;
pub mod config;
pub mod geo;
pub mod intent;
pub mod jokes;
pub mod router;
pub mod routes;
pub mod services;
pub mod slots;
pub mod speech;
pub mod timer;
pub mod units;

// Lookup clients
pub mod currency;
pub mod horoscope;
pub mod news;
pub mod recipe;
pub mod spotify;
pub mod weather;
pub mod wikipedia;

// Re-export commonly used types at crate root
pub use types::{
    AlarmTime, Command, ConversionRequest, Decision, GeoPoint, Intent, IntentPayload, Slots,
    TimerRequest, Tool,
};
pub use error::{AssistantError, RouteSide};

pub use assistant::{Assistant, Collaborators, Outcome};
pub use config::{AssistantConfig, CredentialChain};
pub use intent::{extract_intent, IntentRouter, Rule, CANONICAL_RULES};
pub use router::decide;
