//! Error taxonomy for the assistant core
//!
//! Every handler-level failure is one of these variants. Handlers recover from
//! them locally (spoken fallback or a browser action), so none of them ever
//! reaches the listen loop.

use serde::Serialize;

/// Which endpoint of a route request could not be resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteSide {
    Origin,
    Destination,
}

impl RouteSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteSide::Origin => "origin",
            RouteSide::Destination => "destination",
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AssistantError {
    #[error("no {slot} found in utterance")]
    SlotNotFound { slot: &'static str },

    #[error("cannot convert {from} to {to}")]
    UnsupportedConversion { from: String, to: String },

    #[error("{} not found: {place}", .side.as_str())]
    GeocodeNotFound { side: RouteSide, place: String },

    #[error("could not detect current location")]
    LocationUnavailable,

    #[error("requested time is in the past")]
    PastTime,

    #[error("API returned status {status}")]
    Api { status: u16 },

    #[error("no credentials configured for {what}")]
    NoCredentials { what: &'static str },

    #[error("currency not found: {code}")]
    CurrencyNotFound { code: String },

    #[error("nothing found")]
    NotFound,

    #[error("ambiguous topic, candidates: {}", .options.join(", "))]
    Disambiguation { options: Vec<String> },

    #[error("no handler matched the utterance")]
    UnknownIntent,

    #[error("{0}")]
    Other(String),
}

impl AssistantError {
    /// Short machine-readable signal, e.g. `api_error:404` or `no_key`
    pub fn kind(&self) -> String {
        match self {
            AssistantError::SlotNotFound { slot } => format!("slot_not_found:{}", slot),
            AssistantError::UnsupportedConversion { from, to } => {
                format!("unknown_unit_pair:{}_{}", from, to)
            }
            AssistantError::GeocodeNotFound { side, place } => {
                format!("{}_not_found: {}", side.as_str(), place)
            }
            AssistantError::LocationUnavailable => "location_unavailable".to_string(),
            AssistantError::PastTime => "past_time".to_string(),
            AssistantError::Api { status } => format!("api_error:{}", status),
            AssistantError::NoCredentials { what } if *what == "openweather" => {
                "no_key".to_string()
            }
            AssistantError::NoCredentials { .. } => "no_credentials".to_string(),
            AssistantError::CurrencyNotFound { code } => format!("currency_not_found:{}", code),
            AssistantError::NotFound => "not_found".to_string(),
            AssistantError::Disambiguation { options } => {
                format!("disambiguation: {:?}", options)
            }
            AssistantError::UnknownIntent => "unknown_intent".to_string(),
            AssistantError::Other(msg) => format!("other:{}", msg),
        }
    }

    /// Collapse an arbitrary failure into the generic variant, keeping its text
    pub fn other(err: impl std::fmt::Display) -> Self {
        AssistantError::Other(err.to_string())
    }
}

impl From<reqwest::Error> for AssistantError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => AssistantError::Api {
                status: status.as_u16(),
            },
            None => AssistantError::Other(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_strings() {
        assert_eq!(AssistantError::Api { status: 503 }.kind(), "api_error:503");
        assert_eq!(AssistantError::PastTime.kind(), "past_time");
        assert_eq!(
            AssistantError::NoCredentials { what: "openweather" }.kind(),
            "no_key"
        );
        assert_eq!(
            AssistantError::NoCredentials { what: "spotify" }.kind(),
            "no_credentials"
        );
        assert_eq!(
            AssistantError::UnsupportedConversion {
                from: "km".to_string(),
                to: "kg".to_string()
            }
            .kind(),
            "unknown_unit_pair:km_kg"
        );
    }

    #[test]
    fn test_geocode_side_in_message() {
        let err = AssistantError::GeocodeNotFound {
            side: RouteSide::Destination,
            place: "atlantis".to_string(),
        };
        assert_eq!(err.to_string(), "destination not found: atlantis");
        assert_eq!(err.kind(), "destination_not_found: atlantis");
    }
}
