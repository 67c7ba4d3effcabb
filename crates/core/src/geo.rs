//! Geocoding and current-location lookup
//!
//! Place names resolve through Nominatim (OpenStreetMap), with a built-in
//! table of well-known cities answered without network. The user's current
//! location is found through a layered chain: configured home location,
//! IP-based lookup, then an interactive prompt.

use std::time::Duration;

use anyhow::{Context, Result};
use dialoguer::Input;
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::types::GeoPoint;

const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";
const IP_LOOKUP_URL: &str = "https://ipapi.co/json/";
const USER_AGENT: &str = "daduAssistant";

// ============================================================================
// Collaborator Traits
// ============================================================================

/// Resolve a place name to coordinates.
///
/// `Ok(None)` means the service answered but knows no such place; `Err` is
/// any other failure.
pub trait Geocoder {
    fn geocode(&self, place: &str) -> Result<Option<GeoPoint>>;
}

/// A place name plus coordinates when the source knows them
#[derive(Debug, Clone, PartialEq)]
pub struct Located {
    pub name: String,
    pub point: Option<GeoPoint>,
}

/// One layer of current-location detection
pub trait LocationSource {
    fn locate(&self) -> Option<Located>;
}

// ============================================================================
// Built-in City Table
// ============================================================================

/// Well-known cities (fast, no network)
pub fn known_city(city: &str) -> Option<GeoPoint> {
    let city_lower = city.trim().to_lowercase();

    let (lat, lon) = match city_lower.as_str() {
        "new york" | "nyc" | "new york city" => (40.7128, -74.0060),
        "los angeles" | "la" => (34.0522, -118.2437),
        "chicago" => (41.8781, -87.6298),
        "houston" => (29.7604, -95.3698),
        "phoenix" => (33.4484, -112.0740),
        "philadelphia" => (39.9526, -75.1652),
        "dallas" => (32.7767, -96.7970),
        "austin" => (30.2672, -97.7431),
        "seattle" => (47.6062, -122.3321),
        "denver" => (39.7392, -104.9903),
        "boston" => (42.3601, -71.0589),
        "san francisco" | "sf" => (37.7749, -122.4194),
        "miami" => (25.7617, -80.1918),
        "atlanta" => (33.7490, -84.3880),
        "washington" | "washington dc" => (38.9072, -77.0369),
        "toronto" => (43.6532, -79.3832),
        "london" => (51.5074, -0.1278),
        "paris" => (48.8566, 2.3522),
        "berlin" => (52.5200, 13.4050),
        "madrid" => (40.4168, -3.7038),
        "rome" => (41.9028, 12.4964),
        "amsterdam" => (52.3676, 4.9041),
        "tokyo" => (35.6762, 139.6503),
        "sydney" => (-33.8688, 151.2093),
        "singapore" => (1.3521, 103.8198),
        "dubai" => (25.2048, 55.2708),
        "mumbai" => (19.0760, 72.8777),
        "delhi" | "new delhi" => (28.6139, 77.2090),
        "bangalore" | "bengaluru" => (12.9716, 77.5946),
        "kolkata" => (22.5726, 88.3639),
        "chennai" => (13.0827, 80.2707),
        _ => return None,
    };

    Some(GeoPoint::named(lat, lon, city.trim()))
}

// ============================================================================
// Nominatim
// ============================================================================

#[derive(Deserialize, Debug)]
struct NominatimPlace {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: Option<String>,
}

/// OpenStreetMap Nominatim geocoder
pub struct NominatimGeocoder {
    client: Client,
}

impl NominatimGeocoder {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    fn search(&self, place: &str) -> Result<Option<GeoPoint>> {
        let response = self
            .client
            .get(NOMINATIM_URL)
            .query(&[("q", place), ("format", "json")])
            .send()
            .context("Geocode request failed")?;

        if !response.status().is_success() {
            debug!(status = %response.status(), place, "geocoder returned an error status");
            return Ok(None);
        }

        let places: Vec<NominatimPlace> = response
            .json()
            .context("Failed to parse geocode response")?;

        let Some(first) = places.into_iter().next() else {
            return Ok(None);
        };

        let latitude: f64 = first.lat.parse().context("Invalid latitude")?;
        let longitude: f64 = first.lon.parse().context("Invalid longitude")?;

        Ok(Some(GeoPoint {
            latitude,
            longitude,
            name: Some(first.display_name.unwrap_or_else(|| place.to_string())),
        }))
    }
}

impl Geocoder for NominatimGeocoder {
    fn geocode(&self, place: &str) -> Result<Option<GeoPoint>> {
        if let Some(point) = known_city(place) {
            return Ok(Some(point));
        }
        debug!(place, "geocoding via Nominatim");
        self.search(place)
    }
}

// ============================================================================
// Current Location
// ============================================================================

/// Fixed home location from configuration
pub struct HomeLocation {
    pub name: String,
}

impl LocationSource for HomeLocation {
    fn locate(&self) -> Option<Located> {
        if self.name.trim().is_empty() {
            return None;
        }
        Some(Located {
            name: self.name.clone(),
            point: known_city(&self.name),
        })
    }
}

#[derive(Deserialize, Debug)]
struct IpLookupResponse {
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    country_name: Option<String>,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
}

/// IP-based geolocation via ipapi.co
pub struct IpLocation {
    client: Client,
}

impl IpLocation {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }

    fn lookup(&self) -> Result<Option<Located>> {
        let response = self
            .client
            .get(IP_LOOKUP_URL)
            .send()
            .context("IP location request failed")?;

        if !response.status().is_success() {
            return Ok(None);
        }

        let data: IpLookupResponse = response
            .json()
            .context("Failed to parse IP location response")?;

        let name = format!(
            "{}, {}",
            data.city.as_deref().unwrap_or("Unknown"),
            data.country_name.as_deref().unwrap_or("")
        );
        let point = data
            .latitude
            .zip(data.longitude)
            .map(|(lat, lon)| GeoPoint::named(lat, lon, name.clone()));

        Ok(Some(Located { name, point }))
    }
}

impl LocationSource for IpLocation {
    fn locate(&self) -> Option<Located> {
        match self.lookup() {
            Ok(found) => {
                if let Some(ref loc) = found {
                    debug!(location = %loc.name, "IP-based location detected");
                }
                found
            }
            Err(e) => {
                warn!("IP location lookup failed: {:#}", e);
                None
            }
        }
    }
}

/// Ask the user to type their location
pub struct PromptLocation;

impl LocationSource for PromptLocation {
    fn locate(&self) -> Option<Located> {
        let answer: String = Input::new()
            .with_prompt("Could not detect location. Please enter your location (e.g., 'New York')")
            .allow_empty(true)
            .interact_text()
            .map_err(|e| warn!("location prompt failed: {}", e))
            .ok()?;
        let name = answer.trim();
        if name.is_empty() {
            return None;
        }
        Some(Located {
            name: name.to_string(),
            point: None,
        })
    }
}

/// Ordered fallback over several sources; the first hit wins
#[derive(Default)]
pub struct LocationChain {
    sources: Vec<Box<dyn LocationSource + Send + Sync>>,
}

impl LocationChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: impl LocationSource + Send + Sync + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl LocationSource for LocationChain {
    fn locate(&self) -> Option<Located> {
        self.sources.iter().find_map(|source| source.locate())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Option<&'static str>);

    impl LocationSource for Fixed {
        fn locate(&self) -> Option<Located> {
            self.0.map(|name| Located {
                name: name.to_string(),
                point: None,
            })
        }
    }

    #[test]
    fn test_known_city_lookup() {
        let nyc = known_city("NYC").unwrap();
        assert!((nyc.latitude - 40.7128).abs() < 0.01);
        assert!((nyc.longitude - (-74.0060)).abs() < 0.01);
        assert!(known_city("Nonexistent City XYZ").is_none());
    }

    #[test]
    fn test_chain_first_hit_wins() {
        let chain = LocationChain::new()
            .with(Fixed(None))
            .with(Fixed(Some("Boston")))
            .with(Fixed(Some("Denver")));
        assert_eq!(chain.len(), 3);
        assert_eq!(chain.locate().unwrap().name, "Boston");
    }

    #[test]
    fn test_empty_chain() {
        assert!(LocationChain::new().locate().is_none());
    }

    #[test]
    fn test_home_location() {
        let home = HomeLocation {
            name: "London".to_string(),
        };
        let found = home.locate().unwrap();
        assert_eq!(found.name, "London");
        assert!(found.point.is_some());

        let blank = HomeLocation {
            name: "  ".to_string(),
        };
        assert!(blank.locate().is_none());
    }
}
