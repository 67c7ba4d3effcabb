//! Route planning
//!
//! Resolves origin and destination to coordinates, takes the haversine
//! distance between them as the base distance, and derives three route
//! variants (fastest, cheapest, balanced) from it with fixed multipliers.
//! Tolls and fuel are coarse estimates, not quotes.

use serde::Serialize;
use tracing::debug;

use crate::error::{AssistantError, RouteSide};
use crate::geo::{Geocoder, LocationSource};
use crate::types::GeoPoint;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

const LITERS_PER_100_KM: f64 = 7.0;
const PRICE_PER_LITER: f64 = 1.5;

/// Share of a route assumed to run on toll roads
const TOLL_SHARE: f64 = 0.15;

/// Origins that mean "wherever the user is now"
const CURRENT_LOCATION_ALIASES: &[&str] = &["current location", "home", "here"];

// ============================================================================
// Variants
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VariantKind {
    Fastest,
    Cheapest,
    Balanced,
}

/// Fixed scaling applied to the shared base for one variant
struct VariantProfile {
    kind: VariantKind,
    speed_kmh: f64,
    traffic: f64,
    toll: f64,
    distance: f64,
    note: &'static str,
}

const PROFILES: [VariantProfile; 3] = [
    VariantProfile {
        kind: VariantKind::Fastest,
        speed_kmh: 100.0,
        traffic: 1.15,
        toll: 1.2,
        distance: 1.0,
        note: "highways preferred",
    },
    VariantProfile {
        kind: VariantKind::Cheapest,
        speed_kmh: 60.0,
        traffic: 1.25,
        toll: 0.3,
        distance: 1.05,
        note: "avoids tolls",
    },
    VariantProfile {
        kind: VariantKind::Balanced,
        speed_kmh: 80.0,
        traffic: 1.20,
        toll: 1.0,
        distance: 1.0,
        note: "balanced",
    },
];

impl VariantKind {
    pub fn label(&self) -> &'static str {
        match self {
            VariantKind::Fastest => "Fastest Route",
            VariantKind::Cheapest => "Cheapest Route",
            VariantKind::Balanced => "Balanced Route",
        }
    }
}

/// One of the three computed routes. Values are unrounded; rounding happens
/// when the route is spoken.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteVariant {
    pub kind: VariantKind,
    pub distance_km: f64,
    pub duration_minutes: u32,
    pub duration_hours: f64,
    pub fuel_liters: f64,
    pub toll_cost: f64,
    pub total_cost: f64,
    pub description: String,
    pub map_url: String,
}

impl RouteVariant {
    /// Spoken summary, e.g. "Option 1: Fastest Route. 12.3 kilometers, ..."
    pub fn summary(&self, index: usize) -> String {
        format!(
            "Option {}: {}. {:.1} kilometers, about {} minutes with traffic. \
             Fuel: {:.1} liters, Tolls: ${:.2}, Total cost: ${:.2}",
            index,
            self.kind.label(),
            self.distance_km,
            self.duration_minutes,
            self.fuel_liters,
            self.toll_cost,
            self.total_cost
        )
    }
}

/// The three variants for one origin/destination pair
#[derive(Debug, Clone, Serialize)]
pub struct RoutePlan {
    pub origin: String,
    pub destination: String,
    pub base_distance_km: f64,
    pub variants: [RouteVariant; 3],
}

impl RoutePlan {
    pub fn variant(&self, kind: VariantKind) -> &RouteVariant {
        self.variants
            .iter()
            .find(|v| v.kind == kind)
            .unwrap_or(&self.variants[0])
    }
}

// ============================================================================
// Computation
// ============================================================================

/// Great-circle distance in kilometres
pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();
    let h = (dlat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos()
            * b.latitude.to_radians().cos()
            * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// $/km on toll roads by the route's average longitude
pub fn regional_toll_rate(avg_longitude: f64) -> f64 {
    if avg_longitude < -100.0 {
        0.08 // US west
    } else if avg_longitude < -85.0 {
        0.12 // US midwest/south
    } else if avg_longitude < -75.0 {
        0.18 // US northeast
    } else {
        0.10
    }
}

pub fn estimate_toll(distance_km: f64, origin: &GeoPoint, destination: &GeoPoint) -> f64 {
    let avg_longitude = (origin.longitude + destination.longitude) / 2.0;
    distance_km * TOLL_SHARE * regional_toll_rate(avg_longitude)
}

fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

pub fn map_url(origin: &str, destination: &str) -> String {
    format!(
        "https://www.google.com/maps/dir/{}/{}",
        urlencoding::encode(origin),
        urlencoding::encode(destination)
    )
}

/// Build the three variants from two resolved points
pub fn compute_variants(
    origin: &str,
    destination: &str,
    from: &GeoPoint,
    to: &GeoPoint,
) -> RoutePlan {
    let distance_km = haversine_km(from, to);
    let toll = estimate_toll(distance_km, from, to);
    let fuel_liters = distance_km / 100.0 * LITERS_PER_100_KM;
    let fuel_cost = fuel_liters * PRICE_PER_LITER;
    let url = map_url(origin, destination);

    let variants = PROFILES.map(|p| {
        let base_minutes = (distance_km / p.speed_kmh * 60.0) as u32;
        let duration_minutes = (base_minutes as f64 * p.traffic) as u32;
        let variant_km = distance_km * p.distance;
        let toll_cost = toll * p.toll;

        RouteVariant {
            kind: p.kind,
            distance_km: variant_km,
            duration_minutes,
            duration_hours: round_to(duration_minutes as f64 / 60.0, 2),
            fuel_liters: fuel_liters * p.distance,
            toll_cost,
            total_cost: fuel_cost + toll_cost,
            description: format!("{:.0}km, ~{}min ({})", variant_km, duration_minutes, p.note),
            map_url: url.clone(),
        }
    });

    RoutePlan {
        origin: origin.to_string(),
        destination: destination.to_string(),
        base_distance_km: distance_km,
        variants,
    }
}

// ============================================================================
// Planner
// ============================================================================

/// Resolves endpoints through the collaborators, then computes variants
pub struct RoutePlanner {
    geocoder: Box<dyn Geocoder + Send + Sync>,
    location: Box<dyn LocationSource + Send + Sync>,
}

impl RoutePlanner {
    pub fn new(
        geocoder: Box<dyn Geocoder + Send + Sync>,
        location: Box<dyn LocationSource + Send + Sync>,
    ) -> Self {
        Self { geocoder, location }
    }

    fn resolve(&self, side: RouteSide, place: &str) -> Result<GeoPoint, AssistantError> {
        match self.geocoder.geocode(place) {
            Ok(Some(point)) => Ok(point),
            Ok(None) => Err(AssistantError::GeocodeNotFound {
                side,
                place: place.to_string(),
            }),
            Err(e) => Err(AssistantError::other(format!("{:#}", e))),
        }
    }

    /// Plan routes from `origin` (or the current location when it is absent
    /// or one of "current location", "home", "here") to `destination`.
    pub fn plan(
        &self,
        origin: Option<&str>,
        destination: &str,
    ) -> Result<RoutePlan, AssistantError> {
        let origin = origin.map(str::trim).filter(|o| !o.is_empty());

        let (origin_name, origin_point) = match origin {
            Some(o) if !CURRENT_LOCATION_ALIASES.contains(&o.to_lowercase().as_str()) => {
                (o.to_string(), None)
            }
            _ => {
                let here = self
                    .location
                    .locate()
                    .ok_or(AssistantError::LocationUnavailable)?;
                debug!(origin = %here.name, "using current location as origin");
                (here.name, here.point)
            }
        };

        let from = match origin_point {
            Some(point) => point,
            None => self.resolve(RouteSide::Origin, &origin_name)?,
        };
        let to = self.resolve(RouteSide::Destination, destination)?;

        Ok(compute_variants(&origin_name, destination, &from, &to))
    }
}
