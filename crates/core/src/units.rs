//! Local unit conversion (distance, weight, temperature)
//!
//! Pure functions, no I/O. Each family is independent: distances normalise
//! through miles, weights through pounds, temperatures convert directly
//! between Celsius and Fahrenheit. A pair that spans two families, or names a
//! unit no table knows, is an unsupported pair.

use std::fmt;

use serde::Serialize;

use crate::error::AssistantError;

// ============================================================================
// Tables
// ============================================================================

/// Miles per one unit
const DISTANCE_TABLE: &[(&[&str], f64)] = &[
    (&["km", "kms", "kilometer", "kilometers", "kilometre", "kilometres"], 0.621371),
    (&["mi", "mile", "miles"], 1.0),
    (&["m", "meter", "meters", "metre", "metres"], 0.000621371),
    (&["ft", "foot", "feet"], 0.000189394),
    (&["yd", "yds", "yard", "yards"], 0.000568182),
];

/// Pounds per one unit
const WEIGHT_TABLE: &[(&[&str], f64)] = &[
    (&["kg", "kgs", "kilo", "kilos", "kilogram", "kilograms"], 2.20462),
    (&["lb", "lbs", "pound", "pounds"], 1.0),
    (&["g", "gram", "grams", "gramme", "grammes"], 0.00220462),
    (&["oz", "ounce", "ounces"], 0.0625),
];

const CELSIUS: &[&str] = &["c", "celsius", "centigrade"];
const FAHRENHEIT: &[&str] = &["f", "fahrenheit"];

/// Which table resolved a conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitFamily {
    Distance,
    Weight,
    Temperature,
}

/// A successful conversion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conversion {
    pub amount: f64,
    pub from_unit: String,
    pub to_unit: String,
    pub value: f64,
    pub family: UnitFamily,
}

impl fmt::Display for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.family {
            UnitFamily::Temperature => {
                let (from, to) = if CELSIUS.contains(&self.from_unit.as_str()) {
                    ("C", "F")
                } else {
                    ("F", "C")
                };
                write!(f, "{}°{} is {:.2}°{}", self.amount, from, self.value, to)
            }
            _ => write!(
                f,
                "{} {} is {:.2} {}",
                self.amount, self.from_unit, self.value, self.to_unit
            ),
        }
    }
}

fn factor(table: &[(&[&str], f64)], unit: &str) -> Option<f64> {
    table
        .iter()
        .find(|(aliases, _)| aliases.contains(&unit))
        .map(|(_, f)| *f)
}

/// Convert through a shared base unit: amount -> base -> target
fn via_base(table: &[(&[&str], f64)], amount: f64, from: &str, to: &str) -> Option<f64> {
    let from_factor = factor(table, from)?;
    let to_factor = factor(table, to)?;
    Some(amount * from_factor / to_factor)
}

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

// ============================================================================
// Public API
// ============================================================================

/// Convert `amount` between two case-insensitive unit labels
pub fn convert(amount: f64, from_unit: &str, to_unit: &str) -> Result<Conversion, AssistantError> {
    let from = from_unit.trim().to_lowercase();
    let to = to_unit.trim().to_lowercase();

    let resolved = if CELSIUS.contains(&from.as_str()) && FAHRENHEIT.contains(&to.as_str()) {
        Some((celsius_to_fahrenheit(amount), UnitFamily::Temperature))
    } else if FAHRENHEIT.contains(&from.as_str()) && CELSIUS.contains(&to.as_str()) {
        Some((fahrenheit_to_celsius(amount), UnitFamily::Temperature))
    } else if let Some(value) = via_base(DISTANCE_TABLE, amount, &from, &to) {
        Some((value, UnitFamily::Distance))
    } else {
        via_base(WEIGHT_TABLE, amount, &from, &to).map(|value| (value, UnitFamily::Weight))
    };

    match resolved {
        Some((value, family)) => Ok(Conversion {
            amount,
            from_unit: from,
            to_unit: to,
            value,
            family,
        }),
        None => Err(AssistantError::UnsupportedConversion { from, to }),
    }
}
