use serde::{Deserialize, Serialize};
use std::fmt;

/// Discord user snowflake.
pub type UserId = u64;

/// Discord caps autocomplete choice names and values at this many characters.
pub const MAX_CHOICE_LEN: usize = 100;

/// A resolved place, either from the geocoding API or from a suggestion token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub country: Option<String>,
    pub admin1: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    /// `name, country`, or just `name` when the country is unknown.
    pub fn display_name(&self) -> String {
        match self.country.as_deref().filter(|c| !c.is_empty()) {
            Some(country) => format!("{}, {country}", self.name),
            None => self.name.clone(),
        }
    }

    /// Parse an opaque `lat|lon|name` token produced by [`Suggestion::from_location`].
    ///
    /// Returns `None` for anything that is not a well-formed token, so callers can fall back
    /// to treating the raw input as free text.
    pub fn from_suggestion_token(token: &str) -> Option<Self> {
        let mut parts = token.splitn(3, '|');
        let latitude: f64 = parts.next()?.trim().parse().ok()?;
        let longitude: f64 = parts.next()?.trim().parse().ok()?;
        let name = parts.next()?.trim();

        if name.is_empty()
            || !(-90.0..=90.0).contains(&latitude)
            || !(-180.0..=180.0).contains(&longitude)
        {
            return None;
        }

        Some(Self {
            name: name.to_string(),
            country: None,
            admin1: None,
            latitude,
            longitude,
        })
    }
}

/// One autocomplete choice offered while the user types a location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub label: String,
    pub value: String,
}

impl Suggestion {
    pub fn from_location(location: &Location) -> Self {
        let label = [
            Some(location.name.as_str()),
            location.admin1.as_deref(),
            location.country.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ");

        let value = format!("{}|{}|{label}", location.latitude, location.longitude);

        Self {
            label: truncate_chars(&label, MAX_CHOICE_LEN),
            value: truncate_chars(&value, MAX_CHOICE_LEN),
        }
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitPreference {
    #[default]
    Metric,
    Imperial,
}

impl UnitPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitPreference::Metric => "metric",
            UnitPreference::Imperial => "imperial",
        }
    }

    /// Capitalized name for display.
    pub fn label(&self) -> &'static str {
        match self {
            UnitPreference::Metric => "Metric",
            UnitPreference::Imperial => "Imperial",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            UnitPreference::Metric => UnitPreference::Imperial,
            UnitPreference::Imperial => UnitPreference::Metric,
        }
    }

    /// Value of the forecast API's `temperature_unit` parameter.
    pub fn temperature_unit(&self) -> &'static str {
        match self {
            UnitPreference::Metric => "celsius",
            UnitPreference::Imperial => "fahrenheit",
        }
    }

    /// Value of the forecast API's `wind_speed_unit` parameter.
    pub fn wind_speed_unit(&self) -> &'static str {
        match self {
            UnitPreference::Metric => "kmh",
            UnitPreference::Imperial => "mph",
        }
    }

    pub fn temperature_suffix(&self) -> &'static str {
        match self {
            UnitPreference::Metric => "°C",
            UnitPreference::Imperial => "°F",
        }
    }

    pub fn wind_speed_suffix(&self) -> &'static str {
        match self {
            UnitPreference::Metric => "km/h",
            UnitPreference::Imperial => "mph",
        }
    }
}

impl fmt::Display for UnitPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for UnitPreference {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "metric" => Ok(UnitPreference::Metric),
            "imperial" => Ok(UnitPreference::Imperial),
            _ => Err(anyhow::anyhow!(
                "Unknown unit system '{value}'. Supported: metric, imperial."
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Current,
    Forecast,
}

impl ViewMode {
    pub fn toggled(self) -> Self {
        match self {
            ViewMode::Current => ViewMode::Forecast,
            ViewMode::Forecast => ViewMode::Current,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temperature: f64,
    pub apparent_temperature: Option<f64>,
    pub wind_speed: f64,
    pub condition_code: i32,
}

/// Parallel daily sequences; index `i` of each describes the same day.
///
/// Individual readings may be missing when the upstream model has no value for that day.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DailyForecast {
    pub dates: Vec<String>,
    pub max_temp: Vec<Option<f64>>,
    pub min_temp: Option<Vec<Option<f64>>>,
    pub condition_code: Vec<Option<i32>>,
}

/// Weather for one location, with values already expressed in the units it was fetched in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub current: CurrentConditions,
    pub daily: DailyForecast,
}
