//! WMO weather interpretation codes, as returned in Open-Meteo's `weather_code` fields.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Condition {
    pub icon: &'static str,
    pub label: &'static str,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.icon, self.label)
    }
}

/// Shown for any code missing from the table.
pub const FALLBACK: Condition = Condition { icon: "🌡️", label: "Weather" };

const fn c(icon: &'static str, label: &'static str) -> Option<Condition> {
    Some(Condition { icon, label })
}

/// Look up the table entry for `code`, if there is one.
pub fn condition(code: i32) -> Option<Condition> {
    match code {
        0 => c("☀️", "Clear Sky"),
        1 => c("🌤️", "Mainly Clear"),
        2 => c("⛅", "Partly Cloudy"),
        3 => c("☁️", "Overcast"),
        45 => c("🌫️", "Foggy"),
        48 => c("🌫️", "Rime Fog"),
        51 => c("🌦️", "Light Drizzle"),
        53 => c("🌦️", "Drizzle"),
        55 => c("🌧️", "Dense Drizzle"),
        56 | 57 => c("🌧️", "Freezing Drizzle"),
        61 => c("🌧️", "Rain"),
        63 => c("🌧️", "Moderate Rain"),
        65 => c("🌧️", "Heavy Rain"),
        66 | 67 => c("🌧️", "Freezing Rain"),
        71 => c("🌨️", "Snow"),
        73 => c("🌨️", "Moderate Snow"),
        75 => c("❄️", "Heavy Snow"),
        77 => c("🌨️", "Snow Grains"),
        80 | 81 => c("🌦️", "Rain Showers"),
        82 => c("⛈️", "Violent Showers"),
        85 | 86 => c("🌨️", "Snow Showers"),
        95 => c("⛈️", "Thunderstorm"),
        96 | 99 => c("⛈️", "Thunderstorm with Hail"),
        _ => None,
    }
}

/// Like [`condition`], but never fails: unmapped codes get [`FALLBACK`].
pub fn lookup(code: i32) -> Condition {
    condition(code).unwrap_or(FALLBACK)
}
