//! Rendering of weather data into the embed-shaped [`Dashboard`] document.
//!
//! Everything here is pure: the only input beyond the arguments is the render timestamp.

use chrono::{DateTime, Utc};

use crate::{
    codes,
    model::{Location, UnitPreference, ViewMode, WeatherSnapshot},
    session::DashboardSession,
};

/// Embed accent color, matching Discord's dark theme.
pub const EMBED_COLOR: u32 = 0x2b2d31;

/// How many days the forecast view shows at most.
pub const FORECAST_DAYS: usize = 3;

const MAPBOX_STATIC_URL: &str = "https://api.mapbox.com/styles/v1/mapbox/dark-v11/static";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// A rendered display document: title, description, fields, image, footer.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub title: String,
    pub description: Option<String>,
    pub fields: Vec<DashboardField>,
    pub image_url: Option<String>,
    pub footer: String,
    pub color: u32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct DashboardRenderer {
    map_token: Option<String>,
}

impl DashboardRenderer {
    /// `map_token` is the Mapbox access token; without one, no map image is attached.
    pub fn new(map_token: Option<String>) -> Self {
        Self {
            map_token: map_token.filter(|t| !t.is_empty()),
        }
    }

    pub fn render_session(&self, session: &DashboardSession) -> Dashboard {
        self.render(&session.location, &session.weather, session.units, session.mode)
    }

    pub fn render(
        &self,
        location: &Location,
        weather: &WeatherSnapshot,
        units: UnitPreference,
        mode: ViewMode,
    ) -> Dashboard {
        let mut dashboard = Dashboard {
            title: String::new(),
            description: None,
            fields: Vec::new(),
            image_url: None,
            footer: format!("SkyDash • {} units", units.label()),
            color: EMBED_COLOR,
            timestamp: Utc::now(),
        };

        match mode {
            ViewMode::Current => self.fill_current(&mut dashboard, location, weather, units),
            ViewMode::Forecast => fill_forecast(&mut dashboard, location, weather, units),
        }

        dashboard
    }

    fn fill_current(
        &self,
        dashboard: &mut Dashboard,
        location: &Location,
        weather: &WeatherSnapshot,
        units: UnitPreference,
    ) {
        let current = &weather.current;
        let temp = units.temperature_suffix();

        dashboard.title = format!("📍 {}", location.display_name());
        dashboard.description = Some(format!("### {}", codes::lookup(current.condition_code)));

        dashboard.fields.push(field(
            "Temperature",
            format!("**{}{temp}**", current.temperature),
            true,
        ));
        if let Some(feels_like) = current.apparent_temperature {
            dashboard
                .fields
                .push(field("Feels Like", format!("{feels_like}{temp}"), true));
        }
        dashboard.fields.push(field(
            "Wind Speed",
            format!("{} {}", current.wind_speed, units.wind_speed_suffix()),
            true,
        ));

        dashboard.image_url = self.map_token.as_deref().map(|token| {
            format!(
                "{MAPBOX_STATIC_URL}/{},{},9/600x300?access_token={token}",
                location.longitude, location.latitude
            )
        });
    }
}

fn fill_forecast(
    dashboard: &mut Dashboard,
    location: &Location,
    weather: &WeatherSnapshot,
    units: UnitPreference,
) {
    let daily = &weather.daily;
    let temp = units.temperature_suffix();

    dashboard.title = format!("📅 3-Day Forecast: {}", location.display_name());

    for (i, date) in daily.dates.iter().take(FORECAST_DAYS).enumerate() {
        let condition = daily
            .condition_code
            .get(i)
            .copied()
            .flatten()
            .map_or(codes::FALLBACK, codes::lookup);

        let max = reading(daily.max_temp.get(i).copied().flatten(), temp);
        let mut value = format!("{condition}\nMax: {max}");
        if let Some(min) = &daily.min_temp {
            let min = reading(min.get(i).copied().flatten(), temp);
            value.push_str(&format!(" | Min: {min}"));
        }

        dashboard.fields.push(field(date, value, false));
    }
}

fn reading(value: Option<f64>, suffix: &str) -> String {
    match value {
        Some(v) => format!("{v}{suffix}"),
        None => "n/a".to_string(),
    }
}

fn field(name: impl Into<String>, value: String, inline: bool) -> DashboardField {
    DashboardField {
        name: name.into(),
        value,
        inline,
    }
}
