use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::model::{CurrentConditions, DailyForecast, Location, UnitPreference, WeatherSnapshot};

use super::{ForecastSource, Geocoder, ProviderError};

const GEOCODING: &str = "Open-Meteo geocoding";
const FORECAST: &str = "Open-Meteo forecast";

const CURRENT_FIELDS: &str = "temperature_2m,apparent_temperature,weather_code,wind_speed_10m";
const DAILY_FIELDS: &str = "weather_code,temperature_2m_max,temperature_2m_min";

#[derive(Debug, Clone)]
pub struct OpenMeteoGeocoder {
    base_url: String,
    language: String,
    http: Client,
}

impl OpenMeteoGeocoder {
    pub fn new(base_url: impl Into<String>, language: impl Into<String>, http: Client) -> Self {
        Self {
            base_url: base_url.into(),
            language: language.into(),
            http,
        }
    }
}

#[async_trait]
impl Geocoder for OpenMeteoGeocoder {
    #[instrument(skip(self))]
    async fn search(&self, query: &str, count: u8) -> Result<Vec<Location>, ProviderError> {
        let url = format!("{}/search", self.base_url.trim_end_matches('/'));
        let count = count.to_string();

        let body = get_text(
            &self.http,
            GEOCODING,
            &url,
            &[
                ("name", query),
                ("count", count.as_str()),
                ("language", self.language.as_str()),
                ("format", "json"),
            ],
        )
        .await?;

        let parsed: GeoResponse = serde_json::from_str(&body).map_err(|e| ProviderError::Parse {
            service: GEOCODING,
            message: e.to_string(),
        })?;

        let places: Vec<Location> = parsed
            .results
            .unwrap_or_default()
            .into_iter()
            .map(Location::from)
            .collect();

        debug!(matches = places.len(), "geocoding finished");
        Ok(places)
    }
}

#[derive(Debug, Clone)]
pub struct OpenMeteoForecast {
    base_url: String,
    http: Client,
}

impl OpenMeteoForecast {
    pub fn new(base_url: impl Into<String>, http: Client) -> Self {
        Self {
            base_url: base_url.into(),
            http,
        }
    }
}

#[async_trait]
impl ForecastSource for OpenMeteoForecast {
    #[instrument(skip(self, units), fields(units = %units))]
    async fn forecast(
        &self,
        latitude: f64,
        longitude: f64,
        units: UnitPreference,
    ) -> Result<WeatherSnapshot, ProviderError> {
        let url = format!("{}/forecast", self.base_url.trim_end_matches('/'));
        let latitude = latitude.to_string();
        let longitude = longitude.to_string();

        let body = get_text(
            &self.http,
            FORECAST,
            &url,
            &[
                ("latitude", latitude.as_str()),
                ("longitude", longitude.as_str()),
                ("current", CURRENT_FIELDS),
                ("daily", DAILY_FIELDS),
                ("temperature_unit", units.temperature_unit()),
                ("wind_speed_unit", units.wind_speed_unit()),
                ("timezone", "auto"),
            ],
        )
        .await?;

        let parsed: ForecastResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::Parse {
                service: FORECAST,
                message: e.to_string(),
            })?;

        parsed.into_snapshot().map_err(|message| ProviderError::Parse {
            service: FORECAST,
            message,
        })
    }
}

async fn get_text(
    http: &Client,
    service: &'static str,
    url: &str,
    query: &[(&str, &str)],
) -> Result<String, ProviderError> {
    let res = http
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(|e| ProviderError::from_reqwest(service, e))?;

    let status = res.status();
    let body = res
        .text()
        .await
        .map_err(|e| ProviderError::from_reqwest(service, e))?;

    if !status.is_success() {
        return Err(ProviderError::Status {
            service,
            status,
            body: truncate_body(&body),
        });
    }

    Ok(body)
}

#[derive(Debug, Deserialize)]
struct GeoResponse {
    #[serde(default)]
    results: Option<Vec<GeoResult>>,
}

#[derive(Debug, Deserialize)]
struct GeoResult {
    name: String,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    admin1: Option<String>,
    latitude: f64,
    longitude: f64,
}

impl From<GeoResult> for Location {
    fn from(r: GeoResult) -> Self {
        Location {
            name: r.name,
            country: r.country,
            admin1: r.admin1,
            latitude: r.latitude,
            longitude: r.longitude,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: Option<ApiCurrent>,
    daily: Option<ApiDaily>,
}

#[derive(Debug, Deserialize)]
struct ApiCurrent {
    temperature_2m: f64,
    #[serde(default)]
    apparent_temperature: Option<f64>,
    weather_code: i32,
    wind_speed_10m: f64,
}

#[derive(Debug, Deserialize)]
struct ApiDaily {
    time: Vec<String>,
    weather_code: Vec<Option<i32>>,
    temperature_2m_max: Vec<Option<f64>>,
    #[serde(default)]
    temperature_2m_min: Option<Vec<Option<f64>>>,
}

impl ForecastResponse {
    fn into_snapshot(self) -> Result<WeatherSnapshot, String> {
        let current = self.current.ok_or("no current weather in response")?;
        let daily = self.daily.ok_or("no daily forecast in response")?;

        let days = daily.time.len();
        let min_len = daily.temperature_2m_min.as_ref().map_or(days, Vec::len);
        if daily.weather_code.len() != days
            || daily.temperature_2m_max.len() != days
            || min_len != days
        {
            return Err(format!(
                "daily sequences differ in length (time={days}, codes={}, max={}, min={min_len})",
                daily.weather_code.len(),
                daily.temperature_2m_max.len(),
            ));
        }

        Ok(WeatherSnapshot {
            current: CurrentConditions {
                temperature: current.temperature_2m,
                apparent_temperature: current.apparent_temperature,
                wind_speed: current.wind_speed_10m,
                condition_code: current.weather_code,
            },
            daily: DailyForecast {
                dates: daily.time,
                max_temp: daily.temperature_2m_max,
                min_temp: daily.temperature_2m_min,
                condition_code: daily.weather_code,
            },
        })
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
