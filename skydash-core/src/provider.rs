use crate::{
    Config, Location, UnitPreference, WeatherSnapshot,
    provider::open_meteo::{OpenMeteoForecast, OpenMeteoGeocoder},
};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::{fmt::Debug, time::Duration};
use thiserror::Error;

pub mod open_meteo;

/// Failure talking to an upstream HTTP API.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Failed to send request to {service}: {source}")]
    Request {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} did not respond in time")]
    Timeout { service: &'static str },

    #[error("{service} request failed with status {status}: {body}")]
    Status {
        service: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("Failed to parse {service} response: {message}")]
    Parse {
        service: &'static str,
        message: String,
    },
}

impl ProviderError {
    pub(crate) fn from_reqwest(service: &'static str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout { service }
        } else {
            ProviderError::Request { service, source: err }
        }
    }
}

/// Resolves free text to places.
#[async_trait]
pub trait Geocoder: Send + Sync + Debug {
    /// Up to `count` matches, best first. An empty list means nothing matched.
    async fn search(&self, query: &str, count: u8) -> Result<Vec<Location>, ProviderError>;
}

/// Fetches current conditions and the daily forecast for a coordinate.
#[async_trait]
pub trait ForecastSource: Send + Sync + Debug {
    async fn forecast(
        &self,
        latitude: f64,
        longitude: f64,
        units: UnitPreference,
    ) -> Result<WeatherSnapshot, ProviderError>;
}

/// Shared HTTP client for both Open-Meteo endpoints.
pub fn http_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(concat!("skydash/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
}

/// Construct the geocoding and forecast clients described by `config`.
pub fn providers_from_config(
    config: &Config,
) -> anyhow::Result<(Box<dyn Geocoder>, Box<dyn ForecastSource>)> {
    let http = http_client(Duration::from_secs(config.timeout_secs))
        .context("Failed to build HTTP client")?;

    let geocoder = OpenMeteoGeocoder::new(
        config.geocoding_base_url.clone(),
        config.language.clone(),
        http.clone(),
    );
    let forecast = OpenMeteoForecast::new(config.forecast_base_url.clone(), http);

    Ok((Box::new(geocoder), Box::new(forecast)))
}
