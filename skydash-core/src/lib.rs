//! Core library for the SkyDash weather bot.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Open-Meteo geocoding and forecast clients behind small traits
//! - The weather code table and the dashboard renderer
//! - Per-user unit preferences and expiring dashboard sessions
//! - The controller that ties a search or button press to a rendered dashboard
//!
//! It has no Discord dependency; `skydash-bot` adapts it to serenity.

pub mod codes;
pub mod config;
pub mod controller;
pub mod dashboard;
pub mod model;
pub mod preferences;
pub mod provider;
pub mod session;

pub use config::Config;
pub use controller::{ButtonOutcome, Controller, InteractionError, RenderedDashboard};
pub use dashboard::{Dashboard, DashboardField, DashboardRenderer};
pub use model::{
    CurrentConditions, DailyForecast, Location, Suggestion, UnitPreference, UserId, ViewMode,
    WeatherSnapshot,
};
pub use preferences::PreferenceStore;
pub use provider::{ForecastSource, Geocoder, ProviderError};
pub use session::{DashboardEvent, SessionId};
