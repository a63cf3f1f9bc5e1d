//! The request/render pipeline behind the `/weather` command and its buttons.

use std::{sync::Arc, time::Duration, time::Instant};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::{
    Config,
    dashboard::{Dashboard, DashboardRenderer},
    model::{Location, Suggestion, UnitPreference, UserId, ViewMode},
    preferences::PreferenceStore,
    provider::{ForecastSource, Geocoder, ProviderError, providers_from_config},
    session::{DashboardEvent, DashboardSession, SessionId, SessionStore, Transition},
};

/// Queries shorter than this get no suggestions and no outbound call.
pub const MIN_SUGGESTION_CHARS: usize = 3;

/// Discord accepts at most this many autocomplete choices.
pub const MAX_SUGGESTIONS: u8 = 10;

const DEFAULT_SUGGESTION_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum InteractionError {
    #[error("no location matched '{0}'")]
    LocationNotFound(String),

    #[error("forecast unavailable: {0}")]
    ForecastUnavailable(#[source] ProviderError),

    #[error("suggestion lookup failed: {0}")]
    SuggestionFetchFailed(#[source] ProviderError),

    #[error("dashboard session expired")]
    SessionExpired,
}

impl InteractionError {
    /// Text shown to the Discord user.
    pub fn user_message(&self) -> String {
        match self {
            InteractionError::LocationNotFound(query) => {
                format!("❌ Could not find '{query}'. Try being more specific!")
            }
            InteractionError::ForecastUnavailable(_) => {
                "⚠️ Weather data is unavailable right now. Please try again shortly.".to_string()
            }
            InteractionError::SuggestionFetchFailed(_) => {
                "⚠️ Location suggestions are unavailable right now.".to_string()
            }
            InteractionError::SessionExpired => {
                "⌛ This dashboard has expired. Run `/weather` again for fresh data.".to_string()
            }
        }
    }
}

/// A dashboard ready to be sent, with what the adapter needs to draw its buttons.
#[derive(Debug, Clone)]
pub struct RenderedDashboard {
    pub session_id: SessionId,
    pub mode: ViewMode,
    pub dashboard: Dashboard,
}

#[derive(Debug, Clone)]
pub enum ButtonOutcome {
    /// Re-render in place.
    Updated(RenderedDashboard),
    /// Units flipped and the dashboard was re-fetched in the new units.
    UnitsChanged {
        rendered: RenderedDashboard,
        units: UnitPreference,
    },
    /// Units flipped but the re-fetch failed; the new units apply to the next search.
    UnitsDeferred { units: UnitPreference },
}

impl ButtonOutcome {
    pub fn rendered(&self) -> Option<&RenderedDashboard> {
        match self {
            ButtonOutcome::Updated(rendered) | ButtonOutcome::UnitsChanged { rendered, .. } => {
                Some(rendered)
            }
            ButtonOutcome::UnitsDeferred { .. } => None,
        }
    }

    /// Private acknowledgement for the user who pressed the button, if any.
    pub fn notice(&self) -> Option<String> {
        match self {
            ButtonOutcome::Updated(_) => None,
            ButtonOutcome::UnitsChanged { units, .. } => {
                Some(format!("🌡️ Units switched to {}.", units.label()))
            }
            ButtonOutcome::UnitsDeferred { units } => Some(format!(
                "🌡️ Units set to {}. The change applies to your next search.",
                units.label()
            )),
        }
    }
}

#[derive(Debug)]
pub struct Controller {
    geocoder: Box<dyn Geocoder>,
    forecast: Box<dyn ForecastSource>,
    preferences: Arc<PreferenceStore>,
    sessions: SessionStore,
    renderer: DashboardRenderer,
    suggestion_timeout: Duration,
}

impl Controller {
    pub fn new(
        geocoder: Box<dyn Geocoder>,
        forecast: Box<dyn ForecastSource>,
        renderer: DashboardRenderer,
    ) -> Self {
        Self {
            geocoder,
            forecast,
            preferences: Arc::new(PreferenceStore::new()),
            sessions: SessionStore::default(),
            renderer,
            suggestion_timeout: DEFAULT_SUGGESTION_TIMEOUT,
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let (geocoder, forecast) = providers_from_config(config)?;
        let renderer = DashboardRenderer::new(config.mapbox_token.clone());

        Ok(Self::new(geocoder, forecast, renderer)
            .with_suggestion_timeout(Duration::from_secs(config.suggestion_timeout_secs))
            .with_session_timeout(Duration::from_secs(config.session_timeout_secs)))
    }

    pub fn with_preferences(mut self, preferences: Arc<PreferenceStore>) -> Self {
        self.preferences = preferences;
        self
    }

    pub fn with_suggestion_timeout(mut self, timeout: Duration) -> Self {
        self.suggestion_timeout = timeout;
        self
    }

    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.sessions = SessionStore::new(timeout);
        self
    }

    pub fn preferences(&self) -> &PreferenceStore {
        &self.preferences
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Handle a `/weather` invocation: resolve the location, fetch weather in the user's units,
    /// and open a session in the current view.
    ///
    /// `query` is either free text or a `lat|lon|name` suggestion token.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        user_id: UserId,
        query: &str,
    ) -> Result<RenderedDashboard, InteractionError> {
        let location = match Location::from_suggestion_token(query) {
            Some(location) => location,
            None => self.geocode(query).await?,
        };

        let units = self.preferences.get(user_id);
        let weather = self
            .forecast
            .forecast(location.latitude, location.longitude, units)
            .await
            .map_err(|e| {
                warn!(error = %e, location = %location.name, "forecast fetch failed");
                InteractionError::ForecastUnavailable(e)
            })?;

        let session = DashboardSession::new(location, weather, units, user_id);
        let dashboard = self.renderer.render_session(&session);
        let session_id = self.sessions.insert(session, Instant::now());

        info!(%session_id, "dashboard created");
        Ok(RenderedDashboard {
            session_id,
            mode: ViewMode::Current,
            dashboard,
        })
    }

    async fn geocode(&self, query: &str) -> Result<Location, InteractionError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(InteractionError::LocationNotFound(String::new()));
        }

        match self.geocoder.search(query, 1).await {
            Ok(places) => places
                .into_iter()
                .next()
                .ok_or_else(|| InteractionError::LocationNotFound(query.to_string())),
            Err(e) => {
                warn!(error = %e, "geocoding failed, treating as no match");
                Err(InteractionError::LocationNotFound(query.to_string()))
            }
        }
    }

    /// Autocomplete choices for a partially typed location.
    ///
    /// Never fails: short queries, lookup errors, and timeouts all give an empty list.
    pub async fn suggest(&self, partial: &str) -> Vec<Suggestion> {
        let partial = partial.trim();
        if partial.chars().count() < MIN_SUGGESTION_CHARS {
            return Vec::new();
        }

        let lookup = tokio::time::timeout(
            self.suggestion_timeout,
            self.geocoder.search(partial, MAX_SUGGESTIONS),
        )
        .await
        .unwrap_or(Err(ProviderError::Timeout {
            service: "location suggestions",
        }));

        match lookup {
            Ok(places) => places
                .iter()
                .take(usize::from(MAX_SUGGESTIONS))
                .map(Suggestion::from_location)
                .collect(),
            Err(e) => {
                let err = InteractionError::SuggestionFetchFailed(e);
                debug!(error = %err, query = partial, "no suggestions");
                Vec::new()
            }
        }
    }

    /// Apply a button press to a live session.
    #[instrument(skip(self))]
    pub async fn press(
        &self,
        session_id: SessionId,
        user_id: UserId,
        event: DashboardEvent,
    ) -> Result<ButtonOutcome, InteractionError> {
        let transition = self
            .sessions
            .with_session(session_id, Instant::now(), |s| s.apply(event))?;

        match transition {
            Transition::Render => {
                let rendered = self.rerender(session_id)?;
                Ok(ButtonOutcome::Updated(rendered))
            }
            Transition::ToggleUnits => self.toggle_units(session_id, user_id).await,
        }
    }

    /// Flip the units the session is showing, make that the presser's preference, and re-fetch.
    ///
    /// If another toggle on the same session lands first, its snapshot is kept and this result
    /// is dropped.
    async fn toggle_units(
        &self,
        session_id: SessionId,
        user_id: UserId,
    ) -> Result<ButtonOutcome, InteractionError> {
        let (location, shown, owner) = self
            .sessions
            .with_session(session_id, Instant::now(), |s| {
                (s.location.clone(), s.units, s.user_id)
            })?;
        let units = shown.toggled();
        self.preferences.set(user_id, units);

        match self
            .forecast
            .forecast(location.latitude, location.longitude, units)
            .await
        {
            Ok(weather) => {
                let replaced = self
                    .sessions
                    .with_session(session_id, Instant::now(), |s| {
                        if s.units != shown {
                            return false;
                        }
                        s.replace_weather(weather, units);
                        true
                    })?;
                let rendered = self.rerender(session_id)?;
                if !replaced {
                    debug!(%session_id, "units already switched by an earlier press");
                    return Ok(ButtonOutcome::Updated(rendered));
                }

                info!(%session_id, owner, presser = user_id, %units, "units switched");
                Ok(ButtonOutcome::UnitsChanged { rendered, units })
            }
            Err(e) => {
                warn!(error = %e, %units, "re-fetch after unit toggle failed");
                Ok(ButtonOutcome::UnitsDeferred { units })
            }
        }
    }

    fn rerender(&self, session_id: SessionId) -> Result<RenderedDashboard, InteractionError> {
        self.sessions
            .with_session(session_id, Instant::now(), |s| RenderedDashboard {
                session_id,
                mode: s.mode,
                dashboard: self.renderer.render_session(s),
            })
    }

    /// Drop idle sessions; returns how many were removed.
    pub fn purge_expired_sessions(&self) -> usize {
        self.sessions.purge_expired(Instant::now())
    }
}
