//! Dashboard sessions: the live state behind one rendered message, and the store that
//! expires them after a period of inactivity.

use parking_lot::Mutex;
use std::{
    collections::HashMap,
    time::{Duration, Instant},
};
use uuid::Uuid;

use crate::{
    controller::InteractionError,
    model::{Location, UnitPreference, UserId, ViewMode, WeatherSnapshot},
};

pub type SessionId = Uuid;

/// Default inactivity window before a dashboard stops accepting button presses.
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(300);

const CUSTOM_ID_PREFIX: &str = "skydash";

/// A button press on a dashboard message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardEvent {
    Refresh,
    SwitchView,
    ToggleUnits,
}

impl DashboardEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            DashboardEvent::Refresh => "refresh",
            DashboardEvent::SwitchView => "view",
            DashboardEvent::ToggleUnits => "units",
        }
    }

    /// Component custom id, `skydash:<event>:<session>`.
    pub fn custom_id(&self, session: SessionId) -> String {
        format!("{CUSTOM_ID_PREFIX}:{}:{session}", self.as_str())
    }

    pub fn parse_custom_id(custom_id: &str) -> Option<(Self, SessionId)> {
        let mut parts = custom_id.splitn(3, ':');
        if parts.next()? != CUSTOM_ID_PREFIX {
            return None;
        }
        let event = match parts.next()? {
            "refresh" => DashboardEvent::Refresh,
            "view" => DashboardEvent::SwitchView,
            "units" => DashboardEvent::ToggleUnits,
            _ => return None,
        };
        let session = Uuid::parse_str(parts.next()?).ok()?;
        Some((event, session))
    }
}

/// What the controller must do after an event was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Re-render from the snapshot already held.
    Render,
    /// Flip the units on display, store them for the presser, and fetch a fresh snapshot.
    ToggleUnits,
}

#[derive(Debug, Clone)]
pub struct DashboardSession {
    pub location: Location,
    pub weather: WeatherSnapshot,
    /// Units `weather` was fetched in.
    pub units: UnitPreference,
    /// User who ran the search; anyone may press the buttons.
    pub user_id: UserId,
    pub mode: ViewMode,
}

impl DashboardSession {
    pub fn new(
        location: Location,
        weather: WeatherSnapshot,
        units: UnitPreference,
        user_id: UserId,
    ) -> Self {
        Self {
            location,
            weather,
            units,
            user_id,
            mode: ViewMode::Current,
        }
    }

    pub fn apply(&mut self, event: DashboardEvent) -> Transition {
        match event {
            DashboardEvent::Refresh => Transition::Render,
            DashboardEvent::SwitchView => {
                self.mode = self.mode.toggled();
                Transition::Render
            }
            DashboardEvent::ToggleUnits => Transition::ToggleUnits,
        }
    }

    pub fn replace_weather(&mut self, weather: WeatherSnapshot, units: UnitPreference) {
        self.weather = weather;
        self.units = units;
    }
}

#[derive(Debug)]
struct Entry {
    session: DashboardSession,
    last_active: Instant,
}

/// Live sessions keyed by id. Every successful access refreshes the inactivity clock.
#[derive(Debug)]
pub struct SessionStore {
    entries: Mutex<HashMap<SessionId, Entry>>,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TIMEOUT)
    }
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn insert(&self, session: DashboardSession, now: Instant) -> SessionId {
        let id = Uuid::new_v4();
        self.entries.lock().insert(
            id,
            Entry {
                session,
                last_active: now,
            },
        );
        id
    }

    /// Run `f` against a live session.
    ///
    /// An unknown id and one idle for at least the timeout both yield
    /// [`InteractionError::SessionExpired`]; the latter is removed.
    pub fn with_session<R>(
        &self,
        id: SessionId,
        now: Instant,
        f: impl FnOnce(&mut DashboardSession) -> R,
    ) -> Result<R, InteractionError> {
        let mut entries = self.entries.lock();

        let expired = match entries.get(&id) {
            None => return Err(InteractionError::SessionExpired),
            Some(entry) => now.saturating_duration_since(entry.last_active) >= self.ttl,
        };
        if expired {
            entries.remove(&id);
            return Err(InteractionError::SessionExpired);
        }

        let entry = entries
            .get_mut(&id)
            .ok_or(InteractionError::SessionExpired)?;
        entry.last_active = now;
        Ok(f(&mut entry.session))
    }

    /// Drop every expired session, returning how many were removed.
    pub fn purge_expired(&self, now: Instant) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, e| now.saturating_duration_since(e.last_active) < self.ttl);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
