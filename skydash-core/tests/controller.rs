//! Controller behaviour against in-memory providers.

use async_trait::async_trait;
use parking_lot::Mutex;
use skydash_core::{
    ButtonOutcome, Controller, CurrentConditions, DailyForecast, DashboardEvent,
    DashboardRenderer, ForecastSource, Geocoder, InteractionError, Location, PreferenceStore,
    ProviderError, UnitPreference, ViewMode, WeatherSnapshot,
};
use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

#[derive(Debug, Clone, Default)]
struct FakeGeocoder {
    places: Vec<Location>,
    fail: bool,
    delay: Duration,
    queries: Arc<Mutex<Vec<(String, u8)>>>,
}

impl FakeGeocoder {
    fn with_places(places: Vec<Location>) -> Self {
        Self {
            places,
            ..Self::default()
        }
    }

    fn calls(&self) -> usize {
        self.queries.lock().len()
    }
}

#[async_trait]
impl Geocoder for FakeGeocoder {
    async fn search(&self, query: &str, count: u8) -> Result<Vec<Location>, ProviderError> {
        self.queries.lock().push((query.to_string(), count));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(ProviderError::Parse {
                service: "fake geocoding",
                message: "boom".into(),
            });
        }
        Ok(self.places.iter().take(usize::from(count)).cloned().collect())
    }
}

#[derive(Debug, Clone, Default)]
struct FakeForecast {
    fail_for: Option<UnitPreference>,
    fail_always: bool,
    delay: Duration,
    calls: Arc<AtomicUsize>,
    requested: Arc<Mutex<Vec<UnitPreference>>>,
}

#[async_trait]
impl ForecastSource for FakeForecast {
    async fn forecast(
        &self,
        _latitude: f64,
        _longitude: f64,
        units: UnitPreference,
    ) -> Result<WeatherSnapshot, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().push(units);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self.fail_always || self.fail_for == Some(units) {
            return Err(ProviderError::Timeout {
                service: "fake forecast",
            });
        }

        let (temperature, max_temp) = match units {
            UnitPreference::Metric => (15.2, vec![Some(16.0), Some(14.0), Some(18.0)]),
            UnitPreference::Imperial => (59.4, vec![Some(60.8), Some(57.2), Some(64.4)]),
        };
        Ok(WeatherSnapshot {
            current: CurrentConditions {
                temperature,
                apparent_temperature: None,
                wind_speed: 12.1,
                condition_code: 3,
            },
            daily: DailyForecast {
                dates: vec!["2024-01-01".into(), "2024-01-02".into(), "2024-01-03".into()],
                max_temp,
                min_temp: None,
                condition_code: vec![Some(3), Some(61), Some(0)],
            },
        })
    }
}

fn london() -> Location {
    Location {
        name: "London".into(),
        country: Some("United Kingdom".into()),
        admin1: Some("England".into()),
        latitude: 51.5074,
        longitude: -0.1278,
    }
}

fn controller(geocoder: &FakeGeocoder, forecast: &FakeForecast) -> Controller {
    Controller::new(
        Box::new(geocoder.clone()),
        Box::new(forecast.clone()),
        DashboardRenderer::default(),
    )
}

#[tokio::test]
async fn search_renders_current_view() {
    let geocoder = FakeGeocoder::with_places(vec![london()]);
    let forecast = FakeForecast::default();
    let ctl = controller(&geocoder, &forecast);

    let rendered = ctl.search(1, "London").await.expect("search succeeds");

    assert_eq!(rendered.mode, ViewMode::Current);
    assert_eq!(rendered.dashboard.title, "📍 London, United Kingdom");
    assert!(rendered.dashboard.fields[0].value.contains("15.2°C"));
    assert_eq!(geocoder.queries.lock()[0], ("London".to_string(), 1));
    assert_eq!(*forecast.requested.lock(), vec![UnitPreference::Metric]);
    assert_eq!(ctl.sessions().len(), 1);
}

#[tokio::test]
async fn search_uses_stored_unit_preference() {
    let geocoder = FakeGeocoder::with_places(vec![london()]);
    let forecast = FakeForecast::default();
    let prefs = Arc::new(PreferenceStore::new());
    prefs.set(9, UnitPreference::Imperial);
    let ctl = controller(&geocoder, &forecast).with_preferences(Arc::clone(&prefs));

    let rendered = ctl.search(9, "London").await.unwrap();

    assert_eq!(*forecast.requested.lock(), vec![UnitPreference::Imperial]);
    assert_eq!(rendered.dashboard.footer, "SkyDash • Imperial units");
    assert!(rendered.dashboard.fields[0].value.contains("59.4°F"));
}

#[tokio::test]
async fn unknown_location_creates_no_session() {
    let geocoder = FakeGeocoder::default();
    let forecast = FakeForecast::default();
    let ctl = controller(&geocoder, &forecast);

    let err = ctl.search(1, "Atlantis").await.unwrap_err();

    assert!(matches!(&err, InteractionError::LocationNotFound(q) if q == "Atlantis"));
    assert!(err.user_message().contains("Could not find 'Atlantis'"));
    assert_eq!(forecast.calls.load(Ordering::SeqCst), 0);
    assert!(ctl.sessions().is_empty());
}

#[tokio::test]
async fn geocoding_failure_reads_as_not_found() {
    let geocoder = FakeGeocoder {
        fail: true,
        ..FakeGeocoder::default()
    };
    let ctl = controller(&geocoder, &FakeForecast::default());

    let err = ctl.search(1, "London").await.unwrap_err();
    assert!(matches!(err, InteractionError::LocationNotFound(_)));
}

#[tokio::test]
async fn forecast_failure_is_reported_not_raised() {
    let geocoder = FakeGeocoder::with_places(vec![london()]);
    let forecast = FakeForecast {
        fail_always: true,
        ..FakeForecast::default()
    };
    let ctl = controller(&geocoder, &forecast);

    let err = ctl.search(1, "London").await.unwrap_err();

    assert!(matches!(err, InteractionError::ForecastUnavailable(_)));
    assert!(err.user_message().contains("unavailable"));
    assert!(ctl.sessions().is_empty());
}

#[tokio::test]
async fn suggestion_token_skips_geocoding() {
    let geocoder = FakeGeocoder::with_places(vec![london()]);
    let forecast = FakeForecast::default();
    let ctl = controller(&geocoder, &forecast);

    let rendered = ctl
        .search(1, "48.8566|2.3522|Paris, Île-de-France, France")
        .await
        .unwrap();

    assert_eq!(geocoder.calls(), 0);
    assert_eq!(rendered.dashboard.title, "📍 Paris, Île-de-France, France");
}

#[tokio::test]
async fn malformed_token_falls_back_to_free_text() {
    let geocoder = FakeGeocoder::with_places(vec![london()]);
    let ctl = controller(&geocoder, &FakeForecast::default());

    let rendered = ctl.search(1, "51.5|London").await.unwrap();

    assert_eq!(geocoder.queries.lock()[0].0, "51.5|London");
    assert_eq!(rendered.dashboard.title, "📍 London, United Kingdom");
}

#[tokio::test]
async fn short_queries_get_no_suggestions_and_no_call() {
    let geocoder = FakeGeocoder::with_places(vec![london()]);
    let ctl = controller(&geocoder, &FakeForecast::default());

    for partial in ["", "L", "Lo", "  Lo  ", "東京"] {
        assert!(ctl.suggest(partial).await.is_empty(), "{partial:?}");
    }
    assert_eq!(geocoder.calls(), 0);
}

#[tokio::test]
async fn suggestions_are_capped_and_carry_tokens() {
    let places: Vec<Location> = (0..12)
        .map(|i| Location {
            name: format!("Springfield {i}"),
            ..london()
        })
        .collect();
    let geocoder = FakeGeocoder::with_places(places);
    let ctl = controller(&geocoder, &FakeForecast::default());

    let suggestions = ctl.suggest("Springf").await;

    assert_eq!(suggestions.len(), 10);
    assert_eq!(geocoder.queries.lock()[0], ("Springf".to_string(), 10));
    assert_eq!(suggestions[0].label, "Springfield 0, England, United Kingdom");
    assert!(Location::from_suggestion_token(&suggestions[0].value).is_some());
}

#[tokio::test]
async fn failing_suggestions_degrade_to_empty() {
    let geocoder = FakeGeocoder {
        fail: true,
        ..FakeGeocoder::default()
    };
    let ctl = controller(&geocoder, &FakeForecast::default());

    assert!(ctl.suggest("London").await.is_empty());
    assert_eq!(geocoder.calls(), 1);
}

#[tokio::test]
async fn slow_suggestions_time_out_empty() {
    let geocoder = FakeGeocoder {
        places: vec![london()],
        delay: Duration::from_millis(500),
        ..FakeGeocoder::default()
    };
    let ctl = controller(&geocoder, &FakeForecast::default())
        .with_suggestion_timeout(Duration::from_millis(20));

    assert!(ctl.suggest("London").await.is_empty());
}

#[tokio::test]
async fn switch_view_and_refresh_do_not_refetch() {
    let geocoder = FakeGeocoder::with_places(vec![london()]);
    let forecast = FakeForecast::default();
    let ctl = controller(&geocoder, &forecast);
    let id = ctl.search(1, "London").await.unwrap().session_id;

    let outcome = ctl.press(id, 1, DashboardEvent::SwitchView).await.unwrap();
    let rendered = outcome.rendered().expect("re-rendered");
    assert_eq!(rendered.mode, ViewMode::Forecast);
    assert_eq!(rendered.dashboard.fields.len(), 3);
    assert_eq!(rendered.dashboard.fields[1].name, "2024-01-02");
    assert!(rendered.dashboard.fields[1].value.contains("🌧️ Rain"));
    assert!(rendered.dashboard.fields[1].value.contains("Max: 14°C"));
    assert!(outcome.notice().is_none());

    let outcome = ctl.press(id, 1, DashboardEvent::Refresh).await.unwrap();
    assert_eq!(outcome.rendered().unwrap().mode, ViewMode::Forecast);

    let outcome = ctl.press(id, 1, DashboardEvent::SwitchView).await.unwrap();
    assert_eq!(outcome.rendered().unwrap().mode, ViewMode::Current);

    assert_eq!(forecast.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn toggle_units_refetches_and_rerenders() {
    let geocoder = FakeGeocoder::with_places(vec![london()]);
    let forecast = FakeForecast::default();
    let ctl = controller(&geocoder, &forecast);
    let id = ctl.search(5, "London").await.unwrap().session_id;

    let outcome = ctl.press(id, 5, DashboardEvent::ToggleUnits).await.unwrap();

    let ButtonOutcome::UnitsChanged { rendered, units } = &outcome else {
        panic!("expected units change, got {outcome:?}");
    };
    assert_eq!(*units, UnitPreference::Imperial);
    assert_eq!(rendered.mode, ViewMode::Current);
    assert!(rendered.dashboard.fields[0].value.contains("59.4°F"));
    assert_eq!(rendered.dashboard.footer, "SkyDash • Imperial units");
    assert!(outcome.notice().unwrap().contains("Imperial"));
    assert_eq!(ctl.preferences().get(5), UnitPreference::Imperial);

    ctl.press(id, 5, DashboardEvent::ToggleUnits).await.unwrap();
    assert_eq!(ctl.preferences().get(5), UnitPreference::Metric);
    assert_eq!(
        *forecast.requested.lock(),
        vec![
            UnitPreference::Metric,
            UnitPreference::Imperial,
            UnitPreference::Metric
        ]
    );
}

#[tokio::test]
async fn toggle_flips_units_on_display_for_stale_session() {
    let geocoder = FakeGeocoder::with_places(vec![london()]);
    let forecast = FakeForecast::default();
    let ctl = controller(&geocoder, &forecast);
    let older = ctl.search(5, "London").await.unwrap().session_id;
    let newer = ctl.search(5, "London").await.unwrap().session_id;

    ctl.press(newer, 5, DashboardEvent::ToggleUnits).await.unwrap();
    assert_eq!(ctl.preferences().get(5), UnitPreference::Imperial);

    // The older dashboard still shows metric, so its button must switch it to imperial.
    let outcome = ctl.press(older, 5, DashboardEvent::ToggleUnits).await.unwrap();
    let rendered = outcome.rendered().expect("re-rendered");
    assert_eq!(rendered.dashboard.footer, "SkyDash • Imperial units");
    assert!(rendered.dashboard.fields[0].value.contains("59.4°F"));
    assert!(outcome.notice().unwrap().contains("Imperial"));
    assert_eq!(ctl.preferences().get(5), UnitPreference::Imperial);
}

#[tokio::test]
async fn toggle_by_another_user_follows_the_dashboard() {
    let geocoder = FakeGeocoder::with_places(vec![london()]);
    let forecast = FakeForecast::default();
    let prefs = Arc::new(PreferenceStore::new());
    prefs.set(2, UnitPreference::Imperial);
    let ctl = controller(&geocoder, &forecast).with_preferences(Arc::clone(&prefs));
    let id = ctl.search(1, "London").await.unwrap().session_id;

    let outcome = ctl.press(id, 2, DashboardEvent::ToggleUnits).await.unwrap();

    let ButtonOutcome::UnitsChanged { rendered, units } = &outcome else {
        panic!("expected units change, got {outcome:?}");
    };
    assert_eq!(*units, UnitPreference::Imperial);
    assert_eq!(rendered.dashboard.footer, "SkyDash • Imperial units");
    assert_eq!(prefs.get(2), UnitPreference::Imperial);
    assert_eq!(prefs.get(1), UnitPreference::Metric);
}

#[tokio::test]
async fn overlapping_toggles_keep_session_and_preference_in_step() {
    let geocoder = FakeGeocoder::with_places(vec![london()]);
    let forecast = FakeForecast {
        delay: Duration::from_millis(20),
        ..FakeForecast::default()
    };
    let ctl = controller(&geocoder, &forecast);
    let id = ctl.search(7, "London").await.unwrap().session_id;

    let (first, second) = tokio::join!(
        ctl.press(id, 7, DashboardEvent::ToggleUnits),
        ctl.press(id, 7, DashboardEvent::ToggleUnits),
    );
    let outcomes = [first.unwrap(), second.unwrap()];

    let changed = outcomes
        .iter()
        .filter(|o| matches!(o, ButtonOutcome::UnitsChanged { .. }))
        .count();
    assert_eq!(changed, 1);
    assert_eq!(ctl.preferences().get(7), UnitPreference::Imperial);

    let outcome = ctl.press(id, 7, DashboardEvent::Refresh).await.unwrap();
    assert_eq!(outcome.rendered().unwrap().dashboard.footer, "SkyDash • Imperial units");
}

#[tokio::test]
async fn failed_refetch_defers_unit_change() {
    let geocoder = FakeGeocoder::with_places(vec![london()]);
    let forecast = FakeForecast {
        fail_for: Some(UnitPreference::Imperial),
        ..FakeForecast::default()
    };
    let ctl = controller(&geocoder, &forecast);
    let id = ctl.search(3, "London").await.unwrap().session_id;

    let outcome = ctl.press(id, 3, DashboardEvent::ToggleUnits).await.unwrap();

    assert!(matches!(
        outcome,
        ButtonOutcome::UnitsDeferred {
            units: UnitPreference::Imperial
        }
    ));
    assert!(outcome.rendered().is_none());
    assert!(outcome.notice().unwrap().contains("next search"));
    assert_eq!(ctl.preferences().get(3), UnitPreference::Imperial);

    // The session keeps its metric snapshot.
    let outcome = ctl.press(id, 3, DashboardEvent::Refresh).await.unwrap();
    assert!(outcome.rendered().unwrap().dashboard.fields[0].value.contains("15.2°C"));
}

#[tokio::test]
async fn presses_after_expiry_are_rejected() {
    let geocoder = FakeGeocoder::with_places(vec![london()]);
    let ctl = controller(&geocoder, &FakeForecast::default()).with_session_timeout(Duration::ZERO);
    let id = ctl.search(1, "London").await.unwrap().session_id;

    let err = ctl.press(id, 1, DashboardEvent::SwitchView).await.unwrap_err();

    assert!(matches!(err, InteractionError::SessionExpired));
    assert!(err.user_message().contains("expired"));
    assert!(ctl.sessions().is_empty());
}

#[tokio::test]
async fn purge_removes_idle_sessions() {
    let geocoder = FakeGeocoder::with_places(vec![london()]);
    let ctl = controller(&geocoder, &FakeForecast::default()).with_session_timeout(Duration::ZERO);
    ctl.search(1, "London").await.unwrap();
    ctl.search(2, "London").await.unwrap();

    assert_eq!(ctl.purge_expired_sessions(), 2);
    assert!(ctl.sessions().is_empty());
}
