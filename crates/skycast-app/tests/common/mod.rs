//! In-process fakes shared by the controller tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use skycast_app::{Notification, Notifier};
use skycast_core::LocationError;
use skycast_weather::{
    Coordinates, ForecastService, GeoCodeResult, GeolocationProvider, OpenWeatherResponse,
    WeatherError, WeatherGateway,
};
use tokio::sync::mpsc;

pub fn place(name: &str, country: &str, state: Option<&str>, lat: f64, lon: f64) -> GeoCodeResult {
    GeoCodeResult {
        name: name.to_string(),
        lat,
        lon,
        country: country.to_string(),
        state: state.map(str::to_string),
    }
}

pub fn kyiv() -> GeoCodeResult {
    place("Kyiv", "UA", Some("Kyiv City"), 50.4501, 30.5234)
}

pub fn london() -> GeoCodeResult {
    place("London", "GB", Some("England"), 51.5074, -0.1278)
}

pub fn longyearbyen() -> GeoCodeResult {
    place("Longyearbyen", "SJ", None, 78.2232, 15.6267)
}

/// Gateway over a fixed list of places.
///
/// City search is a case-insensitive prefix match. Weather is answered for any
/// coordinates, named after the matching place or "Somewhere".
#[derive(Default)]
pub struct FakeGateway {
    places: Vec<GeoCodeResult>,
    search_delays: Mutex<HashMap<String, Duration>>,
    fail_search: AtomicBool,
    fail_weather: AtomicBool,
    pub searches: Mutex<Vec<String>>,
    weather_calls: AtomicUsize,
}

impl FakeGateway {
    pub fn new(places: Vec<GeoCodeResult>) -> Self {
        Self {
            places,
            ..Default::default()
        }
    }

    pub fn with_search_delay(self, query: &str, delay: Duration) -> Self {
        self.search_delays.lock().insert(query.to_string(), delay);
        self
    }

    pub fn fail_search(&self, fail: bool) {
        self.fail_search.store(fail, Ordering::SeqCst);
    }

    pub fn fail_weather(&self, fail: bool) {
        self.fail_weather.store(fail, Ordering::SeqCst);
    }

    pub fn search_queries(&self) -> Vec<String> {
        self.searches.lock().clone()
    }

    pub fn weather_calls(&self) -> usize {
        self.weather_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherGateway for FakeGateway {
    async fn search_cities(&self, query: &str) -> Result<Vec<GeoCodeResult>, WeatherError> {
        self.searches.lock().push(query.to_string());

        let delay = self.search_delays.lock().get(query).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_search.load(Ordering::SeqCst) {
            return Err(WeatherError::Api {
                status: 500,
                message: Some("internal error".into()),
            });
        }

        let needle = query.to_lowercase();
        Ok(self
            .places
            .iter()
            .filter(|p| p.name.to_lowercase().starts_with(&needle))
            .cloned()
            .collect())
    }

    async fn get_weather(&self, coords: Coordinates) -> Result<OpenWeatherResponse, WeatherError> {
        self.weather_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_weather.load(Ordering::SeqCst) {
            return Err(WeatherError::NoResponse("connection refused".into()));
        }

        let (name, country) = self
            .places
            .iter()
            .find(|p| Coordinates::new(p.lat, p.lon).is_same_location(&coords))
            .map(|p| (p.name.clone(), p.country.clone()))
            .unwrap_or_else(|| ("Somewhere".to_string(), "ZZ".to_string()));

        Ok(weather_response(&name, &country))
    }
}

pub fn weather_response(name: &str, country: &str) -> OpenWeatherResponse {
    serde_json::from_value(json!({
        "name": name,
        "weather": [{ "description": "light rain", "icon": "10d" }],
        "main": {
            "temp": 12.6,
            "temp_min": 10.2,
            "temp_max": 14.5,
            "pressure": 1012.0,
            "humidity": 81.0
        },
        "wind": { "speed": 4.1 },
        "sys": { "country": country }
    }))
    .unwrap()
}

pub fn service(gateway: &Arc<FakeGateway>) -> ForecastService {
    ForecastService::new(Arc::clone(gateway) as Arc<dyn WeatherGateway>)
}

/// Geolocation answering with a fixed result and counting requests
pub struct FakeLocation {
    result: Result<Coordinates, LocationError>,
    calls: AtomicUsize,
}

impl FakeLocation {
    pub fn at(coords: Coordinates) -> Self {
        Self {
            result: Ok(coords),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: LocationError) -> Self {
        Self {
            result: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GeolocationProvider for FakeLocation {
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result
    }
}

/// Notifier that records every message
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn error(&self, message: &str) {
        self.messages.lock().push(message.to_string());
    }
}

pub fn drain(rx: &mut mpsc::UnboundedReceiver<Notification>) -> Vec<String> {
    let mut messages = Vec::new();
    while let Ok(n) = rx.try_recv() {
        messages.push(n.message);
    }
    messages
}
