//! Forecast lookups, displayed-forecast state and periodic refresh.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use skycast_weather::{Coordinates, ForecastService, GeolocationProvider, WeatherError, WeatherForecast};
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Whether current location may be used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeolocationStatus {
    #[default]
    Unknown,
    Granted,
    Denied,
}

/// What the periodic refresh re-fetches
#[derive(Debug, Clone, PartialEq)]
pub enum LookupKey {
    City(String),
    Coords(Coordinates),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastState {
    pub forecast: Option<WeatherForecast>,
    pub loading: bool,
    pub error: Option<String>,
    pub geolocation: GeolocationStatus,
}

#[derive(Debug, Default)]
struct Lookup {
    key: Option<LookupKey>,
    succeeded: bool,
}

pub struct ForecastController {
    service: ForecastService,
    geolocation: Arc<dyn GeolocationProvider>,
    refresh_interval: Duration,
    state: watch::Sender<ForecastState>,
    lookup: Mutex<Lookup>,
    lifecycle: Mutex<Option<CancellationToken>>,
}

impl ForecastController {
    pub fn new(
        service: ForecastService,
        geolocation: Arc<dyn GeolocationProvider>,
        refresh_interval: Duration,
    ) -> Self {
        let (state, _) = watch::channel(ForecastState::default());
        Self {
            service,
            geolocation,
            refresh_interval,
            state,
            lookup: Mutex::new(Lookup::default()),
            lifecycle: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ForecastState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ForecastState {
        self.state.borrow().clone()
    }

    pub fn lookup_key(&self) -> Option<LookupKey> {
        self.lookup.lock().key.clone()
    }

    /// Start the controller: one current-location fetch, then periodic refresh.
    ///
    /// Calling this while already active does nothing.
    pub fn activate(self: &Arc<Self>) {
        let token = {
            let mut lifecycle = self.lifecycle.lock();
            if lifecycle.is_some() {
                return;
            }
            let token = CancellationToken::new();
            *lifecycle = Some(token.clone());
            token
        };

        tracing::info!("Forecast controller activated");

        let this = Arc::clone(self);
        let initial = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = initial.cancelled() => {}
                _ = this.fetch_current_location_forecast() => {}
            }
        });

        if self.refresh_interval.is_zero() {
            tracing::info!("Periodic forecast refresh disabled");
            return;
        }

        let weak = Arc::downgrade(self);
        let period = self.refresh_interval;
        tokio::spawn(refresh_loop(weak, period, token));
    }

    /// Stop periodic refresh. In-flight fetches are left to finish.
    pub fn deactivate(&self) {
        if let Some(token) = self.lifecycle.lock().take() {
            tracing::info!("Forecast controller deactivated");
            token.cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        self.lifecycle.lock().is_some()
    }

    pub async fn fetch_forecast_by_city(&self, city: &str) -> Option<WeatherForecast> {
        if city.trim().is_empty() {
            return None;
        }

        self.begin(Some(LookupKey::City(city.to_string())));
        let result = self.service.weather_by_city(city).await;
        self.finish(result)
    }

    /// A zero latitude or longitude is treated as "no coordinates".
    pub async fn fetch_forecast_by_coords(&self, lat: f64, lon: f64) -> Option<WeatherForecast> {
        if lat == 0.0 || lon == 0.0 {
            return None;
        }

        let coords = Coordinates::new(lat, lon);
        self.begin(Some(LookupKey::Coords(coords)));
        let result = self.service.weather_by_coords(coords, None).await;
        self.finish(result)
    }

    pub async fn fetch_current_location_forecast(&self) -> Option<WeatherForecast> {
        self.begin(None);

        let coords = match self.geolocation.current_position().await {
            Ok(coords) => coords,
            Err(e) => return self.finish(Err(WeatherError::from(e))),
        };

        tracing::info!("Got location: {}, {}", coords.lat, coords.lon);
        self.lookup.lock().key = Some(LookupKey::Coords(coords));
        self.state
            .send_modify(|s| s.geolocation = GeolocationStatus::Granted);

        let result = self.service.weather_by_coords(coords, None).await;
        self.finish(result)
    }

    /// Re-run the last lookup, if one has ever succeeded.
    pub async fn refresh(&self) -> Option<WeatherForecast> {
        let key = {
            let lookup = self.lookup.lock();
            if !lookup.succeeded {
                return None;
            }
            lookup.key.clone()?
        };

        tracing::debug!("Refreshing forecast for {:?}", key);
        match key {
            LookupKey::City(city) => self.fetch_forecast_by_city(&city).await,
            LookupKey::Coords(c) => self.fetch_forecast_by_coords(c.lat, c.lon).await,
        }
    }

    fn begin(&self, key: Option<LookupKey>) {
        if let Some(key) = key {
            self.lookup.lock().key = Some(key);
        }
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });
    }

    fn finish(&self, result: Result<WeatherForecast, WeatherError>) -> Option<WeatherForecast> {
        match result {
            Ok(forecast) => {
                self.lookup.lock().succeeded = true;
                self.state.send_modify(|s| {
                    s.forecast = Some(forecast.clone());
                    s.loading = false;
                });
                Some(forecast)
            }
            Err(e) => {
                tracing::warn!("Forecast lookup failed: {}", e);
                let denied = e.is_permission_denied();
                self.state.send_modify(|s| {
                    s.error = Some(e.to_string());
                    s.loading = false;
                    if denied {
                        s.geolocation = GeolocationStatus::Denied;
                    }
                });
                None
            }
        }
    }
}

impl Drop for ForecastController {
    fn drop(&mut self) {
        self.deactivate();
    }
}

async fn refresh_loop(controller: Weak<ForecastController>, period: Duration, token: CancellationToken) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                let Some(controller) = controller.upgrade() else { break };
                controller.refresh().await;
            }
        }
    }

    tracing::debug!("Forecast refresh loop stopped");
}
