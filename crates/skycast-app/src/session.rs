//! Wires gateway, storage and controllers together and maps user intents onto them.

use std::sync::Arc;
use std::time::Duration;

use skycast_core::{AppError, Config};
use skycast_history::{HistoryItem, HistoryStore, KeyValueStore, MemoryStore, SqliteStore};
use skycast_weather::{
    ConfiguredLocation, ForecastService, GeolocationProvider, OpenWeatherClient, Suggestion,
    WeatherForecast, WeatherGateway,
};

use crate::forecast::{ForecastController, DEFAULT_REFRESH_INTERVAL};
use crate::notify::{Notifier, HISTORY_LOAD_FAILED};
use crate::search_history::SearchHistory;
use crate::suggestions::{SuggestionController, DEFAULT_DEBOUNCE};

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub refresh_interval: Duration,
    pub suggestion_debounce: Duration,
    pub history_limit: usize,
    pub storage_key: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            suggestion_debounce: DEFAULT_DEBOUNCE,
            history_limit: 10,
            storage_key: "weather_search_history".to_string(),
        }
    }
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            refresh_interval: Duration::from_millis(config.weather.refresh_interval_ms),
            suggestion_debounce: Duration::from_millis(config.weather.suggestion_debounce_ms),
            history_limit: config.history.limit,
            storage_key: config.history.storage_key.clone(),
        }
    }
}

/// Collaborators a session is built from
pub struct SessionParts {
    pub gateway: Arc<dyn WeatherGateway>,
    pub geolocation: Arc<dyn GeolocationProvider>,
    pub durable: Arc<dyn KeyValueStore>,
    pub session: Arc<dyn KeyValueStore>,
    pub notifier: Arc<dyn Notifier>,
}

pub struct Session {
    forecast: Arc<ForecastController>,
    suggestions: SuggestionController,
    history: SearchHistory,
}

impl Session {
    pub fn new(parts: SessionParts, settings: SessionSettings) -> Self {
        let service = ForecastService::new(parts.gateway);

        let forecast = Arc::new(ForecastController::new(
            service.clone(),
            parts.geolocation,
            settings.refresh_interval,
        ));
        let suggestions = SuggestionController::new(
            service,
            Arc::clone(&parts.notifier),
            settings.suggestion_debounce,
        );
        let store = HistoryStore::new(
            parts.durable,
            parts.session,
            &settings.storage_key,
            settings.history_limit,
        );
        let history = SearchHistory::new(store, parts.notifier);

        Self {
            forecast,
            suggestions,
            history,
        }
    }

    /// Build a session from configuration.
    ///
    /// A missing API key is reported as a configuration error and no session is
    /// created. An unusable history database falls back to in-memory history.
    pub fn from_config(config: &Config, notifier: Arc<dyn Notifier>) -> Result<Self, AppError> {
        let gateway = OpenWeatherClient::new(&config.api, &config.weather)?;

        let db_path = config.history_database_path();
        let durable: Arc<dyn KeyValueStore> = match SqliteStore::open(&db_path) {
            Ok(store) => Arc::new(store),
            Err(e) => {
                tracing::error!("Failed to open history database {:?}: {}", db_path, e);
                notifier.error(HISTORY_LOAD_FAILED);
                Arc::new(MemoryStore::new())
            }
        };

        let parts = SessionParts {
            gateway: Arc::new(gateway),
            geolocation: Arc::new(ConfiguredLocation::from_config(&config.location)),
            durable,
            session: Arc::new(MemoryStore::new()),
            notifier,
        };

        Ok(Self::new(parts, SessionSettings::from_config(config)))
    }

    pub fn start(&self) {
        self.forecast.activate();
    }

    pub fn shutdown(&self) {
        self.suggestions.clear_suggestions();
        self.forecast.deactivate();
    }

    pub fn forecast(&self) -> &ForecastController {
        &self.forecast
    }

    pub fn suggestions(&self) -> &SuggestionController {
        &self.suggestions
    }

    pub fn history(&self) -> &SearchHistory {
        &self.history
    }

    /// Search by city name and record the resolved location.
    pub async fn search(&self, query: &str) -> Option<WeatherForecast> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }

        let forecast = self.forecast.fetch_forecast_by_city(query).await;
        if let Some(data) = &forecast {
            self.record(data, data.state.as_deref());
        }
        self.suggestions.clear_suggestions();
        forecast
    }

    /// Fetch the picked suggestion and record it under the suggestion's state.
    pub async fn select_suggestion(&self, suggestion: &Suggestion) -> Option<WeatherForecast> {
        let forecast = self
            .forecast
            .fetch_forecast_by_coords(suggestion.lat, suggestion.lon)
            .await;
        if let Some(data) = &forecast {
            self.record(data, suggestion.state.as_deref());
        }
        self.suggestions.clear_suggestions();
        forecast
    }

    /// Show a history entry again. History itself is left as is.
    pub async fn select_history(&self, item: &HistoryItem) -> Option<WeatherForecast> {
        self.forecast
            .fetch_forecast_by_coords(item.coords.lat, item.coords.lon)
            .await
    }

    pub async fn use_current_location(&self) -> Option<WeatherForecast> {
        let forecast = self.forecast.fetch_current_location_forecast().await;
        if let Some(data) = &forecast {
            self.record(data, data.state.as_deref());
        }
        forecast
    }

    pub fn type_query(&self, text: &str) {
        self.suggestions.fetch_suggestions(text);
    }

    pub fn remove_history(&self, id: &str) {
        self.history.remove(id);
    }

    pub fn undo_remove(&self) {
        self.history.undo_remove();
    }

    pub fn clear_history(&self) {
        self.history.clear();
    }

    fn record(&self, forecast: &WeatherForecast, state: Option<&str>) {
        self.history.add(
            &forecast.city,
            Some(forecast.country.as_str()),
            forecast.coords,
            state,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_follow_config() {
        let mut config = Config::default();
        config.weather.refresh_interval_ms = 30_000;
        config.weather.suggestion_debounce_ms = 250;
        config.history.limit = 3;
        config.history.storage_key = "h".into();

        let settings = SessionSettings::from_config(&config);
        assert_eq!(settings.refresh_interval, Duration::from_secs(30));
        assert_eq!(settings.suggestion_debounce, Duration::from_millis(250));
        assert_eq!(settings.history_limit, 3);
        assert_eq!(settings.storage_key, "h");
    }

    #[test]
    fn default_settings_match_default_config() {
        let from_config = SessionSettings::from_config(&Config::default());
        let defaults = SessionSettings::default();
        assert_eq!(from_config.refresh_interval, defaults.refresh_interval);
        assert_eq!(from_config.suggestion_debounce, defaults.suggestion_debounce);
        assert_eq!(from_config.history_limit, defaults.history_limit);
        assert_eq!(from_config.storage_key, defaults.storage_key);
    }
}
