//! OpenWeather HTTP gateway: city search and current weather.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use skycast_core::{ApiConfig, Lang, Units, WeatherConfig};
use std::time::Duration;
use tracing::instrument;

use crate::types::{Coordinates, GeoCodeResult, OpenWeatherResponse, WeatherError};

const GEOCODE_PATH: &str = "/geo/1.0/direct";
const WEATHER_PATH: &str = "/data/2.5/weather";

/// The two remote lookups the app depends on.
#[async_trait]
pub trait WeatherGateway: Send + Sync {
    /// Resolve a free-text city name to candidate locations, best match first.
    async fn search_cities(&self, query: &str) -> Result<Vec<GeoCodeResult>, WeatherError>;

    /// Fetch current weather at the given coordinates.
    async fn get_weather(&self, coords: Coordinates) -> Result<OpenWeatherResponse, WeatherError>;
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

/// reqwest-backed [`WeatherGateway`]
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: Client,
    base_url: String,
    api_key: String,
    units: Units,
    lang: Lang,
    suggestions_limit: u32,
}

impl OpenWeatherClient {
    /// Build a client from configuration.
    ///
    /// Fails with [`WeatherError::MissingApiKey`] when no key is configured.
    pub fn new(api: &ApiConfig, weather: &WeatherConfig) -> Result<Self, WeatherError> {
        let api_key = api.resolved_api_key().ok_or(WeatherError::MissingApiKey)?;

        let client = Client::builder()
            .timeout(Duration::from_millis(api.timeout_ms))
            .build()
            .map_err(|e| WeatherError::Request(e.to_string()))?;

        Ok(Self {
            client,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            api_key,
            units: weather.units,
            lang: weather.lang,
            suggestions_limit: weather.suggestions_limit,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, WeatherError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("appid", self.api_key.as_str())])
            .send()
            .await?;

        self.handle_response(response).await
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, WeatherError> {
        let status = response.status();

        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| WeatherError::Parse(e.to_string()));
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&text)
            .ok()
            .and_then(|body| body.message);

        tracing::debug!("Weather API returned status {}: {}", status, text);

        Err(WeatherError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl WeatherGateway for OpenWeatherClient {
    #[instrument(skip(self), level = "debug")]
    async fn search_cities(&self, query: &str) -> Result<Vec<GeoCodeResult>, WeatherError> {
        self.get_json(
            GEOCODE_PATH,
            &[
                ("q", query.to_string()),
                ("limit", self.suggestions_limit.to_string()),
            ],
        )
        .await
    }

    #[instrument(skip(self), level = "debug")]
    async fn get_weather(&self, coords: Coordinates) -> Result<OpenWeatherResponse, WeatherError> {
        self.get_json(
            WEATHER_PATH,
            &[
                ("lat", coords.lat.to_string()),
                ("lon", coords.lon.to_string()),
                ("units", self.units.as_str().to_string()),
                ("lang", self.lang.as_str().to_string()),
            ],
        )
        .await
    }
}
