//! Forecast lookups built on a [`WeatherGateway`].

use std::sync::Arc;

use crate::client::WeatherGateway;
use crate::types::{Coordinates, Suggestion, WeatherError, WeatherForecast};

/// Turns gateway responses into normalized forecasts and suggestions.
///
/// A 404 on a lookup that started from a city name is reported as
/// [`WeatherError::CityNotFound`] carrying that name.
#[derive(Clone)]
pub struct ForecastService {
    gateway: Arc<dyn WeatherGateway>,
}

impl ForecastService {
    pub fn new(gateway: Arc<dyn WeatherGateway>) -> Self {
        Self { gateway }
    }

    /// Geocode `city`, then fetch weather for the best match.
    pub async fn weather_by_city(&self, city: &str) -> Result<WeatherForecast, WeatherError> {
        let results = self
            .gateway
            .search_cities(city)
            .await
            .map_err(|e| not_found_as_city(e, city))?;

        let Some(best) = results.into_iter().next() else {
            tracing::info!("No geocoding results for {:?}", city);
            return Err(WeatherError::CityNotFound(city.to_string()));
        };

        self.weather_by_coords(Coordinates::new(best.lat, best.lon), best.state)
            .await
            .map_err(|e| not_found_as_city(e, city))
    }

    /// Fetch weather for `coords`, attaching `state` since the weather payload lacks it.
    pub async fn weather_by_coords(
        &self,
        coords: Coordinates,
        state: Option<String>,
    ) -> Result<WeatherForecast, WeatherError> {
        let data = self.gateway.get_weather(coords).await.map_err(|e| {
            tracing::warn!("Weather lookup failed for {:?}: {}", coords, e);
            e
        })?;

        Ok(WeatherForecast::from_response(data, coords, state))
    }

    /// City suggestions for a free-text query.
    pub async fn search_cities(&self, query: &str) -> Result<Vec<Suggestion>, WeatherError> {
        let results = self
            .gateway
            .search_cities(query)
            .await
            .map_err(|e| not_found_as_city(e, query))?;

        Ok(results.into_iter().map(Suggestion::from).collect())
    }
}

fn not_found_as_city(error: WeatherError, city: &str) -> WeatherError {
    match error {
        WeatherError::Api { status: 404, .. } => WeatherError::CityNotFound(city.to_string()),
        other => {
            tracing::warn!("City lookup failed for {:?}: {}", city, other);
            other
        }
    }
}
