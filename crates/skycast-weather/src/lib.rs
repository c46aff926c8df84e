//! Weather gateway for Skycast
//!
//! Wraps the OpenWeather geocoding and current-weather endpoints and
//! normalizes their responses.

pub mod client;
pub mod geolocation;
pub mod service;
pub mod types;

pub use client::{OpenWeatherClient, WeatherGateway};
pub use geolocation::{ConfiguredLocation, GeolocationProvider};
pub use service::ForecastService;
pub use types::*;
