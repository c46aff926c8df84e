use serde::{Deserialize, Serialize};
use skycast_core::{AppError, ConfigError, LocationError, NetworkError};

/// Two coordinates closer than this on both axes are the same location.
pub const COORDS_TOLERANCE: f64 = 0.0001;

/// Geographic coordinates in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Location equality within [`COORDS_TOLERANCE`].
    pub fn is_same_location(&self, other: &Coordinates) -> bool {
        self.is_within(other, COORDS_TOLERANCE)
    }

    pub fn is_within(&self, other: &Coordinates, tolerance: f64) -> bool {
        (self.lat - other.lat).abs() < tolerance && (self.lon - other.lon).abs() < tolerance
    }
}

/// One entry of the geocoding search response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoCodeResult {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub state: Option<String>,
}

/// City suggestion shown while typing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub name: String,
    pub country: String,
    pub state: Option<String>,
    pub lat: f64,
    pub lon: f64,
}

impl Suggestion {
    pub fn coords(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lon)
    }
}

impl From<GeoCodeResult> for Suggestion {
    fn from(result: GeoCodeResult) -> Self {
        Self {
            name: result.name,
            country: result.country,
            state: result.state,
            lat: result.lat,
            lon: result.lon,
        }
    }
}

/// Raw current-weather payload. Only the fields the app reads are modelled.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenWeatherResponse {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub weather: Vec<WeatherDescription>,
    pub main: MainReadings,
    pub wind: Wind,
    pub sys: Sys,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherDescription {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MainReadings {
    pub temp: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub pressure: f64,
    pub humidity: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Wind {
    pub speed: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sys {
    #[serde(default)]
    pub country: String,
}

/// Normalized current weather for one location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherForecast {
    pub city: String,
    pub country: String,
    pub state: Option<String>,
    pub coords: Coordinates,
    pub temperature: i64,
    pub temp_min: i64,
    pub temp_max: i64,
    pub description: String,
    pub wind_speed: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub icon: String,
}

impl WeatherForecast {
    /// Project a raw response onto the displayed shape.
    ///
    /// `coords` are the requested coordinates, not the ones echoed back by the API,
    /// so history entries line up with what the user picked.
    pub fn from_response(
        data: OpenWeatherResponse,
        coords: Coordinates,
        state: Option<String>,
    ) -> Self {
        let (description, icon) = data
            .weather
            .into_iter()
            .next()
            .map(|w| (w.description, w.icon))
            .unwrap_or_default();

        Self {
            city: data.name,
            country: data.sys.country,
            state,
            coords,
            temperature: data.main.temp.round() as i64,
            temp_min: data.main.temp_min.round() as i64,
            temp_max: data.main.temp_max.round() as i64,
            description,
            wind_speed: data.wind.speed,
            humidity: data.main.humidity,
            pressure: data.main.pressure,
            icon,
        }
    }

    pub fn icon_url(&self) -> String {
        icon_url(&self.icon)
    }

    pub fn location_label(&self) -> String {
        format_location(self.state.as_deref(), Some(&self.country))
    }
}

pub fn icon_url(icon_code: &str) -> String {
    format!("https://openweathermap.org/img/wn/{}@4x.png", icon_code)
}

/// "State, Country" with blank parts skipped
pub fn format_location(state: Option<&str>, country: Option<&str>) -> String {
    [state, country]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

fn server_message_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .filter(|m| !m.is_empty())
        .map(|m| format!(": {}", m))
        .unwrap_or_default()
}

/// Weather gateway errors. `Display` is the message shown to the user.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Weather API key is not configured")]
    MissingApiKey,

    #[error("City \"{0}\" not found")]
    CityNotFound(String),

    #[error("Weather service error ({status}){}", server_message_suffix(.message))]
    Api {
        status: u16,
        message: Option<String>,
    },

    #[error("No response from weather service. Check your connection.")]
    NoResponse(String),

    #[error("Could not send weather request: {0}")]
    Request(String),

    #[error("Unexpected response from weather service: {0}")]
    Parse(String),

    #[error(transparent)]
    Location(#[from] LocationError),
}

impl WeatherError {
    /// Classify a transport-level failure.
    pub fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() || error.is_connect() {
            Self::NoResponse(error.to_string())
        } else if error.is_builder() {
            Self::Request(error.to_string())
        } else if error.is_decode() {
            Self::Parse(error.to_string())
        } else if let Some(status) = error.status() {
            Self::Api {
                status: status.as_u16(),
                message: None,
            }
        } else {
            Self::NoResponse(error.to_string())
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::Location(LocationError::PermissionDenied))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::CityNotFound(_) | Self::Api { status: 404, .. })
    }
}

impl From<reqwest::Error> for WeatherError {
    fn from(error: reqwest::Error) -> Self {
        Self::from_reqwest(error)
    }
}

impl From<WeatherError> for AppError {
    fn from(e: WeatherError) -> Self {
        match e {
            WeatherError::MissingApiKey => {
                AppError::Config(ConfigError::MissingSetting("api.api_key".to_string()))
            }
            WeatherError::CityNotFound(city) => {
                AppError::Weather(skycast_core::WeatherError::CityNotFound(city))
            }
            WeatherError::Api { status: 401, .. } => {
                AppError::Weather(skycast_core::WeatherError::InvalidApiKey)
            }
            WeatherError::Api { status, .. } if status >= 500 => {
                AppError::Weather(skycast_core::WeatherError::ServiceUnavailable)
            }
            e @ WeatherError::Api { .. } => {
                AppError::Weather(skycast_core::WeatherError::ApiError(e.to_string()))
            }
            WeatherError::NoResponse(detail) => AppError::Network(NetworkError::NoResponse(detail)),
            WeatherError::Request(detail) => AppError::Network(NetworkError::RequestSetup(detail)),
            WeatherError::Parse(detail) => AppError::Network(NetworkError::InvalidResponse(detail)),
            WeatherError::Location(e) => AppError::Location(e),
        }
    }
}
