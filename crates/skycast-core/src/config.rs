use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Environment variable consulted when `api.api_key` is not set in the file.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    pub config_dir: PathBuf,

    /// Weather API connection settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Forecast and suggestion settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Search history settings
    #[serde(default)]
    pub history: HistoryConfig,

    /// Current-location settings
    #[serde(default)]
    pub location: LocationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the OpenWeather-compatible API
    pub base_url: String,

    /// API key attached to every request (optional, can be set via environment)
    pub api_key: Option<String>,

    /// Request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openweathermap.org".to_string(),
            api_key: None,
            timeout_ms: 5000,
        }
    }
}

impl ApiConfig {
    /// The configured key, falling back to `OPENWEATHER_API_KEY`.
    /// Blank values count as missing.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.key_or_else(|| std::env::var(API_KEY_ENV).ok())
    }

    fn key_or_else(&self, fallback: impl FnOnce() -> Option<String>) -> Option<String> {
        let present = |k: &String| !k.trim().is_empty();
        self.api_key
            .clone()
            .filter(present)
            .or_else(|| fallback().filter(present))
    }
}

/// Unit system requested from the weather API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    /// Kelvin
    Standard,
    /// Celsius
    #[default]
    Metric,
    /// Fahrenheit
    Imperial,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Metric => "metric",
            Self::Imperial => "imperial",
        }
    }
}

/// Language for weather descriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    Ua,
    #[default]
    En,
    Es,
    Fr,
    De,
}

impl Lang {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ua => "ua",
            Self::En => "en",
            Self::Es => "es",
            Self::Fr => "fr",
            Self::De => "de",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Measurement unit system
    #[serde(default)]
    pub units: Units,

    /// Response language
    #[serde(default)]
    pub lang: Lang,

    /// Silent refresh interval in milliseconds (0 disables refresh)
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,

    /// Maximum number of city suggestions returned
    #[serde(default = "default_suggestions_limit")]
    pub suggestions_limit: u32,

    /// Quiet period before a suggestion search is sent
    #[serde(default = "default_suggestion_debounce_ms")]
    pub suggestion_debounce_ms: u64,
}

fn default_refresh_interval_ms() -> u64 {
    60_000
}

fn default_suggestions_limit() -> u32 {
    5
}

fn default_suggestion_debounce_ms() -> u64 {
    400
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            units: Units::default(),
            lang: Lang::default(),
            refresh_interval_ms: default_refresh_interval_ms(),
            suggestions_limit: default_suggestions_limit(),
            suggestion_debounce_ms: default_suggestion_debounce_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Maximum number of history entries retained
    #[serde(default = "default_history_limit")]
    pub limit: usize,

    /// Key the active history is stored under; the removed stack uses `<key>_undo`
    #[serde(default = "default_storage_key")]
    pub storage_key: String,

    /// SQLite file holding durable history, relative to the config directory
    #[serde(default = "default_history_database")]
    pub database: PathBuf,
}

fn default_history_limit() -> usize {
    10
}

fn default_storage_key() -> String {
    "weather_search_history".to_string()
}

fn default_history_database() -> PathBuf {
    PathBuf::from("history.db")
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            limit: default_history_limit(),
            storage_key: default_storage_key(),
            database: default_history_database(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    /// Whether the app may use the current location at all
    #[serde(default = "default_location_enabled")]
    pub enabled: bool,

    pub latitude: Option<f64>,

    pub longitude: Option<f64>,
}

fn default_location_enabled() -> bool {
    true
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            enabled: default_location_enabled(),
            latitude: None,
            longitude: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("skycast");

        Self {
            config_dir,
            api: ApiConfig::default(),
            weather: WeatherConfig::default(),
            history: HistoryConfig::default(),
            location: LocationConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, creating default if it doesn't exist
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            let mut config = Self::default();
            if let Some(parent) = config_path.parent() {
                config.config_dir = parent.to_path_buf();
            }
            config.save_to(config_path)?;
            return Ok(config);
        }

        let contents =
            std::fs::read_to_string(config_path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", config_path.display(), e)))?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        Self::load()?.into_validated()
    }

    /// Validate an already loaded configuration, failing with
    /// [`ConfigError::Invalid`] when it has errors and logging its warnings.
    pub fn into_validated(self) -> Result<(Self, ValidationResult)> {
        let config = self;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    ///
    /// Returns a ValidationResult containing any errors or warnings.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.api.base_url, "api.base_url", &mut result);

        if self.api.timeout_ms == 0 {
            result.add_error("api.timeout_ms", "Request timeout must be greater than 0");
        }

        if self.api.resolved_api_key().is_none() {
            result.add_warning(
                "api.api_key",
                format!("No API key configured (set it here or via {})", API_KEY_ENV),
            );
        }

        if self.weather.refresh_interval_ms == 0 {
            result.add_warning(
                "weather.refresh_interval_ms",
                "Weather refresh disabled (0 ms)",
            );
        }

        if self.weather.suggestions_limit == 0 {
            result.add_error(
                "weather.suggestions_limit",
                "Suggestions limit must be greater than 0",
            );
        }

        if self.history.limit == 0 {
            result.add_error("history.limit", "History limit must be greater than 0");
        }

        if self.history.storage_key.trim().is_empty() {
            result.add_error("history.storage_key", "Storage key cannot be empty");
        }

        match (self.location.latitude, self.location.longitude) {
            (Some(lat), _) if !(-90.0..=90.0).contains(&lat) => {
                result.add_error("location.latitude", "Latitude must be within -90..=90");
            }
            (_, Some(lon)) if !(-180.0..=180.0).contains(&lon) => {
                result.add_error("location.longitude", "Longitude must be within -180..=180");
            }
            (Some(_), None) | (None, Some(_)) => {
                result.add_warning(
                    "location",
                    "Both latitude and longitude are needed for current location",
                );
            }
            _ => {}
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }

                if let Some(port) = url.port() {
                    if port == 0 {
                        result.add_error(field_name, "Port cannot be 0");
                    }
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Absolute path of the history database
    pub fn history_database_path(&self) -> PathBuf {
        if self.history.database.is_absolute() {
            self.history.database.clone()
        } else {
            self.config_dir.join(&self.history.database)
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("skycast");

        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyed() -> Config {
        let mut config = Config::default();
        config.api.api_key = Some("test-key".to_string());
        config
    }

    #[test]
    fn test_valid_default_config() {
        let result = keyed().validate();
        assert!(result.is_valid(), "Default config should be valid: {:?}", result.errors);
    }

    #[test]
    fn test_defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.api.timeout_ms, 5000);
        assert_eq!(config.weather.units, Units::Metric);
        assert_eq!(config.weather.lang, Lang::En);
        assert_eq!(config.weather.suggestions_limit, 5);
        assert_eq!(config.weather.refresh_interval_ms, 60_000);
        assert_eq!(config.weather.suggestion_debounce_ms, 400);
        assert_eq!(config.history.limit, 10);
        assert_eq!(config.history.storage_key, "weather_search_history");
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = keyed();
        config.api.base_url = "ftp://localhost:8080".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_invalid_url() {
        let mut config = keyed();
        config.api.base_url = "not-a-url".to_string();
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.field == "api.base_url"));
    }

    #[test]
    fn test_zero_limits_are_errors() {
        let mut config = keyed();
        config.history.limit = 0;
        config.weather.suggestions_limit = 0;
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.field == "history.limit"));
        assert!(result.errors.iter().any(|e| e.field == "weather.suggestions_limit"));
    }

    #[test]
    fn test_zero_refresh_is_warning() {
        let mut config = keyed();
        config.weather.refresh_interval_ms = 0;
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result
            .warnings
            .iter()
            .any(|w| w.field == "weather.refresh_interval_ms"));
    }

    #[test]
    fn test_out_of_range_latitude() {
        let mut config = keyed();
        config.location.latitude = Some(123.0);
        config.location.longitude = Some(10.0);
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.field == "location.latitude"));
    }

    #[test]
    fn test_blank_api_key_is_missing() {
        let api = ApiConfig {
            api_key: Some("   ".to_string()),
            ..ApiConfig::default()
        };
        if std::env::var(API_KEY_ENV).is_err() {
            assert!(api.resolved_api_key().is_none());
        }
    }

    #[test]
    fn test_blank_file_key_falls_back_to_environment() {
        let api = ApiConfig {
            api_key: Some(String::new()),
            ..ApiConfig::default()
        };
        assert_eq!(api.key_or_else(|| Some("env-key".into())).as_deref(), Some("env-key"));
        assert_eq!(api.key_or_else(|| Some("  ".into())), None);

        let api = ApiConfig {
            api_key: Some("file-key".into()),
            ..ApiConfig::default()
        };
        assert_eq!(api.key_or_else(|| Some("env-key".into())).as_deref(), Some("file-key"));
    }

    #[test]
    fn test_parse_failure_is_config_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[weather\nunits = 3").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_invalid_config_is_config_invalid_error() {
        let mut config = keyed();
        config.history.limit = 0;

        let err = config.into_validated().unwrap_err();
        match err.downcast_ref::<ConfigError>() {
            Some(ConfigError::Invalid(summary)) => assert!(summary.contains("history.limit")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_valid_config_passes_validation() {
        let (config, validation) = keyed().into_validated().unwrap();
        assert!(validation.is_valid());
        assert_eq!(config.history.limit, 10);
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.config_dir, dir.path());
        assert_eq!(
            config.history_database_path(),
            dir.path().join("history.db")
        );
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = keyed();
        config.weather.units = Units::Imperial;
        config.history.limit = 3;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.weather.units, Units::Imperial);
        assert_eq!(loaded.history.limit, 3);
        assert_eq!(loaded.api.api_key.as_deref(), Some("test-key"));
    }

    #[test]
    fn test_partial_file_uses_section_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "config_dir = \"/tmp/skycast\"\n[history]\nlimit = 4\n").unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.history.limit, 4);
        assert_eq!(loaded.history.storage_key, "weather_search_history");
        assert_eq!(loaded.weather.suggestions_limit, 5);
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1"));
        assert!(summary.contains("field2"));
    }
}
