//! Current-position lookup.

use async_trait::async_trait;
use skycast_core::{LocationConfig, LocationError};

use crate::types::Coordinates;

/// Platform "get current position". May wait indefinitely for the user or platform.
#[async_trait]
pub trait GeolocationProvider: Send + Sync {
    async fn current_position(&self) -> Result<Coordinates, LocationError>;
}

/// Desktop provider backed by the `[location]` config section.
///
/// Disabled location reports `PermissionDenied`; enabled but unset
/// coordinates report `PositionUnavailable`.
#[derive(Debug, Clone)]
pub struct ConfiguredLocation {
    enabled: bool,
    coords: Option<Coordinates>,
}

impl ConfiguredLocation {
    pub fn new(enabled: bool, coords: Option<Coordinates>) -> Self {
        Self { enabled, coords }
    }

    pub fn from_config(config: &LocationConfig) -> Self {
        let coords = match (config.latitude, config.longitude) {
            (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
            _ => None,
        };
        Self::new(config.enabled, coords)
    }
}

#[async_trait]
impl GeolocationProvider for ConfiguredLocation {
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        if !self.enabled {
            tracing::debug!("Location disabled in config");
            return Err(LocationError::PermissionDenied);
        }

        self.coords.ok_or(LocationError::PositionUnavailable)
    }
}
