use std::fmt;

use foundation::GeoPoint;
use layers::{ClusterParams, PriceScale};
use providers::ProviderId;
use serde::{Deserialize, Serialize};

use crate::viewport::{ContainerSize, MapViewport};

pub const ENV_CENTER_LAT: &str = "MAPVIEW_CENTER_LAT";
pub const ENV_CENTER_LNG: &str = "MAPVIEW_CENTER_LNG";
pub const ENV_ZOOM: &str = "MAPVIEW_ZOOM";
pub const ENV_FOCUS_ZOOM: &str = "MAPVIEW_FOCUS_ZOOM";
pub const ENV_CLUSTER_CELL_PX: &str = "MAPVIEW_CLUSTER_CELL_PX";
pub const ENV_CLUSTER_EXPAND_ZOOM: &str = "MAPVIEW_CLUSTER_EXPAND_ZOOM";
pub const ENV_PROVIDER: &str = "MAPVIEW_PROVIDER";

#[derive(Debug)]
pub enum ConfigError {
    Parse(serde_json::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Parse(err) => write!(f, "config parse error: {err}"),
            ConfigError::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub default_center: GeoPoint,
    pub default_zoom: f64,
    /// Zoom used when the camera is sent to a single listing.
    pub focus_zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub cluster: ClusterParams,
    pub container: ContainerSize,
    pub price_scale: PriceScale,
    pub default_provider: ProviderId,
    pub log_filter: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            default_center: GeoPoint::new(43.585, 39.720),
            default_zoom: 14.0,
            focus_zoom: 18.0,
            min_zoom: 2.0,
            max_zoom: 20.0,
            cluster: ClusterParams::default(),
            container: ContainerSize::default(),
            price_scale: PriceScale::default(),
            default_provider: ProviderId::Raster,
            log_filter: "info".to_string(),
        }
    }
}

impl ViewerConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Overrides from the process environment. Unparseable values are
    /// ignored and the current value kept.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lat = env_var_f64(&lookup, ENV_CENTER_LAT, self.default_center.lat);
        let lng = env_var_f64(&lookup, ENV_CENTER_LNG, self.default_center.lng);
        self.default_center = GeoPoint::new(lat, lng);
        self.default_zoom = env_var_f64(&lookup, ENV_ZOOM, self.default_zoom);
        self.focus_zoom = env_var_f64(&lookup, ENV_FOCUS_ZOOM, self.focus_zoom);
        self.cluster.cell_size_px =
            f64::from(env_var_u32(&lookup, ENV_CLUSTER_CELL_PX, self.cluster.cell_size_px as u32));
        self.cluster.expand_zoom =
            env_var_f64(&lookup, ENV_CLUSTER_EXPAND_ZOOM, self.cluster.expand_zoom);
        if let Some(raw) = lookup(ENV_PROVIDER) {
            match raw.parse() {
                Ok(provider) => self.default_provider = provider,
                Err(err) => tracing::warn!(%err, "ignoring {ENV_PROVIDER}"),
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.default_center.is_valid() {
            return Err(ConfigError::Invalid(format!(
                "default center {:?} is out of range",
                self.default_center
            )));
        }
        if !(self.min_zoom.is_finite() && self.max_zoom.is_finite()) || self.min_zoom > self.max_zoom
        {
            return Err(ConfigError::Invalid(format!(
                "zoom range {}..{} is empty",
                self.min_zoom, self.max_zoom
            )));
        }
        for (name, zoom) in [("default_zoom", self.default_zoom), ("focus_zoom", self.focus_zoom)] {
            if !(self.min_zoom..=self.max_zoom).contains(&zoom) {
                return Err(ConfigError::Invalid(format!(
                    "{name} {zoom} outside {}..{}",
                    self.min_zoom, self.max_zoom
                )));
            }
        }
        if !(self.cluster.cell_size_px > 0.0) || !(self.cluster.tile_size_px > 0.0) {
            return Err(ConfigError::Invalid(
                "cluster cell and tile sizes must be positive".to_string(),
            ));
        }
        if self.container.width == 0 || self.container.height == 0 {
            return Err(ConfigError::Invalid("container has no area".to_string()));
        }
        Ok(())
    }

    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        zoom.clamp(self.min_zoom, self.max_zoom)
    }

    pub fn viewport(&self, center: GeoPoint, zoom: f64) -> MapViewport {
        MapViewport::new(
            center,
            self.clamp_zoom(zoom),
            self.container,
            self.cluster.tile_size_px,
        )
    }

    pub fn default_viewport(&self) -> MapViewport {
        self.viewport(self.default_center, self.default_zoom)
    }
}

fn env_var_u32(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u32) -> u32 {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_var_f64(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: f64) -> f64 {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .filter(|v: &f64| v.is_finite())
        .unwrap_or(default)
}
