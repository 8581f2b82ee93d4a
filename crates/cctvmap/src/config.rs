//! Configuration file parsing and structures.
//!
//! cctvmap uses TOML. Every section is optional; an empty file yields the
//! same map the service shows out of the box.

use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::filter::Targets;

use crate::geo::LatLng;
use crate::locator::LOCATED_ZOOM;
use crate::map::TileLayer;
use crate::map::DEFAULT_TILE_ATTRIBUTION;
use crate::map::DEFAULT_TILE_MAX_ZOOM;
use crate::map::DEFAULT_TILE_URL;
use crate::status::Locale;

pub const DEFAULT_CENTER: [f64; 2] = [36.5, 127.5];
pub const DEFAULT_ZOOM: u8 = 7;
pub const DEFAULT_FEED_PATH: &str = "cctv_data.json";

/// Top-level configuration structure
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub locator: LocatorConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default)]
    pub level: LogLevel,

    /// Per-target levels, e.g. `"cctvmap::feed" = "debug"`
    #[serde(default)]
    pub overrides: HashMap<String, LogLevel>,
}

impl LoggingConfig {
    /// Build the subscriber filter for this config.
    pub fn targets(&self) -> Targets {
        Targets::new()
            .with_default(LevelFilter::from(self.level))
            .with_targets(
                self.overrides
                    .iter()
                    .map(|(target, level)| (target.clone(), LevelFilter::from(*level))),
            )
    }
}

/// Map presentation
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Default center `[lat, lng]`
    pub center: [f64; 2],

    /// Default zoom
    pub zoom: u8,

    /// Zoom applied when the user's position is found
    pub located_zoom: u8,

    pub locale: Locale,

    pub tiles: TilesConfig,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
            located_zoom: LOCATED_ZOOM,
            locale: Locale::default(),
            tiles: TilesConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TilesConfig {
    pub url: String,
    pub max_zoom: u8,
    pub attribution: String,
}

impl Default for TilesConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_TILE_URL.to_string(),
            max_zoom: DEFAULT_TILE_MAX_ZOOM,
            attribution: DEFAULT_TILE_ATTRIBUTION.to_string(),
        }
    }
}

impl From<&TilesConfig> for TileLayer {
    fn from(tiles: &TilesConfig) -> Self {
        TileLayer {
            url: tiles.url.clone(),
            max_zoom: tiles.max_zoom,
            attribution: tiles.attribution.clone(),
        }
    }
}

/// Device feed location. Exactly one of `url` and `path`.
#[derive(Debug, Deserialize)]
pub struct FeedConfig {
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Request timeout for `url`; unset means no timeout
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: None,
            path: Some(PathBuf::from(DEFAULT_FEED_PATH)),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LocatorMode {
    /// Report `position`
    Fixed,
    /// Query `url`
    Http,
    /// No location capability
    #[default]
    Disabled,
}

#[derive(Debug, Deserialize)]
pub struct LocatorConfig {
    #[serde(default)]
    pub mode: LocatorMode,

    #[serde(default)]
    pub position: Option<[f64; 2]>,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_locator_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            mode: LocatorMode::default(),
            position: None,
            url: None,
            timeout_secs: default_locator_timeout_secs(),
        }
    }
}

fn default_locator_timeout_secs() -> u64 {
    10
}

/// Read-only HTTP API
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub enabled: bool,
    pub listen: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen: "127.0.0.1".to_string(),
            port: 8565,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(path.as_ref().to_path_buf(), e))?;

        Self::parse(&contents)
    }

    /// Parse and validate TOML text
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid =
            |msg: String| -> Result<(), ConfigError> { Err(ConfigError::Validation(msg)) };

        let [lat, lng] = self.map.center;
        if LatLng::checked(lat, lng).is_none() {
            return invalid(format!("map.center {:?} is not a valid position", self.map.center));
        }
        if self.map.zoom > self.map.tiles.max_zoom {
            return invalid(format!(
                "map.zoom {} exceeds map.tiles.max_zoom {}",
                self.map.zoom, self.map.tiles.max_zoom
            ));
        }
        if self.map.located_zoom > self.map.tiles.max_zoom {
            return invalid(format!(
                "map.located_zoom {} exceeds map.tiles.max_zoom {}",
                self.map.located_zoom, self.map.tiles.max_zoom
            ));
        }

        match (&self.feed.url, &self.feed.path) {
            (Some(_), Some(_)) => return invalid("feed.url and feed.path are exclusive".into()),
            (None, None) => return invalid("feed needs one of url or path".into()),
            _ => {}
        }

        match self.locator.mode {
            LocatorMode::Fixed => match self.locator.position {
                Some([lat, lng]) if LatLng::checked(lat, lng).is_some() => {}
                Some(p) => return invalid(format!("locator.position {:?} is not valid", p)),
                None => return invalid("locator.mode = \"fixed\" needs locator.position".into()),
            },
            LocatorMode::Http if self.locator.url.is_none() => {
                return invalid("locator.mode = \"http\" needs locator.url".into());
            }
            _ => {}
        }

        Ok(())
    }

    pub fn default_center(&self) -> LatLng {
        LatLng::from(self.map.center)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Validation(String),
}
