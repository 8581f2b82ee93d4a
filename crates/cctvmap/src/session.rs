//! One map session: load the feed and locate the user, concurrently.

use std::sync::Arc;
#[cfg(any(feature = "feed_http", feature = "locator_http"))]
use std::time::Duration;

use serde::Serialize;
use tracing::error;
use tracing::info;

use crate::config::Config;
use crate::config::ConfigError;
use crate::config::LocatorMode;
use crate::device::Device;
use crate::diagnostics::DiagnosticsSummary;
use crate::feed::DeviceFeedLoader;
use crate::feed::FeedSource;
use crate::feed::FileFeedSource;
use crate::geo;
use crate::geo::LatLng;
use crate::locator::FixedGeolocator;
use crate::locator::Geolocator;
use crate::locator::LocateFuture;
use crate::locator::LocateStart;
use crate::locator::LocationError;
use crate::locator::LocatorState;
use crate::locator::Notice;
use crate::locator::UnsupportedGeolocator;
use crate::locator::UserLocator;
use crate::map::MapState;
use crate::map::MapSurface;
use crate::map::TileLayer;
use crate::projector::MarkerProjector;
use crate::status::Locale;

/// Initial map presentation.
#[derive(Debug, Clone)]
pub struct MapOptions {
    pub tiles: TileLayer,
    pub center: LatLng,
    pub zoom: u8,
    pub locale: Locale,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            tiles: TileLayer::default(),
            center: LatLng::from(crate::config::DEFAULT_CENTER),
            zoom: crate::config::DEFAULT_ZOOM,
            locale: Locale::default(),
        }
    }
}

/// Everything a finished session produced.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub map: MapState,
    pub devices: Vec<Device>,
    /// Present when the feed loaded
    pub summary: Option<DiagnosticsSummary>,
    pub locator: LocatorState,
    /// User-visible notices, in the order they were raised
    pub notices: Vec<Notice>,
    pub locale: Locale,
}

impl SessionReport {
    pub fn notice_messages(&self) -> Vec<&'static str> {
        self.notices.iter().map(|n| n.message(self.locale)).collect()
    }
}

pub struct Session {
    options: MapOptions,
    loader: DeviceFeedLoader,
    locator: UserLocator,
    projector: MarkerProjector,
}

impl Session {
    pub fn new(options: MapOptions, loader: DeviceFeedLoader, locator: UserLocator) -> Self {
        let projector = MarkerProjector::new(options.locale);
        Self {
            options,
            loader,
            locator,
            projector,
        }
    }

    /// Wire up feed source and geolocator from configuration.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let options = MapOptions {
            tiles: TileLayer::from(&config.map.tiles),
            center: config.default_center(),
            zoom: config.map.zoom,
            locale: config.map.locale,
        };

        let locator = UserLocator::new(
            geolocator_from_config(config)?,
            config.map.locale,
            config.map.located_zoom,
        );

        Ok(Self::new(
            options,
            DeviceFeedLoader::new(feed_source_from_config(config)?),
            locator,
        ))
    }

    /// Render the map.
    ///
    /// The feed load and the location request run concurrently on the
    /// current task; each result is applied to the map as soon as it arrives.
    /// Neither failure is fatal.
    pub async fn run(mut self) -> SessionReport {
        let mut map = MapState::new();
        map.add_tile_layer(self.options.tiles.clone());
        map.set_view(self.options.center, self.options.zoom);

        let mut notices = Vec::new();
        let mut devices = Vec::new();
        let mut summary = None;

        let mut pending_location = match self.locator.start() {
            LocateStart::Pending(fut) => Some(fut),
            LocateStart::Unsupported(notice) => {
                notices.push(notice);
                None
            }
            LocateStart::AlreadyStarted => None,
        };

        let feed = self.loader.load();
        tokio::pin!(feed);
        let mut feed_done = false;

        loop {
            tokio::select! {
                result = &mut feed, if !feed_done => {
                    feed_done = true;
                    match result {
                        Ok(loaded) => {
                            let placed = self.projector.project(&loaded.devices, &mut map);
                            info!("Placed {} of {} devices", placed, loaded.devices.len());
                            devices = loaded.devices;
                            summary = Some(loaded.summary);
                        }
                        Err(e) => error!("Error loading CCTV data: {}", e),
                    }
                }
                result = next_location(&mut pending_location), if pending_location.is_some() => {
                    pending_location = None;
                    if let Some(notice) = self.locator.resolve(result, &mut map) {
                        notices.push(notice);
                    }
                }
                else => break,
            }
        }

        if let LocatorState::Located { position } = self.locator.state() {
            if let Some((device, meters)) = geo::nearest(&devices, *position) {
                info!("Nearest device to user: {:?} ({:.0} m)", device.name, meters);
            }
        }

        SessionReport {
            map,
            devices,
            summary,
            locator: self.locator.state().clone(),
            notices,
            locale: self.options.locale,
        }
    }
}

async fn next_location(pending: &mut Option<LocateFuture>) -> Result<LatLng, LocationError> {
    match pending {
        Some(fut) => fut.await,
        None => std::future::pending().await,
    }
}

fn feed_source_from_config(config: &Config) -> Result<Box<dyn FeedSource>, ConfigError> {
    if let Some(url) = &config.feed.url {
        #[cfg(feature = "feed_http")]
        {
            let timeout = config.feed.timeout_secs.map(Duration::from_secs);
            let source = crate::feed::HttpFeedSource::new(url.clone(), timeout)
                .map_err(|e| ConfigError::Validation(format!("feed.url: {}", e)))?;
            return Ok(Box::new(source));
        }
        #[cfg(not(feature = "feed_http"))]
        return Err(ConfigError::Validation(format!(
            "feed.url {} needs the feed_http feature",
            url
        )));
    }

    match &config.feed.path {
        Some(path) => Ok(Box::new(FileFeedSource::new(path.clone()))),
        None => Err(ConfigError::Validation(
            "feed needs one of url or path".to_string(),
        )),
    }
}

fn geolocator_from_config(config: &Config) -> Result<Arc<dyn Geolocator>, ConfigError> {
    match config.locator.mode {
        LocatorMode::Disabled => Ok(Arc::new(UnsupportedGeolocator)),
        LocatorMode::Fixed => {
            let position = config.locator.position.ok_or_else(|| {
                ConfigError::Validation("locator.mode = \"fixed\" needs locator.position".into())
            })?;
            Ok(Arc::new(FixedGeolocator(LatLng::from(position))))
        }
        #[cfg(feature = "locator_http")]
        LocatorMode::Http => {
            let url = config.locator.url.clone().ok_or_else(|| {
                ConfigError::Validation("locator.mode = \"http\" needs locator.url".into())
            })?;
            let timeout = Duration::from_secs(config.locator.timeout_secs);
            let geolocator = crate::locator::HttpGeolocator::new(url, timeout)
                .map_err(|e| ConfigError::Validation(format!("locator.url: {}", e)))?;
            Ok(Arc::new(geolocator))
        }
        #[cfg(not(feature = "locator_http"))]
        LocatorMode::Http => Err(ConfigError::Validation(
            "locator.mode = \"http\" needs the locator_http feature".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::feed::MockFeedSource;
    use crate::locator::MockGeolocator;
    use crate::locator::LOCATED_ZOOM;
    use crate::map::Viewport;
    use crate::status::StatusCategory;

    const FEED: &[u8] = br#"[
        {"name": "Gate1", "lat": 36.5, "lng": 127.5, "status": "active", "url": "http://x"},
        {"name": "Gate2", "status": "error"}
    ]"#;

    fn session(payload: Option<&[u8]>, geolocator: MockGeolocator) -> Session {
        Session::new(
            MapOptions::default(),
            DeviceFeedLoader::new(Box::new(MockFeedSource {
                payload: payload.map(|p| p.to_vec()),
            })),
            UserLocator::new(Arc::new(geolocator), Locale::Ko, LOCATED_ZOOM),
        )
    }

    fn located(delay_ms: u64) -> MockGeolocator {
        MockGeolocator {
            supported: true,
            result: Ok(LatLng::new(37.0, 127.0)),
            delay: Duration::from_millis(delay_ms),
        }
    }

    #[tokio::test]
    async fn test_both_succeed() {
        let report = session(Some(FEED), located(0)).run().await;

        assert_eq!(report.map.tile_layers, vec![TileLayer::default()]);
        assert_eq!(report.map.device_markers().count(), 1);
        assert_eq!(report.devices.len(), 2);
        assert_eq!(
            report.summary.as_ref().unwrap().count(StatusCategory::Error),
            1
        );
        assert!(report.map.user_marker().unwrap().popup_open);
        assert_eq!(
            report.map.view,
            Some(Viewport {
                center: LatLng::new(37.0, 127.0),
                zoom: 13
            })
        );
        assert!(report.notices.is_empty());
    }

    #[tokio::test]
    async fn test_order_does_not_matter() {
        let fast = session(Some(FEED), located(0)).run().await;
        let slow = session(Some(FEED), located(50)).run().await;

        // Same markers regardless of which side finished first
        assert_eq!(fast.map.markers.len(), slow.map.markers.len());
        assert_eq!(fast.map.view, slow.map.view);
        assert_eq!(fast.map.device_markers().count(), 1);
        assert!(slow.map.user_marker().is_some());
    }

    #[tokio::test]
    async fn test_feed_failure_keeps_map_usable() {
        let report = session(None, located(0)).run().await;

        assert_eq!(report.map.tile_layers.len(), 1);
        assert_eq!(report.map.device_markers().count(), 0);
        assert!(report.devices.is_empty());
        assert!(report.summary.is_none());
        assert!(report.map.user_marker().is_some());
    }

    #[tokio::test]
    async fn test_denied_keeps_default_view() {
        let report = session(
            Some(FEED),
            MockGeolocator {
                supported: true,
                result: Err(LocationError::Timeout),
                delay: Duration::ZERO,
            },
        )
        .run()
        .await;

        assert_eq!(
            report.map.view,
            Some(Viewport {
                center: LatLng::new(36.5, 127.5),
                zoom: 7
            })
        );
        assert!(report.map.user_marker().is_none());
        assert_eq!(report.notices, vec![Notice::LocationDenied]);
        assert_eq!(
            report.notice_messages(),
            vec!["위치 정보를 가져올 수 없습니다. 기본 위치를 사용합니다."]
        );
    }

    #[tokio::test]
    async fn test_unsupported_still_loads_feed() {
        let report = session(
            Some(FEED),
            MockGeolocator {
                supported: false,
                result: Err(LocationError::PermissionDenied),
                delay: Duration::ZERO,
            },
        )
        .run()
        .await;

        assert_eq!(report.locator, LocatorState::Unsupported);
        assert_eq!(report.notices, vec![Notice::LocationUnsupported]);
        assert_eq!(report.map.device_markers().count(), 1);
    }

    #[test]
    fn test_from_config() {
        let config = Config::parse(
            r#"
            [feed]
            path = "/tmp/cctv_data.json"

            [locator]
            mode = "fixed"
            position = [37.0, 127.0]
            "#,
        )
        .unwrap();
        let session = Session::from_config(&config).unwrap();
        assert_eq!(session.options.center, LatLng::new(36.5, 127.5));
        assert_eq!(session.loader.source().describe(), "/tmp/cctv_data.json");
    }

    #[cfg(feature = "locator_http")]
    #[tokio::test]
    async fn test_http_locator_denied_keeps_view() {
        use axum::http::StatusCode;
        use axum::routing::get;

        let router = axum::Router::new().route("/geo", get(|| async { StatusCode::FORBIDDEN }));
        let base = crate::api::spawn_local(router).await;
        let geolocator =
            crate::locator::HttpGeolocator::new(format!("{}/geo", base), Duration::from_secs(5))
                .unwrap();

        let report = Session::new(
            MapOptions::default(),
            DeviceFeedLoader::new(Box::new(MockFeedSource {
                payload: Some(FEED.to_vec()),
            })),
            UserLocator::new(Arc::new(geolocator), Locale::Ko, LOCATED_ZOOM),
        )
        .run()
        .await;

        assert_eq!(
            report.map.view,
            Some(Viewport {
                center: LatLng::new(36.5, 127.5),
                zoom: 7
            })
        );
        assert!(report.map.user_marker().is_none());
        assert_eq!(report.map.device_markers().count(), 1);
        assert_eq!(report.notices, vec![Notice::LocationDenied]);
        assert_eq!(
            report.locator,
            LocatorState::Denied {
                error: LocationError::PermissionDenied
            }
        );
    }
}
