//! One-shot user location.
//!
//! The locator moves `Idle -> Requesting -> Located | Denied`, or straight
//! to `Unsupported` when no geolocation capability exists. Both outcomes are
//! terminal; there is no retry and no continuous tracking.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
#[cfg(feature = "locator_http")]
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;
use tracing::warn;

use crate::geo::LatLng;
use crate::map::MapSurface;
use crate::map::Marker;
use crate::map::MarkerIcon;
use crate::map::MarkerKind;
use crate::map::PopupContent;
use crate::status::Locale;

pub const LOCATED_ZOOM: u8 = 13;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Location unavailable: {0}")]
    Unavailable(String),

    #[error("Location request timed out")]
    Timeout,
}

/// Platform capability yielding the current position.
#[async_trait]
pub trait Geolocator: Send + Sync {
    /// Whether the capability exists at all
    fn is_supported(&self) -> bool {
        true
    }

    async fn current_position(&self) -> Result<LatLng, LocationError>;
}

/// Always reports the same position.
#[derive(Debug, Clone, Copy)]
pub struct FixedGeolocator(pub LatLng);

#[async_trait]
impl Geolocator for FixedGeolocator {
    async fn current_position(&self) -> Result<LatLng, LocationError> {
        Ok(self.0)
    }
}

/// No geolocation capability.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedGeolocator;

#[async_trait]
impl Geolocator for UnsupportedGeolocator {
    fn is_supported(&self) -> bool {
        false
    }

    async fn current_position(&self) -> Result<LatLng, LocationError> {
        Err(LocationError::Unavailable("geolocation not supported".to_string()))
    }
}

/// Looks the position up from a JSON endpoint.
///
/// Accepts `lat`/`lon`, `lat`/`lng` or `latitude`/`longitude` numbers.
#[cfg(feature = "locator_http")]
#[derive(Debug, Clone)]
pub struct HttpGeolocator {
    client: reqwest::Client,
    url: String,
}

#[cfg(feature = "locator_http")]
impl HttpGeolocator {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[cfg(feature = "locator_http")]
#[async_trait]
impl Geolocator for HttpGeolocator {
    async fn current_position(&self) -> Result<LatLng, LocationError> {
        let request_error = |e: reqwest::Error| {
            if e.is_timeout() {
                LocationError::Timeout
            } else {
                LocationError::Unavailable(e.to_string())
            }
        };

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(request_error)?;

        match response.status().as_u16() {
            401 | 403 => return Err(LocationError::PermissionDenied),
            s if !(200..300).contains(&s) => {
                return Err(LocationError::Unavailable(format!("HTTP {}", s)));
            }
            _ => {}
        }

        let body: serde_json::Value = response.json().await.map_err(request_error)?;
        position_from_json(&body)
            .ok_or_else(|| LocationError::Unavailable("response has no coordinates".to_string()))
    }
}

#[cfg_attr(not(feature = "locator_http"), allow(dead_code))]
fn position_from_json(body: &serde_json::Value) -> Option<LatLng> {
    let field = |names: &[&str]| names.iter().find_map(|n| body.get(*n)?.as_f64());
    let lat = field(&["lat", "latitude"])?;
    let lng = field(&["lon", "lng", "longitude"])?;
    LatLng::checked(lat, lng)
}

/// Message shown to the user when location fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Notice {
    LocationDenied,
    LocationUnsupported,
}

impl Notice {
    pub fn message(&self, locale: Locale) -> &'static str {
        match (self, locale) {
            (Notice::LocationDenied, Locale::Ko) => {
                "위치 정보를 가져올 수 없습니다. 기본 위치를 사용합니다."
            }
            (Notice::LocationDenied, Locale::En) => {
                "Could not get your location. Using the default location."
            }
            (Notice::LocationUnsupported, Locale::Ko) => {
                "이 브라우저는 위치 정보를 지원하지 않습니다."
            }
            (Notice::LocationUnsupported, Locale::En) => "Location is not supported.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LocatorState {
    Idle,
    Requesting,
    Located { position: LatLng },
    Denied { error: LocationError },
    Unsupported,
}

impl LocatorState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LocatorState::Located { .. } | LocatorState::Denied { .. } | LocatorState::Unsupported
        )
    }
}

/// Pending position request, independent of the locator borrow.
pub type LocateFuture = Pin<Box<dyn Future<Output = Result<LatLng, LocationError>> + Send>>;

pub enum LocateStart {
    Pending(LocateFuture),
    Unsupported(Notice),
    /// The locator already left `Idle`
    AlreadyStarted,
}

pub struct UserLocator {
    geolocator: Arc<dyn Geolocator>,
    state: LocatorState,
    locale: Locale,
    zoom: u8,
}

impl UserLocator {
    pub fn new(geolocator: Arc<dyn Geolocator>, locale: Locale, zoom: u8) -> Self {
        Self {
            geolocator,
            state: LocatorState::Idle,
            locale,
            zoom,
        }
    }

    pub fn state(&self) -> &LocatorState {
        &self.state
    }

    /// Leave `Idle`, returning the pending request if there is one.
    pub fn start(&mut self) -> LocateStart {
        if self.state != LocatorState::Idle {
            return LocateStart::AlreadyStarted;
        }

        if !self.geolocator.is_supported() {
            warn!("Geolocation is not supported");
            self.state = LocatorState::Unsupported;
            return LocateStart::Unsupported(Notice::LocationUnsupported);
        }

        self.state = LocatorState::Requesting;
        let geolocator = Arc::clone(&self.geolocator);
        LocateStart::Pending(Box::pin(async move { geolocator.current_position().await }))
    }

    /// Apply the request outcome to the map.
    ///
    /// On success the user marker is placed with its popup open and the view
    /// recentered. On failure the map is left untouched and a notice returned.
    pub fn resolve(
        &mut self,
        result: Result<LatLng, LocationError>,
        map: &mut dyn MapSurface,
    ) -> Option<Notice> {
        if self.state != LocatorState::Requesting {
            warn!("Ignoring location result in state {:?}", self.state);
            return None;
        }

        match result {
            Ok(position) => {
                info!("User location: {}", position);
                let id = map.add_marker(Marker::new(
                    MarkerKind::User,
                    position,
                    MarkerIcon::user(),
                    PopupContent::current_location(self.locale),
                ));
                map.open_popup(id);
                map.set_view(position, self.zoom);
                self.state = LocatorState::Located { position };
                None
            }
            Err(error) => {
                warn!("Geolocation error: {}", error);
                self.state = LocatorState::Denied { error };
                Some(Notice::LocationDenied)
            }
        }
    }
}

/// Geolocator with a canned answer and optional delay.
#[cfg(test)]
pub struct MockGeolocator {
    pub supported: bool,
    pub result: Result<LatLng, LocationError>,
    pub delay: std::time::Duration,
}

#[cfg(test)]
#[async_trait]
impl Geolocator for MockGeolocator {
    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn current_position(&self) -> Result<LatLng, LocationError> {
        tokio::time::sleep(self.delay).await;
        self.result.clone()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::map::MapState;
    use crate::map::Viewport;

    fn locator(geolocator: impl Geolocator + 'static) -> UserLocator {
        UserLocator::new(Arc::new(geolocator), Locale::Ko, LOCATED_ZOOM)
    }

    async fn run(locator: &mut UserLocator, map: &mut MapState) -> Option<Notice> {
        match locator.start() {
            LocateStart::Pending(fut) => {
                let result = fut.await;
                locator.resolve(result, map)
            }
            LocateStart::Unsupported(notice) => Some(notice),
            LocateStart::AlreadyStarted => panic!("locator already started"),
        }
    }

    #[tokio::test]
    async fn test_located() {
        let mut locator = locator(FixedGeolocator(LatLng::new(37.0, 127.0)));
        let mut map = MapState::new();
        map.set_view(LatLng::new(36.5, 127.5), 7);

        assert_eq!(run(&mut locator, &mut map).await, None);
        assert_eq!(
            locator.state(),
            &LocatorState::Located {
                position: LatLng::new(37.0, 127.0)
            }
        );

        let user = map.user_marker().unwrap();
        assert_eq!(user.position, LatLng::new(37.0, 127.0));
        assert!(user.popup_open);
        assert_eq!(user.icon, MarkerIcon::user());
        assert_eq!(
            map.view,
            Some(Viewport {
                center: LatLng::new(37.0, 127.0),
                zoom: 13
            })
        );
    }

    #[tokio::test]
    async fn test_denied_leaves_map_alone() {
        let mut locator = locator(MockGeolocator {
            supported: true,
            result: Err(LocationError::PermissionDenied),
            delay: std::time::Duration::ZERO,
        });
        let mut map = MapState::new();
        map.set_view(LatLng::new(36.5, 127.5), 7);
        let before = map.clone();

        assert_eq!(
            run(&mut locator, &mut map).await,
            Some(Notice::LocationDenied)
        );
        assert_eq!(map, before);
        assert_eq!(
            locator.state(),
            &LocatorState::Denied {
                error: LocationError::PermissionDenied
            }
        );
    }

    #[tokio::test]
    async fn test_unsupported() {
        let mut locator = locator(UnsupportedGeolocator);
        let mut map = MapState::new();

        assert_eq!(
            run(&mut locator, &mut map).await,
            Some(Notice::LocationUnsupported)
        );
        assert_eq!(locator.state(), &LocatorState::Unsupported);
        assert!(locator.state().is_terminal());
        assert!(map.markers.is_empty());
    }

    #[tokio::test]
    async fn test_single_request_per_session() {
        let mut locator = locator(FixedGeolocator(LatLng::new(37.0, 127.0)));
        let mut map = MapState::new();
        run(&mut locator, &mut map).await;

        assert!(matches!(locator.start(), LocateStart::AlreadyStarted));
        assert_eq!(
            locator.resolve(Ok(LatLng::new(35.0, 129.0)), &mut map),
            None
        );
        assert_eq!(map.markers.len(), 1);
    }

    #[test]
    fn test_position_from_json() {
        assert_eq!(
            position_from_json(&json!({"lat": 37.5, "lon": 126.9})),
            Some(LatLng::new(37.5, 126.9))
        );
        assert_eq!(
            position_from_json(&json!({"latitude": 37.5, "longitude": 126.9})),
            Some(LatLng::new(37.5, 126.9))
        );
        assert_eq!(position_from_json(&json!({"status": "fail"})), None);
    }

    #[test]
    fn test_notice_messages() {
        assert_eq!(
            Notice::LocationDenied.message(Locale::Ko),
            "위치 정보를 가져올 수 없습니다. 기본 위치를 사용합니다."
        );
        assert_eq!(
            Notice::LocationUnsupported.message(Locale::En),
            "Location is not supported."
        );
    }

    #[cfg(feature = "locator_http")]
    #[tokio::test]
    async fn test_http_geolocator() {
        use axum::http::StatusCode;
        use axum::routing::get;
        use axum::Json;

        let router = axum::Router::new()
            .route("/geo", get(|| async { Json(json!({"lat": 37.0, "lon": 127.0})) }))
            .route("/forbidden", get(|| async { StatusCode::FORBIDDEN }))
            .route(
                "/broken",
                get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
            )
            .route("/empty", get(|| async { Json(json!({"status": "fail"})) }));
        let base = crate::api::spawn_local(router).await;
        let lookup = |path: &str| {
            HttpGeolocator::new(format!("{}{}", base, path), std::time::Duration::from_secs(5))
                .unwrap()
        };

        assert_eq!(
            lookup("/geo").current_position().await,
            Ok(LatLng::new(37.0, 127.0))
        );
        assert_eq!(
            lookup("/forbidden").current_position().await,
            Err(LocationError::PermissionDenied)
        );
        assert_eq!(
            lookup("/broken").current_position().await,
            Err(LocationError::Unavailable("HTTP 500".to_string()))
        );
        assert!(matches!(
            lookup("/empty").current_position().await,
            Err(LocationError::Unavailable(_))
        ));
    }
}
