//! Device feed loading.
//!
//! A [`FeedSource`] yields the raw snapshot; [`DeviceFeedLoader`] parses it
//! into devices and reports the status breakdown.

use std::path::PathBuf;
#[cfg(feature = "feed_http")]
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::device::Device;
use crate::diagnostics::DiagnosticsSummary;

/// The feed could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("Failed to read feed file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[cfg(feature = "feed_http")]
    #[error("Failed to fetch feed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Feed request to {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Malformed feed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Malformed feed payload: expected a JSON array")]
    NotAnArray,
}

/// Where the device snapshot comes from.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Human-readable location for logs
    fn describe(&self) -> String;

    /// Fetch the raw snapshot
    async fn fetch(&self) -> Result<Vec<u8>, FeedError>;
}

/// Feed stored as a local JSON file.
#[derive(Debug, Clone)]
pub struct FileFeedSource {
    path: PathBuf,
}

impl FileFeedSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl FeedSource for FileFeedSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<Vec<u8>, FeedError> {
        tokio::fs::read(&self.path)
            .await
            .map_err(|e| FeedError::Io(self.path.clone(), e))
    }
}

/// Feed served over HTTP(S).
#[cfg(feature = "feed_http")]
#[derive(Debug, Clone)]
pub struct HttpFeedSource {
    client: reqwest::Client,
    url: String,
}

#[cfg(feature = "feed_http")]
impl HttpFeedSource {
    /// Without a `timeout` the request waits as long as the server does.
    pub fn new(url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, FeedError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[cfg(feature = "feed_http")]
#[async_trait]
impl FeedSource for HttpFeedSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    async fn fetch(&self) -> Result<Vec<u8>, FeedError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::HttpStatus {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

/// Parse a raw snapshot into devices, preserving source order.
///
/// Only the top-level shape is enforced; individual records degrade instead
/// of failing.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<Device>, FeedError> {
    let payload: serde_json::Value = serde_json::from_slice(bytes)?;
    let records = payload.as_array().ok_or(FeedError::NotAnArray)?;
    Ok(records.iter().map(Device::from_record).collect())
}

/// Devices from one successful load.
#[derive(Debug, Clone)]
pub struct LoadedFeed {
    pub devices: Vec<Device>,
    pub summary: DiagnosticsSummary,
}

pub struct DeviceFeedLoader {
    source: Box<dyn FeedSource>,
}

impl DeviceFeedLoader {
    pub fn new(source: Box<dyn FeedSource>) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &dyn FeedSource {
        self.source.as_ref()
    }

    /// Fetch and parse the feed, then report its status breakdown.
    pub async fn load(&self) -> Result<LoadedFeed, FeedError> {
        let bytes = self.source.fetch().await?;
        let devices = parse_feed(&bytes)?;
        info!(
            "Loaded {} devices from {}",
            devices.len(),
            self.source.describe()
        );

        let summary = DiagnosticsSummary::summarize(&devices);
        summary.report();

        Ok(LoadedFeed { devices, summary })
    }
}

/// Feed source returning a canned result.
#[cfg(test)]
pub struct MockFeedSource {
    pub payload: Option<Vec<u8>>,
}

#[cfg(test)]
#[async_trait]
impl FeedSource for MockFeedSource {
    fn describe(&self) -> String {
        "mock".to_string()
    }

    async fn fetch(&self) -> Result<Vec<u8>, FeedError> {
        self.payload.clone().ok_or_else(|| {
            FeedError::Io(
                PathBuf::from("mock"),
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "network down"),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::status::StatusCategory;

    #[test]
    fn test_parse_preserves_order() {
        let devices = parse_feed(
            br#"[{"name": "b", "status": "error"}, {"name": "a", "lat": 36.5, "lng": 127.5}]"#,
        )
        .unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].name, "b");
        assert_eq!(devices[1].name, "a");
        assert_eq!(devices[1].status, StatusCategory::Unknown);
    }

    #[test]
    fn test_parse_rejects_bad_payloads() {
        assert!(matches!(parse_feed(b"not json"), Err(FeedError::Malformed(_))));
        assert!(matches!(
            parse_feed(br#"{"data": []}"#),
            Err(FeedError::NotAnArray)
        ));
    }

    #[test]
    fn test_parse_tolerates_bad_records() {
        let devices = parse_feed(br#"[null, 3, {"name": "ok"}]"#).unwrap();
        assert_eq!(devices.len(), 3);
        assert_eq!(devices[2].name, "ok");
    }

    #[tokio::test]
    async fn test_load_reports_summary() {
        let loader = DeviceFeedLoader::new(Box::new(MockFeedSource {
            payload: Some(br#"[{"name": "Gate2", "status": "error"}]"#.to_vec()),
        }));

        let feed = loader.load().await.unwrap();
        assert_eq!(feed.devices.len(), 1);
        assert_eq!(feed.summary.count(StatusCategory::Error), 1);
        assert_eq!(feed.summary.total(), 1);
    }

    #[tokio::test]
    async fn test_load_failure() {
        let loader = DeviceFeedLoader::new(Box::new(MockFeedSource { payload: None }));
        assert!(loader.load().await.is_err());
    }

    #[tokio::test]
    async fn test_file_source() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"name": "Gate1", "lat": 36.5, "lng": 127.5}}]"#).unwrap();

        let loader = DeviceFeedLoader::new(Box::new(FileFeedSource::new(file.path())));
        let feed = loader.load().await.unwrap();
        assert_eq!(feed.devices[0].name, "Gate1");
    }

    #[tokio::test]
    async fn test_missing_file() {
        let source = FileFeedSource::new("/nonexistent/cctv_data.json");
        let err = source.fetch().await.unwrap_err();
        assert!(err.to_string().contains("/nonexistent/cctv_data.json"));
    }

    #[cfg(feature = "feed_http")]
    async fn http_source(router: axum::Router, path: &str) -> HttpFeedSource {
        let base = crate::api::spawn_local(router).await;
        HttpFeedSource::new(format!("{}{}", base, path), Some(Duration::from_secs(5))).unwrap()
    }

    #[cfg(feature = "feed_http")]
    #[tokio::test]
    async fn test_http_source() {
        use axum::http::StatusCode;
        use axum::routing::get;

        let router = axum::Router::new()
            .route(
                "/cctv_data.json",
                get(|| async { r#"[{"name": "Gate1", "lat": 36.5, "lng": 127.5, "status": "active"}]"# }),
            )
            .route(
                "/broken",
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
            );

        let source = http_source(router.clone(), "/cctv_data.json").await;
        let feed = DeviceFeedLoader::new(Box::new(source)).load().await.unwrap();
        assert_eq!(feed.devices.len(), 1);
        assert_eq!(feed.summary.count(StatusCategory::Active), 1);

        let source = http_source(router, "/broken").await;
        let err = source.fetch().await.unwrap_err();
        assert!(
            matches!(err, FeedError::HttpStatus { status: 500, .. }),
            "unexpected error: {:?}",
            err
        );
    }

    #[cfg(feature = "feed_http")]
    #[tokio::test]
    async fn test_http_source_not_found() {
        let source = http_source(axum::Router::new(), "/cctv_data.json").await;
        let loader = DeviceFeedLoader::new(Box::new(source));
        assert!(matches!(
            loader.load().await,
            Err(FeedError::HttpStatus { status: 404, .. })
        ));
    }
}
