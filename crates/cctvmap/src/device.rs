//! Device records as loaded from the feed.
//!
//! The feed is loosely typed: any field may be missing or carry the wrong
//! JSON type. Records are normalized once here into [`Device`] so the rest of
//! the pipeline never checks optionality ad hoc.

use serde::Serialize;

use crate::geo::LatLng;
use crate::status::StatusCategory;

/// A monitored camera location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Device {
    /// Upstream identifier, if the feed carries one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Display name (empty when the record has none)
    pub name: String,

    /// Position; `None` means the device is not rendered
    pub coordinates: Option<LatLng>,

    pub status: StatusCategory,

    /// Live view link, only meaningful for active devices. Only `http` and
    /// `https` links are kept.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Which upstream collection the record came from (e.g. "NTIC")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Device {
    /// Normalize one feed record.
    ///
    /// Never fails: a record that is not an object, or has missing or
    /// mistyped fields, yields a device with degraded content.
    pub fn from_record(record: &serde_json::Value) -> Self {
        let lat = record.get("lat").and_then(number);
        let lng = record.get("lng").and_then(number);
        let coordinates = match (lat, lng) {
            (Some(lat), Some(lng)) => LatLng::checked(lat, lng),
            _ => None,
        };

        Self {
            id: record.get("id").and_then(text),
            name: record
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            coordinates,
            status: StatusCategory::from_raw(record.get("status").and_then(|v| v.as_str())),
            url: record.get("url").and_then(text).filter(|u| is_web_url(u)),
            source: record.get("source").and_then(text),
        }
    }

    /// Whether the device can be placed on the map.
    pub fn is_placed(&self) -> bool {
        self.coordinates.is_some()
    }
}

/// Numeric field that may arrive as a JSON number or a numeric string.
fn number(v: &serde_json::Value) -> Option<f64> {
    match v {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Non-empty string field.
fn text(v: &serde_json::Value) -> Option<String> {
    v.as_str().filter(|s| !s.is_empty()).map(String::from)
}

/// Whether `url` uses a scheme a live view may be opened with.
fn is_web_url(url: &str) -> bool {
    let Some((scheme, rest)) = url.split_once("://") else {
        return false;
    };
    !rest.is_empty() && (scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https"))
}
