//! Geographic primitives and nearest-device lookup.

use serde::Deserialize;
use serde::Serialize;

use crate::device::Device;

/// Mean earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Build a point from possibly-bad inputs.
    ///
    /// Zero is treated as missing, matching how the device feed marks
    /// unplaced cameras. Values outside +-90 / +-180 are rejected too, so a
    /// record carrying both fields can still end up without a position.
    pub fn checked(lat: f64, lng: f64) -> Option<Self> {
        let valid = |v: f64, limit: f64| v.is_finite() && v != 0.0 && v.abs() <= limit;
        if valid(lat, 90.0) && valid(lng, 180.0) {
            Some(Self { lat, lng })
        } else {
            None
        }
    }
}

impl From<[f64; 2]> for LatLng {
    fn from([lat, lng]: [f64; 2]) -> Self {
        Self { lat, lng }
    }
}

impl std::fmt::Display for LatLng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.lat, self.lng)
    }
}

/// Great-circle distance between two points in meters (haversine).
pub fn haversine_m(a: LatLng, b: LatLng) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let dphi = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();

    let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Find the placed device closest to `point`, with its distance in meters.
pub fn nearest(devices: &[Device], point: LatLng) -> Option<(&Device, f64)> {
    devices
        .iter()
        .filter_map(|d| d.coordinates.map(|c| (d, haversine_m(point, c))))
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
}
