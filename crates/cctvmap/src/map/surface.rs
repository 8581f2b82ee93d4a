use serde::Serialize;

use super::popup::PopupContent;
use crate::geo::LatLng;

pub const DEFAULT_TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const DEFAULT_TILE_ATTRIBUTION: &str =
    "&copy; <a href=\"http://www.openstreetmap.org/copyright\">OpenStreetMap</a>";
pub const DEFAULT_TILE_MAX_ZOOM: u8 = 19;

/// Interactive map capability the pipeline renders onto.
///
/// Mutations only ever append or replace the viewport, so device markers and
/// the user marker may be added in any order.
pub trait MapSurface {
    fn add_tile_layer(&mut self, layer: TileLayer);

    /// Register a marker. Its popup stays closed until opened.
    fn add_marker(&mut self, marker: Marker) -> MarkerId;

    fn open_popup(&mut self, id: MarkerId);

    fn set_view(&mut self, center: LatLng, zoom: u8);
}

/// Index of a marker on the surface that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct MarkerId(pub usize);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileLayer {
    pub url: String,
    pub max_zoom: u8,
    pub attribution: String,
}

impl Default for TileLayer {
    fn default() -> Self {
        Self {
            url: DEFAULT_TILE_URL.to_string(),
            max_zoom: DEFAULT_TILE_MAX_ZOOM,
            attribution: DEFAULT_TILE_ATTRIBUTION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub center: LatLng,
    pub zoom: u8,
}

/// What a marker stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarkerKind {
    /// A device, by its position in the loaded feed
    Device { index: usize },
    User,
}

/// Circular glyph drawn for a marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkerIcon {
    /// CSS class on the icon container
    pub class_name: &'static str,
    pub color: String,
    pub diameter_px: u32,
    pub border_px: u32,
    pub shadow: bool,
    /// Icon box size `[width, height]`
    pub size: [u32; 2],
    /// Pixel inside the icon box placed on the coordinate
    pub anchor: [u32; 2],
}

impl MarkerIcon {
    /// Fixed-size status dot, anchored at its center.
    pub fn device(color: &str) -> Self {
        Self {
            class_name: "custom-marker",
            color: color.to_string(),
            diameter_px: 20,
            border_px: 2,
            shadow: true,
            size: [24, 24],
            anchor: [12, 12],
        }
    }

    /// Smaller blue dot for the user's position.
    pub fn user() -> Self {
        Self {
            class_name: "user-marker",
            color: "blue".to_string(),
            diameter_px: 12,
            border_px: 2,
            shadow: false,
            size: [16, 16],
            anchor: [8, 8],
        }
    }

    /// Inline HTML for the glyph.
    pub fn html(&self) -> String {
        let shadow = if self.shadow {
            " box-shadow: 0 2px 4px rgba(0,0,0,0.3);"
        } else {
            ""
        };
        format!(
            "<div style=\"background-color: {}; width: {d}px; height: {d}px; border-radius: 50%; border: {}px solid white;{}\"></div>",
            self.color,
            self.border_px,
            shadow,
            d = self.diameter_px,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub kind: MarkerKind,
    pub position: LatLng,
    pub icon: MarkerIcon,
    pub popup: PopupContent,
    pub popup_open: bool,
}

impl Marker {
    pub fn new(kind: MarkerKind, position: LatLng, icon: MarkerIcon, popup: PopupContent) -> Self {
        Self {
            kind,
            position,
            icon,
            popup,
            popup_open: false,
        }
    }
}

/// In-memory map surface recording everything rendered onto it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MapState {
    pub tile_layers: Vec<TileLayer>,
    pub view: Option<Viewport>,
    pub markers: Vec<Marker>,
}

impl MapState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn device_markers(&self) -> impl Iterator<Item = &Marker> {
        self.markers
            .iter()
            .filter(|m| matches!(m.kind, MarkerKind::Device { .. }))
    }

    pub fn user_marker(&self) -> Option<&Marker> {
        self.markers.iter().find(|m| m.kind == MarkerKind::User)
    }

    pub fn marker(&self, id: MarkerId) -> Option<&Marker> {
        self.markers.get(id.0)
    }
}

impl MapSurface for MapState {
    fn add_tile_layer(&mut self, layer: TileLayer) {
        self.tile_layers.push(layer);
    }

    fn add_marker(&mut self, marker: Marker) -> MarkerId {
        self.markers.push(marker);
        MarkerId(self.markers.len() - 1)
    }

    fn open_popup(&mut self, id: MarkerId) {
        if let Some(marker) = self.markers.get_mut(id.0) {
            marker.popup_open = true;
        }
    }

    fn set_view(&mut self, center: LatLng, zoom: u8) {
        self.view = Some(Viewport { center, zoom });
    }
}
