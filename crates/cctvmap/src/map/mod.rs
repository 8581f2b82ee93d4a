mod popup;
mod surface;

pub use popup::AuxiliaryView;
pub use popup::PopupAction;
pub use popup::PopupContent;
pub use popup::ViewSpec;
pub use popup::LIVE_VIEW;
pub use surface::MapState;
pub use surface::MapSurface;
pub use surface::Marker;
pub use surface::MarkerIcon;
pub use surface::MarkerId;
pub use surface::MarkerKind;
pub use surface::TileLayer;
pub use surface::Viewport;
pub use surface::DEFAULT_TILE_ATTRIBUTION;
pub use surface::DEFAULT_TILE_MAX_ZOOM;
pub use surface::DEFAULT_TILE_URL;
