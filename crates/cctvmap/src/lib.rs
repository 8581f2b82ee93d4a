pub mod api;
pub mod config;
pub mod device;
pub mod diagnostics;
pub mod feed;
pub mod geo;
pub mod locator;
pub mod map;
pub mod projector;
pub mod session;
pub mod status;

pub use config::Config;
pub use config::ConfigError;
pub use config::LogLevel;
pub use device::Device;
pub use diagnostics::DiagnosticsSummary;
pub use feed::DeviceFeedLoader;
pub use feed::FeedError;
pub use feed::FeedSource;
pub use geo::LatLng;
pub use locator::Geolocator;
pub use locator::LocationError;
pub use locator::LocatorState;
pub use locator::Notice;
pub use locator::UserLocator;
pub use map::MapState;
pub use map::MapSurface;
pub use projector::MarkerProjector;
pub use session::MapOptions;
pub use session::Session;
pub use session::SessionReport;
pub use status::classify;
pub use status::Locale;
pub use status::StatusCategory;
pub use status::StatusDescriptor;
