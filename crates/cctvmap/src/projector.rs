use tracing::debug;

use crate::device::Device;
use crate::map::MapSurface;
use crate::map::Marker;
use crate::map::MarkerIcon;
use crate::map::MarkerKind;
use crate::map::PopupContent;
use crate::status::describe;
use crate::status::Locale;

/// Turns devices into markers on a map surface.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkerProjector {
    locale: Locale,
}

impl MarkerProjector {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    /// Build the marker for one device, or `None` if it has no position.
    pub fn marker_for(&self, index: usize, device: &Device) -> Option<Marker> {
        let position = device.coordinates?;
        let descriptor = describe(device.status, self.locale);

        Some(Marker::new(
            MarkerKind::Device { index },
            position,
            MarkerIcon::device(descriptor.color),
            PopupContent::for_device(&device.name, &descriptor, device.url.as_deref(), self.locale),
        ))
    }

    /// Add one marker per placed device. Returns how many were added.
    ///
    /// Not incremental: calling twice on the same surface duplicates markers.
    pub fn project(&self, devices: &[Device], map: &mut dyn MapSurface) -> usize {
        let mut added = 0;
        for (index, device) in devices.iter().enumerate() {
            match self.marker_for(index, device) {
                Some(marker) => {
                    map.add_marker(marker);
                    added += 1;
                }
                None => debug!("Skipping device {:?} without coordinates", device.name),
            }
        }
        added
    }
}
