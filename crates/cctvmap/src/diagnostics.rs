use std::collections::BTreeMap;

use serde::Serialize;
use tracing::info;

use crate::device::Device;
use crate::status::StatusCategory;

/// Device counts per status category.
///
/// Derived from a loaded feed for observability only; never feeds back into
/// rendering. Only categories that occur are present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DiagnosticsSummary {
    counts: BTreeMap<StatusCategory, usize>,
}

impl DiagnosticsSummary {
    pub fn summarize(devices: &[Device]) -> Self {
        let mut counts = BTreeMap::new();
        for device in devices {
            *counts.entry(device.status).or_insert(0) += 1;
        }
        Self { counts }
    }

    pub fn count(&self, category: StatusCategory) -> usize {
        self.counts.get(&category).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn counts(&self) -> &BTreeMap<StatusCategory, usize> {
        &self.counts
    }

    /// Log the breakdown.
    pub fn report(&self) {
        info!(
            total = self.total(),
            active = self.count(StatusCategory::Active),
            error = self.count(StatusCategory::Error),
            unknown = self.count(StatusCategory::Unknown),
            "Status breakdown"
        );
    }
}
