//! Status classification for devices.
//!
//! A device's raw status string is collapsed into one of three categories,
//! each with a fixed visual and textual encoding.

use serde::Deserialize;
use serde::Serialize;
use strum::AsRefStr;
use strum::Display;
use strum::EnumIter;

/// Status category of a device.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StatusCategory {
    Active,
    Error,
    Unknown,
}

impl StatusCategory {
    /// Map a raw status value to its category.
    ///
    /// Only the exact strings `active` and `error` are recognized; every other
    /// value, including an absent one, is `Unknown`.
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw {
            Some("active") => StatusCategory::Active,
            Some("error") => StatusCategory::Error,
            _ => StatusCategory::Unknown,
        }
    }
}

/// Language used for user-facing strings.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Locale {
    #[default]
    Ko,
    En,
}

/// Fixed presentation of a status category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusDescriptor {
    pub category: StatusCategory,

    /// CSS color used for the marker glyph and the popup status line.
    pub color: &'static str,

    /// Human-readable status label in the requested locale.
    pub label: &'static str,

    /// Whether the popup offers a control to open the live view.
    pub interactive: bool,
}

pub const ACTIVE_COLOR: &str = "#28a745";
pub const ERROR_COLOR: &str = "#dc3545";
pub const UNKNOWN_COLOR: &str = "#808080";

/// Classify a raw status value.
///
/// Total and pure: every input maps to one of three fixed descriptors.
pub fn classify(raw: Option<&str>, locale: Locale) -> StatusDescriptor {
    describe(StatusCategory::from_raw(raw), locale)
}

/// Descriptor for an already-resolved category.
pub fn describe(category: StatusCategory, locale: Locale) -> StatusDescriptor {
    match category {
        StatusCategory::Active => StatusDescriptor {
            category,
            color: ACTIVE_COLOR,
            label: match locale {
                Locale::Ko => "정상",
                Locale::En => "Normal",
            },
            interactive: true,
        },
        StatusCategory::Error => StatusDescriptor {
            category,
            color: ERROR_COLOR,
            label: match locale {
                Locale::Ko => "오류/점검중",
                Locale::En => "Error/Under maintenance",
            },
            interactive: false,
        },
        StatusCategory::Unknown => StatusDescriptor {
            category,
            color: UNKNOWN_COLOR,
            label: match locale {
                Locale::Ko => "상태 불명",
                Locale::En => "Status unknown",
            },
            interactive: false,
        },
    }
}
