//! Popup content attached to markers.

use serde::Serialize;

use crate::status::Locale;
use crate::status::StatusDescriptor;

/// Secondary presentation surface for live views.
///
/// Opening a view never navigates or resizes the primary map.
pub trait AuxiliaryView {
    fn open(&mut self, url: &str, spec: &ViewSpec);
}

/// Window name and fixed size for an auxiliary view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewSpec {
    pub name: &'static str,
    pub width: u32,
    pub height: u32,
}

pub const LIVE_VIEW: ViewSpec = ViewSpec {
    name: "cctv_view",
    width: 400,
    height: 350,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PopupContent {
    Device {
        name: String,
        status_color: String,
        status_label: String,
        action: PopupAction,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PopupAction {
    /// Control that opens `url` in an auxiliary view
    OpenView {
        url: String,
        label: String,
        view: ViewSpec,
    },
    Unavailable {
        notice: String,
    },
}

impl PopupContent {
    /// Build the popup for a device.
    ///
    /// The live view control is only offered when the status is interactive
    /// and a URL is present.
    pub fn for_device(
        name: &str,
        descriptor: &StatusDescriptor,
        url: Option<&str>,
        locale: Locale,
    ) -> Self {
        let action = match url {
            Some(url) if descriptor.interactive => PopupAction::OpenView {
                url: url.to_string(),
                label: match locale {
                    Locale::Ko => "CCTV 보기",
                    Locale::En => "View CCTV",
                }
                .to_string(),
                view: LIVE_VIEW,
            },
            _ => PopupAction::Unavailable {
                notice: match locale {
                    Locale::Ko => "영상을 사용할 수 없습니다",
                    Locale::En => "Video unavailable",
                }
                .to_string(),
            },
        };

        PopupContent::Device {
            name: name.to_string(),
            status_color: descriptor.color.to_string(),
            status_label: descriptor.label.to_string(),
            action,
        }
    }

    /// Fixed popup for the user's own position.
    pub fn current_location(locale: Locale) -> Self {
        PopupContent::Text {
            text: match locale {
                Locale::Ko => "현재 위치",
                Locale::En => "Current location",
            }
            .to_string(),
        }
    }

    pub fn has_activation_control(&self) -> bool {
        matches!(
            self,
            PopupContent::Device {
                action: PopupAction::OpenView { .. },
                ..
            }
        )
    }

    /// Trigger the activation control, if any.
    ///
    /// Returns whether a view was opened.
    pub fn activate(&self, viewer: &mut dyn AuxiliaryView) -> bool {
        match self {
            PopupContent::Device {
                action: PopupAction::OpenView { url, view, .. },
                ..
            } => {
                viewer.open(url, view);
                true
            }
            _ => false,
        }
    }

    /// Render as an HTML fragment for a browser map.
    pub fn html(&self) -> String {
        match self {
            PopupContent::Text { text } => escape_html(text),
            PopupContent::Device {
                name,
                status_color,
                status_label,
                action,
            } => {
                let control = match action {
                    PopupAction::OpenView { url, label, view } => format!(
                        "<a href=\"{}\" target=\"_blank\" onclick=\"window.open(this.href, '{}', 'width={},height={}'); return false;\">{}</a>",
                        escape_html(url),
                        view.name,
                        view.width,
                        view.height,
                        escape_html(label)
                    ),
                    PopupAction::Unavailable { notice } => format!(
                        "<div style=\"color: #999; font-size: 0.9em;\">{}</div>",
                        escape_html(notice)
                    ),
                };

                [
                    "<div class=\"cctv-popup\">".to_string(),
                    format!("  <b>{}</b>", escape_html(name)),
                    format!(
                        "  <div style=\"margin: 8px 0; color: {}; font-weight: bold;\">● {}</div>",
                        escape_html(status_color),
                        escape_html(status_label)
                    ),
                    format!("  {}", control),
                    "</div>".to_string(),
                ]
                .join("\n")
            }
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Auxiliary view that records what was opened.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockAuxiliaryView {
    pub opened: Vec<(String, ViewSpec)>,
}

#[cfg(test)]
impl AuxiliaryView for MockAuxiliaryView {
    fn open(&mut self, url: &str, spec: &ViewSpec) {
        self.opened.push((url.to_string(), spec.clone()));
    }
}
