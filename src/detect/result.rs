use serde::{Deserialize, Serialize};

use crate::geometry::BoundingBox;

/// Closed set of classes the pipeline understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectClass {
    Rider,
    Helmet,
    Plate,
}

impl ObjectClass {
    /// Parses a detector label. Unknown labels yield `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        if label.eq_ignore_ascii_case("rider") {
            Some(Self::Rider)
        } else if label.eq_ignore_ascii_case("helmet") {
            Some(Self::Helmet)
        } else if label.eq_ignore_ascii_case("plate") {
            Some(Self::Plate)
        } else {
            None
        }
    }

    /// Label drawn on the overlay.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Rider => "Rider",
            Self::Helmet => "Helmet",
            Self::Plate => "Plate",
        }
    }
}

/// Detector output before it is checked against the closed class set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub bbox: BoundingBox,
    pub label: String,
    #[serde(default)]
    pub confidence: f32,
}

impl RawDetection {
    pub fn new(bbox: BoundingBox, label: impl Into<String>, confidence: f32) -> Self {
        Self {
            bbox,
            label: label.into(),
            confidence,
        }
    }
}

/// A box tagged with one of the known classes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub class: ObjectClass,
    pub confidence: f32,
}
