use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use serde::Deserialize;

use super::{class_label, DEFAULT_CLASS_LABELS};
use crate::detect::backend::DetectorBackend;
use crate::detect::result::RawDetection;
use crate::geometry::BoundingBox;

/// One entry of a detections sidecar file.
#[derive(Debug, Deserialize)]
struct SidecarEntry {
    /// `[x1, y1, x2, y2]` in source pixels.
    bbox: [f32; 4],
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    class_id: Option<usize>,
    #[serde(default = "default_confidence")]
    confidence: f32,
}

fn default_confidence() -> f32 {
    1.0
}

/// Backend that replays detections produced by an external model.
///
/// The sidecar is a JSON array read on every `detect` call:
///
/// ```json
/// [{ "bbox": [12, 40, 180, 390], "label": "rider", "confidence": 0.91 },
///  { "bbox": [30, 44, 80, 90], "class_id": 0 }]
/// ```
///
/// `class_id` is resolved through the configured class label order.
pub struct SidecarBackend {
    path: PathBuf,
    class_labels: Vec<String>,
    confidence_threshold: f32,
}

impl SidecarBackend {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            class_labels: DEFAULT_CLASS_LABELS.iter().map(|s| s.to_string()).collect(),
            confidence_threshold: 0.0,
        }
    }

    pub fn with_class_labels(mut self, labels: Vec<String>) -> Self {
        self.class_labels = labels;
        self
    }

    /// Override the default confidence threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    fn parse(&self, raw: &str) -> Result<Vec<RawDetection>> {
        let entries: Vec<SidecarEntry> = serde_json::from_str(raw)
            .with_context(|| format!("invalid detections sidecar {}", self.path.display()))?;
        let mut out = Vec::with_capacity(entries.len());
        for (idx, entry) in entries.into_iter().enumerate() {
            if entry.confidence < self.confidence_threshold {
                continue;
            }
            let label = match (entry.label, entry.class_id) {
                (Some(label), _) => label,
                (None, Some(class_id)) => class_label(&self.class_labels, class_id),
                (None, None) => {
                    return Err(anyhow!(
                        "sidecar entry {} has neither label nor class_id",
                        idx
                    ))
                }
            };
            let [x1, y1, x2, y2] = entry.bbox;
            out.push(RawDetection::new(
                BoundingBox::from_f32(x1, y1, x2, y2),
                label,
                entry.confidence,
            ));
        }
        Ok(out)
    }
}

impl DetectorBackend for SidecarBackend {
    fn name(&self) -> &'static str {
        "sidecar"
    }

    fn detect(&mut self, _image: &RgbImage) -> Result<Vec<RawDetection>> {
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read detections sidecar {}", self.path.display()))?;
        let detections = self.parse(&raw)?;
        log::debug!(
            "sidecar {}: {} detections",
            self.path.display(),
            detections.len()
        );
        Ok(detections)
    }
}
