//! Orchestrator for one image: classify, evaluate, associate, extract
//! evidence, render the overlay.
//!
//! Nothing is kept between calls. Each invocation gets its store passed in
//! and returns everything it produced.

use std::path::Path;

use image::{ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};

use crate::associate::{associate, Association};
use crate::classify::DetectionSet;
use crate::compliance::{evaluate, ComplianceVerdict};
use crate::detect::{DetectorBackend, RawDetection};
use crate::error::PipelineError;
use crate::evidence::{encode, EvidenceExtractor, EvidenceRecord};
use crate::overlay::{OverlayRenderer, OverlayStyle};
use crate::recognize::PlateRecognizer;
use crate::store::{ArtifactKind, ImageStore, OVERLAY_IMAGE_NAME};

/// Evidence records for every rider without a helmet, in rider order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationReport {
    pub records: Vec<EvidenceRecord>,
}

impl ViolationReport {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EvidenceRecord> {
        self.records.iter()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl<'a> IntoIterator for &'a ViolationReport {
    type Item = &'a EvidenceRecord;
    type IntoIter = std::slice::Iter<'a, EvidenceRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Everything one invocation produced.
#[derive(Debug)]
pub struct PipelineOutput {
    pub report: ViolationReport,
    pub annotated: RgbImage,
    pub detections: DetectionSet,
    pub verdicts: Vec<ComplianceVerdict>,
    pub associations: Vec<Association>,
}

impl PipelineOutput {
    pub fn riders_without_helmet(&self) -> usize {
        self.verdicts.iter().filter(|v| !v.has_helmet).count()
    }
}

pub struct Pipeline<'a> {
    recognizer: &'a dyn PlateRecognizer,
    renderer: OverlayRenderer,
}

impl<'a> Pipeline<'a> {
    pub fn new(recognizer: &'a dyn PlateRecognizer) -> Self {
        Self::with_style(recognizer, OverlayStyle::default())
    }

    pub fn with_style(recognizer: &'a dyn PlateRecognizer, style: OverlayStyle) -> Self {
        Self {
            recognizer,
            renderer: OverlayRenderer::new(style),
        }
    }

    /// Runs the detector on `image`, then the rest of the pipeline.
    pub fn run(
        &self,
        detector: &mut dyn DetectorBackend,
        image: &RgbImage,
        store: &mut dyn ImageStore,
    ) -> Result<PipelineOutput, PipelineError> {
        let raw = detector.detect(image).map_err(PipelineError::Detection)?;
        log::debug!("detector '{}' returned {} boxes", detector.name(), raw.len());
        self.process_detections(image, raw, store)
    }

    /// Runs the pipeline over detections produced elsewhere.
    pub fn process_detections(
        &self,
        image: &RgbImage,
        detections: Vec<RawDetection>,
        store: &mut dyn ImageStore,
    ) -> Result<PipelineOutput, PipelineError> {
        log::info!(
            "processing {}x{} image with {} detections",
            image.width(),
            image.height(),
            detections.len()
        );

        let set = DetectionSet::classify(detections);
        let verdicts = evaluate(&set.riders, &set.helmets);
        let associations = associate(&set.riders, &verdicts, &set.plates);
        let records =
            EvidenceExtractor::new(self.recognizer).extract(image, &set, &associations, store)?;

        let annotated = self.renderer.render(image, &set);
        let overlay_bytes = encode(&annotated, ImageFormat::Png, OVERLAY_IMAGE_NAME)?;
        store
            .put(ArtifactKind::Overlay, OVERLAY_IMAGE_NAME, &overlay_bytes)
            .map_err(|source| PipelineError::Storage {
                name: OVERLAY_IMAGE_NAME.to_string(),
                source,
            })?;

        let report = ViolationReport { records };
        log::info!(
            "riders={} helmets={} plates={} violations={} plates_read={}",
            set.riders.len(),
            set.helmets.len(),
            set.plates.len(),
            report.len(),
            report.iter().filter(|r| r.plate_recognized()).count()
        );

        Ok(PipelineOutput {
            report,
            annotated,
            detections: set,
            verdicts,
            associations,
        })
    }
}

/// Decodes the source image at `path` into RGB8.
pub fn load_source<P: AsRef<Path>>(path: P) -> Result<RgbImage, PipelineError> {
    let path = path.as_ref();
    image::open(path)
        .map(|img| img.to_rgb8())
        .map_err(|source| PipelineError::Input {
            path: path.display().to_string(),
            source,
        })
}

/// Decodes an in-memory upload into RGB8.
pub fn decode_source(bytes: &[u8]) -> Result<RgbImage, PipelineError> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgb8())
        .map_err(|source| PipelineError::Input {
            path: "<memory>".to_string(),
            source,
        })
}
