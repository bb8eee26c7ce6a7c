//! Helmet Watch
//!
//! This crate turns the boxes of an object detector into helmet-violation
//! evidence for one still image.
//!
//! # Architecture
//!
//! Data flows one way through the pipeline:
//!
//! 1. **Classify**: raw detections are partitioned into riders, helmets and plates.
//! 2. **Evaluate**: a rider wears a helmet iff some helmet's top-left corner is
//!    strictly inside the rider box.
//! 3. **Associate**: every rider without a helmet gets the plate whose centroid is
//!    nearest to its own. Plates may be shared by several riders.
//! 4. **Extract**: rider and plate crops are stored and the plate text is looked up.
//!    Lookup failures degrade to a sentinel; crop and storage failures abort.
//! 5. **Render**: all boxes are drawn on a copy of the source image.
//!
//! # Module Structure
//!
//! - `detect`: detector backends (sidecar JSON, stub, optional ONNX) and their registry
//! - `classify`, `compliance`, `associate`, `evidence`, `overlay`: the stages above
//! - `recognize`: plate text recognition client
//! - `store`: artifact persistence (filesystem or in-memory)
//! - `pipeline`: per-request orchestration and the `ViolationReport`

pub mod associate;
pub mod classify;
pub mod compliance;
pub mod config;
pub mod detect;
pub mod error;
pub mod evidence;
pub mod geometry;
pub mod overlay;
pub mod pipeline;
pub mod recognize;
pub mod store;

pub use associate::{associate, nearest_plate, Association};
pub use classify::DetectionSet;
pub use compliance::{evaluate, rider_has_helmet, ComplianceVerdict};
pub use config::{DetectorSettings, HelmetWatchConfig, RecognizerSettings};
pub use detect::{BackendRegistry, Detection, DetectorBackend, ObjectClass, RawDetection};
pub use error::{PipelineError, RecognitionError};
pub use evidence::{EvidenceExtractor, EvidenceRecord, NO_PLATE, PLATE_NOT_FOUND};
pub use geometry::BoundingBox;
pub use overlay::{OverlayRenderer, OverlayStyle};
pub use pipeline::{decode_source, load_source, Pipeline, PipelineOutput, ViolationReport};
pub use recognize::{
    recognizer_from_settings, OfflineRecognizer, PlateRecognizer, PlateRecognizerClient,
    RecognitionResponse,
};
pub use store::{ArtifactKind, FilesystemImageStore, ImageStore, InMemoryImageStore};
