use thiserror::Error;

use crate::detect::ObjectClass;
use crate::geometry::BoundingBox;

/// Fatal failures of one image-processing request.
///
/// Any of these aborts the request; no partial report is produced.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to load source image {path}")]
    Input {
        path: String,
        #[source]
        source: image::ImageError,
    },

    #[error("object detector failed")]
    Detection(#[source] anyhow::Error),

    #[error("{class:?} box {bbox:?} has no pixels inside the {width}x{height} image")]
    Crop {
        class: ObjectClass,
        bbox: BoundingBox,
        width: u32,
        height: u32,
    },

    #[error("association references rider {rider_index} / plate {plate_index:?} outside the detection set")]
    InvalidAssociation {
        rider_index: usize,
        plate_index: Option<usize>,
    },

    #[error("failed to encode {name}")]
    Encode {
        name: String,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to store {name}")]
    Storage {
        name: String,
        #[source]
        source: anyhow::Error,
    },
}

impl PipelineError {
    /// True for storage-side failures (encode or write).
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Encode { .. } | Self::Storage { .. })
    }
}

/// Plate recognition failures. Always recovered to the "not found" sentinel.
#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("plate recognition request failed: {0}")]
    Transport(String),

    #[error("plate recognition service returned HTTP {status}")]
    Status { status: u16, body: String },

    #[error("malformed plate recognition response: {0}")]
    Malformed(String),

    #[error("plate recognition is not configured")]
    Unavailable,
}
