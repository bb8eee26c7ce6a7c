//! Evidence extraction for riders without a helmet.
//!
//! For every association, in order: crop and store the rider, then crop and
//! store the plate (when one was associated) and look its text up. Crop and
//! storage failures abort the request. Recognition failures never do; they
//! become the `PLATE_NOT_FOUND` sentinel.

use std::io::Cursor;

use image::{imageops, ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};

use crate::associate::Association;
use crate::classify::DetectionSet;
use crate::detect::Detection;
use crate::error::PipelineError;
use crate::recognize::PlateRecognizer;
use crate::store::{ArtifactKind, ImageStore};

/// Plate file sentinel when no plate was associated.
pub const NO_PLATE: &str = "No Plate";
/// Plate text sentinel when no text could be obtained.
pub const PLATE_NOT_FOUND: &str = "No Plate Found";

/// One report entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    /// Rider crop file name.
    pub rider: String,
    /// Plate crop file name, or `NO_PLATE`.
    pub plate: String,
    /// Upper-cased plate text, or `PLATE_NOT_FOUND`.
    pub plate_text: String,
    pub rider_index: usize,
    pub plate_index: Option<usize>,
}

impl EvidenceRecord {
    pub fn has_plate(&self) -> bool {
        self.plate_index.is_some()
    }

    pub fn plate_recognized(&self) -> bool {
        self.plate_text != PLATE_NOT_FOUND
    }
}

pub fn rider_file_name(ordinal: usize) -> String {
    format!("rider_without_helmet_{}.jpg", ordinal)
}

pub fn plate_file_name(ordinal: usize) -> String {
    format!("plate_of_rider_{}.jpg", ordinal)
}

/// Copies the detection's box out of the image, clamped to the image bounds.
pub fn crop(image: &RgbImage, detection: &Detection) -> Result<RgbImage, PipelineError> {
    let (width, height) = image.dimensions();
    let (x, y, w, h) = detection
        .bbox
        .clamp_to(width, height)
        .ok_or(PipelineError::Crop {
            class: detection.class,
            bbox: detection.bbox,
            width,
            height,
        })?;
    Ok(imageops::crop_imm(image, x, y, w, h).to_image())
}

/// Encodes an image in memory.
pub fn encode(image: &RgbImage, format: ImageFormat, name: &str) -> Result<Vec<u8>, PipelineError> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, format)
        .map_err(|source| PipelineError::Encode {
            name: name.to_string(),
            source,
        })?;
    Ok(buf.into_inner())
}

pub struct EvidenceExtractor<'a> {
    recognizer: &'a dyn PlateRecognizer,
}

impl<'a> EvidenceExtractor<'a> {
    pub fn new(recognizer: &'a dyn PlateRecognizer) -> Self {
        Self { recognizer }
    }

    /// Builds one record per association, in association order.
    pub fn extract(
        &self,
        image: &RgbImage,
        set: &DetectionSet,
        associations: &[Association],
        store: &mut dyn ImageStore,
    ) -> Result<Vec<EvidenceRecord>, PipelineError> {
        associations
            .iter()
            .enumerate()
            .map(|(ordinal, assoc)| self.extract_one(ordinal, image, set, assoc, store))
            .collect()
    }

    fn extract_one(
        &self,
        ordinal: usize,
        image: &RgbImage,
        set: &DetectionSet,
        assoc: &Association,
        store: &mut dyn ImageStore,
    ) -> Result<EvidenceRecord, PipelineError> {
        let invalid = || PipelineError::InvalidAssociation {
            rider_index: assoc.rider_index,
            plate_index: assoc.plate_index,
        };
        let rider = set.riders.get(assoc.rider_index).ok_or_else(invalid)?;
        let plate = match assoc.plate_index {
            Some(idx) => Some(set.plates.get(idx).ok_or_else(invalid)?),
            None => None,
        };

        let rider_name = rider_file_name(ordinal);
        let rider_bytes = encode(&crop(image, rider)?, ImageFormat::Jpeg, &rider_name)?;
        persist(store, ArtifactKind::RiderCrop, &rider_name, &rider_bytes)?;

        let Some(plate) = plate else {
            log::debug!("rider {} has no plate candidate", assoc.rider_index);
            return Ok(EvidenceRecord {
                rider: rider_name,
                plate: NO_PLATE.to_string(),
                plate_text: PLATE_NOT_FOUND.to_string(),
                rider_index: assoc.rider_index,
                plate_index: None,
            });
        };

        let plate_name = plate_file_name(ordinal);
        let plate_bytes = encode(&crop(image, plate)?, ImageFormat::Jpeg, &plate_name)?;
        persist(store, ArtifactKind::PlateCrop, &plate_name, &plate_bytes)?;
        let plate_text = self.plate_text(ordinal, &plate_bytes);

        Ok(EvidenceRecord {
            rider: rider_name,
            plate: plate_name,
            plate_text,
            rider_index: assoc.rider_index,
            plate_index: assoc.plate_index,
        })
    }

    fn plate_text(&self, ordinal: usize, plate_bytes: &[u8]) -> String {
        match self.recognizer.recognize(plate_bytes) {
            Ok(response) => response.first_plate().unwrap_or_else(|| {
                log::info!("violation {}: recognizer returned no plate", ordinal);
                PLATE_NOT_FOUND.to_string()
            }),
            Err(err) => {
                log::warn!("violation {}: plate recognition failed: {}", ordinal, err);
                PLATE_NOT_FOUND.to_string()
            }
        }
    }
}

fn persist(
    store: &mut dyn ImageStore,
    kind: ArtifactKind,
    name: &str,
    bytes: &[u8],
) -> Result<(), PipelineError> {
    store
        .put(kind, name, bytes)
        .map_err(|source| PipelineError::Storage {
            name: name.to_string(),
            source,
        })
}
