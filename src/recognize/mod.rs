//! Plate text recognition collaborator.
//!
//! The pipeline hands a persisted plate crop to a `PlateRecognizer` and only
//! looks at the first candidate of the response. Every failure mode maps to
//! a `RecognitionError`, which the evidence stage downgrades to a sentinel.

mod client;

use serde::{Deserialize, Serialize};

pub use client::PlateRecognizerClient;

use crate::config::RecognizerSettings;
use crate::error::RecognitionError;

/// Response of a plate recognition call.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResponse {
    #[serde(default)]
    pub results: Option<Vec<PlateCandidate>>,
}

/// One candidate reading.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlateCandidate {
    #[serde(default)]
    pub plate: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
}

impl RecognitionResponse {
    pub fn from_plates<I, S>(plates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            results: Some(
                plates
                    .into_iter()
                    .map(|p| PlateCandidate {
                        plate: Some(p.into()),
                        score: None,
                    })
                    .collect(),
            ),
        }
    }

    pub fn from_json(body: &str) -> Result<Self, RecognitionError> {
        serde_json::from_str(body).map_err(|e| RecognitionError::Malformed(e.to_string()))
    }

    /// Upper-cased plate of the first result, if any.
    pub fn first_plate(&self) -> Option<String> {
        self.results
            .as_deref()?
            .first()?
            .plate
            .as_deref()
            .map(str::to_uppercase)
    }
}

/// Plate text recognition service.
pub trait PlateRecognizer {
    /// Recognize plate text in an encoded image.
    ///
    /// Transport failures must be reported as errors, distinct from a
    /// successful response with zero results.
    fn recognize(&self, image_bytes: &[u8]) -> Result<RecognitionResponse, RecognitionError>;
}

impl<F> PlateRecognizer for F
where
    F: Fn(&[u8]) -> Result<RecognitionResponse, RecognitionError>,
{
    fn recognize(&self, image_bytes: &[u8]) -> Result<RecognitionResponse, RecognitionError> {
        self(image_bytes)
    }
}

/// Recognizer used when no service credentials are configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct OfflineRecognizer;

impl PlateRecognizer for OfflineRecognizer {
    fn recognize(&self, _image_bytes: &[u8]) -> Result<RecognitionResponse, RecognitionError> {
        Err(RecognitionError::Unavailable)
    }
}

/// Builds the HTTP client when a token is configured, the offline recognizer otherwise.
pub fn recognizer_from_settings(
    settings: &RecognizerSettings,
) -> anyhow::Result<Box<dyn PlateRecognizer>> {
    match settings.token.as_deref() {
        Some(token) if !token.trim().is_empty() => {
            let client = PlateRecognizerClient::new(settings)?;
            log::info!("plate recognizer enabled at {}", client.url());
            Ok(Box::new(client))
        }
        _ => {
            log::warn!("no plate recognizer token configured; plate text lookups are disabled");
            Ok(Box::new(OfflineRecognizer))
        }
    }
}
