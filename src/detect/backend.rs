use anyhow::Result;
use image::RgbImage;

use crate::detect::result::RawDetection;

/// Object detector backend trait.
///
/// Backends are black boxes to the pipeline: whatever they emit is taken as
/// is, in emission order, with no correction of false positives or misses.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on one image.
    ///
    /// Implementations must treat the image as read-only. Returning zero
    /// detections is a valid outcome, not an error.
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<RawDetection>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
