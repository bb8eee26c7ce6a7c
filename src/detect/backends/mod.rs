pub mod sidecar;
pub mod stub;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use sidecar::SidecarBackend;
pub use stub::StubBackend;

#[cfg(feature = "backend-tract")]
pub use tract::TractBackend;

/// Default model class order for the helmet/plate/rider detector.
pub const DEFAULT_CLASS_LABELS: [&str; 3] = ["helmet", "plate", "rider"];

/// Maps a model class index to its label.
///
/// Out-of-range indices become `class_<n>`, which the classifier drops as an
/// unknown label.
pub fn class_label(labels: &[String], class_id: usize) -> String {
    labels
        .get(class_id)
        .cloned()
        .unwrap_or_else(|| format!("class_{}", class_id))
}
