//! Artifact storage for evidence crops, overlays and reports.

use anyhow::{anyhow, Context, Result};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Default artifact root, matching the web deployment's media folder.
pub const DEFAULT_OUTPUT_DIR: &str = "static/Media";
pub const SOURCE_IMAGE_NAME: &str = "img.png";
pub const OVERLAY_IMAGE_NAME: &str = "processed_image.png";
pub const REPORT_NAME: &str = "report.json";

/// What an artifact is; decides where it lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArtifactKind {
    Source,
    Overlay,
    Report,
    RiderCrop,
    PlateCrop,
}

impl ArtifactKind {
    /// Subdirectory under the store root, if any.
    pub fn subdir(&self) -> Option<&'static str> {
        match self {
            Self::RiderCrop => Some("rider_without_helmet"),
            Self::PlateCrop => Some("plates"),
            Self::Source | Self::Overlay | Self::Report => None,
        }
    }
}

/// Write-once-per-name artifact sink.
///
/// Writes to an existing name replace the previous content; names are reused
/// across runs.
pub trait ImageStore {
    fn put(&mut self, kind: ArtifactKind, name: &str, bytes: &[u8]) -> Result<()>;

    fn get(&self, kind: ArtifactKind, name: &str) -> Result<Vec<u8>>;
}

/// Stores artifacts under a root directory.
pub struct FilesystemImageStore {
    root: PathBuf,
}

impl FilesystemImageStore {
    /// Opens the store, creating the root and crop subdirectories.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        for kind in [ArtifactKind::RiderCrop, ArtifactKind::PlateCrop] {
            let dir = kind.subdir().map(|d| root.join(d)).unwrap_or_else(|| root.clone());
            fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, kind: ArtifactKind, name: &str) -> Result<PathBuf> {
        let name = sanitize_name(name)?;
        Ok(match kind.subdir() {
            Some(dir) => self.root.join(dir).join(name),
            None => self.root.join(name),
        })
    }
}

impl ImageStore for FilesystemImageStore {
    fn put(&mut self, kind: ArtifactKind, name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(kind, name)?;
        write_atomic(&path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
        log::debug!("stored {:?} artifact {}", kind, path.display());
        Ok(())
    }

    fn get(&self, kind: ArtifactKind, name: &str) -> Result<Vec<u8>> {
        let path = self.path_for(kind, name)?;
        fs::read(&path).with_context(|| format!("failed to read {}", path.display()))
    }
}

/// Keeps artifacts as byte buffers for callers that do their own persistence.
#[derive(Debug, Default)]
pub struct InMemoryImageStore {
    artifacts: BTreeMap<(ArtifactKind, String), Vec<u8>>,
}

impl InMemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Names stored under one kind, sorted.
    pub fn names(&self, kind: ArtifactKind) -> Vec<String> {
        self.artifacts
            .keys()
            .filter(|(k, _)| *k == kind)
            .map(|(_, name)| name.clone())
            .collect()
    }

    /// Hands the buffers over to the caller, emptying the store.
    pub fn take(&mut self) -> BTreeMap<(ArtifactKind, String), Vec<u8>> {
        std::mem::take(&mut self.artifacts)
    }
}

impl ImageStore for InMemoryImageStore {
    fn put(&mut self, kind: ArtifactKind, name: &str, bytes: &[u8]) -> Result<()> {
        let name = sanitize_name(name)?;
        self.artifacts.insert((kind, name), bytes.to_vec());
        Ok(())
    }

    fn get(&self, kind: ArtifactKind, name: &str) -> Result<Vec<u8>> {
        self.artifacts
            .get(&(kind, name.to_string()))
            .cloned()
            .ok_or_else(|| anyhow!("no {:?} artifact named '{}'", kind, name))
    }
}

fn sanitize_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("artifact name cannot be empty"));
    }
    if trimmed == "." || trimmed == ".." || trimmed.contains(['/', '\\']) {
        return Err(anyhow!("artifact name '{}' must be a plain file name", name));
    }
    Ok(trimmed.to_string())
}

fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let tmp_path = path.with_extension("tmp");
    {
        let mut file = File::create(&tmp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
    }
    fs::rename(tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filesystem_store_lays_out_crop_directories() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let root = temp_dir.path().join("media");
        let mut store = FilesystemImageStore::new(&root)?;
        assert!(root.join("rider_without_helmet").is_dir());
        assert!(root.join("plates").is_dir());

        store.put(ArtifactKind::RiderCrop, "rider_without_helmet_0.jpg", b"r0")?;
        store.put(ArtifactKind::PlateCrop, "plate_of_rider_0.jpg", b"p0")?;
        store.put(ArtifactKind::Overlay, OVERLAY_IMAGE_NAME, b"png")?;

        assert_eq!(
            fs::read(root.join("rider_without_helmet/rider_without_helmet_0.jpg"))?,
            b"r0"
        );
        assert_eq!(fs::read(root.join("plates/plate_of_rider_0.jpg"))?, b"p0");
        assert_eq!(store.get(ArtifactKind::Overlay, OVERLAY_IMAGE_NAME)?, b"png");
        assert!(!root.join("processed_image.tmp").exists());
        Ok(())
    }

    #[test]
    fn rewrites_replace_previous_content() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let mut store = FilesystemImageStore::new(temp_dir.path())?;
        store.put(ArtifactKind::Source, SOURCE_IMAGE_NAME, b"first")?;
        store.put(ArtifactKind::Source, SOURCE_IMAGE_NAME, b"second")?;
        assert_eq!(store.get(ArtifactKind::Source, SOURCE_IMAGE_NAME)?, b"second");
        Ok(())
    }

    #[test]
    fn rejects_path_like_names() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let mut store = FilesystemImageStore::new(temp_dir.path())?;
        assert!(store.put(ArtifactKind::Source, "../escape.png", b"x").is_err());
        assert!(store.put(ArtifactKind::Source, "", b"x").is_err());
        let mut mem = InMemoryImageStore::new();
        assert!(mem.put(ArtifactKind::PlateCrop, "a/b.jpg", b"x").is_err());
        Ok(())
    }

    #[test]
    fn in_memory_store_hands_buffers_over() -> Result<()> {
        let mut store = InMemoryImageStore::new();
        store.put(ArtifactKind::RiderCrop, "rider_without_helmet_1.jpg", b"b")?;
        store.put(ArtifactKind::RiderCrop, "rider_without_helmet_0.jpg", b"a")?;
        assert_eq!(
            store.names(ArtifactKind::RiderCrop),
            vec!["rider_without_helmet_0.jpg", "rider_without_helmet_1.jpg"]
        );
        assert!(store.get(ArtifactKind::PlateCrop, "missing.jpg").is_err());
        let taken = store.take();
        assert_eq!(taken.len(), 2);
        assert!(store.is_empty());
        Ok(())
    }
}
