use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::detect::backends::DEFAULT_CLASS_LABELS;
use crate::detect::ObjectClass;
use crate::overlay::OverlayStyle;
use crate::store::DEFAULT_OUTPUT_DIR;

const DEFAULT_BACKEND: &str = "sidecar";
const DEFAULT_MODEL_PATH: &str = "weights/besthel.onnx";
const DEFAULT_INPUT_SIZE: u32 = 640;
const DEFAULT_CONFIDENCE: f32 = 0.25;
const DEFAULT_IOU: f32 = 0.45;
const DEFAULT_RECOGNIZER_URL: &str = "https://api.platerecognizer.com/v1/plate-reader/";
const DEFAULT_REGIONS: [&str; 2] = ["mx", "in"];
const DEFAULT_TIMEOUT_SECS: u64 = 15;

pub const KNOWN_BACKENDS: [&str; 2] = ["sidecar", "tract"];

#[derive(Debug, Deserialize, Default)]
struct HelmetWatchConfigFile {
    output_dir: Option<PathBuf>,
    detector: Option<DetectorConfigFile>,
    recognizer: Option<RecognizerConfigFile>,
    overlay: Option<OverlayConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    model_path: Option<PathBuf>,
    input_size: Option<u32>,
    confidence: Option<f32>,
    iou: Option<f32>,
    class_labels: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
struct RecognizerConfigFile {
    url: Option<String>,
    token: Option<String>,
    regions: Option<Vec<String>>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct OverlayConfigFile {
    line_thickness: Option<u32>,
    font_px: Option<f32>,
    label_offset: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct HelmetWatchConfig {
    pub output_dir: PathBuf,
    pub detector: DetectorSettings,
    pub recognizer: RecognizerSettings,
    pub overlay: OverlayStyle,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub backend: String,
    pub model_path: PathBuf,
    pub input_size: u32,
    pub confidence: f32,
    pub iou: f32,
    /// Model class index order.
    pub class_labels: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RecognizerSettings {
    pub url: String,
    /// `None` disables plate text lookups.
    pub token: Option<String>,
    pub regions: Vec<String>,
    pub timeout: Duration,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            backend: DEFAULT_BACKEND.to_string(),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            input_size: DEFAULT_INPUT_SIZE,
            confidence: DEFAULT_CONFIDENCE,
            iou: DEFAULT_IOU,
            class_labels: DEFAULT_CLASS_LABELS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for RecognizerSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_RECOGNIZER_URL.to_string(),
            token: None,
            regions: DEFAULT_REGIONS.iter().map(|s| s.to_string()).collect(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl Default for HelmetWatchConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            detector: DetectorSettings::default(),
            recognizer: RecognizerSettings::default(),
            overlay: OverlayStyle::default(),
        }
    }
}

impl HelmetWatchConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("HELMET_WATCH_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: HelmetWatchConfigFile) -> Self {
        let defaults = Self::default();
        let detector = file.detector.unwrap_or_default();
        let recognizer = file.recognizer.unwrap_or_default();
        let overlay = file.overlay.unwrap_or_default();
        Self {
            output_dir: file.output_dir.unwrap_or(defaults.output_dir),
            detector: DetectorSettings {
                backend: detector.backend.unwrap_or(defaults.detector.backend),
                model_path: detector.model_path.unwrap_or(defaults.detector.model_path),
                input_size: detector.input_size.unwrap_or(defaults.detector.input_size),
                confidence: detector.confidence.unwrap_or(defaults.detector.confidence),
                iou: detector.iou.unwrap_or(defaults.detector.iou),
                class_labels: detector
                    .class_labels
                    .unwrap_or(defaults.detector.class_labels),
            },
            recognizer: RecognizerSettings {
                url: recognizer.url.unwrap_or(defaults.recognizer.url),
                token: recognizer.token.or(defaults.recognizer.token),
                regions: recognizer.regions.unwrap_or(defaults.recognizer.regions),
                timeout: recognizer
                    .timeout_secs
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.recognizer.timeout),
            },
            overlay: OverlayStyle {
                line_thickness: overlay
                    .line_thickness
                    .unwrap_or(defaults.overlay.line_thickness),
                font_px: overlay.font_px.unwrap_or(defaults.overlay.font_px),
                label_offset: overlay.label_offset.unwrap_or(defaults.overlay.label_offset),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(dir) = std::env::var("HELMET_WATCH_OUTPUT_DIR") {
            if !dir.trim().is_empty() {
                self.output_dir = PathBuf::from(dir);
            }
        }
        if let Ok(backend) = std::env::var("HELMET_WATCH_BACKEND") {
            if !backend.trim().is_empty() {
                self.detector.backend = backend.trim().to_string();
            }
        }
        if let Ok(path) = std::env::var("HELMET_WATCH_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.detector.model_path = PathBuf::from(path);
            }
        }
        if let Ok(url) = std::env::var("PLATE_RECOGNIZER_URL") {
            if !url.trim().is_empty() {
                self.recognizer.url = url;
            }
        }
        if let Ok(token) = std::env::var("PLATE_RECOGNIZER_TOKEN") {
            if !token.trim().is_empty() {
                self.recognizer.token = Some(token.trim().to_string());
            }
        }
        if let Ok(regions) = std::env::var("PLATE_RECOGNIZER_REGIONS") {
            let parsed = split_csv(&regions);
            if !parsed.is_empty() {
                self.recognizer.regions = parsed;
            }
        }
        if let Ok(timeout) = std::env::var("PLATE_RECOGNIZER_TIMEOUT_SECS") {
            let seconds: u64 = timeout.trim().parse().map_err(|_| {
                anyhow!("PLATE_RECOGNIZER_TIMEOUT_SECS must be an integer number of seconds")
            })?;
            self.recognizer.timeout = Duration::from_secs(seconds);
        }
        Ok(())
    }

    pub fn validate(&mut self) -> Result<()> {
        self.detector.backend = self.detector.backend.to_lowercase();
        if !KNOWN_BACKENDS.contains(&self.detector.backend.as_str()) {
            return Err(anyhow!(
                "unknown detector backend '{}'; expected one of {:?}",
                self.detector.backend,
                KNOWN_BACKENDS
            ));
        }
        for (name, value) in [
            ("detector.confidence", self.detector.confidence),
            ("detector.iou", self.detector.iou),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(anyhow!("{} must be within [0, 1], got {}", name, value));
            }
        }
        if self.detector.input_size == 0 {
            return Err(anyhow!("detector.input_size must be greater than zero"));
        }
        if self.detector.class_labels.is_empty() {
            return Err(anyhow!("detector.class_labels cannot be empty"));
        }
        if let Some(bad) = self
            .detector
            .class_labels
            .iter()
            .find(|label| ObjectClass::from_label(label).is_none())
        {
            return Err(anyhow!(
                "detector.class_labels entry '{}' is not one of rider, helmet, plate",
                bad
            ));
        }
        if self.recognizer.timeout.as_secs() == 0 {
            return Err(anyhow!("recognizer timeout must be greater than zero"));
        }
        if self.overlay.line_thickness == 0 {
            return Err(anyhow!("overlay.line_thickness must be greater than zero"));
        }
        if !(self.overlay.font_px > 0.0) {
            return Err(anyhow!("overlay.font_px must be positive"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<HelmetWatchConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.to_string())
        .collect()
}
