use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::capture::domain::frame_source::DeviceId;
use crate::detection::domain::presence_detector::ClassifierConfig;
use crate::shared::constants::{APP_DIR_NAME, DEFAULT_BACKEND_URL, DEFAULT_LIGHTING_BAUD};
use crate::shared::crop::{CropBounds, CropError};
use crate::transform::domain::image_transformer::GenerationParams;

const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid crop: {0}")]
    Crop(#[from] CropError),
    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct WindowSize {
    pub width: u32,
    pub height: u32,
}

/// Everything the installation needs to know, fixed for a session.
///
/// Every field has a default, so a config file only lists what it changes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Root URL of the image backend.
    pub backend_url: String,
    pub device: DeviceId,
    /// Where before/after pairs are kept. `None` disables persistence.
    pub output_dir: Option<PathBuf>,
    pub generation: GenerationParams,
    /// Flip frames horizontally so the result reads like a reflection.
    pub mirror_flip: bool,
    pub crop: CropBounds,
    /// Stale frames are drained for this long before each watch read.
    pub catch_up_ms: u64,
    /// Pause between first detection and the capture that is transformed.
    pub settle_ms: u64,
    /// How long the result stays on the output surface.
    pub display_ms: u64,
    /// Upper bound on one backend call.
    pub timeout_ms: u64,
    /// Serial port of the lighting accessory. `None` disables lighting.
    pub lighting_port: Option<String>,
    pub lighting_baud: u32,
    pub classifier: ClassifierConfig,
    /// Explicit face model file; resolved from the cache when absent.
    pub classifier_model: Option<PathBuf>,
    pub output_size: WindowSize,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            device: DeviceId::default(),
            output_dir: None,
            generation: GenerationParams::default(),
            mirror_flip: true,
            crop: CropBounds::IDENTITY,
            catch_up_ms: 100,
            settle_ms: 1500,
            display_ms: 2000,
            timeout_ms: 10_000,
            lighting_port: None,
            lighting_baud: DEFAULT_LIGHTING_BAUD,
            classifier: ClassifierConfig::default(),
            classifier_model: None,
            output_size: WindowSize {
                width: 1280,
                height: 720,
            },
        }
    }
}

impl MirrorConfig {
    /// `<platform config dir>/Haunted Mirror/config.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&json).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Loads the file at the default location if one exists, else defaults.
    pub fn load_default() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.is_file() => {
                log::info!("Loading config from {}", path.display());
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.crop.validate()?;

        let g = &self.generation;
        if !(0.0..=1.0).contains(&g.denoising_strength) {
            return Err(ConfigError::Invalid(format!(
                "denoising strength must be between 0 and 1, got {}",
                g.denoising_strength
            )));
        }
        if g.width == 0 || g.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "generation size must be non-zero, got {}x{}",
                g.width, g.height
            )));
        }
        if g.steps == 0 {
            return Err(ConfigError::Invalid("steps must be at least 1".into()));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeout must be non-zero".into()));
        }
        if self.classifier.scale_factor <= 1.0 {
            return Err(ConfigError::Invalid(format!(
                "scale factor must be greater than 1, got {}",
                self.classifier.scale_factor
            )));
        }
        if self.classifier.min_size == 0 {
            return Err(ConfigError::Invalid("min face size must be at least 1".into()));
        }
        if self.output_size.width == 0 || self.output_size.height == 0 {
            return Err(ConfigError::Invalid("output window size must be non-zero".into()));
        }
        Ok(())
    }

    pub fn catch_up(&self) -> Duration {
        Duration::from_millis(self.catch_up_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn display(&self) -> Duration {
        Duration::from_millis(self.display_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
