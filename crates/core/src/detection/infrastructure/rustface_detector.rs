//! Face detector backed by the `rustface` crate (SeetaFace funnel cascade).
//!
//! The cascade merges overlapping window hits internally and reports one
//! aggregated score per face, so the neighbour vote of [`ClassifierConfig`]
//! is applied as a score threshold.
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::detection::domain::presence_detector::{to_intensity, ClassifierConfig, PresenceDetector};
use crate::shared::frame::Frame;
use crate::shared::region::{DetectionResult, Region};

/// Cascade score contributed by each required neighbour. The default of
/// five neighbours maps to a threshold of 2.0.
const SCORE_PER_NEIGHBOR: f64 = 0.4;

/// SeetaFace cannot scan windows smaller than this.
const CASCADE_MIN_FACE_SIZE: u32 = 20;

const SLIDE_WINDOW_STEP: u32 = 4;

#[derive(Error, Debug)]
pub enum DetectorLoadError {
    #[error("failed to open classifier model {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid classifier model {path}: {reason}")]
    Model { path: PathBuf, reason: String },
}

pub struct RustfaceDetector {
    detector: Box<dyn rustface::Detector>,
    config: ClassifierConfig,
}

impl RustfaceDetector {
    pub fn from_model_file(path: &Path, config: ClassifierConfig) -> Result<Self, DetectorLoadError> {
        let file = File::open(path).map_err(|e| DetectorLoadError::Open {
            path: path.to_path_buf(),
            source: e,
        })?;
        let model = rustface::read_model(BufReader::new(file)).map_err(|e| {
            DetectorLoadError::Model {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;

        let mut detector = rustface::create_detector_with_model(model);
        detector.set_min_face_size(config.min_size.max(CASCADE_MIN_FACE_SIZE));
        detector.set_score_thresh(score_threshold(config.min_neighbors));
        detector.set_pyramid_scale_factor(pyramid_factor(config.scale_factor));
        detector.set_slide_window_step(SLIDE_WINDOW_STEP, SLIDE_WINDOW_STEP);

        log::debug!("Loaded classifier model {} with {config:?}", path.display());
        Ok(Self { detector, config })
    }
}

impl PresenceDetector for RustfaceDetector {
    fn detect(&mut self, frame: &Frame) -> DetectionResult {
        let Some(gray) = to_intensity(frame) else {
            log::debug!("Skipping malformed frame {}", frame.index());
            return Vec::new();
        };
        let image = rustface::ImageData::new(gray.as_raw(), gray.width(), gray.height());

        self.detector
            .detect(&image)
            .iter()
            .map(|face| {
                let bbox = face.bbox();
                Region::new(bbox.x(), bbox.y(), bbox.width() as i32, bbox.height() as i32)
            })
            .filter(|r| r.is_at_least(self.config.min_size))
            .collect()
    }
}

/// rustface shrinks each pyramid level by a factor below one, the inverse
/// of the growth factor used to describe the classifier.
fn pyramid_factor(scale_factor: f64) -> f32 {
    ((1.0 / scale_factor) as f32).clamp(0.01, 0.99)
}

fn score_threshold(min_neighbors: u32) -> f64 {
    min_neighbors as f64 * SCORE_PER_NEIGHBOR
}
