use image::{imageops, GrayImage, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::shared::frame::Frame;
use crate::shared::region::DetectionResult;

/// Tuning for the multi-scale sliding-window face classifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Size step between image pyramid levels (> 1.0).
    pub scale_factor: f64,
    /// Votes a candidate needs before it counts as a face. Higher values
    /// trade recall for fewer false positives.
    pub min_neighbors: u32,
    /// Smallest face side, in pixels, that is reported.
    pub min_size: u32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            scale_factor: 1.2,
            min_neighbors: 5,
            min_size: 30,
        }
    }
}

/// Domain interface for "is somebody looking into the mirror".
///
/// Implementations must be deterministic for identical frames and must not
/// fail on a well-formed frame: no face is an empty result, not an error.
pub trait PresenceDetector {
    fn detect(&mut self, frame: &Frame) -> DetectionResult;
}

/// Single-channel intensity image of a frame, via `image`'s luma conversion.
///
/// Returns `None` when the frame's buffer does not match its dimensions.
pub fn to_intensity(frame: &Frame) -> Option<GrayImage> {
    let (w, h) = (frame.width(), frame.height());
    let data = frame.data().to_vec();
    match frame.channels() {
        1 => GrayImage::from_raw(w, h, data),
        4 => RgbaImage::from_raw(w, h, data).map(|img| imageops::grayscale(&img)),
        _ => RgbImage::from_raw(w, h, data).map(|img| imageops::grayscale(&img)),
    }
}
