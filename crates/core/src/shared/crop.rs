use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CropError {
    #[error("crop bound {name}={value} is outside the normalized range [0, 1]")]
    OutOfRange { name: &'static str, value: f64 },
    #[error("crop bounds select an empty area ({axis}: {start}..{end})")]
    Empty {
        axis: &'static str,
        start: f64,
        end: f64,
    },
}

/// Normalized crop rectangle, each edge expressed as a fraction of the
/// frame's width or height.
///
/// Used to compensate for the camera sitting above or below the center of
/// the display behind the mirror.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropBounds {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl CropBounds {
    pub const IDENTITY: CropBounds = CropBounds {
        left: 0.0,
        right: 1.0,
        top: 0.0,
        bottom: 1.0,
    };

    pub fn new(left: f64, right: f64, top: f64, bottom: f64) -> Result<Self, CropError> {
        let bounds = Self {
            left,
            right,
            top,
            bottom,
        };
        bounds.validate()?;
        Ok(bounds)
    }

    /// Vertical-only crop keeping the band between `top` and `bottom`.
    pub fn vertical(top: f64, bottom: f64) -> Result<Self, CropError> {
        Self::new(0.0, 1.0, top, bottom)
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    pub fn validate(&self) -> Result<(), CropError> {
        for (name, value) in [
            ("left", self.left),
            ("right", self.right),
            ("top", self.top),
            ("bottom", self.bottom),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(CropError::OutOfRange { name, value });
            }
        }
        if self.left >= self.right {
            return Err(CropError::Empty {
                axis: "horizontal",
                start: self.left,
                end: self.right,
            });
        }
        if self.top >= self.bottom {
            return Err(CropError::Empty {
                axis: "vertical",
                start: self.top,
                end: self.bottom,
            });
        }
        Ok(())
    }

    /// Pixel rectangle `(x0, x1, y0, y1)` (end-exclusive) for a frame of the
    /// given size. Fails if the bounds are invalid or round to zero pixels.
    pub fn pixel_rect(&self, width: u32, height: u32) -> Result<(u32, u32, u32, u32), CropError> {
        self.validate()?;
        let x0 = (self.left * width as f64).round() as u32;
        let x1 = (self.right * width as f64).round() as u32;
        let y0 = (self.top * height as f64).round() as u32;
        let y1 = (self.bottom * height as f64).round() as u32;
        if x1 <= x0 {
            return Err(CropError::Empty {
                axis: "horizontal",
                start: self.left,
                end: self.right,
            });
        }
        if y1 <= y0 {
            return Err(CropError::Empty {
                axis: "vertical",
                start: self.top,
                end: self.bottom,
            });
        }
        Ok((x0, x1.min(width), y0, y1.min(height)))
    }
}

impl Default for CropBounds {
    fn default() -> Self {
        Self::IDENTITY
    }
}
