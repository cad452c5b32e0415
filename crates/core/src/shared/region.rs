/// Axis-aligned face region in image pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Regions found in one frame. Only the count and the rectangles matter;
/// any non-empty result starts a capture cycle.
pub type DetectionResult = Vec<Region>;

impl Region {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// True when both sides are at least `min_size` pixels.
    pub fn is_at_least(&self, min_size: u32) -> bool {
        let min = min_size as i64;
        self.width as i64 >= min && self.height as i64 >= min
    }

    /// Intersects the region with a `width`×`height` frame.
    ///
    /// Returns `None` when nothing of the region is visible.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Region> {
        let x0 = self.x.max(0);
        let y0 = self.y.max(0);
        let x1 = (self.x + self.width).min(width as i32);
        let y1 = (self.y + self.height).min(height as i32);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Region::new(x0, y0, x1 - x0, y1 - y0))
    }
}
