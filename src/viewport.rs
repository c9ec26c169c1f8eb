//! Screen/image coordinate mapping with zoom-to-cursor.
//!
//! The transform maps a screen point `s` to an image point `i` with
//! `i = (s - pan) / scale` and back with `s = i * scale + pan`. Nothing here
//! clamps to the image extent; callers bounds-check where they need to.

use serde::{Deserialize, Serialize};

use crate::constants::{MAX_SCALE, MIN_SCALE, MIN_WHEEL_FACTOR, WHEEL_DIVISOR};

/// A point on the viewport surface, in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Midpoint between two screen points.
    pub fn midpoint(&self, other: &ScreenPoint) -> ScreenPoint {
        ScreenPoint::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    /// Euclidean distance to another screen point.
    pub fn distance_to(&self, other: &ScreenPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// A point in the pixel grid of the loaded image, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ImagePoint {
    pub x: f64,
    pub y: f64,
}

impl ImagePoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Midpoint between two image points.
    pub fn midpoint(&self, other: &ImagePoint) -> ImagePoint {
        ImagePoint::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    /// Euclidean distance to another image point.
    pub fn distance_to(&self, other: &ImagePoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Nearest integer pixel, rounding halves away from zero.
    pub fn rounded(&self) -> (i64, i64) {
        (self.x.round() as i64, self.y.round() as i64)
    }

    /// The rounded pixel if it lies inside a `width` x `height` image.
    pub fn pixel_in(&self, width: u32, height: u32) -> Option<(u32, u32)> {
        let (x, y) = self.rounded();
        if x < 0 || y < 0 || x >= i64::from(width) || y >= i64::from(height) {
            return None;
        }
        Some((x as u32, y as u32))
    }
}

/// Allowed scale range for a transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomLimits {
    pub min: f64,
    pub max: f64,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self {
            min: MIN_SCALE,
            max: MAX_SCALE,
        }
    }
}

impl ZoomLimits {
    /// Clamp a scale into the allowed range.
    pub fn clamp(&self, scale: f64) -> f64 {
        scale.clamp(self.min, self.max)
    }
}

/// Pan/zoom state of the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportTransform {
    scale: f64,
    pan_x: f64,
    pan_y: f64,
    limits: ZoomLimits,
}

impl ViewportTransform {
    /// Create a transform with the given scale (clamped) and pan.
    pub fn new(scale: f64, pan_x: f64, pan_y: f64) -> Self {
        Self::with_limits(scale, pan_x, pan_y, ZoomLimits::default())
    }

    /// Create a transform with explicit zoom limits.
    pub fn with_limits(scale: f64, pan_x: f64, pan_y: f64, limits: ZoomLimits) -> Self {
        Self {
            scale: limits.clamp(scale),
            pan_x,
            pan_y,
            limits,
        }
    }

    /// Create an identity transform (scale=1, no pan).
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0)
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn pan_offset(&self) -> (f64, f64) {
        (self.pan_x, self.pan_y)
    }

    pub fn limits(&self) -> ZoomLimits {
        self.limits
    }

    /// Map a screen point into image space.
    pub fn screen_to_image(&self, s: ScreenPoint) -> ImagePoint {
        ImagePoint::new((s.x - self.pan_x) / self.scale, (s.y - self.pan_y) / self.scale)
    }

    /// Map an image point onto the screen.
    pub fn image_to_screen(&self, i: ImagePoint) -> ScreenPoint {
        ScreenPoint::new(i.x * self.scale + self.pan_x, i.y * self.scale + self.pan_y)
    }

    /// Scale an image-space length to screen pixels.
    pub fn length_to_screen(&self, length: f64) -> f64 {
        length * self.scale
    }

    /// Multiply the scale by `factor` while keeping the image point under
    /// `anchor` fixed on screen.
    ///
    /// Factors that are not finite and positive are ignored.
    pub fn zoom(&mut self, anchor: ScreenPoint, factor: f64) {
        if !factor.is_finite() || factor <= 0.0 {
            log::debug!("Ignoring zoom factor {}", factor);
            return;
        }

        // Image-space point under the anchor before zoom
        let image_anchor = self.screen_to_image(anchor);

        self.scale = self.limits.clamp(self.scale * factor);
        self.pan_x = anchor.x - image_anchor.x * self.scale;
        self.pan_y = anchor.y - image_anchor.y * self.scale;
    }

    /// Zoom by a wheel rotation (angle units, 120 per notch) at `anchor`.
    pub fn zoom_by_wheel(&mut self, anchor: ScreenPoint, angle_delta: f64, divisor: f64) {
        self.zoom(anchor, wheel_factor(angle_delta, divisor));
    }

    /// Shift the pan offset by a screen-space delta.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.pan_x += dx;
        self.pan_y += dy;
    }

    /// Back to scale 1 with no pan, keeping the limits.
    pub fn reset(&mut self) {
        self.scale = self.limits.clamp(1.0);
        self.pan_x = 0.0;
        self.pan_y = 0.0;
    }
}

impl Default for ViewportTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Zoom factor for a wheel rotation. A `divisor` that is not positive falls
/// back to the default. Large negative rotations bottom out at
/// `MIN_WHEEL_FACTOR` so they still zoom out to the scale floor.
pub fn wheel_factor(angle_delta: f64, divisor: f64) -> f64 {
    let divisor = if divisor > 0.0 { divisor } else { WHEEL_DIVISOR };
    (1.0 + angle_delta / divisor).max(MIN_WHEEL_FACTOR)
}
