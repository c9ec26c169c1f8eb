//! Processing collaborators.
//!
//! The viewer core only talks to these traits. The implementations in the
//! submodules are small reference collaborators used by the command-line
//! shell; anything implementing the traits can replace them.

mod components;
mod threshold;

pub use components::{OtsuComponentLabeler, hsv_to_rgb};
pub use threshold::MaxChannelThreshold;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ViewerError};
use crate::overlay::Circle;
use crate::raster::RasterImage;

/// An image-to-image filter.
pub trait ImageFilter: Send + Sync {
    /// Name used in history descriptions.
    fn name(&self) -> String;

    /// Produce a new image from `input`.
    fn apply(&self, input: &RasterImage) -> Result<RasterImage>;
}

/// Result of labeling connected components.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledComponents {
    /// Image with each component drawn in its own color
    pub image: RasterImage,
    /// Component centroids in image pixels, background excluded
    pub centers: Vec<(f64, f64)>,
    /// Component areas in pixels, parallel to `centers`
    pub areas: Vec<u32>,
}

impl LabeledComponents {
    pub fn len(&self) -> usize {
        self.centers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }
}

/// Labels foreground regions of an image.
pub trait ComponentLabeler: Send + Sync {
    fn label(&self, input: &RasterImage) -> Result<LabeledComponents>;
}

/// Hough circle transform parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoughParams {
    /// Inverse accumulator resolution ratio
    pub dp: f64,
    /// Minimum distance between detected centers
    pub min_dist: f64,
    /// Upper edge-detector threshold
    pub param1: f64,
    /// Accumulator threshold
    pub param2: f64,
    /// Smallest radius searched
    pub min_radius: u32,
    /// Largest radius searched; 0 means unbounded
    pub max_radius: u32,
}

impl Default for HoughParams {
    fn default() -> Self {
        Self {
            dp: 1.0,
            min_dist: 20.0,
            param1: 100.0,
            param2: 30.0,
            min_radius: 0,
            max_radius: 0,
        }
    }
}

impl HoughParams {
    /// Reject parameters no detector can work with.
    pub fn validate(&self) -> Result<()> {
        if self.dp.is_nan() || self.dp <= 0.0 {
            return Err(ViewerError::invalid_params(format!(
                "dp must be positive, got {}",
                self.dp
            )));
        }
        if self.min_dist.is_nan() || self.min_dist <= 0.0 {
            return Err(ViewerError::invalid_params(format!(
                "min_dist must be positive, got {}",
                self.min_dist
            )));
        }
        if self.max_radius != 0 && self.max_radius < self.min_radius {
            return Err(ViewerError::invalid_params(format!(
                "max_radius {} is below min_radius {}",
                self.max_radius, self.min_radius
            )));
        }
        Ok(())
    }
}

/// Finds circles in an image.
pub trait CircleDetector: Send + Sync {
    fn detect(&self, input: &RasterImage, params: &HoughParams) -> Result<Vec<Circle>>;
}
