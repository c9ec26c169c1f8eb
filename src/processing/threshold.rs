//! Binary threshold on the brightest channel of each pixel.

use image::{GrayImage, Luma};

use super::ImageFilter;
use crate::constants::{MASK_OFF, MASK_ON};
use crate::error::Result;
use crate::raster::RasterImage;

/// Pixels whose largest channel exceeds `level` become 255, the rest 0.
/// Output is always single-channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxChannelThreshold {
    pub level: u8,
}

impl MaxChannelThreshold {
    pub fn new(level: u8) -> Self {
        Self { level }
    }
}

impl Default for MaxChannelThreshold {
    fn default() -> Self {
        Self::new(128)
    }
}

impl ImageFilter for MaxChannelThreshold {
    fn name(&self) -> String {
        format!("threshold {}", self.level)
    }

    fn apply(&self, input: &RasterImage) -> Result<RasterImage> {
        let binarize = |value: u8| {
            if value > self.level {
                Luma([MASK_ON])
            } else {
                Luma([MASK_OFF])
            }
        };

        let output = match input {
            RasterImage::Gray(gray) => {
                GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
                    binarize(gray.get_pixel(x, y)[0])
                })
            }
            RasterImage::Rgb(rgb) => GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
                let [r, g, b] = rgb.get_pixel(x, y).0;
                binarize(r.max(g).max(b))
            }),
        };

        log::trace!(
            "Thresholded {}x{} image at {}",
            output.width(),
            output.height(),
            self.level
        );
        Ok(RasterImage::Gray(output))
    }
}
