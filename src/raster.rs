//! Raster snapshots and single-channel masks.
//!
//! `RasterImage` is what history entries hold and what collaborators consume
//! and produce. `Mask` is a `{0, 255}` bitmap in image pixel coordinates,
//! stored row-major as an `ndarray::Array2<u8>` indexed `[y, x]`.

use std::fmt;

use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use ndarray::Array2;

use crate::constants::{MASK_OFF, MASK_ON};
use crate::error::{Result, ViewerError};

/// A decoded image, either single-channel or RGB.
#[derive(Debug, Clone, PartialEq)]
pub enum RasterImage {
    Gray(GrayImage),
    Rgb(RgbImage),
}

impl RasterImage {
    /// All-black RGB image of the given size.
    pub fn blank(width: u32, height: u32) -> Self {
        RasterImage::Rgb(RgbImage::new(width, height))
    }

    /// Convert a decoded image. 8-bit grayscale stays single-channel,
    /// everything else becomes RGB.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        match image {
            DynamicImage::ImageLuma8(gray) => RasterImage::Gray(gray),
            other => RasterImage::Rgb(other.to_rgb8()),
        }
    }

    pub fn to_dynamic(&self) -> DynamicImage {
        match self {
            RasterImage::Gray(gray) => DynamicImage::ImageLuma8(gray.clone()),
            RasterImage::Rgb(rgb) => DynamicImage::ImageRgb8(rgb.clone()),
        }
    }

    /// RGB view of the image, expanding grayscale.
    pub fn to_rgb8(&self) -> RgbImage {
        match self {
            RasterImage::Gray(gray) => DynamicImage::ImageLuma8(gray.clone()).to_rgb8(),
            RasterImage::Rgb(rgb) => rgb.clone(),
        }
    }

    pub fn width(&self) -> u32 {
        match self {
            RasterImage::Gray(gray) => gray.width(),
            RasterImage::Rgb(rgb) => rgb.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            RasterImage::Gray(gray) => gray.height(),
            RasterImage::Rgb(rgb) => rgb.height(),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    pub fn is_grayscale(&self) -> bool {
        matches!(self, RasterImage::Gray(_))
    }

    /// Pixel value at `(x, y)`, or `None` outside the image.
    pub fn pixel_value(&self, x: u32, y: u32) -> Option<PixelValue> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        Some(match self {
            RasterImage::Gray(gray) => PixelValue::Gray(gray.get_pixel(x, y)[0]),
            RasterImage::Rgb(rgb) => PixelValue::Rgb(rgb.get_pixel(x, y).0),
        })
    }

    /// Copy of the image with every pixel outside `mask` set to zero.
    pub fn masked(&self, mask: &Mask) -> Result<RasterImage> {
        if mask.dimensions() != self.dimensions() {
            return Err(ViewerError::MaskSizeMismatch {
                mask_width: mask.width(),
                mask_height: mask.height(),
                image_width: self.width(),
                image_height: self.height(),
            });
        }

        Ok(match self {
            RasterImage::Gray(gray) => RasterImage::Gray(GrayImage::from_fn(
                gray.width(),
                gray.height(),
                |x, y| {
                    if mask.is_set(x, y) {
                        *gray.get_pixel(x, y)
                    } else {
                        Luma([0])
                    }
                },
            )),
            RasterImage::Rgb(rgb) => RasterImage::Rgb(RgbImage::from_fn(
                rgb.width(),
                rgb.height(),
                |x, y| {
                    if mask.is_set(x, y) {
                        *rgb.get_pixel(x, y)
                    } else {
                        Rgb([0, 0, 0])
                    }
                },
            )),
        })
    }
}

/// The value of a single pixel, for readouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelValue {
    Gray(u8),
    Rgb([u8; 3]),
}

impl fmt::Display for PixelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PixelValue::Gray(v) => write!(f, "{}", v),
            PixelValue::Rgb([r, g, b]) => write!(f, "R: {} - G: {} - B: {}", r, g, b),
        }
    }
}

/// Binary region mask in image pixel coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    data: Array2<u8>,
}

impl Mask {
    /// All-zero mask covering a `width` x `height` image.
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            data: Array2::from_elem((height as usize, width as usize), MASK_OFF),
        }
    }

    pub fn width(&self) -> u32 {
        self.data.ncols() as u32
    }

    pub fn height(&self) -> u32 {
        self.data.nrows() as u32
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    /// Raw value at `(x, y)`; zero outside the mask.
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.data
            .get((y as usize, x as usize))
            .copied()
            .unwrap_or(MASK_OFF)
    }

    pub fn is_set(&self, x: u32, y: u32) -> bool {
        self.get(x, y) != MASK_OFF
    }

    /// Number of pixels inside the region.
    pub fn count_set(&self) -> usize {
        self.data.iter().filter(|&&v| v != MASK_OFF).count()
    }

    /// True when no pixel is set.
    pub fn is_blank(&self) -> bool {
        self.data.iter().all(|&v| v == MASK_OFF)
    }

    /// Underlying `[row, column]` array.
    pub fn as_array(&self) -> &Array2<u8> {
        &self.data
    }

    /// Set every pixel with `x0 <= x < x1` and `y0 <= y < y1`, clipped to the
    /// mask. Corners may be given in any order.
    pub fn fill_rect(&mut self, x0: i64, y0: i64, x1: i64, y1: i64) {
        let (left, right) = (x0.min(x1), x0.max(x1));
        let (top, bottom) = (y0.min(y1), y0.max(y1));
        let Some((cols, rows)) = self.clip(left, right, top, bottom) else {
            return;
        };
        for y in rows {
            for x in cols.clone() {
                self.data[[y, x]] = MASK_ON;
            }
        }
    }

    /// Set every pixel within `radius` of `(cx, cy)`, clipped to the mask.
    /// A zero radius sets nothing.
    pub fn fill_disc(&mut self, cx: i64, cy: i64, radius: i64) {
        if radius <= 0 {
            return;
        }
        let Some((cols, rows)) =
            self.clip(cx - radius, cx + radius + 1, cy - radius, cy + radius + 1)
        else {
            return;
        };
        let r2 = radius * radius;
        for y in rows {
            let dy = y as i64 - cy;
            for x in cols.clone() {
                let dx = x as i64 - cx;
                if dx * dx + dy * dy <= r2 {
                    self.data[[y, x]] = MASK_ON;
                }
            }
        }
    }

    /// Half-open column and row ranges of the rectangle that intersect the mask.
    fn clip(
        &self,
        left: i64,
        right: i64,
        top: i64,
        bottom: i64,
    ) -> Option<(std::ops::Range<usize>, std::ops::Range<usize>)> {
        let width = i64::from(self.width());
        let height = i64::from(self.height());
        let (x0, x1) = (left.clamp(0, width), right.clamp(0, width));
        let (y0, y1) = (top.clamp(0, height), bottom.clamp(0, height));
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some((x0 as usize..x1 as usize, y0 as usize..y1 as usize))
    }

    /// Grayscale image of the mask, for saving or handing to `image`-based code.
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width(), self.height(), |x, y| Luma([self.get(x, y)]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_dynamic_keeps_gray() {
        let gray = DynamicImage::ImageLuma8(GrayImage::new(4, 3));
        assert!(RasterImage::from_dynamic(gray).is_grayscale());

        let rgba = DynamicImage::ImageRgba8(image::RgbaImage::new(4, 3));
        let converted = RasterImage::from_dynamic(rgba);
        assert!(!converted.is_grayscale());
        assert_eq!(converted.dimensions(), (4, 3));
    }

    #[test]
    fn test_pixel_value_display() {
        let mut rgb = RgbImage::new(2, 2);
        rgb.put_pixel(1, 0, Rgb([10, 20, 30]));
        let image = RasterImage::Rgb(rgb);
        let value = image.pixel_value(1, 0).expect("in bounds");
        assert_eq!(value.to_string(), "R: 10 - G: 20 - B: 30");
        assert_eq!(image.pixel_value(2, 0), None);

        let gray = RasterImage::Gray(GrayImage::from_pixel(2, 2, Luma([77])));
        assert_eq!(gray.pixel_value(0, 1).map(|v| v.to_string()), Some("77".into()));
    }

    #[test]
    fn test_fill_rect_half_open_and_clipped() {
        let mut mask = Mask::empty(10, 10);
        mask.fill_rect(8, 8, 2, 2);
        assert_eq!(mask.count_set(), 36);
        assert!(mask.is_set(2, 2));
        assert!(mask.is_set(7, 7));
        assert!(!mask.is_set(8, 8));

        let mut clipped = Mask::empty(10, 10);
        clipped.fill_rect(-5, -5, 3, 20);
        assert_eq!(clipped.count_set(), 30);
    }

    #[test]
    fn test_fill_rect_zero_extent() {
        let mut mask = Mask::empty(10, 10);
        mask.fill_rect(4, 4, 4, 4);
        mask.fill_rect(1, 1, 1, 9);
        assert!(mask.is_blank());
    }

    #[test]
    fn test_fill_disc() {
        let mut mask = Mask::empty(21, 21);
        mask.fill_disc(10, 10, 3);
        // Lattice points with x^2 + y^2 <= 9
        assert_eq!(mask.count_set(), 29);
        assert!(mask.is_set(10, 7));
        assert!(!mask.is_set(13, 12));

        let mut none = Mask::empty(5, 5);
        none.fill_disc(2, 2, 0);
        assert!(none.is_blank());
    }

    #[test]
    fn test_masked_zeroes_outside() {
        let image = RasterImage::Gray(GrayImage::from_pixel(4, 4, Luma([200])));
        let mut mask = Mask::empty(4, 4);
        mask.fill_rect(0, 0, 2, 4);
        let RasterImage::Gray(out) = image.masked(&mask).expect("same size") else {
            panic!("Expected grayscale output");
        };
        assert_eq!(out.get_pixel(1, 3)[0], 200);
        assert_eq!(out.get_pixel(2, 0)[0], 0);
    }

    #[test]
    fn test_masked_size_mismatch() {
        let image = RasterImage::blank(4, 4);
        let mask = Mask::empty(3, 4);
        assert!(matches!(
            image.masked(&mask),
            Err(ViewerError::MaskSizeMismatch { mask_width: 3, .. })
        ));
    }

    #[test]
    fn test_mask_to_gray_image() {
        let mut mask = Mask::empty(3, 2);
        mask.fill_rect(1, 1, 2, 2);
        let gray = mask.to_gray_image();
        assert_eq!(gray.dimensions(), (3, 2));
        assert_eq!(gray.get_pixel(1, 1)[0], 255);
        assert_eq!(gray.get_pixel(0, 0)[0], 0);
    }
}
