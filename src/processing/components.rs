//! Otsu binarization followed by connected-component labeling.

use std::collections::BTreeMap;

use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::contrast::otsu_level;
use imageproc::region_labelling::{Connectivity, connected_components};

use super::{ComponentLabeler, LabeledComponents};
use crate::constants::{MASK_OFF, MASK_ON};
use crate::error::Result;
use crate::raster::RasterImage;

/// Hue step between consecutive labels, in degrees.
const GOLDEN_ANGLE: f32 = 137.5;

/// Convert HSV to RGB.
///
/// `h` is in degrees (0-360), `s` and `v` in 0.0-1.0. Output channels are in
/// 0.0-1.0.
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (f32, f32, f32) {
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = if h < 60.0 {
        (c, x, 0.0)
    } else if h < 120.0 {
        (x, c, 0.0)
    } else if h < 180.0 {
        (0.0, c, x)
    } else if h < 240.0 {
        (0.0, x, c)
    } else if h < 300.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    (r + m, g + m, b + m)
}

/// Distinct display color for the `index`-th component.
fn component_color(index: usize) -> Rgb<u8> {
    let hue = (index as f32 * GOLDEN_ANGLE) % 360.0;
    let (r, g, b) = hsv_to_rgb(hue, 0.7, 0.9);
    let to_u8 = |c: f32| (c * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgb([to_u8(r), to_u8(g), to_u8(b)])
}

/// Running totals for one label.
#[derive(Default)]
struct Accumulator {
    area: u32,
    sum_x: f64,
    sum_y: f64,
}

/// Binarizes with Otsu's level, labels the foreground and reports each
/// component's centroid and area. Color input is converted to luma first.
#[derive(Debug, Clone, Copy)]
pub struct OtsuComponentLabeler {
    connectivity: Connectivity,
}

impl OtsuComponentLabeler {
    pub fn new(connectivity: Connectivity) -> Self {
        Self { connectivity }
    }
}

impl Default for OtsuComponentLabeler {
    fn default() -> Self {
        Self::new(Connectivity::Eight)
    }
}

impl ComponentLabeler for OtsuComponentLabeler {
    fn label(&self, input: &RasterImage) -> Result<LabeledComponents> {
        let gray = match input {
            RasterImage::Gray(gray) => gray.clone(),
            RasterImage::Rgb(_) => input.to_dynamic().to_luma8(),
        };

        let level = otsu_level(&gray);
        let binary = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
            if gray.get_pixel(x, y)[0] > level {
                Luma([MASK_ON])
            } else {
                Luma([MASK_OFF])
            }
        });

        let labels = connected_components(&binary, self.connectivity, Luma([MASK_OFF]));

        let mut totals: BTreeMap<u32, Accumulator> = BTreeMap::new();
        for (x, y, label) in labels.enumerate_pixels() {
            let label = label[0];
            if label == 0 {
                continue;
            }
            let acc = totals.entry(label).or_default();
            acc.area += 1;
            acc.sum_x += f64::from(x);
            acc.sum_y += f64::from(y);
        }

        let colors: BTreeMap<u32, Rgb<u8>> = totals
            .keys()
            .enumerate()
            .map(|(index, &label)| (label, component_color(index)))
            .collect();
        let image = RgbImage::from_fn(labels.width(), labels.height(), |x, y| {
            colors
                .get(&labels.get_pixel(x, y)[0])
                .copied()
                .unwrap_or(Rgb([0, 0, 0]))
        });

        let (centers, areas): (Vec<(f64, f64)>, Vec<u32>) = totals
            .values()
            .map(|acc| {
                let area = f64::from(acc.area);
                ((acc.sum_x / area, acc.sum_y / area), acc.area)
            })
            .unzip();

        log::info!(
            "Labeled {} components (otsu level {})",
            totals.len(),
            level
        );

        Ok(LabeledComponents {
            image: RasterImage::Rgb(image),
            centers,
            areas,
        })
    }
}
