//! Draw surfaces the controller renders a scene into.
//!
//! The core never draws pixels itself: it issues calls on a `DrawSurface`.
//! Two implementations are provided:
//! - `DisplayList` records the calls, for UI shells that replay them and for tests
//! - `ImageSurface` rasterizes into an `RgbImage` with `imageproc`

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};

use crate::raster::RasterImage;
use crate::viewport::ScreenPoint;

/// An opaque RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    /// Viewport background
    pub const LIGHT_GRAY: Color = Color::rgb(200, 200, 200);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    fn to_pixel(self) -> Rgb<u8> {
        Rgb([self.r, self.g, self.b])
    }
}

/// Outline color and width in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub color: Color,
    pub width: f64,
}

impl Stroke {
    pub fn new(color: Color, width: f64) -> Self {
        Self { color, width }
    }
}

/// Something a scene can be drawn onto.
pub trait DrawSurface {
    /// Fill the whole surface.
    fn fill(&mut self, color: Color);

    /// Draw `image` with its top-left pixel at `top_left`, scaled by `scale`.
    fn draw_image(&mut self, image: &RasterImage, top_left: ScreenPoint, scale: f64);

    fn stroke_line(&mut self, from: ScreenPoint, to: ScreenPoint, stroke: Stroke);

    /// Outline the axis-aligned rectangle spanned by two opposite corners.
    fn stroke_rect(&mut self, corner_a: ScreenPoint, corner_b: ScreenPoint, stroke: Stroke);

    fn stroke_circle(&mut self, center: ScreenPoint, radius: f64, stroke: Stroke);

    fn draw_text(&mut self, anchor: ScreenPoint, text: &str, color: Color);
}

// ============================================================================
// Display List
// ============================================================================

/// A recorded draw call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Fill(Color),
    Image {
        width: u32,
        height: u32,
        top_left: ScreenPoint,
        scale: f64,
    },
    Line {
        from: ScreenPoint,
        to: ScreenPoint,
        stroke: Stroke,
    },
    Rect {
        corner_a: ScreenPoint,
        corner_b: ScreenPoint,
        stroke: Stroke,
    },
    Circle {
        center: ScreenPoint,
        radius: f64,
        stroke: Stroke,
    },
    Text {
        anchor: ScreenPoint,
        text: String,
        color: Color,
    },
}

/// Records draw calls in order.
#[derive(Debug, Clone, Default)]
pub struct DisplayList {
    pub commands: Vec<DrawCommand>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DrawSurface for DisplayList {
    fn fill(&mut self, color: Color) {
        self.commands.push(DrawCommand::Fill(color));
    }

    fn draw_image(&mut self, image: &RasterImage, top_left: ScreenPoint, scale: f64) {
        self.commands.push(DrawCommand::Image {
            width: image.width(),
            height: image.height(),
            top_left,
            scale,
        });
    }

    fn stroke_line(&mut self, from: ScreenPoint, to: ScreenPoint, stroke: Stroke) {
        self.commands.push(DrawCommand::Line { from, to, stroke });
    }

    fn stroke_rect(&mut self, corner_a: ScreenPoint, corner_b: ScreenPoint, stroke: Stroke) {
        self.commands.push(DrawCommand::Rect {
            corner_a,
            corner_b,
            stroke,
        });
    }

    fn stroke_circle(&mut self, center: ScreenPoint, radius: f64, stroke: Stroke) {
        self.commands.push(DrawCommand::Circle {
            center,
            radius,
            stroke,
        });
    }

    fn draw_text(&mut self, anchor: ScreenPoint, text: &str, color: Color) {
        self.commands.push(DrawCommand::Text {
            anchor,
            text: text.to_string(),
            color,
        });
    }
}

// ============================================================================
// Image Surface
// ============================================================================

/// Software surface rendering into an RGB image.
///
/// Text is not rasterized (no font is bundled); skipped labels are counted.
pub struct ImageSurface {
    canvas: RgbImage,
    skipped_text: usize,
}

impl ImageSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            canvas: RgbImage::new(width, height),
            skipped_text: 0,
        }
    }

    pub fn canvas(&self) -> &RgbImage {
        &self.canvas
    }

    pub fn into_image(self) -> RgbImage {
        self.canvas
    }

    /// Number of text labels that were not drawn.
    pub fn skipped_text(&self) -> usize {
        self.skipped_text
    }
}

/// Pixel offsets that spread a stroke of `width` around its center line.
fn stroke_offsets(width: f64) -> std::ops::RangeInclusive<i32> {
    let count = width.round().max(1.0) as i32;
    let low = -(count - 1) / 2;
    low..=low + count - 1
}

impl DrawSurface for ImageSurface {
    fn fill(&mut self, color: Color) {
        let pixel = color.to_pixel();
        for p in self.canvas.pixels_mut() {
            *p = pixel;
        }
    }

    fn draw_image(&mut self, image: &RasterImage, top_left: ScreenPoint, scale: f64) {
        if scale <= 0.0 {
            return;
        }
        let source = image.to_rgb8();
        let (src_w, src_h) = (f64::from(source.width()), f64::from(source.height()));
        let (dst_w, dst_h) = (f64::from(self.canvas.width()), f64::from(self.canvas.height()));

        let x0 = top_left.x.floor().clamp(0.0, dst_w) as u32;
        let y0 = top_left.y.floor().clamp(0.0, dst_h) as u32;
        let x1 = (top_left.x + src_w * scale).ceil().clamp(0.0, dst_w) as u32;
        let y1 = (top_left.y + src_h * scale).ceil().clamp(0.0, dst_h) as u32;

        // Nearest neighbour, sampling at destination pixel centers
        for y in y0..y1 {
            let sy = ((f64::from(y) + 0.5 - top_left.y) / scale).floor();
            if sy < 0.0 || sy >= src_h {
                continue;
            }
            for x in x0..x1 {
                let sx = ((f64::from(x) + 0.5 - top_left.x) / scale).floor();
                if sx < 0.0 || sx >= src_w {
                    continue;
                }
                let pixel = *source.get_pixel(sx as u32, sy as u32);
                self.canvas.put_pixel(x, y, pixel);
            }
        }
    }

    fn stroke_line(&mut self, from: ScreenPoint, to: ScreenPoint, stroke: Stroke) {
        let pixel = stroke.color.to_pixel();
        let horizontal = (to.x - from.x).abs() >= (to.y - from.y).abs();
        for offset in stroke_offsets(stroke.width) {
            let (dx, dy) = if horizontal {
                (0.0, offset as f32)
            } else {
                (offset as f32, 0.0)
            };
            draw_line_segment_mut(
                &mut self.canvas,
                (from.x as f32 + dx, from.y as f32 + dy),
                (to.x as f32 + dx, to.y as f32 + dy),
                pixel,
            );
        }
    }

    fn stroke_rect(&mut self, corner_a: ScreenPoint, corner_b: ScreenPoint, stroke: Stroke) {
        let pixel = stroke.color.to_pixel();
        let left = corner_a.x.min(corner_b.x).round() as i32;
        let top = corner_a.y.min(corner_b.y).round() as i32;
        let right = corner_a.x.max(corner_b.x).round() as i32;
        let bottom = corner_a.y.max(corner_b.y).round() as i32;

        for offset in stroke_offsets(stroke.width) {
            let width = right - left + 1 + 2 * offset;
            let height = bottom - top + 1 + 2 * offset;
            if width <= 0 || height <= 0 {
                continue;
            }
            let rect = Rect::at(left - offset, top - offset).of_size(width as u32, height as u32);
            draw_hollow_rect_mut(&mut self.canvas, rect, pixel);
        }
    }

    fn stroke_circle(&mut self, center: ScreenPoint, radius: f64, stroke: Stroke) {
        let pixel = stroke.color.to_pixel();
        let c = (center.x.round() as i32, center.y.round() as i32);
        let r = radius.round() as i32;
        for offset in stroke_offsets(stroke.width) {
            let ring = r + offset;
            if ring >= 0 {
                draw_hollow_circle_mut(&mut self.canvas, c, ring, pixel);
            }
        }
    }

    fn draw_text(&mut self, anchor: ScreenPoint, text: &str, _color: Color) {
        log::trace!("Skipping text '{}' at ({:.0}, {:.0})", text, anchor.x, anchor.y);
        self.skipped_text += 1;
    }
}
