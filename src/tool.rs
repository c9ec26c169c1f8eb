//! Drag-defined region tools: line, rectangle and circle.
//!
//! This module provides:
//! - The tool kinds and the drag state machine (`Idle -> Dragging -> {Committed, Cancelled}`)
//! - Screen-space preview shapes for live rendering
//! - Measurement labels in image units
//! - Mask rasterization at image resolution

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ViewerError};
use crate::raster::Mask;
use crate::viewport::{ImagePoint, ScreenPoint, ViewportTransform};

// ============================================================================
// Tool Kinds
// ============================================================================

/// How a drag is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    /// Measure a distance. Produces no mask.
    #[default]
    Line,
    /// Axis-aligned rectangle between the drag endpoints.
    Rectangle,
    /// Circle through both endpoints, centered on their midpoint.
    Circle,
}

impl ToolKind {
    /// Get the display name for this tool.
    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::Line => "Line",
            ToolKind::Rectangle => "Rectangle",
            ToolKind::Circle => "Circle",
        }
    }

    /// Whether this tool can be rasterized into a mask.
    pub fn produces_mask(&self) -> bool {
        !matches!(self, ToolKind::Line)
    }
}

// ============================================================================
// Drag State Machine
// ============================================================================

/// Progress of the current tool drag, in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ToolDrag {
    /// Nothing drawn.
    #[default]
    Idle,
    /// Primary button held. `end` stays `None` until the pointer moves.
    Dragging {
        start: ScreenPoint,
        end: Option<ScreenPoint>,
    },
    /// Button released after moving; the shape stays available for masks.
    Committed { start: ScreenPoint, end: ScreenPoint },
    /// Drag abandoned before release.
    Cancelled,
}

impl ToolDrag {
    pub fn is_dragging(&self) -> bool {
        matches!(self, ToolDrag::Dragging { .. })
    }

    /// Both endpoints, when both are defined.
    pub fn endpoints(&self) -> Option<(ScreenPoint, ScreenPoint)> {
        match *self {
            ToolDrag::Dragging {
                start,
                end: Some(end),
            } => Some((start, end)),
            ToolDrag::Committed { start, end } => Some((start, end)),
            _ => None,
        }
    }
}

/// A shape to draw while a drag is in progress, in screen space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PreviewShape {
    Line {
        from: ScreenPoint,
        to: ScreenPoint,
    },
    Rect {
        corner_a: ScreenPoint,
        corner_b: ScreenPoint,
    },
    Circle {
        center: ScreenPoint,
        radius: f64,
    },
}

/// Measurement of the drawn shape in image units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measurement {
    Length(f64),
    Rect {
        width: f64,
        height: f64,
        center: ImagePoint,
    },
    Circle {
        radius: f64,
        center: ImagePoint,
    },
}

fn round_i(v: f64) -> i64 {
    v.round() as i64
}

impl Measurement {
    /// Primary label line (size).
    pub fn primary(&self) -> String {
        match self {
            Measurement::Length(length) => format!("Length: {}", round_i(*length)),
            Measurement::Rect { width, height, .. } => {
                format!("W: {} - H: {}", round_i(*width), round_i(*height))
            }
            Measurement::Circle { radius, .. } => format!("R: {}", round_i(*radius)),
        }
    }

    /// Secondary label line (center), absent for lines.
    pub fn secondary(&self) -> Option<String> {
        match self {
            Measurement::Length(_) => None,
            Measurement::Rect { center, .. } | Measurement::Circle { center, .. } => Some(
                format!("Cx: {} - Cy: {}", round_i(center.x), round_i(center.y)),
            ),
        }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.secondary() {
            Some(secondary) => write!(f, "{} | {}", self.primary(), secondary),
            None => write!(f, "{}", self.primary()),
        }
    }
}

/// The active tool and the state of its drag.
#[derive(Debug, Clone, Default)]
pub struct ToolGeometry {
    kind: ToolKind,
    drag: ToolDrag,
}

impl ToolGeometry {
    pub fn new(kind: ToolKind) -> Self {
        Self {
            kind,
            drag: ToolDrag::Idle,
        }
    }

    pub fn kind(&self) -> ToolKind {
        self.kind
    }

    pub fn drag(&self) -> ToolDrag {
        self.drag
    }

    /// Switch tools. A drag in progress is cancelled and the state returns to
    /// idle; a committed shape is kept and reinterpreted by the new tool.
    pub fn set_kind(&mut self, kind: ToolKind) {
        self.abort();
        if self.kind != kind {
            log::debug!("Tool: {} -> {}", self.kind.name(), kind.name());
            self.kind = kind;
        }
    }

    /// Start a new drag at `start`.
    pub fn begin(&mut self, start: ScreenPoint) {
        self.drag = ToolDrag::Dragging { start, end: None };
        log::trace!("Tool drag started at ({:.1}, {:.1})", start.x, start.y);
    }

    /// Move the free endpoint. Ignored unless dragging.
    pub fn update(&mut self, point: ScreenPoint) {
        if let ToolDrag::Dragging { end, .. } = &mut self.drag {
            *end = Some(point);
        }
    }

    /// Release the drag. A drag that never moved leaves nothing behind.
    pub fn finish(&mut self) {
        self.drag = match self.drag {
            ToolDrag::Dragging {
                start,
                end: Some(end),
            } => ToolDrag::Committed { start, end },
            ToolDrag::Dragging { end: None, .. } => ToolDrag::Idle,
            other => other,
        };
    }

    /// Abandon a drag in progress.
    pub fn cancel(&mut self) {
        if self.drag.is_dragging() {
            log::debug!("{} drag cancelled", self.kind.name());
            self.drag = ToolDrag::Cancelled;
        }
    }

    /// Cancel a drag in progress and return to idle. A committed shape is
    /// left alone.
    pub fn abort(&mut self) {
        if self.drag.is_dragging() {
            self.cancel();
            self.drag = ToolDrag::Idle;
        }
    }

    /// Forget any drawn shape.
    pub fn clear(&mut self) {
        self.drag = ToolDrag::Idle;
    }

    /// Shape to draw for the drag in progress.
    pub fn preview(&self) -> Option<PreviewShape> {
        let ToolDrag::Dragging {
            start,
            end: Some(end),
        } = self.drag
        else {
            return None;
        };

        Some(match self.kind {
            ToolKind::Line => PreviewShape::Line {
                from: start,
                to: end,
            },
            ToolKind::Rectangle => PreviewShape::Rect {
                corner_a: start,
                corner_b: end,
            },
            ToolKind::Circle => PreviewShape::Circle {
                center: start.midpoint(&end),
                radius: start.distance_to(&end) / 2.0,
            },
        })
    }

    /// Both endpoints mapped into image space.
    pub fn image_endpoints(&self, transform: &ViewportTransform) -> Option<(ImagePoint, ImagePoint)> {
        let (start, end) = self.drag.endpoints()?;
        Some((transform.screen_to_image(start), transform.screen_to_image(end)))
    }

    /// Size and position of the drawn shape in image units.
    pub fn measurement(&self, transform: &ViewportTransform) -> Option<Measurement> {
        let (a, b) = self.image_endpoints(transform)?;
        Some(match self.kind {
            ToolKind::Line => Measurement::Length(a.distance_to(&b)),
            ToolKind::Rectangle => Measurement::Rect {
                width: (b.x - a.x).abs(),
                height: (b.y - a.y).abs(),
                center: a.midpoint(&b),
            },
            ToolKind::Circle => Measurement::Circle {
                radius: a.distance_to(&b) / 2.0,
                center: a.midpoint(&b),
            },
        })
    }

    /// Rasterize the drawn shape into a `width` x `height` mask.
    ///
    /// Endpoints are rounded to whole pixels first. A drag whose endpoints
    /// land on the same pixel gives an all-zero mask.
    pub fn mask(&self, transform: &ViewportTransform, width: u32, height: u32) -> Result<Mask> {
        if !self.kind.produces_mask() {
            return Err(ViewerError::no_mask(format!(
                "{} tool has no area",
                self.kind.name()
            )));
        }
        let (a, b) = self
            .image_endpoints(transform)
            .ok_or_else(|| ViewerError::no_mask("no region drawn"))?;

        let mut mask = Mask::empty(width, height);
        let (x1, y1) = a.rounded();
        let (x2, y2) = b.rounded();
        if (x1, y1) == (x2, y2) {
            return Ok(mask);
        }

        match self.kind {
            ToolKind::Rectangle => mask.fill_rect(x1, y1, x2, y2),
            ToolKind::Circle => {
                let (cx, cy) = a.midpoint(&b).rounded();
                let radius = round_i(a.distance_to(&b) / 2.0);
                mask.fill_disc(cx, cy, radius);
            }
            ToolKind::Line => {}
        }
        Ok(mask)
    }
}

// ============================================================================
// Tests
// ============================================================================
