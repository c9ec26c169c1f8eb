//! Computed-annotation overlays drawn on top of the image.
//!
//! At most one computed layer is held at a time (component markers or detected
//! circles). The layer lives in image space; `OverlayModel::render` maps it to
//! screen-space primitives for a draw surface. The drag preview is separate
//! and handled by the controller.

use serde::{Deserialize, Serialize};

use crate::constants::{MARKER_LABEL_OFFSET, MARKER_RADIUS};
use crate::error::{Result, ViewerError};
use crate::surface::{Color, Stroke};
use crate::viewport::{ImagePoint, ScreenPoint, ViewportTransform};

/// A detected circle in image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub cx: f64,
    pub cy: f64,
    pub radius: f64,
}

impl Circle {
    pub fn new(cx: f64, cy: f64, radius: f64) -> Self {
        Self { cx, cy, radius }
    }
}

/// The kinds of computed overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayKind {
    ComponentMarkers,
    Circles,
}

impl OverlayKind {
    fn bit(self) -> u8 {
        match self {
            OverlayKind::ComponentMarkers => OverlayKinds::COMPONENT_MARKERS.0,
            OverlayKind::Circles => OverlayKinds::CIRCLES.0,
        }
    }
}

/// Bitmask of overlay kinds that are enabled for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct OverlayKinds(u8);

impl OverlayKinds {
    pub const NONE: OverlayKinds = OverlayKinds(0);
    pub const COMPONENT_MARKERS: OverlayKinds = OverlayKinds(1);
    pub const CIRCLES: OverlayKinds = OverlayKinds(1 << 1);
    pub const ALL: OverlayKinds = OverlayKinds(0b11);

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, kind: OverlayKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn with(self, kind: OverlayKind) -> OverlayKinds {
        OverlayKinds(self.0 | kind.bit())
    }

    pub fn without(self, kind: OverlayKind) -> OverlayKinds {
        OverlayKinds(self.0 & !kind.bit())
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// A computed annotation layer.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum OverlayLayer {
    /// No computed overlay.
    #[default]
    None,
    /// Connected-component centroids with their pixel areas.
    /// Both vectors have the same length.
    ComponentMarkers {
        centers: Vec<(f64, f64)>,
        areas: Vec<u32>,
    },
    /// Detected circles.
    Circles(Vec<Circle>),
}

impl OverlayLayer {
    /// The kind of this layer, `None` for an empty layer.
    pub fn kind(&self) -> Option<OverlayKind> {
        match self {
            OverlayLayer::None => None,
            OverlayLayer::ComponentMarkers { .. } => Some(OverlayKind::ComponentMarkers),
            OverlayLayer::Circles(_) => Some(OverlayKind::Circles),
        }
    }

    /// Number of drawable items.
    pub fn len(&self) -> usize {
        match self {
            OverlayLayer::None => 0,
            OverlayLayer::ComponentMarkers { centers, .. } => centers.len(),
            OverlayLayer::Circles(circles) => circles.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Colors and sizes used when rendering overlays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayStyle {
    /// Stroke for component marker dots and their labels
    pub markers: Stroke,
    /// Stroke for detected circles
    pub circles: Stroke,
    /// Screen-space radius of a marker dot
    pub marker_radius: f64,
    /// Screen-space offset of a marker label from its dot
    pub label_offset: (f64, f64),
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            markers: Stroke::new(Color::YELLOW, 2.0),
            circles: Stroke::new(Color::GREEN, 2.0),
            marker_radius: MARKER_RADIUS,
            label_offset: MARKER_LABEL_OFFSET,
        }
    }
}

/// A screen-space item ready to be drawn.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayPrimitive {
    /// A component centroid dot with its label.
    Marker {
        center: ScreenPoint,
        radius: f64,
        label: String,
        label_anchor: ScreenPoint,
        stroke: Stroke,
    },
    /// A detected circle.
    Circle {
        center: ScreenPoint,
        radius: f64,
        stroke: Stroke,
    },
}

/// Holds the current computed overlay and its visibility.
#[derive(Debug, Clone)]
pub struct OverlayModel {
    layer: OverlayLayer,
    visible: OverlayKinds,
    /// Set on every mutation; read with `take_redraw`.
    dirty: bool,
}

impl Default for OverlayModel {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlayModel {
    pub fn new() -> Self {
        Self {
            layer: OverlayLayer::None,
            visible: OverlayKinds::ALL,
            dirty: true,
        }
    }

    pub fn layer(&self) -> &OverlayLayer {
        &self.layer
    }

    pub fn visible(&self) -> OverlayKinds {
        self.visible
    }

    /// Whether the held layer is non-empty and enabled.
    pub fn is_shown(&self) -> bool {
        self.layer
            .kind()
            .is_some_and(|kind| self.visible.contains(kind))
    }

    /// Replace the layer with component markers. Fails without changing
    /// anything if the lengths differ.
    pub fn set_component_markers(&mut self, centers: Vec<(f64, f64)>, areas: Vec<u32>) -> Result<()> {
        if centers.len() != areas.len() {
            return Err(ViewerError::MarkerMismatch {
                centers: centers.len(),
                areas: areas.len(),
            });
        }
        log::debug!("Overlay: {} component markers", centers.len());
        self.layer = OverlayLayer::ComponentMarkers { centers, areas };
        self.visible = self.visible.with(OverlayKind::ComponentMarkers);
        self.mark_dirty();
        Ok(())
    }

    /// Replace the layer with detected circles.
    pub fn set_circles(&mut self, circles: Vec<Circle>) {
        log::debug!("Overlay: {} circles", circles.len());
        self.layer = OverlayLayer::Circles(circles);
        self.visible = self.visible.with(OverlayKind::Circles);
        self.mark_dirty();
    }

    /// Drop the computed layer.
    pub fn clear(&mut self) {
        if self.layer != OverlayLayer::None {
            log::debug!("Overlay cleared");
        }
        self.layer = OverlayLayer::None;
        self.mark_dirty();
    }

    /// Stop drawing layers of `kind` without discarding them.
    pub fn hide(&mut self, kind: OverlayKind) {
        self.visible = self.visible.without(kind);
        self.mark_dirty();
    }

    /// Draw layers of `kind` again.
    pub fn show(&mut self, kind: OverlayKind) {
        self.visible = self.visible.with(kind);
        self.mark_dirty();
    }

    /// Replace the whole state, e.g. when navigating history.
    pub fn restore(&mut self, layer: OverlayLayer, visible: OverlayKinds) {
        self.layer = layer;
        self.visible = visible;
        self.mark_dirty();
    }

    #[inline]
    fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Whether a redraw was requested since the last call, clearing the flag.
    #[inline]
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Map the visible layer to screen-space primitives.
    pub fn render(&self, transform: &ViewportTransform, style: &OverlayStyle) -> Vec<OverlayPrimitive> {
        if !self.is_shown() {
            return Vec::new();
        }

        match &self.layer {
            OverlayLayer::None => Vec::new(),
            OverlayLayer::ComponentMarkers { centers, areas } => centers
                .iter()
                .zip(areas)
                .map(|(&(x, y), area)| {
                    let center = transform.image_to_screen(ImagePoint::new(x, y));
                    OverlayPrimitive::Marker {
                        center,
                        radius: style.marker_radius,
                        label: format!("{} ({}, {})", area, x.round() as i64, y.round() as i64),
                        label_anchor: ScreenPoint::new(
                            center.x + style.label_offset.0,
                            center.y + style.label_offset.1,
                        ),
                        stroke: style.markers,
                    }
                })
                .collect(),
            OverlayLayer::Circles(circles) => circles
                .iter()
                .map(|c| OverlayPrimitive::Circle {
                    center: transform.image_to_screen(ImagePoint::new(c.cx, c.cy)),
                    radius: transform.length_to_screen(c.radius),
                    stroke: style.circles,
                })
                .collect(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
