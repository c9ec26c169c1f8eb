//! Pointer-event interpretation, readouts and scene rendering.
//!
//! `ViewportController` owns every piece of viewer state: the transform, the
//! active tool and its drag, the pan drag, the overlay model and the history.
//! Processing actions live in [`crate::actions`].

use std::sync::Arc;

use crate::config::ViewerConfig;
use crate::error::{Result, ViewerError};
use crate::history::HistoryStack;
use crate::overlay::{OverlayKind, OverlayLayer, OverlayModel, OverlayPrimitive};
use crate::raster::{Mask, RasterImage};
use crate::surface::DrawSurface;
use crate::tool::{Measurement, PreviewShape, ToolDrag, ToolGeometry, ToolKind};
use crate::viewport::{ScreenPoint, ViewportTransform};

/// Pointer buttons the viewer reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    /// Draws with the active tool
    Left,
    /// Pans the view
    Right,
}

/// Snapshot of whichever drag is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DragState {
    pub active: bool,
    pub button: Option<PointerButton>,
    pub start: Option<ScreenPoint>,
    pub end: Option<ScreenPoint>,
}

/// Right-button pan in progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PanDrag {
    start: ScreenPoint,
    last: ScreenPoint,
}

/// Text shown next to the viewport for the pointer position.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Readouts {
    /// `X: x - Y: y` in image pixels, absent outside the image
    pub position: Option<String>,
    /// Value of the pixel under the pointer, absent outside the image
    pub pixel: Option<String>,
    /// Size of the shape being drawn
    pub measurement: Option<Measurement>,
}

/// Owns the viewer state and interprets pointer input.
#[derive(Debug, Clone)]
pub struct ViewportController {
    pub(crate) config: ViewerConfig,
    pub(crate) transform: ViewportTransform,
    pub(crate) tool: ToolGeometry,
    pub(crate) pan_drag: Option<PanDrag>,
    pub(crate) overlay: OverlayModel,
    pub(crate) history: HistoryStack,
    /// The image as loaded, before any processing
    pub(crate) original: Option<Arc<RasterImage>>,
    /// Mask re-applied to subsequent filter output
    pub(crate) active_mask: Option<Arc<Mask>>,
    pointer: Option<ScreenPoint>,
    /// View changes not tracked by the overlay model
    pub(crate) view_dirty: bool,
}

impl Default for ViewportController {
    fn default() -> Self {
        Self::new(ViewerConfig::default())
    }
}

impl ViewportController {
    pub fn new(config: ViewerConfig) -> Self {
        let transform = ViewportTransform::with_limits(1.0, 0.0, 0.0, config.zoom_limits());
        let history = HistoryStack::with_config(config.history_config());
        let tool = ToolGeometry::new(config.default_tool);
        Self {
            config,
            transform,
            tool,
            pan_drag: None,
            overlay: OverlayModel::new(),
            history,
            original: None,
            active_mask: None,
            pointer: None,
            view_dirty: true,
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn transform(&self) -> &ViewportTransform {
        &self.transform
    }

    pub fn tool(&self) -> &ToolGeometry {
        &self.tool
    }

    pub fn overlay(&self) -> &OverlayModel {
        &self.overlay
    }

    pub fn history(&self) -> &HistoryStack {
        &self.history
    }

    /// Mask applied by the last `apply_mask`, if any.
    pub fn active_mask(&self) -> Option<&Mask> {
        self.active_mask.as_deref()
    }

    // ------------------------------------------------------------------------
    // Pointer input
    // ------------------------------------------------------------------------

    /// Left starts a tool drag, right starts panning.
    pub fn pointer_down(&mut self, pos: ScreenPoint, button: PointerButton) {
        self.pointer = Some(pos);
        match button {
            PointerButton::Left => self.tool.begin(pos),
            PointerButton::Right => {
                self.pan_drag = Some(PanDrag {
                    start: pos,
                    last: pos,
                });
                log::trace!("Pan started at ({:.1}, {:.1})", pos.x, pos.y);
            }
        }
        self.view_dirty = true;
    }

    /// Pan or extend the current drag, then recompute the readouts.
    pub fn pointer_move(&mut self, pos: ScreenPoint) -> Readouts {
        if let Some(drag) = &mut self.pan_drag {
            let dx = pos.x - drag.last.x;
            let dy = pos.y - drag.last.y;
            drag.last = pos;
            self.transform.pan(dx, dy);
            self.view_dirty = true;
        }
        if self.tool.drag().is_dragging() {
            self.tool.update(pos);
            self.view_dirty = true;
        }
        self.pointer = Some(pos);
        self.readouts()
    }

    /// End the drag started with `button`.
    pub fn pointer_up(&mut self, button: PointerButton) {
        match button {
            PointerButton::Left => self.tool.finish(),
            PointerButton::Right => {
                if let Some(drag) = self.pan_drag.take() {
                    log::trace!(
                        "Pan ended, moved ({:.1}, {:.1})",
                        drag.last.x - drag.start.x,
                        drag.last.y - drag.start.y
                    );
                }
            }
        }
        self.view_dirty = true;
    }

    /// Zoom by a wheel rotation anchored at `pos`.
    pub fn wheel(&mut self, pos: ScreenPoint, angle_delta: f64) {
        self.transform
            .zoom_by_wheel(pos, angle_delta, self.config.zoom.wheel_divisor);
        log::trace!("Zoom {:.3}x at ({:.1}, {:.1})", self.transform.scale(), pos.x, pos.y);
        self.view_dirty = true;
    }

    /// Select a tool, cancelling any drag in progress.
    pub fn set_tool(&mut self, kind: ToolKind) {
        self.tool.set_kind(kind);
        self.view_dirty = true;
    }

    /// Abandon both the tool drag and the pan drag, as switching tools does.
    pub fn cancel_drag(&mut self) {
        self.tool.abort();
        self.pan_drag = None;
        self.view_dirty = true;
    }

    /// Back to scale 1 with no pan.
    pub fn reset_view(&mut self) {
        self.transform.reset();
        self.view_dirty = true;
    }

    /// The drag in progress, pan first.
    pub fn drag_state(&self) -> DragState {
        if let Some(drag) = self.pan_drag {
            return DragState {
                active: true,
                button: Some(PointerButton::Right),
                start: Some(drag.start),
                end: Some(drag.last),
            };
        }
        match self.tool.drag() {
            ToolDrag::Dragging { start, end } => DragState {
                active: true,
                button: Some(PointerButton::Left),
                start: Some(start),
                end,
            },
            _ => DragState::default(),
        }
    }

    pub fn hide_overlay(&mut self, kind: OverlayKind) {
        self.overlay.hide(kind);
    }

    pub fn show_overlay(&mut self, kind: OverlayKind) {
        self.overlay.show(kind);
    }

    // ------------------------------------------------------------------------
    // Readouts
    // ------------------------------------------------------------------------

    /// Readouts for the last known pointer position.
    pub fn readouts(&self) -> Readouts {
        let mut readouts = Readouts {
            measurement: self.tool.measurement(&self.transform),
            ..Default::default()
        };

        let (Some(pointer), Ok(image)) = (self.pointer, self.current_image()) else {
            return readouts;
        };
        let point = self.transform.screen_to_image(pointer);
        if let Some((x, y)) = point.pixel_in(image.width(), image.height()) {
            readouts.position = Some(format!("X: {} - Y: {}", x, y));
            readouts.pixel = image.pixel_value(x, y).map(|v| v.to_string());
        }
        readouts
    }

    // ------------------------------------------------------------------------
    // State access
    // ------------------------------------------------------------------------

    /// Image of the current history entry.
    pub fn current_image(&self) -> Result<&Arc<RasterImage>> {
        Ok(self.history.current()?.image())
    }

    /// Overlay layer being displayed.
    pub fn current_overlay(&self) -> &OverlayLayer {
        self.overlay.layer()
    }

    /// Rasterize the active tool's shape at the current image's size.
    pub fn mask_from_active_tool(&self) -> Result<Mask> {
        let image = self.current_image()?;
        self.tool
            .mask(&self.transform, image.width(), image.height())
    }

    /// Step back in history, restoring that entry's overlay and mask.
    pub fn undo(&mut self) -> bool {
        let moved = self.history.undo();
        if moved {
            self.restore_from_history();
        }
        moved
    }

    /// Step forward in history, restoring that entry's overlay and mask.
    pub fn redo(&mut self) -> bool {
        let moved = self.history.redo();
        if moved {
            self.restore_from_history();
        }
        moved
    }

    fn restore_from_history(&mut self) {
        if let Ok(entry) = self.history.current() {
            log::debug!("Showing '{}'", entry.action().description());
            let layer = entry.overlay().clone();
            let visible = entry.overlay_mask();
            self.overlay.restore(layer, visible);
            self.active_mask = entry.mask().cloned();
        }
    }

    /// Whether anything changed since the last call, clearing the request.
    pub fn take_redraw(&mut self) -> bool {
        let overlay = self.overlay.take_redraw();
        std::mem::take(&mut self.view_dirty) || overlay
    }

    // ------------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------------

    /// Draw background, image, drag preview and overlay, in that order.
    pub fn render(&self, surface: &mut dyn DrawSurface) {
        let style = &self.config.style;
        surface.fill(style.background);

        if let Ok(image) = self.current_image() {
            let (pan_x, pan_y) = self.transform.pan_offset();
            surface.draw_image(image, ScreenPoint::new(pan_x, pan_y), self.transform.scale());
        }

        if let Some(shape) = self.tool.preview() {
            match shape {
                PreviewShape::Line { from, to } => surface.stroke_line(from, to, style.preview),
                PreviewShape::Rect { corner_a, corner_b } => {
                    surface.stroke_rect(corner_a, corner_b, style.preview)
                }
                PreviewShape::Circle { center, radius } => {
                    surface.stroke_circle(center, radius, style.preview)
                }
            }
        }

        for primitive in self.overlay.render(&self.transform, &style.overlay) {
            match primitive {
                OverlayPrimitive::Marker {
                    center,
                    radius,
                    label,
                    label_anchor,
                    stroke,
                } => {
                    surface.stroke_circle(center, radius, stroke);
                    surface.draw_text(label_anchor, &label, stroke.color);
                }
                OverlayPrimitive::Circle {
                    center,
                    radius,
                    stroke,
                } => surface.stroke_circle(center, radius, stroke),
            }
        }
    }

    /// Fails with `EmptyHistory` until an image is loaded.
    pub(crate) fn require_loaded(&self) -> Result<Arc<RasterImage>> {
        match &self.original {
            Some(original) if !self.history.is_empty() => Ok(Arc::clone(original)),
            _ => Err(ViewerError::EmptyHistory),
        }
    }
}
