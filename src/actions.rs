//! Processing actions on the viewer session.
//!
//! Each action that produces a new state pushes exactly one history entry on
//! success. A failing action leaves history, overlay and active mask as they
//! were.

use std::path::Path;
use std::sync::Arc;

use crate::controller::ViewportController;
use crate::error::{Result, ViewerError};
use crate::history::{HistoryAction, HistoryEntry};
use crate::loader;
use crate::overlay::{OverlayKinds, OverlayLayer};
use crate::processing::{CircleDetector, ComponentLabeler, HoughParams, ImageFilter};
use crate::raster::RasterImage;

impl ViewportController {
    /// Start a new session on `image`.
    ///
    /// History is reset to a single `Load` entry; overlay, active mask and
    /// any drawn shape are cleared. The view transform is kept.
    pub fn load_image(&mut self, image: RasterImage) {
        let image = Arc::new(image);
        log::info!("Loaded {}x{} image", image.width(), image.height());

        self.original = Some(Arc::clone(&image));
        self.history
            .reset(HistoryEntry::plain(HistoryAction::Load, image));
        self.overlay.restore(OverlayLayer::None, OverlayKinds::ALL);
        self.active_mask = None;
        self.tool.clear();
        self.view_dirty = true;
    }

    /// Decode the file at `path` and start a new session on it.
    pub fn load_path(&mut self, path: &Path) -> Result<()> {
        let image = loader::load_image(path)?;
        self.load_image(image);
        Ok(())
    }

    /// Run `filter` on the loaded image and show the result, masked by the
    /// active mask if there is one. The overlay is cleared.
    pub fn apply_filter(&mut self, filter: &dyn ImageFilter) -> Result<()> {
        let original = self.require_loaded()?;
        let name = filter.name();

        let mut output = filter.apply(&original).inspect_err(|e| {
            log::warn!("Filter '{}' failed: {}", name, e);
        })?;
        if let Some(mask) = &self.active_mask {
            output = output.masked(mask)?;
        }

        log::info!("Applied {}", name);
        self.commit(HistoryAction::Filter { name }, Arc::new(output), OverlayLayer::None);
        Ok(())
    }

    /// Rasterize the active tool's shape and zero everything outside it in
    /// the current image. The mask stays active for later filters.
    pub fn apply_mask(&mut self) -> Result<()> {
        self.require_loaded()?;
        let current = Arc::clone(self.current_image()?);
        let mask = self.mask_from_active_tool()?;
        if mask.is_blank() {
            return Err(ViewerError::no_mask("drawn region covers no pixels"));
        }

        let masked = current.masked(&mask)?;
        log::info!("Applied mask covering {} pixels", mask.count_set());
        self.active_mask = Some(Arc::new(mask));

        let layer = self.overlay.layer().clone();
        self.commit(HistoryAction::ApplyMask, Arc::new(masked), layer);
        Ok(())
    }

    /// Label the current image's components and show them as markers on the
    /// labeled image.
    pub fn label_components(&mut self, labeler: &dyn ComponentLabeler) -> Result<usize> {
        self.require_loaded()?;
        let current = Arc::clone(self.current_image()?);
        let result = labeler.label(&current)?;

        if result.centers.len() != result.areas.len() {
            return Err(ViewerError::MarkerMismatch {
                centers: result.centers.len(),
                areas: result.areas.len(),
            });
        }

        let count = result.len();
        log::info!("Labeled {} components", count);
        let layer = OverlayLayer::ComponentMarkers {
            centers: result.centers,
            areas: result.areas,
        };
        self.commit(
            HistoryAction::ConnectedComponents { count },
            Arc::new(result.image),
            layer,
        );
        Ok(count)
    }

    /// Detect circles in the current image and overlay them. The image itself
    /// is unchanged and shared with the previous entry.
    pub fn detect_circles(
        &mut self,
        detector: &dyn CircleDetector,
        params: &HoughParams,
    ) -> Result<usize> {
        self.require_loaded()?;
        params.validate()?;
        let current = Arc::clone(self.current_image()?);

        let circles = detector.detect(&current, params).inspect_err(|e| {
            log::warn!("Circle detection failed: {}", e);
        })?;

        let count = circles.len();
        log::info!("Detected {} circles", count);
        self.commit(
            HistoryAction::DetectCircles { count },
            current,
            OverlayLayer::Circles(circles),
        );
        Ok(count)
    }

    /// Show the loaded image again with no overlay, mask or drawn shape.
    pub fn reset(&mut self) -> Result<()> {
        let original = self.require_loaded()?;
        self.active_mask = None;
        self.tool.clear();
        log::info!("Reset to loaded image");
        self.commit(HistoryAction::Reset, original, OverlayLayer::None);
        Ok(())
    }

    /// Show `layer` and record the new state, active mask included, in history.
    fn commit(&mut self, action: HistoryAction, image: Arc<RasterImage>, layer: OverlayLayer) {
        let visible = match layer.kind() {
            Some(kind) => self.overlay.visible().with(kind),
            None => self.overlay.visible(),
        };
        self.overlay.restore(layer.clone(), visible);
        let entry =
            HistoryEntry::new(action, image, layer, visible).with_mask(self.active_mask.clone());
        self.history.push(entry);
        self.view_dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::PointerButton;
    use crate::overlay::{Circle, OverlayKind};
    use crate::processing::{LabeledComponents, MaxChannelThreshold, OtsuComponentLabeler};
    use crate::tool::ToolKind;
    use crate::viewport::ScreenPoint;
    use image::{GrayImage, Luma};

    struct FixedCircles(Vec<Circle>);

    impl CircleDetector for FixedCircles {
        fn detect(&self, _input: &RasterImage, _params: &HoughParams) -> Result<Vec<Circle>> {
            Ok(self.0.clone())
        }
    }

    struct BrokenDetector;

    impl CircleDetector for BrokenDetector {
        fn detect(&self, _input: &RasterImage, _params: &HoughParams) -> Result<Vec<Circle>> {
            Err(ViewerError::detection_failed("accumulator overflow"))
        }
    }

    struct BrokenFilter;

    impl ImageFilter for BrokenFilter {
        fn name(&self) -> String {
            "broken".to_string()
        }

        fn apply(&self, _input: &RasterImage) -> Result<RasterImage> {
            Err(ViewerError::processing_failed("broken", "always fails"))
        }
    }

    struct LopsidedLabeler;

    impl ComponentLabeler for LopsidedLabeler {
        fn label(&self, input: &RasterImage) -> Result<LabeledComponents> {
            Ok(LabeledComponents {
                image: input.clone(),
                centers: vec![(1.0, 1.0), (2.0, 2.0)],
                areas: vec![5],
            })
        }
    }

    /// 40x40 gray image: dark left half, bright right half, three bright blobs
    /// in the dark half.
    fn plate() -> RasterImage {
        let mut gray = GrayImage::from_fn(40, 40, |x, _| if x >= 20 { Luma([200]) } else { Luma([20]) });
        for (x0, y0) in [(2, 2), (2, 10), (10, 30)] {
            for y in y0..y0 + 3 {
                for x in x0..x0 + 3 {
                    gray.put_pixel(x, y, Luma([250]));
                }
            }
        }
        RasterImage::Gray(gray)
    }

    fn session() -> ViewportController {
        let mut controller = ViewportController::default();
        controller.load_image(plate());
        controller
    }

    fn draw_rect(controller: &mut ViewportController, from: (f64, f64), to: (f64, f64)) {
        controller.set_tool(ToolKind::Rectangle);
        controller.pointer_down(ScreenPoint::new(from.0, from.1), PointerButton::Left);
        controller.pointer_move(ScreenPoint::new(to.0, to.1));
        controller.pointer_up(PointerButton::Left);
    }

    fn gray_at(controller: &ViewportController, x: u32, y: u32) -> u8 {
        match controller.current_image().expect("loaded").as_ref() {
            RasterImage::Gray(gray) => gray.get_pixel(x, y)[0],
            RasterImage::Rgb(_) => panic!("Expected grayscale image"),
        }
    }

    #[test]
    fn test_actions_require_image() {
        let mut controller = ViewportController::default();
        let params = HoughParams::default();
        assert!(matches!(
            controller.apply_filter(&MaxChannelThreshold::default()),
            Err(ViewerError::EmptyHistory)
        ));
        assert!(matches!(controller.apply_mask(), Err(ViewerError::EmptyHistory)));
        assert!(matches!(
            controller.label_components(&OtsuComponentLabeler::default()),
            Err(ViewerError::EmptyHistory)
        ));
        assert!(matches!(
            controller.detect_circles(&FixedCircles(vec![]), &params),
            Err(ViewerError::EmptyHistory)
        ));
        assert!(matches!(controller.reset(), Err(ViewerError::EmptyHistory)));
        assert!(controller.history().is_empty());
    }

    #[test]
    fn test_filter_pushes_entry() {
        let mut controller = session();
        controller
            .apply_filter(&MaxChannelThreshold::new(100))
            .expect("filter");
        assert_eq!(controller.history().len(), 2);
        assert_eq!(gray_at(&controller, 0, 0), 0);
        assert_eq!(gray_at(&controller, 30, 0), 255);
        assert_eq!(
            controller.history().undo_description().as_deref(),
            Some("Apply threshold 100")
        );
    }

    #[test]
    fn test_filter_runs_on_loaded_image() {
        let mut controller = session();
        controller
            .apply_filter(&MaxChannelThreshold::new(100))
            .expect("filter");
        // A second threshold must see the original grays, not the binary output
        controller
            .apply_filter(&MaxChannelThreshold::new(210))
            .expect("filter");
        assert_eq!(gray_at(&controller, 30, 0), 0);
        assert_eq!(gray_at(&controller, 3, 3), 255);
    }

    #[test]
    fn test_failed_action_pushes_nothing() {
        let mut controller = session();
        assert!(controller.apply_filter(&BrokenFilter).is_err());
        assert!(matches!(
            controller.detect_circles(&BrokenDetector, &HoughParams::default()),
            Err(ViewerError::DetectionFailed { .. })
        ));
        assert!(matches!(
            controller.label_components(&LopsidedLabeler),
            Err(ViewerError::MarkerMismatch {
                centers: 2,
                areas: 1
            })
        ));
        assert_eq!(controller.history().len(), 1);
        assert_eq!(controller.current_overlay(), &OverlayLayer::None);
    }

    #[test]
    fn test_invalid_hough_params() {
        let mut controller = session();
        let params = HoughParams {
            dp: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            controller.detect_circles(&FixedCircles(vec![Circle::new(1.0, 1.0, 1.0)]), &params),
            Err(ViewerError::InvalidParams { .. })
        ));
        assert_eq!(controller.history().len(), 1);
    }

    #[test]
    fn test_detect_circles_shares_image() {
        let mut controller = session();
        let before = Arc::clone(controller.current_image().expect("loaded"));
        let count = controller
            .detect_circles(
                &FixedCircles(vec![Circle::new(5.0, 5.0, 3.0), Circle::new(20.0, 20.0, 4.0)]),
                &HoughParams::default(),
            )
            .expect("detect");
        assert_eq!(count, 2);
        assert!(Arc::ptr_eq(&before, controller.current_image().expect("loaded")));
        assert_eq!(controller.current_overlay().len(), 2);
    }

    #[test]
    fn test_label_components_shows_markers() {
        let mut controller = session();
        controller
            .apply_filter(&MaxChannelThreshold::new(240))
            .expect("filter");
        let count = controller
            .label_components(&OtsuComponentLabeler::default())
            .expect("label");
        assert_eq!(count, 3);

        let OverlayLayer::ComponentMarkers { areas, .. } = controller.current_overlay() else {
            panic!("Expected component markers");
        };
        assert_eq!(areas, &vec![9, 9, 9]);
        assert!(!controller.current_image().expect("loaded").is_grayscale());
    }

    #[test]
    fn test_apply_mask_and_reuse_in_filter() {
        let mut controller = session();
        draw_rect(&mut controller, (0.0, 0.0), (10.0, 10.0));
        controller.apply_mask().expect("mask");

        assert_eq!(gray_at(&controller, 3, 3), 250);
        assert_eq!(gray_at(&controller, 30, 30), 0);
        assert_eq!(
            controller.active_mask().map(|m| m.count_set()),
            Some(100)
        );

        controller
            .apply_filter(&MaxChannelThreshold::new(100))
            .expect("filter");
        assert_eq!(gray_at(&controller, 3, 3), 255);
        // Bright right half is outside the active mask
        assert_eq!(gray_at(&controller, 30, 0), 0);
    }

    #[test]
    fn test_apply_mask_needs_region() {
        let mut controller = session();
        controller.set_tool(ToolKind::Line);
        controller.pointer_down(ScreenPoint::new(1.0, 1.0), PointerButton::Left);
        controller.pointer_move(ScreenPoint::new(9.0, 9.0));
        controller.pointer_up(PointerButton::Left);
        assert!(matches!(
            controller.apply_mask(),
            Err(ViewerError::NoMaskAvailable { .. })
        ));

        // Zero-sized rectangle
        draw_rect(&mut controller, (4.0, 4.0), (4.2, 3.9));
        assert!(matches!(
            controller.apply_mask(),
            Err(ViewerError::NoMaskAvailable { .. })
        ));
        assert_eq!(controller.history().len(), 1);
        assert!(controller.active_mask().is_none());
    }

    #[test]
    fn test_reset_restores_loaded_image() {
        let mut controller = session();
        draw_rect(&mut controller, (0.0, 0.0), (10.0, 10.0));
        controller.apply_mask().expect("mask");
        controller
            .detect_circles(&FixedCircles(vec![Circle::new(1.0, 1.0, 1.0)]), &HoughParams::default())
            .expect("detect");

        controller.reset().expect("reset");
        assert_eq!(controller.history().len(), 4);
        assert_eq!(gray_at(&controller, 30, 30), 200);
        assert_eq!(controller.current_overlay(), &OverlayLayer::None);
        assert!(controller.active_mask().is_none());
        assert!(matches!(
            controller.mask_from_active_tool(),
            Err(ViewerError::NoMaskAvailable { .. })
        ));
    }

    #[test]
    fn test_undo_redo_restore_overlay() {
        let mut controller = session();
        controller
            .detect_circles(&FixedCircles(vec![Circle::new(5.0, 5.0, 3.0)]), &HoughParams::default())
            .expect("detect");
        controller.hide_overlay(OverlayKind::Circles);
        controller
            .apply_filter(&MaxChannelThreshold::new(100))
            .expect("filter");

        assert!(controller.undo());
        assert!(matches!(controller.current_overlay(), OverlayLayer::Circles(c) if c.len() == 1));
        // Visibility as recorded when the entry was created
        assert!(controller.overlay().is_shown());

        assert!(controller.undo());
        assert_eq!(controller.current_overlay(), &OverlayLayer::None);
        assert!(!controller.undo());

        assert!(controller.redo());
        assert!(controller.redo());
        assert_eq!(controller.current_overlay(), &OverlayLayer::None);
        assert!(!controller.redo());
    }

    #[test]
    fn test_undo_apply_mask_drops_mask() {
        let mut controller = ViewportController::default();
        controller.load_image(RasterImage::Gray(GrayImage::from_pixel(40, 40, Luma([200]))));
        draw_rect(&mut controller, (0.0, 0.0), (10.0, 10.0));
        controller.apply_mask().expect("mask");
        assert!(controller.active_mask().is_some());

        assert!(controller.undo());
        assert!(controller.active_mask().is_none());

        controller
            .apply_filter(&MaxChannelThreshold::new(100))
            .expect("filter");
        assert_eq!(gray_at(&controller, 30, 30), 255);
    }

    #[test]
    fn test_undo_reset_restores_mask() {
        let mut controller = ViewportController::default();
        controller.load_image(RasterImage::Gray(GrayImage::from_pixel(40, 40, Luma([200]))));
        draw_rect(&mut controller, (0.0, 0.0), (10.0, 10.0));
        controller.apply_mask().expect("mask");
        controller.reset().expect("reset");
        assert!(controller.active_mask().is_none());

        assert!(controller.undo());
        assert_eq!(controller.active_mask().map(|m| m.count_set()), Some(100));

        controller
            .apply_filter(&MaxChannelThreshold::new(100))
            .expect("filter");
        assert_eq!(gray_at(&controller, 30, 30), 0);
        assert_eq!(gray_at(&controller, 5, 5), 255);
    }

    #[test]
    fn test_redo_reapplies_mask() {
        let mut controller = session();
        draw_rect(&mut controller, (0.0, 0.0), (10.0, 10.0));
        controller.apply_mask().expect("mask");
        controller.undo();
        assert!(controller.active_mask().is_none());
        assert!(controller.redo());
        assert_eq!(controller.active_mask().map(|m| m.count_set()), Some(100));
    }

    #[test]
    fn test_branch_discards_redo() {
        let mut controller = session();
        controller
            .apply_filter(&MaxChannelThreshold::new(100))
            .expect("filter");
        controller
            .apply_filter(&MaxChannelThreshold::new(150))
            .expect("filter");
        controller.undo();
        controller.reset().expect("reset");

        let descriptions: Vec<String> = controller
            .history()
            .entries()
            .iter()
            .map(|e| e.action().description())
            .collect();
        assert_eq!(
            descriptions,
            vec!["Load image", "Apply threshold 100", "Reset image"]
        );
        assert_eq!(controller.history().index(), 2);
    }

    #[test]
    fn test_load_path_missing_file() {
        let mut controller = session();
        let dir = tempfile::tempdir().expect("temp dir");
        assert!(matches!(
            controller.load_path(&dir.path().join("gone.png")),
            Err(ViewerError::ImageNotFound { .. })
        ));
        // Session untouched
        assert_eq!(controller.history().len(), 1);
    }

    #[test]
    fn test_reload_starts_fresh() {
        let mut controller = session();
        controller
            .apply_filter(&MaxChannelThreshold::new(100))
            .expect("filter");
        controller.load_image(RasterImage::blank(3, 3));
        assert_eq!(controller.history().len(), 1);
        assert!(!controller.history().can_undo());
        assert_eq!(controller.current_image().expect("loaded").dimensions(), (3, 3));
    }
}
