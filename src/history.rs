//! Linear undo/redo history of processed image states.
//!
//! Every state-producing action appends one immutable `HistoryEntry`. Undo and
//! redo only move the current index. Pushing after an undo discards the
//! entries ahead of the current index before appending, so the history never
//! branches.

use std::sync::Arc;

use crate::constants::DEFAULT_MAX_HISTORY;
use crate::error::{Result, ViewerError};
use crate::overlay::{OverlayKinds, OverlayLayer};
use crate::raster::{Mask, RasterImage};

// ============================================================================
// Entries
// ============================================================================

/// The action that produced a history entry.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryAction {
    /// A new image was loaded
    Load,
    /// A filter ran against the loaded image
    Filter {
        /// Name reported by the filter
        name: String,
    },
    /// The active tool's mask was applied
    ApplyMask,
    /// Connected components were labeled
    ConnectedComponents {
        /// Number of components found
        count: usize,
    },
    /// Circles were detected
    DetectCircles {
        /// Number of circles found
        count: usize,
    },
    /// The loaded image was restored
    Reset,
}

impl HistoryAction {
    /// Get a human-readable description of this action
    pub fn description(&self) -> String {
        match self {
            HistoryAction::Load => "Load image".to_string(),
            HistoryAction::Filter { name } => format!("Apply {}", name),
            HistoryAction::ApplyMask => "Apply mask".to_string(),
            HistoryAction::ConnectedComponents { count } => {
                format!("Label {} components", count)
            }
            HistoryAction::DetectCircles { count } => format!("Detect {} circles", count),
            HistoryAction::Reset => "Reset image".to_string(),
        }
    }
}

/// One immutable snapshot of image and overlay state.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    action: HistoryAction,
    image: Arc<RasterImage>,
    overlay: OverlayLayer,
    overlay_mask: OverlayKinds,
    /// Mask that was active when the entry was created
    mask: Option<Arc<Mask>>,
}

impl HistoryEntry {
    pub fn new(
        action: HistoryAction,
        image: Arc<RasterImage>,
        overlay: OverlayLayer,
        overlay_mask: OverlayKinds,
    ) -> Self {
        Self {
            action,
            image,
            overlay,
            overlay_mask,
            mask: None,
        }
    }

    /// Record the active mask alongside the image.
    pub fn with_mask(mut self, mask: Option<Arc<Mask>>) -> Self {
        self.mask = mask;
        self
    }

    /// Entry with no computed overlay.
    pub fn plain(action: HistoryAction, image: Arc<RasterImage>) -> Self {
        Self::new(action, image, OverlayLayer::None, OverlayKinds::ALL)
    }

    pub fn action(&self) -> &HistoryAction {
        &self.action
    }

    pub fn image(&self) -> &Arc<RasterImage> {
        &self.image
    }

    pub fn overlay(&self) -> &OverlayLayer {
        &self.overlay
    }

    /// Active mask recorded with this entry.
    pub fn mask(&self) -> Option<&Arc<Mask>> {
        self.mask.as_ref()
    }

    /// Overlay kinds that were enabled when the entry was created.
    pub fn overlay_mask(&self) -> OverlayKinds {
        self.overlay_mask
    }
}

// ============================================================================
// History Stack
// ============================================================================

/// Configuration for the history stack
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Maximum number of entries to keep
    pub max_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_HISTORY,
        }
    }
}

/// Ordered entries plus the index of the one being shown.
///
/// `0 <= current < entries.len()` whenever the stack is non-empty.
#[derive(Debug, Clone, Default)]
pub struct HistoryStack {
    entries: Vec<HistoryEntry>,
    current: usize,
    config: HistoryConfig,
}

impl HistoryStack {
    /// Create a new empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom configuration
    pub fn with_config(config: HistoryConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Append an entry, discarding anything ahead of the current index first.
    pub fn push(&mut self, entry: HistoryEntry) {
        if !self.entries.is_empty() && self.current + 1 < self.entries.len() {
            let discarded = self.entries.len() - self.current - 1;
            self.entries.truncate(self.current + 1);
            log::debug!("History: discarded {} forward entries", discarded);
        }

        log::debug!("History: pushed '{}'", entry.action.description());
        self.entries.push(entry);

        // Limit history size
        let max = self.config.max_entries.max(1);
        if self.entries.len() > max {
            let excess = self.entries.len() - max;
            self.entries.drain(..excess);
        }
        self.current = self.entries.len() - 1;
    }

    /// Step back one entry. Returns false at the oldest entry.
    pub fn undo(&mut self) -> bool {
        if !self.can_undo() {
            log::debug!("History: at oldest state");
            return false;
        }
        self.current -= 1;
        log::debug!("History: undo to {}/{}", self.current + 1, self.entries.len());
        true
    }

    /// Step forward one entry. Returns false at the newest entry.
    pub fn redo(&mut self) -> bool {
        if !self.can_redo() {
            log::debug!("History: at newest state");
            return false;
        }
        self.current += 1;
        log::debug!("History: redo to {}/{}", self.current + 1, self.entries.len());
        true
    }

    /// The entry being shown.
    pub fn current(&self) -> Result<&HistoryEntry> {
        self.entries
            .get(self.current)
            .ok_or(ViewerError::EmptyHistory)
    }

    /// Drop everything and start over from `initial`.
    pub fn reset(&mut self, initial: HistoryEntry) {
        self.entries.clear();
        self.entries.push(initial);
        self.current = 0;
        log::debug!("History reset");
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        self.current > 0
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        self.current + 1 < self.entries.len()
    }

    /// Get the description of the entry that undo would leave
    pub fn undo_description(&self) -> Option<String> {
        if !self.can_undo() {
            return None;
        }
        self.entries
            .get(self.current)
            .map(|e| e.action.description())
    }

    /// Get the description of the entry that redo would show
    pub fn redo_description(&self) -> Option<String> {
        if !self.can_redo() {
            return None;
        }
        self.entries
            .get(self.current + 1)
            .map(|e| e.action.description())
    }

    /// Index of the current entry
    pub fn index(&self) -> usize {
        self.current
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }
}

// ============================================================================
// Tests
// ============================================================================
