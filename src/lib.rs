//! PogoTrack - interactive image viewer core
//!
//! Displays a raster image in a pannable, zoomable viewport, turns dragged
//! line/rectangle/circle regions into pixel masks, overlays computed
//! annotations and keeps a linear undo/redo history of processed images.

mod actions;
pub mod config;
pub mod constants;
pub mod controller;
pub mod error;
pub mod history;
pub mod loader;
pub mod overlay;
pub mod processing;
pub mod raster;
pub mod surface;
pub mod tool;
pub mod viewport;

pub use config::{ConfigError, LogLevel, ViewerConfig};
pub use controller::{DragState, PointerButton, Readouts, ViewportController};
pub use error::{Result, ViewerError};
pub use history::{HistoryAction, HistoryEntry, HistoryStack};
pub use overlay::{Circle, OverlayKind, OverlayKinds, OverlayLayer, OverlayModel};
pub use raster::{Mask, RasterImage};
pub use surface::{DisplayList, DrawSurface, ImageSurface};
pub use tool::{Measurement, ToolGeometry, ToolKind};
pub use viewport::{ImagePoint, ScreenPoint, ViewportTransform};
