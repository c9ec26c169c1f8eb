//! Global constants for the viewer core

/// Smallest allowed viewport scale
pub const MIN_SCALE: f64 = 0.1;

/// Largest allowed viewport scale
pub const MAX_SCALE: f64 = 10.0;

/// Wheel angle units per unit of zoom factor (one notch of 120 zooms by 20%)
pub const WHEEL_DIVISOR: f64 = 600.0;

/// Smallest zoom factor a single wheel event can produce
pub const MIN_WHEEL_FACTOR: f64 = 0.01;

/// Default number of history entries kept before the oldest is dropped
pub const DEFAULT_MAX_HISTORY: usize = 100;

/// Mask value for pixels inside a region
pub const MASK_ON: u8 = 255;

/// Mask value for pixels outside a region
pub const MASK_OFF: u8 = 0;

/// Screen-space radius of a component marker dot
pub const MARKER_RADIUS: f64 = 4.0;

/// Screen-space offset of a component marker label from its dot
pub const MARKER_LABEL_OFFSET: (f64, f64) = (6.0, -6.0);
