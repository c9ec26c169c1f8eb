//! Error types for viewer operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while driving the viewer core.
///
/// Pointer positions outside the image are not errors: readouts are simply
/// absent in that case.
#[derive(Error, Debug)]
pub enum ViewerError {
    /// An operation needed a loaded image but the history is empty
    #[error("No image loaded")]
    EmptyHistory,

    /// The active tool cannot produce a mask right now
    #[error("No mask available: {reason}")]
    NoMaskAvailable {
        /// Why no mask could be produced
        reason: String,
    },

    /// Processing or detection parameters out of range
    #[error("Invalid parameters: {message}")]
    InvalidParams {
        /// Description of the offending parameter
        message: String,
    },

    /// Image file not found at the given path
    #[error("Image not found: {path:?}")]
    ImageNotFound {
        /// Path that was requested
        path: PathBuf,
    },

    /// Image data could not be decoded
    #[error("Failed to decode image: {message}")]
    DecodeFailed {
        /// Decoder message
        message: String,
    },

    /// An image could not be written
    #[error("Failed to write {path:?}: {message}")]
    EncodeFailed {
        /// Destination path
        path: PathBuf,
        /// Encoder message
        message: String,
    },

    /// A detection collaborator failed
    #[error("Detection failed: {message}")]
    DetectionFailed {
        /// Collaborator message
        message: String,
    },

    /// A processing collaborator failed
    #[error("Processing failed in '{filter}': {message}")]
    ProcessingFailed {
        /// Name of the filter or collaborator
        filter: String,
        /// Collaborator message
        message: String,
    },

    /// Component marker centers and areas have different lengths
    #[error("Marker mismatch: {centers} centers but {areas} areas")]
    MarkerMismatch {
        /// Number of centers supplied
        centers: usize,
        /// Number of areas supplied
        areas: usize,
    },

    /// A mask does not cover the image it is applied to
    #[error("Mask is {mask_width}x{mask_height} but image is {image_width}x{image_height}")]
    MaskSizeMismatch {
        /// Mask width
        mask_width: u32,
        /// Mask height
        mask_height: u32,
        /// Image width
        image_width: u32,
        /// Image height
        image_height: u32,
    },

    /// I/O error while reading or writing files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ViewerError {
    /// Create a no-mask error with a reason.
    pub fn no_mask(reason: impl Into<String>) -> Self {
        Self::NoMaskAvailable {
            reason: reason.into(),
        }
    }

    /// Create an invalid parameters error.
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams {
            message: message.into(),
        }
    }

    /// Create a decode error.
    pub fn decode_failed(message: impl Into<String>) -> Self {
        Self::DecodeFailed {
            message: message.into(),
        }
    }

    /// Create a detection error.
    pub fn detection_failed(message: impl Into<String>) -> Self {
        Self::DetectionFailed {
            message: message.into(),
        }
    }

    /// Create a processing error attributed to a named filter.
    pub fn processing_failed(filter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProcessingFailed {
            filter: filter.into(),
            message: message.into(),
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, ViewerError>;
