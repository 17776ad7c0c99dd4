//! Error types for maskslice

use thiserror::Error;

/// Which unit of work an error invalidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorScope {
    /// Only the current detection is lost; the image continues.
    Detection,
    /// The whole image is lost; the batch continues.
    Image,
}

#[derive(Error, Debug)]
pub enum SliceError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error(
        "Dimension mismatch: image is {}x{} but mask is {}x{}",
        .image.0, .image.1, .mask.0, .mask.1
    )]
    DimensionMismatch { image: (u32, u32), mask: (u32, u32) },

    #[error("Unsupported mask element type: {0} (expected bool or u8)")]
    UnsupportedMaskType(&'static str),

    #[error("Invalid mask layout: {0}")]
    MaskLayout(String),

    #[error("Detection failed: {0}")]
    Detection(String),

    #[error("Segmentation failed: {0}")]
    Segmentation(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SliceError {
    pub fn scope(&self) -> ErrorScope {
        match self {
            SliceError::DimensionMismatch { .. }
            | SliceError::UnsupportedMaskType(_)
            | SliceError::MaskLayout(_)
            | SliceError::Encode(_) => ErrorScope::Detection,
            _ => ErrorScope::Image,
        }
    }

    /// Wrap a backend failure, keeping the whole context chain in the message.
    pub fn detection(err: anyhow::Error) -> Self {
        SliceError::Detection(format!("{:#}", err))
    }

    pub fn segmentation(err: anyhow::Error) -> Self {
        SliceError::Segmentation(format!("{:#}", err))
    }
}

impl From<image::ImageError> for SliceError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Encoding(e) => SliceError::Encode(e.to_string()),
            other => SliceError::Decode(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, SliceError>;
