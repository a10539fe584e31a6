//! Image processing backend trait and shared types.
//!
//! [`ImageBackend`] covers the two operations a transform needs: identify
//! (read dimensions) and resize (decode, scale, encode to a target format).
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend).

use super::params::ResizeParams;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Backends run on the blocking pool and fan out with rayon, hence
/// `Send + Sync`.
pub trait ImageBackend: Send + Sync {
    /// Get image dimensions.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Resize the source and encode it to `params.output`.
    fn resize(&self, params: &ResizeParams) -> Result<(), BackendError>;
}
