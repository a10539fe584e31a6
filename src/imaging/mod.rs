//! Image processing: the asset transform service.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_dimensions` |
//! | **Resize** | Lanczos3 via `image` |
//! | **Encode** | JPEG, PNG, lossless WebP, AVIF (rav1e) |
//! | **Cache** | content-addressed manifest in [`crate::cache`] |
//!
//! The module is split into:
//! - **Calculations**: pure width/height math and orientation
//! - **Parameters**: [`Quality`], [`OutputFormat`], resize parameters
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Transform**: [`ImageTransformer`], which plans variants, consults the
//!   cache and drives the backend in parallel

pub mod backend;
mod calculations;
mod params;
pub mod rust_backend;
pub mod transform;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{Orientation, ResponsiveSize, calculate_responsive_sizes, scaled_height};
pub use params::{OutputFormat, Quality, ResizeParams, UnknownFormat};
pub use rust_backend::RustBackend;
pub use transform::{
    ImageMetadata, ImageTransformer, ImageVariant, TransformError, TransformRequest,
    VariantNaming,
};
