//! Persistent masked-texture compositing.

pub mod compositor;

pub use compositor::{CompositorConfig, TextureCompositor, SURFACE_SIZE};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompositeError {
    #[error("failed to decode result image: {0}")]
    BadResultImage(#[source] image::ImageError),

    #[error("failed to decode mask image: {0}")]
    BadMaskImage(#[source] image::ImageError),

    #[error("failed to encode surface: {0}")]
    Encode(#[from] image::ImageError),
}

pub type CompositeResult<T> = Result<T, CompositeError>;
