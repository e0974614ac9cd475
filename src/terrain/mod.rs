//! Terrain mesh model: owns the renderable buffers for one heightmap and
//! keeps them consistent under full rebuilds and incremental region patches.

pub mod colormap;
pub mod mesh;

pub use mesh::{TerrainMesh, TerrainVertex, DEFAULT_HEIGHT_SCALE};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TerrainError {
    /// A region patch arrived before any full heightmap was built. This is a
    /// programming defect in the integration, not a recoverable condition.
    #[error("region update applied before any full heightmap build")]
    NotBuilt,

    #[error("region ({x},{y}) {w}x{h} exceeds mesh dimensions {width}x{height}")]
    RegionOutOfBounds {
        x: u32,
        y: u32,
        w: u32,
        h: u32,
        width: u32,
        height: u32,
    },

    #[error("heightmap export failed: {0}")]
    Export(#[from] image::ImageError),
}

pub type TerrainResult<T> = Result<T, TerrainError>;
