// Terracarve: desktop terrain sculpting client
// The compute backend owns the height math; this crate keeps the mesh,
// normals and accumulated surface texture coherent under its update stream.

pub mod app;
pub mod backend;
pub mod capture;
pub mod config;
pub mod protocol;
pub mod sculpt;
pub mod terrain;
pub mod texture;
pub mod ui;
pub mod utils;

// Re-export commonly used types for convenience
pub use app::EditorSession;
pub use backend::{BrushOp, BrushStroke, TerrainBackend};
pub use protocol::{FrameCodec, HeightmapFull, HeightmapRegion, TerrainMessage};
pub use terrain::TerrainMesh;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
