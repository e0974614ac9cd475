//! Interface to the external terrain compute service.
//!
//! The backend is the sole authority on height math: brush strokes, noise
//! generation and erosion all happen on its side. This crate only forwards
//! parameters opaquely and renders the heightmap frames that come back.

pub mod remote;

pub use remote::{RemoteBackend, RemoteConfig};

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("backend transport failed: {reason}")]
    Transport { reason: String },

    #[error("backend rejected the call: {reason}")]
    Rejected { reason: String },

    #[error("backend connection closed")]
    Closed,
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::Transport { reason: err.to_string() }
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Brush operators, passed through to the backend untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BrushOp {
    Raise,
    Lower,
    Smooth,
    Flatten,
}

/// One sculpting edit request. Position is in heightmap space and need not
/// be integral; the backend decides how the stroke mutates heights.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrushStroke {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub strength: f32,
    pub op: BrushOp,
}

/// Deterministic noise generation parameters, forwarded opaquely.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoiseParams {
    pub noise_type: NoiseType,
    pub seed: u32,
    pub octaves: u32,
    pub frequency: f64,
    pub lacunarity: f64,
    pub persistence: f64,
    pub amplitude: f64,
    pub offset: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NoiseType {
    Perlin,
    Simplex,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            noise_type: NoiseType::Perlin,
            seed: 0,
            octaves: 5,
            frequency: 2.0,
            lacunarity: 2.0,
            persistence: 0.5,
            amplitude: 1.0,
            offset: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThermalParams {
    pub iterations: u32,
    pub talus: f32,
    pub transfer_rate: f32,
}

impl Default for ThermalParams {
    fn default() -> Self {
        Self { iterations: 50, talus: 0.01, transfer_rate: 0.5 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HydraulicParams {
    pub num_droplets: u32,
    pub max_lifetime: u32,
    pub erosion_rate: f32,
    pub deposition_rate: f32,
    pub evaporation_rate: f32,
    pub inertia: f32,
    pub min_slope: f32,
    pub capacity_factor: f32,
    pub erosion_radius: f32,
    pub gravity: f32,
}

impl Default for HydraulicParams {
    fn default() -> Self {
        Self {
            num_droplets: 50_000,
            max_lifetime: 30,
            erosion_rate: 0.3,
            deposition_rate: 0.3,
            evaporation_rate: 0.01,
            inertia: 0.05,
            min_slope: 0.01,
            capacity_factor: 4.0,
            erosion_radius: 3.0,
            gravity: 4.0,
        }
    }
}

/// The asynchronous seam to the compute service.
///
/// Every frame-returning call yields raw bytes in the framed wire format,
/// decoded by [`crate::protocol::FrameCodec`] at the call site. At most one terrain
/// call is driven at a time by the sculpting pipeline; hydraulic erosion is
/// the one long-running call and streams progress on a side channel before
/// its terminal frame.
#[async_trait]
pub trait TerrainBackend: Send + Sync {
    /// Fetch the current authoritative heightmap as a full frame.
    async fn fetch_heightmap(&self) -> BackendResult<Bytes>;

    /// Apply one brush stroke; the backend chooses between a full frame and
    /// a region patch depending on how far the edit cascaded.
    async fn apply_brush_stroke(&self, stroke: BrushStroke) -> BackendResult<Bytes>;

    /// Regenerate the terrain from noise parameters. Always a full frame.
    async fn generate_terrain(&self, params: NoiseParams) -> BackendResult<Bytes>;

    /// Run thermal erosion to completion. Always a full frame.
    async fn run_thermal_erosion(&self, params: ThermalParams) -> BackendResult<Bytes>;

    /// Run hydraulic erosion, emitting progress values in [0,1] on
    /// `progress` until the terminal full frame (or failure) is returned.
    async fn run_hydraulic_erosion(
        &self,
        params: HydraulicParams,
        progress: mpsc::UnboundedSender<f32>,
    ) -> BackendResult<Bytes>;

    /// Best-effort abort of the in-flight long-running operation. The
    /// operation may not stop immediately; the only guarantee is that no
    /// further progress notifications should be expected.
    async fn abort(&self);
}
