//! Pointer-driven sculpting: turns a stream of pointer events into
//! throttled, deduplicated backend edit requests.

pub mod scheduler;

pub use scheduler::{FlushState, StrokeScheduler};

use crate::backend::{BackendError, BrushOp};
use crate::protocol::ProtocolError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current brush configuration, persisted with the editor settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrushSettings {
    pub op: BrushOp,
    pub radius: f32,
    pub strength: f32,
}

impl Default for BrushSettings {
    fn default() -> Self {
        Self { op: BrushOp::Raise, radius: 12.0, strength: 0.6 }
    }
}

#[derive(Debug, Error)]
pub enum SculptError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

pub type SculptResult<T> = Result<T, SculptError>;
