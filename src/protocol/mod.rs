//! Binary wire protocol shared with the terrain compute backend.
//!
//! Every terrain-mutating backend call answers with one frame in this format;
//! the codec turns it into either a full heightmap or a sparse region patch.

pub mod codecs;
pub mod messages;

pub use codecs::FrameCodec;
pub use messages::{HeightmapFull, HeightmapRegion, TerrainMessage};

/// Compiled-in protocol version. A frame carrying any other version is
/// rejected outright; there is no partial recovery.
pub const PROTOCOL_VERSION: u32 = 1;

/// Message type byte for a full heightmap frame.
pub const MSG_FULL: u8 = 0;
/// Message type byte for a region patch frame.
pub const MSG_REGION: u8 = 1;

/// Header length of a full frame: version + type + padding + width + height.
pub const FULL_HEADER_LEN: usize = 16;
/// Header length of a region frame: version + type + padding + x/y/w/h.
pub const REGION_HEADER_LEN: usize = 24;

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("protocol version mismatch: expected {expected}, got {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("unknown message type: {0:#04x}")]
    UnknownMessageType(u8),

    #[error("frame too short: {len} bytes, need at least {need}")]
    Truncated { len: usize, need: usize },

    #[error("payload length mismatch: declared {declared} floats, got {actual}")]
    PayloadMismatch { declared: usize, actual: usize },

    #[error("declared dimensions overflow: {width}x{height}")]
    DimensionOverflow { width: u32, height: u32 },
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
