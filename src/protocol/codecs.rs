//! Frame codec for the backend wire protocol.
//!
//! Layout (all integers little-endian):
//!   full:   [version:u32][type:u8 = 0][pad:3B][width:u32][height:u32][w*h f32]
//!   region: [version:u32][type:u8 = 1][pad:3B][x:u32][y:u32][w:u32][h:u32][w*h f32]
//!
//! The three padding bytes exist for alignment only; decoders must not assume
//! they are zero.

use super::{
    HeightmapFull, HeightmapRegion, ProtocolError, ProtocolResult, TerrainMessage,
    FULL_HEADER_LEN, MSG_FULL, MSG_REGION, PROTOCOL_VERSION, REGION_HEADER_LEN,
};
use tracing::trace;

pub struct FrameCodec;

impl FrameCodec {
    /// Decode one backend response frame into an owned message.
    ///
    /// Fails fast on a version mismatch: the whole buffer is considered
    /// unusable and no payload bytes are interpreted.
    pub fn decode(buf: &[u8]) -> ProtocolResult<TerrainMessage> {
        if buf.len() < 8 {
            return Err(ProtocolError::Truncated { len: buf.len(), need: 8 });
        }

        let version = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        if version != PROTOCOL_VERSION {
            return Err(ProtocolError::VersionMismatch {
                expected: PROTOCOL_VERSION,
                found: version,
            });
        }

        match buf[4] {
            MSG_FULL => Self::decode_full(buf),
            MSG_REGION => Self::decode_region(buf),
            other => Err(ProtocolError::UnknownMessageType(other)),
        }
    }

    fn decode_full(buf: &[u8]) -> ProtocolResult<TerrainMessage> {
        if buf.len() < FULL_HEADER_LEN {
            return Err(ProtocolError::Truncated { len: buf.len(), need: FULL_HEADER_LEN });
        }
        let width = u32::from_le_bytes(buf[8..12].try_into().unwrap());
        let height = u32::from_le_bytes(buf[12..16].try_into().unwrap());

        let count = (width as u64)
            .checked_mul(height as u64)
            .filter(|&n| n <= usize::MAX as u64 / 4)
            .ok_or(ProtocolError::DimensionOverflow { width, height })?
            as usize;

        let data = Self::read_payload(&buf[FULL_HEADER_LEN..], count)?;
        trace!(width, height, "decoded full heightmap frame");
        Ok(TerrainMessage::Full(HeightmapFull { width, height, data }))
    }

    fn decode_region(buf: &[u8]) -> ProtocolResult<TerrainMessage> {
        if buf.len() < REGION_HEADER_LEN {
            return Err(ProtocolError::Truncated { len: buf.len(), need: REGION_HEADER_LEN });
        }
        let x = u32::from_le_bytes(buf[8..12].try_into().unwrap());
        let y = u32::from_le_bytes(buf[12..16].try_into().unwrap());
        let w = u32::from_le_bytes(buf[16..20].try_into().unwrap());
        let h = u32::from_le_bytes(buf[20..24].try_into().unwrap());

        let count = (w as u64)
            .checked_mul(h as u64)
            .filter(|&n| n <= usize::MAX as u64 / 4)
            .ok_or(ProtocolError::DimensionOverflow { width: w, height: h })?
            as usize;

        let data = Self::read_payload(&buf[REGION_HEADER_LEN..], count)?;
        trace!(x, y, w, h, "decoded region patch frame");
        Ok(TerrainMessage::Region(HeightmapRegion { x, y, w, h, data }))
    }

    /// Copy the f32 payload out of the wire buffer. The payload is not
    /// guaranteed to be 4-aligned inside an arbitrary allocation, so this
    /// goes through `from_le_bytes` per value rather than a slice cast.
    fn read_payload(bytes: &[u8], count: usize) -> ProtocolResult<Vec<f32>> {
        let actual = bytes.len() / 4;
        if actual < count {
            return Err(ProtocolError::PayloadMismatch { declared: count, actual });
        }
        Ok(bytes[..count * 4]
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    /// Encode a full heightmap frame.
    pub fn encode_full(hm: &HeightmapFull) -> Vec<u8> {
        let mut buf = Vec::with_capacity(FULL_HEADER_LEN + hm.data.len() * 4);
        buf.extend_from_slice(&PROTOCOL_VERSION.to_le_bytes());
        buf.push(MSG_FULL);
        buf.extend_from_slice(&[0u8; 3]);
        buf.extend_from_slice(&hm.width.to_le_bytes());
        buf.extend_from_slice(&hm.height.to_le_bytes());
        buf.extend_from_slice(bytemuck::cast_slice(&hm.data));
        buf
    }

    /// Encode a region patch frame.
    pub fn encode_region(region: &HeightmapRegion) -> Vec<u8> {
        let mut buf = Vec::with_capacity(REGION_HEADER_LEN + region.data.len() * 4);
        buf.extend_from_slice(&PROTOCOL_VERSION.to_le_bytes());
        buf.push(MSG_REGION);
        buf.extend_from_slice(&[0u8; 3]);
        buf.extend_from_slice(&region.x.to_le_bytes());
        buf.extend_from_slice(&region.y.to_le_bytes());
        buf.extend_from_slice(&region.w.to_le_bytes());
        buf.extend_from_slice(&region.h.to_le_bytes());
        buf.extend_from_slice(bytemuck::cast_slice(&region.data));
        buf
    }
}
