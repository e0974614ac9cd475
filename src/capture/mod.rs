//! Top-down orthographic capture of the current terrain.
//!
//! The projection spans the same [-0.5,0.5]x[-0.5,0.5] domain as mesh UV
//! space, so the output pixel grid aligns 1:1 with heightmap-normalized
//! coordinates; the external editing workflow depends on that alignment for
//! its masks. Capture runs entirely off to the side of the interactive view:
//! it reads the mesh and (optionally) the bound surface texture and shares no
//! mutable state with the viewport, so it can never leave a visible side
//! effect behind.

use crate::terrain::{colormap, TerrainMesh};
use glam::Vec3;
use image::RgbaImage;
use std::io::Cursor;
use thiserror::Error;
use tracing::debug;

/// Fixed output edge length, matching the compositor surface.
pub const CAPTURE_SIZE: u32 = 512;

/// Fixed capture light, normalized at use. Overrides whatever the
/// interactive view is lit with; never written back.
const LIGHT_DIR: Vec3 = Vec3::new(-0.45, 1.0, -0.3);
const AMBIENT: f32 = 0.3;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CaptureError {
    /// No renderable mesh is present. The caller must abort whatever
    /// workflow depends on the image rather than ship empty data downstream.
    #[error("no renderable mesh present")]
    NoMesh,

    #[error("capture encoding failed: {0}")]
    Encode(String),
}

/// Render the terrain to a top-down shaded image.
///
/// `texture` is sampled as-is when bound; otherwise heights run through the
/// banded elevation ramp. The rasterizer fills rows bottom-to-top and the
/// result is flipped to deliver a top-to-bottom image.
pub fn capture_ortho(
    mesh: Option<&TerrainMesh>,
    texture: Option<&RgbaImage>,
) -> Result<RgbaImage, CaptureError> {
    let mesh = mesh.ok_or(CaptureError::NoMesh)?;
    let light = LIGHT_DIR.normalize();
    let size = CAPTURE_SIZE;

    let mut img = RgbaImage::new(size, size);
    let inv = 1.0 / (size - 1) as f32;
    for row in 0..size {
        // Bottom-to-top fill order, mirroring a GPU readback.
        let py = size - 1 - row;
        let v = py as f32 * inv;
        let gy = v * (mesh.height() - 1) as f32;
        for px in 0..size {
            let u = px as f32 * inv;
            let gx = u * (mesh.width() - 1) as f32;

            let base = match texture {
                Some(tex) => {
                    let tx = (u * (tex.width() - 1) as f32).round() as u32;
                    let ty = (v * (tex.height() - 1) as f32).round() as u32;
                    let p = tex.get_pixel(tx, ty);
                    [p.0[0], p.0[1], p.0[2]]
                }
                None => colormap::elevation_color(mesh.sample_height(gx, gy)),
            };

            let n = mesh.sample_normal(gx, gy);
            let shade = AMBIENT + (1.0 - AMBIENT) * n.dot(light).max(0.0);
            let shaded = [
                (base[0] as f32 * shade).min(255.0) as u8,
                (base[1] as f32 * shade).min(255.0) as u8,
                (base[2] as f32 * shade).min(255.0) as u8,
                255,
            ];
            img.put_pixel(px, row, image::Rgba(shaded));
        }
    }

    // The fill above is bottom-to-top; flip so consumers get top-to-bottom.
    image::imageops::flip_vertical_in_place(&mut img);
    debug!(size, textured = texture.is_some(), "orthographic capture rendered");
    Ok(img)
}

/// Capture and PNG-encode in one step.
pub fn capture_png(
    mesh: Option<&TerrainMesh>,
    texture: Option<&RgbaImage>,
) -> Result<Vec<u8>, CaptureError> {
    let img = capture_ortho(mesh, texture)?;
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .map_err(|e| CaptureError::Encode(e.to_string()))?;
    Ok(bytes)
}
