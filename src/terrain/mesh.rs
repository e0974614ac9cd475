//! The terrain mesh and its incremental update engine.
//!
//! The mesh owns an interleaved vertex buffer plus a fixed triangulation and
//! the height field it was built from. A full build is O(width*height); a
//! region patch touches only the affected vertices and recomputes normals in
//! the patch rectangle grown by one cell, because each normal reads its four
//! neighbors.

use crate::protocol::{HeightmapFull, HeightmapRegion};
use crate::terrain::{TerrainError, TerrainResult};
use glam::Vec3;
use std::io::Cursor;
use tracing::{debug, info};

/// Default world-space height scale: heights in [0,1] map to
/// y in [0, DEFAULT_HEIGHT_SCALE] over the unit [-0.5,0.5] ground plane.
pub const DEFAULT_HEIGHT_SCALE: f32 = 0.25;

/// Interleaved vertex, laid out for direct GPU upload.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TerrainVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// One heightmap's worth of renderable geometry.
///
/// Invariant: `vertices.len() == width * height` at all times. Changing
/// dimensions goes through [`TerrainMesh::rebuild`], which discards and
/// recreates every buffer including the index buffer.
pub struct TerrainMesh {
    width: u32,
    height: u32,
    height_scale: f32,
    heights: Vec<f32>,
    vertices: Vec<TerrainVertex>,
    indices: Vec<u32>,
    revision: u64,
}

impl TerrainMesh {
    /// Build a mesh from a full heightmap. Consumes the heightmap; the
    /// caller's copy is not retained anywhere else.
    pub fn build_full(hm: HeightmapFull, height_scale: f32) -> Self {
        let mut mesh = Self {
            width: 0,
            height: 0,
            height_scale,
            heights: Vec::new(),
            vertices: Vec::new(),
            indices: Vec::new(),
            revision: 0,
        };
        mesh.rebuild(hm);
        mesh
    }

    /// Discard all buffers and rebuild from a new full heightmap. Bumps the
    /// revision so transient UI affordances attached to the old geometry know
    /// to reattach.
    pub fn rebuild(&mut self, hm: HeightmapFull) {
        let (w, h) = (hm.width, hm.height);
        debug_assert!(w > 0 && h > 0, "heightmap dimensions must be positive");

        self.width = w;
        self.height = h;
        self.heights = hm.data;

        let count = (w as usize) * (h as usize);
        self.vertices = Vec::with_capacity(count);

        let inv_w = 1.0 / (w.max(2) - 1) as f32;
        let inv_h = 1.0 / (h.max(2) - 1) as f32;
        for y in 0..h {
            for x in 0..w {
                let u = x as f32 * inv_w;
                let v = y as f32 * inv_h;
                self.vertices.push(TerrainVertex {
                    position: [u - 0.5, self.height_at(x, y) * self.height_scale, v - 0.5],
                    normal: [0.0, 1.0, 0.0],
                    uv: [u, v],
                });
            }
        }
        for y in 0..h {
            for x in 0..w {
                let n = self.compute_normal(x, y);
                self.vertices[(y * w + x) as usize].normal = n.to_array();
            }
        }

        // Two counter-clockwise (seen from +y) triangles per grid quad.
        self.indices = Vec::with_capacity(
            (w.saturating_sub(1) as usize) * (h.saturating_sub(1) as usize) * 6,
        );
        for y in 0..h.saturating_sub(1) {
            for x in 0..w.saturating_sub(1) {
                let i = y * w + x;
                self.indices
                    .extend_from_slice(&[i, i + w, i + 1, i + 1, i + w, i + w + 1]);
            }
        }

        self.revision += 1;
        info!(width = w, height = h, revision = self.revision, "terrain mesh rebuilt");
    }

    /// Patch a rectangular region of heights in place.
    ///
    /// Only the height component of affected positions changes; normals are
    /// recomputed over the patch rectangle grown by one cell on every side,
    /// clamped to the grid. Out-of-bounds regions are rejected, never
    /// clamped: a silently wrong patch renders incorrect terrain with no
    /// diagnostic.
    pub fn update_region(&mut self, region: &HeightmapRegion) -> TerrainResult<()> {
        if self.vertices.is_empty() {
            return Err(TerrainError::NotBuilt);
        }
        let (x1, y1) = (
            region.x.checked_add(region.w),
            region.y.checked_add(region.h),
        );
        match (x1, y1) {
            (Some(x1), Some(y1)) if x1 <= self.width && y1 <= self.height => {}
            _ => {
                return Err(TerrainError::RegionOutOfBounds {
                    x: region.x,
                    y: region.y,
                    w: region.w,
                    h: region.h,
                    width: self.width,
                    height: self.height,
                })
            }
        }
        if region.w == 0 || region.h == 0 {
            return Ok(());
        }

        for ry in 0..region.h {
            for rx in 0..region.w {
                let (x, y) = (region.x + rx, region.y + ry);
                let idx = (y * self.width + x) as usize;
                let val = region.get(rx, ry);
                self.heights[idx] = val;
                self.vertices[idx].position[1] = val * self.height_scale;
            }
        }

        let nx0 = region.x.saturating_sub(1);
        let ny0 = region.y.saturating_sub(1);
        let nx1 = (region.x + region.w + 1).min(self.width);
        let ny1 = (region.y + region.h + 1).min(self.height);
        for y in ny0..ny1 {
            for x in nx0..nx1 {
                let n = self.compute_normal(x, y);
                self.vertices[(y * self.width + x) as usize].normal = n.to_array();
            }
        }

        debug!(
            x = region.x,
            y = region.y,
            w = region.w,
            h = region.h,
            "region patch applied"
        );
        Ok(())
    }

    /// Central-difference normal. At grid edges the missing neighbor is the
    /// vertex's own height (zero-gradient extrapolation).
    fn compute_normal(&self, x: u32, y: u32) -> Vec3 {
        let own = self.height_at(x, y);
        let hl = if x > 0 { self.height_at(x - 1, y) } else { own };
        let hr = if x + 1 < self.width { self.height_at(x + 1, y) } else { own };
        let hu = if y > 0 { self.height_at(x, y - 1) } else { own };
        let hd = if y + 1 < self.height { self.height_at(x, y + 1) } else { own };

        let cell_x = 1.0 / (self.width.max(2) - 1) as f32;
        let cell_z = 1.0 / (self.height.max(2) - 1) as f32;
        let dhdx = (hr - hl) * self.height_scale / (2.0 * cell_x);
        let dhdz = (hd - hu) * self.height_scale / (2.0 * cell_z);

        Vec3::new(-dhdx, 1.0, -dhdz).normalize()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn height_scale(&self) -> f32 {
        self.height_scale
    }

    /// Bumped on every full rebuild, never on region patches.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn vertices(&self) -> &[TerrainVertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Vertex buffer contents for GPU upload.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub fn height_at(&self, x: u32, y: u32) -> f32 {
        self.heights[(y * self.width + x) as usize]
    }

    pub fn normal_at(&self, x: u32, y: u32) -> Vec3 {
        Vec3::from_array(self.vertices[(y * self.width + x) as usize].normal)
    }

    /// Bilinear height sample at fractional grid coordinates.
    pub fn sample_height(&self, gx: f32, gy: f32) -> f32 {
        let (x0, y0, fx, fy) = self.bilinear_cell(gx, gy);
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let top = self.height_at(x0, y0) * (1.0 - fx) + self.height_at(x1, y0) * fx;
        let bot = self.height_at(x0, y1) * (1.0 - fx) + self.height_at(x1, y1) * fx;
        top * (1.0 - fy) + bot * fy
    }

    /// Bilinear normal sample, renormalized.
    pub fn sample_normal(&self, gx: f32, gy: f32) -> Vec3 {
        let (x0, y0, fx, fy) = self.bilinear_cell(gx, gy);
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let top = self.normal_at(x0, y0).lerp(self.normal_at(x1, y0), fx);
        let bot = self.normal_at(x0, y1).lerp(self.normal_at(x1, y1), fx);
        top.lerp(bot, fy).normalize_or(Vec3::Y)
    }

    fn bilinear_cell(&self, gx: f32, gy: f32) -> (u32, u32, f32, f32) {
        let gx = gx.clamp(0.0, (self.width - 1) as f32);
        let gy = gy.clamp(0.0, (self.height - 1) as f32);
        let x0 = gx.floor() as u32;
        let y0 = gy.floor() as u32;
        (x0, y0, gx - x0 as f32, gy - y0 as f32)
    }

    /// Export the current height field as 16-bit greyscale PNG bytes.
    pub fn export_png16(&self) -> TerrainResult<Vec<u8>> {
        let pixels: Vec<u16> = self
            .heights
            .iter()
            .map(|&v| (v.clamp(0.0, 1.0) * 65535.0) as u16)
            .collect();
        let img =
            image::ImageBuffer::<image::Luma<u16>, Vec<u16>>::from_raw(self.width, self.height, pixels)
                .expect("pixel count matches dimensions");
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
        Ok(bytes)
    }
}
