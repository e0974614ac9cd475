//! Decoded terrain messages.
//!
//! Both structures own their height data (copy-on-decode); nothing here
//! borrows the wire buffer.

/// A complete heightmap. Row-major: `data[y * width + x]`, heights in
/// [0.0, 1.0]. Consumed wholesale by `TerrainMesh::build_full`.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightmapFull {
    pub width: u32,
    pub height: u32,
    pub data: Vec<f32>,
}

impl HeightmapFull {
    pub fn new(width: u32, height: u32, data: Vec<f32>) -> Self {
        debug_assert_eq!(data.len(), (width as usize) * (height as usize));
        Self { width, height, data }
    }

    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.data[(y * self.width + x) as usize]
    }
}

/// A rectangular sub-grid update. `x + w` and `y + h` must fit inside the
/// mesh it patches; the mesh, not the codec, enforces that.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightmapRegion {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    pub data: Vec<f32>,
}

impl HeightmapRegion {
    pub fn new(x: u32, y: u32, w: u32, h: u32, data: Vec<f32>) -> Self {
        debug_assert_eq!(data.len(), (w as usize) * (h as usize));
        Self { x, y, w, h, data }
    }

    pub fn get(&self, rx: u32, ry: u32) -> f32 {
        self.data[(ry * self.w + rx) as usize]
    }
}

/// One decoded backend response frame.
#[derive(Debug, Clone, PartialEq)]
pub enum TerrainMessage {
    Full(HeightmapFull),
    Region(HeightmapRegion),
}
