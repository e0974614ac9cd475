//! Accumulates masked image edits into one persistent surface texture.
//!
//! The surface outlives terrain rebuilds and any number of edits; only an
//! explicit clear (or teardown) destroys it. Each edit is blended through a
//! feathered mask so seams between successive edits stay soft.

use crate::texture::{CompositeError, CompositeResult};
use image::{imageops, DynamicImage, RgbaImage};
use std::io::Cursor;
use tracing::{debug, info};

/// Fixed edge length of the persistent surface, matching the orthographic
/// capture resolution so masks line up 1:1.
pub const SURFACE_SIZE: u32 = 512;

/// Visual-quality tuning knobs. Neither field affects correctness.
#[derive(Debug, Clone, Copy)]
pub struct CompositorConfig {
    /// Box-blur radius, in pixels, applied to the mask in two 1D passes.
    /// Larger values hide seams at the cost of edge fidelity.
    pub feather_radius: u32,
    /// Mask weights at or below this are skipped entirely, so an edit never
    /// dirties pixels its mask does not reach.
    pub alpha_threshold: f32,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            feather_radius: 8,
            alpha_threshold: 1.0 / 255.0,
        }
    }
}

/// Owner of the persistent texture surface.
pub struct TextureCompositor {
    config: CompositorConfig,
    surface: Option<RgbaImage>,
}

impl TextureCompositor {
    pub fn new(config: CompositorConfig) -> Self {
        Self { config, surface: None }
    }

    /// The current surface, if any edit has been applied since the last clear.
    pub fn surface(&self) -> Option<&RgbaImage> {
        self.surface.as_ref()
    }

    pub fn has_surface(&self) -> bool {
        self.surface.is_some()
    }

    /// Composite one edit into the persistent surface.
    ///
    /// The first edit becomes the surface verbatim: by convention the first
    /// result image already contains plausible content outside its mask.
    /// Later edits blend `result` over the surface, weighted by the feathered
    /// mask intensity. Both images are decoded before the surface is touched,
    /// so a decode failure leaves it fully intact.
    pub fn composite(&mut self, result_bytes: &[u8], mask_bytes: &[u8]) -> CompositeResult<()> {
        let result = Self::decode_rgba(result_bytes).map_err(CompositeError::BadResultImage)?;

        if self.surface.is_none() {
            info!("initializing persistent texture surface from first edit");
            self.surface = Some(result);
            return Ok(());
        }

        let mask = image::load_from_memory(mask_bytes)
            .map_err(CompositeError::BadMaskImage)?
            .to_luma8();
        let mask = imageops::resize(
            &mask,
            SURFACE_SIZE,
            SURFACE_SIZE,
            imageops::FilterType::Triangle,
        );
        let mut alpha: Vec<f32> = mask.as_raw().iter().map(|&v| v as f32 / 255.0).collect();
        feather(
            &mut alpha,
            SURFACE_SIZE as usize,
            SURFACE_SIZE as usize,
            self.config.feather_radius as usize,
        );

        let surface = self.surface.as_mut().expect("checked above");
        let mut blended = 0usize;
        for (i, px) in surface.pixels_mut().enumerate() {
            let a = alpha[i];
            if a <= self.config.alpha_threshold {
                continue;
            }
            let rp = result.get_pixel((i as u32) % SURFACE_SIZE, (i as u32) / SURFACE_SIZE);
            for c in 0..3 {
                px.0[c] = (px.0[c] as f32 * (1.0 - a) + rp.0[c] as f32 * a).round() as u8;
            }
            // Wherever any blending occurred the surface is opaque.
            px.0[3] = 255;
            blended += 1;
        }
        debug!(blended, "composited masked edit into surface");
        Ok(())
    }

    /// Drop the persistent surface. Idempotent: clearing with no surface
    /// present is a no-op.
    pub fn clear(&mut self) {
        if self.surface.take().is_some() {
            info!("persistent texture surface cleared");
        }
    }

    /// PNG-encode the current surface for export.
    pub fn to_png(&self) -> CompositeResult<Option<Vec<u8>>> {
        let Some(surface) = &self.surface else {
            return Ok(None);
        };
        let mut bytes = Vec::new();
        surface.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
        Ok(Some(bytes))
    }

    fn decode_rgba(bytes: &[u8]) -> Result<RgbaImage, image::ImageError> {
        let img = image::load_from_memory(bytes)?;
        let img = if img.width() != SURFACE_SIZE || img.height() != SURFACE_SIZE {
            DynamicImage::ImageRgba8(imageops::resize(
                &img.to_rgba8(),
                SURFACE_SIZE,
                SURFACE_SIZE,
                imageops::FilterType::Triangle,
            ))
        } else {
            img
        };
        Ok(img.to_rgba8())
    }
}

impl Default for TextureCompositor {
    fn default() -> Self {
        Self::new(CompositorConfig::default())
    }
}

/// Separable box blur over a scalar field: one horizontal pass, then one
/// vertical pass, each a sliding-window mean. Linear in radius; edges clamp.
fn feather(field: &mut [f32], width: usize, height: usize, radius: usize) {
    if radius == 0 {
        return;
    }
    let mut scratch = vec![0.0f32; field.len()];

    // Horizontal pass.
    for y in 0..height {
        let row = &field[y * width..(y + 1) * width];
        for x in 0..width {
            let lo = x.saturating_sub(radius);
            let hi = (x + radius).min(width - 1);
            let sum: f32 = row[lo..=hi].iter().sum();
            scratch[y * width + x] = sum / (hi - lo + 1) as f32;
        }
    }

    // Vertical pass.
    for x in 0..width {
        for y in 0..height {
            let lo = y.saturating_sub(radius);
            let hi = (y + radius).min(height - 1);
            let mut sum = 0.0f32;
            for ry in lo..=hi {
                sum += scratch[ry * width + x];
            }
            field[y * width + x] = sum / (hi - lo + 1) as f32;
        }
    }
}
