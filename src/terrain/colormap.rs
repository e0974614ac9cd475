//! Banded elevation color ramp.
//!
//! Used by the orthographic capture when no surface texture is bound yet, so
//! the exported image stays visually informative instead of flat-colored.

/// Band thresholds on normalized height, low to high.
const BANDS: [(f32, [u8; 3]); 6] = [
    (0.30, [52, 90, 150]),   // water
    (0.35, [204, 185, 132]), // sand
    (0.55, [94, 138, 70]),   // lowland
    (0.75, [130, 122, 86]),  // highland
    (0.88, [118, 110, 106]), // rock
    (f32::INFINITY, [238, 240, 244]), // snow
];

/// Map a normalized height in [0,1] to a band color.
pub fn elevation_color(h: f32) -> [u8; 3] {
    for &(threshold, color) in &BANDS {
        if h < threshold {
            return color;
        }
    }
    BANDS[BANDS.len() - 1].1
}
