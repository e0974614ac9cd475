mod common;

use common::flat_heightmap;
use terracarve::protocol::{HeightmapFull, HeightmapRegion};
use terracarve::terrain::{TerrainError, TerrainMesh};

const EPS: f32 = 1e-5;

fn assert_up(normal: [f32; 3]) {
    assert!((normal[0]).abs() < EPS && (normal[1] - 1.0).abs() < EPS && (normal[2]).abs() < EPS,
        "expected (0,1,0), got {normal:?}");
}

#[test]
fn flat_build_scenario() {
    let mesh = TerrainMesh::build_full(flat_heightmap(4, 4, 0.5), 2.0);

    assert_eq!(mesh.vertex_count(), 16);
    assert_eq!(mesh.indices().len(), 3 * 3 * 6);
    for v in mesh.vertices() {
        assert!((v.position[1] - 1.0).abs() < EPS, "y = height * height_scale");
        assert!((-0.5..=0.5).contains(&v.position[0]));
        assert!((-0.5..=0.5).contains(&v.position[2]));
        assert!((0.0..=1.0).contains(&v.uv[0]) && (0.0..=1.0).contains(&v.uv[1]));
        // Flat terrain: straight-up normals everywhere, edges included.
        assert_up(v.normal);
    }

    // Upload views cover the whole buffers: 32 bytes per vertex, 4 per index.
    assert_eq!(mesh.vertex_bytes().len(), 16 * 32);
    assert_eq!(mesh.index_bytes().len(), mesh.indices().len() * 4);

    // Corner vertices span the unit domain exactly.
    assert_eq!(mesh.vertices()[0].position[0], -0.5);
    assert_eq!(mesh.vertices()[0].position[2], -0.5);
    assert_eq!(mesh.vertices()[15].position[0], 0.5);
    assert_eq!(mesh.vertices()[15].position[2], 0.5);
}

#[test]
fn ramp_normals_point_into_the_hill() {
    // Heights increase strictly along +x.
    let w = 8u32;
    let h = 6u32;
    let data: Vec<f32> = (0..h)
        .flat_map(|_| (0..w).map(|x| x as f32 / w as f32))
        .collect();
    let mesh = TerrainMesh::build_full(HeightmapFull::new(w, h, data), 1.0);

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let n = mesh.normal_at(x, y);
            assert!(n.x < 0.0, "interior normal at ({x},{y}) has x = {}", n.x);
            assert!(n.y > 0.0);
        }
    }
}

#[test]
fn region_patch_scenario() {
    let mut mesh = TerrainMesh::build_full(flat_heightmap(4, 4, 0.5), 2.0);
    let patch = HeightmapRegion::new(1, 1, 1, 1, vec![0.9]);
    mesh.update_region(&patch).expect("patch in bounds");

    // Only vertex (1,1) changed height.
    for y in 0..4u32 {
        for x in 0..4u32 {
            let expected = if (x, y) == (1, 1) { 0.9 } else { 0.5 };
            assert!((mesh.height_at(x, y) - expected).abs() < EPS);
            let v = mesh.vertices()[(y * 4 + x) as usize];
            assert!((v.position[1] - expected * 2.0).abs() < EPS);
        }
    }

    // Normals tilted only inside the 3x3 window around the patch.
    for y in 0..4u32 {
        for x in 0..4u32 {
            let n = mesh.normal_at(x, y);
            let in_window = (0..=2).contains(&x) && (0..=2).contains(&y);
            if !in_window {
                assert_up(n.to_array());
            }
        }
    }
    // The patched vertex itself is a local peak: central differences cancel.
    assert_up(mesh.normal_at(1, 1).to_array());
    // Its left neighbor slopes up toward +x.
    assert!(mesh.normal_at(0, 1).x < 0.0);
    // Its right neighbor slopes down toward +x.
    assert!(mesh.normal_at(2, 1).x > 0.0);
}

#[test]
fn region_patch_is_idempotent() {
    let mut once = TerrainMesh::build_full(flat_heightmap(6, 6, 0.2), 1.0);
    let patch = HeightmapRegion::new(2, 1, 3, 2, vec![0.8, 0.1, 0.6, 0.4, 0.9, 0.3]);
    once.update_region(&patch).unwrap();

    let mut twice = TerrainMesh::build_full(flat_heightmap(6, 6, 0.2), 1.0);
    twice.update_region(&patch).unwrap();
    twice.update_region(&patch).unwrap();

    assert_eq!(once.vertices(), twice.vertices());
}

#[test]
fn out_of_bounds_region_fails_loudly() {
    let mut mesh = TerrainMesh::build_full(flat_heightmap(4, 4, 0.5), 1.0);
    let patch = HeightmapRegion::new(3, 3, 2, 2, vec![0.1; 4]);
    let err = mesh.update_region(&patch).unwrap_err();
    assert!(matches!(err, TerrainError::RegionOutOfBounds { .. }));
    // Nothing was clamped or partially applied.
    for v in mesh.vertices() {
        assert!((v.position[1] - 0.5).abs() < EPS);
    }
}

#[test]
fn empty_region_is_a_no_op() {
    let mut mesh = TerrainMesh::build_full(flat_heightmap(4, 4, 0.5), 1.0);
    let before: Vec<_> = mesh.vertices().to_vec();
    mesh.update_region(&HeightmapRegion::new(2, 2, 0, 0, vec![])).unwrap();
    assert_eq!(mesh.vertices(), &before[..]);
}

#[test]
fn rebuild_discards_and_resizes_buffers() {
    let mut mesh = TerrainMesh::build_full(flat_heightmap(4, 4, 0.5), 1.0);
    let rev = mesh.revision();
    mesh.rebuild(flat_heightmap(8, 3, 0.1));
    assert_eq!(mesh.vertex_count(), 24);
    assert_eq!(mesh.indices().len(), 7 * 2 * 6);
    assert_eq!(mesh.revision(), rev + 1);
}

#[test]
fn png16_export_round_numbers() {
    let mut data = vec![0.0f32; 4];
    data[1] = 1.0;
    data[2] = 2.0; // clamped to 1.0
    data[3] = -1.0; // clamped to 0.0
    let mesh = TerrainMesh::build_full(HeightmapFull::new(2, 2, data), 1.0);
    let png = mesh.export_png16().expect("export failed");

    let img = image::load_from_memory(&png).expect("valid png").to_luma16();
    assert_eq!(img.dimensions(), (2, 2));
    assert_eq!(img.get_pixel(0, 0).0[0], 0);
    assert_eq!(img.get_pixel(1, 0).0[0], 65535);
    assert_eq!(img.get_pixel(0, 1).0[0], 65535);
    assert_eq!(img.get_pixel(1, 1).0[0], 0);
}
