mod common;

use common::{full_frame, region_frame, wait_for, GatedBackend, InstantBackend};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use terracarve::app::EditorSession;
use terracarve::backend::HydraulicParams;
use terracarve::capture::CaptureError;
use terracarve::protocol::{FrameCodec, TerrainMessage};

fn session_with(backend: Arc<InstantBackend>) -> EditorSession {
    EditorSession::new(backend, tokio::runtime::Handle::current())
}

/// Tick until the session finishes its pending operation.
async fn settle(session: &mut EditorSession) {
    for _ in 0..500 {
        session.tick();
        if !session.is_busy() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }
    panic!("session never settled");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn initial_fetch_builds_the_mesh() {
    let backend = Arc::new(InstantBackend::new(full_frame(8, 8, 0.5)));
    let mut session = session_with(backend);

    assert!(!session.has_mesh());
    session.fetch_heightmap();
    assert!(session.is_busy());
    settle(&mut session).await;

    let mesh = session.mesh().expect("mesh built from full frame");
    assert_eq!((mesh.width(), mesh.height()), (8, 8));
    assert!(session.last_error.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn region_before_full_is_an_error() {
    let backend = Arc::new(InstantBackend::new(full_frame(8, 8, 0.5)));
    let mut session = session_with(backend);

    let msg = FrameCodec::decode(&region_frame(1, 1, 2, 2, 0.9)).unwrap();
    assert!(matches!(msg, TerrainMessage::Region(_)));
    assert!(session.apply_message(msg).is_err());
    assert!(!session.has_mesh());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sculpting_without_terrain_is_refused() {
    let backend = Arc::new(InstantBackend::new(full_frame(8, 8, 0.5)));
    let mut session = session_with(backend);

    session.pointer_down(2.0, 2.0);
    assert!(session.last_error.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stroke_responses_patch_the_mesh() {
    // Backend answers every call with a region patch, strokes included.
    let backend = Arc::new(InstantBackend::new(region_frame(2, 2, 1, 1, 0.9)));
    let mut session = session_with(backend);
    session.apply_message(FrameCodec::decode(&full_frame(8, 8, 0.5)).unwrap()).unwrap();
    let rev = session.mesh_revision();

    session.pointer_down(2.0, 2.0);
    session.pointer_up();
    wait_for(|| {
        session.tick();
        (session.mesh().unwrap().height_at(2, 2) - 0.9).abs() < 1e-6
    })
    .await;
    // Patches do not count as rebuilds.
    assert_eq!(session.mesh_revision(), rev);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn hydraulic_erosion_completes_and_frees_the_slot() {
    let backend = Arc::new(InstantBackend::new(full_frame(8, 8, 0.3)));
    let mut session = session_with(backend);
    session.fetch_heightmap();
    settle(&mut session).await;

    session.run_hydraulic_erosion(HydraulicParams::default());
    assert!(session.is_busy());
    settle(&mut session).await;

    assert!(session.last_error.is_none());
    assert!(session.status_message.contains("complete"));
    assert!((session.mesh().unwrap().height_at(0, 0) - 0.3).abs() < 1e-6);
    // The slot is free again.
    assert!(session.progress().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn hydraulic_progress_is_observable_mid_run() {
    let backend = Arc::new(GatedBackend::new(full_frame(8, 8, 0.3)));
    let mut session = EditorSession::new(backend.clone(), tokio::runtime::Handle::current());

    session.run_hydraulic_erosion(HydraulicParams::default());
    // The backend streams 0.25/0.5/0.75 and then stalls; ticking must drain
    // them into the reported progress, latest value winning.
    wait_for(|| {
        session.tick();
        session.progress() == Some(0.75)
    })
    .await;
    assert!(session.is_busy());

    backend.release_one();
    settle(&mut session).await;
    assert!(session.last_error.is_none());
    assert!(session.progress().is_none());
    assert!(session.has_mesh());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sculpting_during_an_operation_is_refused_loudly() {
    let backend = Arc::new(GatedBackend::new(full_frame(8, 8, 0.3)));
    let mut session = EditorSession::new(backend.clone(), tokio::runtime::Handle::current());
    session.apply_message(FrameCodec::decode(&full_frame(8, 8, 0.5)).unwrap()).unwrap();

    session.run_hydraulic_erosion(HydraulicParams::default());
    session.pointer_down(2.0, 2.0);
    let err = session.last_error.clone().expect("refused sculpt must be diagnosable");
    assert!(err.contains("hydraulic erosion"), "got {err}");

    backend.release_one();
    settle(&mut session).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn abort_notifies_backend_and_clears_progress() {
    let backend = Arc::new(InstantBackend::new(full_frame(8, 8, 0.3)));
    let mut session = session_with(backend.clone());

    session.run_hydraulic_erosion(HydraulicParams::default());
    session.abort();
    wait_for(|| backend.aborts.load(Ordering::SeqCst) == 1).await;
    // Progress reporting stops immediately even though the slot stays
    // occupied until the backend answers.
    assert!(session.progress().is_none());
    settle(&mut session).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_operation_requests_are_ignored() {
    let backend = Arc::new(InstantBackend::new(full_frame(4, 4, 0.5)));
    let mut session = session_with(backend);

    session.fetch_heightmap();
    // Second request while the first is pending must not clobber the slot.
    session.generate_terrain(Default::default());
    settle(&mut session).await;
    assert!(session.has_mesh());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn capture_requires_a_mesh() {
    let backend = Arc::new(InstantBackend::new(full_frame(4, 4, 0.5)));
    let mut session = session_with(backend);
    assert_eq!(session.capture_png().unwrap_err(), CaptureError::NoMesh);

    session.fetch_heightmap();
    settle(&mut session).await;
    let png = session.capture_png().expect("capture after build");
    assert!(image::load_from_memory(&png).is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn texture_survives_full_rebuild() {
    let backend = Arc::new(InstantBackend::new(full_frame(4, 4, 0.5)));
    let mut session = session_with(backend);
    session.fetch_heightmap();
    settle(&mut session).await;

    let result = {
        let img = image::RgbaImage::from_pixel(512, 512, image::Rgba([9, 9, 9, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png).unwrap();
        bytes
    };
    let mask = {
        let img = image::GrayImage::from_pixel(512, 512, image::Luma([255]));
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png).unwrap();
        bytes
    };
    session.composite_texture(&result, &mask).unwrap();
    assert!(session.has_texture());

    session.generate_terrain(Default::default());
    settle(&mut session).await;
    assert!(session.has_texture(), "texture must outlive terrain rebuilds");
}
