#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use terracarve::backend::{
    BackendResult, BrushStroke, HydraulicParams, NoiseParams, TerrainBackend, ThermalParams,
};
use terracarve::protocol::{FrameCodec, HeightmapFull, HeightmapRegion};
use tokio::sync::{mpsc, Semaphore};

pub fn flat_heightmap(w: u32, h: u32, value: f32) -> HeightmapFull {
    HeightmapFull::new(w, h, vec![value; (w * h) as usize])
}

pub fn full_frame(w: u32, h: u32, value: f32) -> Vec<u8> {
    FrameCodec::encode_full(&flat_heightmap(w, h, value))
}

pub fn region_frame(x: u32, y: u32, w: u32, h: u32, value: f32) -> Vec<u8> {
    FrameCodec::encode_region(&HeightmapRegion::new(x, y, w, h, vec![value; (w * h) as usize]))
}

/// Backend that answers every call immediately with a canned frame.
/// Hydraulic erosion emits the configured progress values first.
pub struct InstantBackend {
    pub frame: Vec<u8>,
    pub progress_values: Vec<f32>,
    pub aborts: AtomicUsize,
}

impl InstantBackend {
    pub fn new(frame: Vec<u8>) -> Self {
        Self { frame, progress_values: vec![0.25, 0.5, 0.75], aborts: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl TerrainBackend for InstantBackend {
    async fn fetch_heightmap(&self) -> BackendResult<Bytes> {
        Ok(Bytes::from(self.frame.clone()))
    }

    async fn apply_brush_stroke(&self, _stroke: BrushStroke) -> BackendResult<Bytes> {
        Ok(Bytes::from(self.frame.clone()))
    }

    async fn generate_terrain(&self, _params: NoiseParams) -> BackendResult<Bytes> {
        Ok(Bytes::from(self.frame.clone()))
    }

    async fn run_thermal_erosion(&self, _params: ThermalParams) -> BackendResult<Bytes> {
        Ok(Bytes::from(self.frame.clone()))
    }

    async fn run_hydraulic_erosion(
        &self,
        _params: HydraulicParams,
        progress: mpsc::UnboundedSender<f32>,
    ) -> BackendResult<Bytes> {
        for &p in &self.progress_values {
            let _ = progress.send(p);
        }
        Ok(Bytes::from(self.frame.clone()))
    }

    async fn abort(&self) {
        self.aborts.fetch_add(1, Ordering::SeqCst);
    }
}

/// Backend whose brush-stroke and hydraulic-erosion calls block until the
/// test releases a permit, so in-flight behavior is observable
/// deterministically. Hydraulic erosion emits its progress values before
/// blocking.
pub struct GatedBackend {
    pub frame: Vec<u8>,
    pub gate: Semaphore,
    pub calls: AtomicUsize,
    pub strokes: Mutex<Vec<BrushStroke>>,
    pub progress_values: Vec<f32>,
}

impl GatedBackend {
    pub fn new(frame: Vec<u8>) -> Self {
        Self {
            frame,
            gate: Semaphore::new(0),
            calls: AtomicUsize::new(0),
            strokes: Mutex::new(Vec::new()),
            progress_values: vec![0.25, 0.5, 0.75],
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn release_one(&self) {
        self.gate.add_permits(1);
    }
}

#[async_trait]
impl TerrainBackend for GatedBackend {
    async fn fetch_heightmap(&self) -> BackendResult<Bytes> {
        Ok(Bytes::from(self.frame.clone()))
    }

    async fn apply_brush_stroke(&self, stroke: BrushStroke) -> BackendResult<Bytes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.strokes.lock().unwrap().push(stroke);
        let permit = self.gate.acquire().await.expect("gate closed");
        permit.forget();
        Ok(Bytes::from(self.frame.clone()))
    }

    async fn generate_terrain(&self, _params: NoiseParams) -> BackendResult<Bytes> {
        Ok(Bytes::from(self.frame.clone()))
    }

    async fn run_thermal_erosion(&self, _params: ThermalParams) -> BackendResult<Bytes> {
        Ok(Bytes::from(self.frame.clone()))
    }

    async fn run_hydraulic_erosion(
        &self,
        _params: HydraulicParams,
        progress: mpsc::UnboundedSender<f32>,
    ) -> BackendResult<Bytes> {
        for &p in &self.progress_values {
            let _ = progress.send(p);
        }
        let permit = self.gate.acquire().await.expect("gate closed");
        permit.forget();
        Ok(Bytes::from(self.frame.clone()))
    }

    async fn abort(&self) {}
}

/// Poll `cond` until it holds or the timeout expires.
pub async fn wait_for(mut cond: impl FnMut() -> bool) {
    for _ in 0..500 {
        if cond() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }
    panic!("condition not reached within timeout");
}
