//! The editor session: the single coordinating object behind the UI.
//!
//! Owns every piece of mutable cross-call state in the pipeline: the mesh
//! model, the persistent texture surface, the stroke scheduler and the
//! long-running-operation slot. Construction is "session start", drop is
//! "session end". All mutation runs on the UI thread; suspension happens
//! only at the backend call boundaries, which complete through channels
//! drained by [`EditorSession::tick`].

use crate::backend::{BackendResult, HydraulicParams, NoiseParams, TerrainBackend, ThermalParams};
use crate::capture::{self, CaptureError};
use crate::protocol::{FrameCodec, TerrainMessage};
use crate::sculpt::{BrushSettings, StrokeScheduler};
use crate::terrain::{TerrainError, TerrainMesh, DEFAULT_HEIGHT_SCALE};
use crate::texture::{CompositorConfig, TextureCompositor};
use anyhow::Result;
use bytes::Bytes;
use image::RgbaImage;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

/// One outstanding long-running backend operation. Brush strokes do not go
/// through this slot; they are throttled by the scheduler instead.
struct PendingOp {
    label: &'static str,
    result_rx: oneshot::Receiver<BackendResult<Bytes>>,
    progress_rx: Option<mpsc::UnboundedReceiver<f32>>,
    latest_progress: f32,
}

pub struct EditorSession {
    backend: Arc<dyn TerrainBackend>,
    runtime: tokio::runtime::Handle,
    mesh: Option<TerrainMesh>,
    compositor: TextureCompositor,
    scheduler: StrokeScheduler,
    pending_op: Option<PendingOp>,
    height_scale: f32,
    /// Cached shaded top-down view for the viewport; re-rendered lazily.
    view_cache: Option<RgbaImage>,
    view_dirty: bool,
    view_serial: u64,
    pub status_message: String,
    pub last_error: Option<String>,
}

impl EditorSession {
    pub fn new(backend: Arc<dyn TerrainBackend>, runtime: tokio::runtime::Handle) -> Self {
        let scheduler = StrokeScheduler::new(Arc::clone(&backend), runtime.clone());
        Self {
            backend,
            runtime,
            mesh: None,
            compositor: TextureCompositor::new(CompositorConfig::default()),
            scheduler,
            pending_op: None,
            height_scale: DEFAULT_HEIGHT_SCALE,
            view_cache: None,
            view_dirty: false,
            view_serial: 0,
            status_message: "Not connected".to_string(),
            last_error: None,
        }
    }

    pub fn mesh(&self) -> Option<&TerrainMesh> {
        self.mesh.as_ref()
    }

    pub fn has_mesh(&self) -> bool {
        self.mesh.is_some()
    }

    pub fn is_busy(&self) -> bool {
        self.pending_op.is_some()
    }

    pub fn progress(&self) -> Option<f32> {
        self.pending_op
            .as_ref()
            .filter(|op| op.progress_rx.is_some())
            .map(|op| op.latest_progress)
    }

    pub fn brush(&self) -> BrushSettings {
        self.scheduler.brush()
    }

    pub fn set_brush(&mut self, brush: BrushSettings) {
        self.scheduler.set_brush(brush);
    }

    // ---- long-running backend operations -----------------------------------

    /// Fetch the authoritative heightmap (initial sync).
    pub fn fetch_heightmap(&mut self) {
        let backend = Arc::clone(&self.backend);
        self.start_op("fetch heightmap", None, async move { backend.fetch_heightmap().await });
    }

    pub fn generate_terrain(&mut self, params: NoiseParams) {
        let backend = Arc::clone(&self.backend);
        self.start_op("generate terrain", None, async move {
            backend.generate_terrain(params).await
        });
    }

    pub fn run_thermal_erosion(&mut self, params: ThermalParams) {
        let backend = Arc::clone(&self.backend);
        self.start_op("thermal erosion", None, async move {
            backend.run_thermal_erosion(params).await
        });
    }

    pub fn run_hydraulic_erosion(&mut self, params: HydraulicParams) {
        let backend = Arc::clone(&self.backend);
        let (progress_tx, progress_rx) = mpsc::unbounded_channel();
        self.start_op("hydraulic erosion", Some(progress_rx), async move {
            backend.run_hydraulic_erosion(params, progress_tx).await
        });
    }

    /// Best-effort abort of the in-flight long-running operation. The
    /// operation slot stays occupied until the backend actually answers (or
    /// errors out); only the progress indicator resets now.
    pub fn abort(&mut self) {
        if let Some(op) = self.pending_op.as_mut() {
            info!(op = op.label, "abort requested");
            op.progress_rx = None;
            op.latest_progress = 0.0;
            let backend = Arc::clone(&self.backend);
            self.runtime.spawn(async move { backend.abort().await });
            self.status_message = "Aborting...".to_string();
        }
    }

    fn start_op<F>(
        &mut self,
        label: &'static str,
        progress_rx: Option<mpsc::UnboundedReceiver<f32>>,
        fut: F,
    ) where
        F: std::future::Future<Output = BackendResult<Bytes>> + Send + 'static,
    {
        if self.pending_op.is_some() {
            warn!(label, "backend operation already running, ignoring request");
            return;
        }
        let (result_tx, result_rx) = oneshot::channel();
        self.runtime.spawn(async move {
            let _ = result_tx.send(fut.await);
        });
        self.pending_op = Some(PendingOp {
            label,
            result_rx,
            progress_rx,
            latest_progress: 0.0,
        });
        self.status_message = format!("Running {label}...");
    }

    // ---- pointer events ----------------------------------------------------

    /// Pointer press in heightmap-space coordinates. Painting with no mesh
    /// built, or while a long-running operation holds the heightmap, is
    /// refused rather than silently dropped on the floor later.
    pub fn pointer_down(&mut self, x: f32, y: f32) {
        if self.mesh.is_none() {
            self.last_error = Some("cannot sculpt: no terrain built yet".to_string());
            return;
        }
        if let Some(op) = self.pending_op.as_ref() {
            self.last_error = Some(format!("cannot sculpt while {} is running", op.label));
            return;
        }
        self.scheduler.pointer_down(x, y);
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        self.scheduler.pointer_move(x, y);
    }

    pub fn pointer_up(&mut self) {
        self.scheduler.pointer_up();
    }

    // ---- per-frame tick ----------------------------------------------------

    /// Drive the pipeline one frame: flush the stroke queue, apply finished
    /// stroke responses, and complete any finished long-running operation.
    pub fn tick(&mut self) {
        self.scheduler.flush();

        for completion in self.scheduler.poll_completions() {
            match completion {
                Ok(msg) => {
                    if let Err(e) = self.apply_message(msg) {
                        // State-invariant violation: not recoverable here.
                        error!(error = %e, "failed to apply stroke response");
                        self.last_error = Some(e.to_string());
                    }
                }
                Err(e) => {
                    warn!(error = %e, "brush stroke failed");
                    self.last_error = Some(e.to_string());
                }
            }
        }

        self.poll_pending_op();
    }

    fn poll_pending_op(&mut self) {
        let finished = {
            let Some(op) = self.pending_op.as_mut() else {
                return;
            };
            if let Some(rx) = op.progress_rx.as_mut() {
                while let Ok(p) = rx.try_recv() {
                    op.latest_progress = p;
                }
            }
            match op.result_rx.try_recv() {
                Err(oneshot::error::TryRecvError::Empty) => None,
                Err(oneshot::error::TryRecvError::Closed) => {
                    Some(Err(crate::backend::BackendError::Closed))
                }
                Ok(result) => Some(result),
            }
        };
        let Some(result) = finished else {
            return;
        };

        let label = self.pending_op.take().expect("op checked above").label;
        match result.map_err(anyhow::Error::from).and_then(|frame| {
            let msg = FrameCodec::decode(&frame)?;
            self.apply_message(msg)
        }) {
            Ok(()) => {
                self.status_message = format!("{label} complete");
            }
            Err(e) => {
                // The call failed or the frame was unusable: surface it and
                // return to the previous interaction mode with mesh and
                // texture untouched.
                error!(op = label, error = %e, "backend operation failed");
                self.last_error = Some(format!("{label}: {e}"));
                self.status_message = "Ready".to_string();
            }
        }
    }

    // ---- terrain state -----------------------------------------------------

    /// Route one decoded backend frame into the mesh model. The persistent
    /// texture surface deliberately survives full rebuilds.
    pub fn apply_message(&mut self, msg: TerrainMessage) -> Result<()> {
        match msg {
            TerrainMessage::Full(hm) => {
                match self.mesh.as_mut() {
                    Some(mesh) => mesh.rebuild(hm),
                    None => {
                        self.mesh = Some(TerrainMesh::build_full(hm, self.height_scale));
                    }
                }
                self.status_message = "Terrain rebuilt".to_string();
            }
            TerrainMessage::Region(region) => {
                let mesh = self.mesh.as_mut().ok_or(TerrainError::NotBuilt)?;
                mesh.update_region(&region)?;
            }
        }
        self.view_dirty = true;
        Ok(())
    }

    /// Mesh revision, for UI affordances that must reattach after a rebuild.
    pub fn mesh_revision(&self) -> u64 {
        self.mesh.as_ref().map_or(0, |m| m.revision())
    }

    // ---- texture -----------------------------------------------------------

    pub fn composite_texture(&mut self, result_bytes: &[u8], mask_bytes: &[u8]) -> Result<()> {
        self.compositor.composite(result_bytes, mask_bytes)?;
        self.view_dirty = true;
        Ok(())
    }

    pub fn clear_texture(&mut self) {
        self.compositor.clear();
        self.view_dirty = true;
    }

    pub fn has_texture(&self) -> bool {
        self.compositor.has_surface()
    }

    pub fn export_texture_png(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.compositor.to_png()?)
    }

    // ---- capture & export --------------------------------------------------

    /// Orthographic capture of the current state as PNG bytes, for the
    /// external editing workflow.
    pub fn capture_png(&self) -> Result<Vec<u8>, CaptureError> {
        capture::capture_png(self.mesh.as_ref(), self.compositor.surface())
    }

    pub fn export_heightmap_png16(&self) -> Result<Vec<u8>> {
        let mesh = self.mesh.as_ref().ok_or(TerrainError::NotBuilt)?;
        Ok(mesh.export_png16()?)
    }

    /// Shaded top-down view for the viewport, re-rendered only after a
    /// terrain or texture change.
    pub fn viewport_image(&mut self) -> Option<&RgbaImage> {
        if self.view_dirty || self.view_cache.is_none() {
            match capture::capture_ortho(self.mesh.as_ref(), self.compositor.surface()) {
                Ok(img) => {
                    self.view_cache = Some(img);
                    self.view_dirty = false;
                    self.view_serial += 1;
                }
                Err(CaptureError::NoMesh) => return None,
                Err(e) => {
                    error!(error = %e, "viewport render failed");
                    return None;
                }
            }
        }
        self.view_cache.as_ref()
    }

    /// Bumped whenever the cached viewport image is re-rendered; the UI uses
    /// it to skip redundant texture uploads.
    pub fn view_serial(&self) -> u64 {
        self.view_serial
    }
}
