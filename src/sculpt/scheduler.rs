//! The brush stroke scheduler.
//!
//! A coalescing queue of depth one (latest position wins), drained once per
//! frame by [`StrokeScheduler::flush`], gated so that at most one backend
//! call is ever in flight. Bursts of pointer-move events collapse into the
//! single most recent position: path fidelity is traded for backend load
//! control. Pointer-down bypasses the per-frame throttle so the first edit
//! of a stroke has no perceptible latency.
//!
//! Because only one request is ever outstanding, responses apply in dispatch
//! order by construction; there is no reordering hazard to handle.

use crate::backend::{BackendResult, BrushStroke, TerrainBackend};
use crate::protocol::{FrameCodec, TerrainMessage};
use crate::sculpt::{BrushSettings, SculptResult};
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

/// Scheduler states. `Pending` means a recorded position is waiting for the
/// next flush; `InFlight` means a backend call is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushState {
    Idle,
    PendingFlush,
    InFlight,
    InFlightWithPending,
}

pub struct StrokeScheduler {
    backend: Arc<dyn TerrainBackend>,
    runtime: tokio::runtime::Handle,
    state: FlushState,
    painting: bool,
    brush: BrushSettings,
    /// Latest recorded heightmap-space position; overwritten, never queued.
    pending: Option<(f32, f32)>,
    completions_tx: mpsc::UnboundedSender<BackendResult<Bytes>>,
    completions_rx: mpsc::UnboundedReceiver<BackendResult<Bytes>>,
    dispatched: u64,
}

impl StrokeScheduler {
    pub fn new(backend: Arc<dyn TerrainBackend>, runtime: tokio::runtime::Handle) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            backend,
            runtime,
            state: FlushState::Idle,
            painting: false,
            brush: BrushSettings::default(),
            pending: None,
            completions_tx,
            completions_rx,
            dispatched: 0,
        }
    }

    pub fn brush(&self) -> BrushSettings {
        self.brush
    }

    pub fn set_brush(&mut self, brush: BrushSettings) {
        self.brush = brush;
    }

    pub fn state(&self) -> FlushState {
        self.state
    }

    pub fn is_painting(&self) -> bool {
        self.painting
    }

    /// Total backend calls issued; used by tests to verify coalescing.
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    /// Pointer pressed over a valid terrain hit: enter painting mode and
    /// send one stroke immediately, bypassing the per-frame throttle. If a
    /// call is somehow still outstanding the position is recorded instead,
    /// preserving the single-flight invariant.
    pub fn pointer_down(&mut self, x: f32, y: f32) {
        self.painting = true;
        match self.state {
            FlushState::Idle | FlushState::PendingFlush => self.dispatch(x, y),
            FlushState::InFlight | FlushState::InFlightWithPending => {
                self.pending = Some((x, y));
                self.state = FlushState::InFlightWithPending;
            }
        }
    }

    /// Pointer moved while painting: record the position and wait for the
    /// next flush. Never calls the backend synchronously.
    pub fn pointer_move(&mut self, x: f32, y: f32) {
        if !self.painting {
            return;
        }
        self.pending = Some((x, y));
        self.state = match self.state {
            FlushState::Idle | FlushState::PendingFlush => FlushState::PendingFlush,
            FlushState::InFlight | FlushState::InFlightWithPending => {
                FlushState::InFlightWithPending
            }
        };
        trace!(x, y, "pending stroke position updated");
    }

    /// Pointer released or left the viewport: leave painting mode. A
    /// still-pending position is retained and goes out on the next flush.
    pub fn pointer_up(&mut self) {
        self.painting = false;
    }

    /// Per-frame drain of the depth-one queue. Dispatches the pending
    /// position iff no call is in flight.
    pub fn flush(&mut self) {
        if self.state == FlushState::PendingFlush {
            if let Some((x, y)) = self.pending {
                self.dispatch(x, y);
            } else {
                self.state = FlushState::Idle;
            }
        }
    }

    /// Collect finished backend calls, decoded into terrain messages for the
    /// caller to apply (full frame -> rebuild, region -> patch).
    pub fn poll_completions(&mut self) -> Vec<SculptResult<TerrainMessage>> {
        let mut out = Vec::new();
        while let Ok(result) = self.completions_rx.try_recv() {
            self.state = match self.state {
                FlushState::InFlight => FlushState::Idle,
                FlushState::InFlightWithPending => FlushState::PendingFlush,
                other => {
                    warn!(?other, "stroke completion in unexpected state");
                    other
                }
            };
            match result {
                Ok(frame) => out.push(FrameCodec::decode(&frame).map_err(Into::into)),
                Err(e) => out.push(Err(e.into())),
            }
        }
        out
    }

    fn dispatch(&mut self, x: f32, y: f32) {
        self.pending = None;
        self.state = FlushState::InFlight;
        self.dispatched += 1;

        let stroke = BrushStroke {
            x,
            y,
            radius: self.brush.radius,
            strength: self.brush.strength,
            op: self.brush.op,
        };
        debug!(x, y, op = ?stroke.op, seq = self.dispatched, "dispatching brush stroke");

        let backend = Arc::clone(&self.backend);
        let tx = self.completions_tx.clone();
        self.runtime.spawn(async move {
            let result = backend.apply_brush_stroke(stroke).await;
            // Receiver dropped means the session is tearing down.
            let _ = tx.send(result);
        });
    }
}
