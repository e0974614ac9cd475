//! TCP binding of [`TerrainBackend`].
//!
//! Requests are single JSON lines; responses are length-prefixed envelope
//! frames: `[len:u32 LE][kind:u8][payload]` where kind 0 carries a terrain
//! frame in the wire format, kind 1 a progress value (f32 LE) and kind 2 an
//! error string. The sculpting pipeline guarantees one terrain call at a
//! time, and the connection mutex enforces the same for everything else.

use crate::backend::{
    BackendError, BackendResult, BrushStroke, HydraulicParams, NoiseParams, TerrainBackend,
    ThermalParams,
};
use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

const ENVELOPE_TERRAIN: u8 = 0;
const ENVELOPE_PROGRESS: u8 = 1;
const ENVELOPE_ERROR: u8 = 2;

/// Sanity cap on a single envelope frame (a 4096x4096 float heightmap is
/// 64 MiB; anything past double that is a framing error, not data).
const MAX_FRAME_LEN: usize = 128 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub addr: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self { addr: "127.0.0.1:7878".to_string() }
    }
}

#[derive(Serialize)]
#[serde(tag = "cmd", content = "params", rename_all = "camelCase")]
enum Request<'a> {
    GetHeightmap,
    ApplyBrushStroke(&'a BrushStroke),
    GenerateTerrain(&'a NoiseParams),
    RunThermalErosion(&'a ThermalParams),
    RunHydraulicErosion(&'a HydraulicParams),
    AbortErosion,
}

pub struct RemoteBackend {
    config: RemoteConfig,
    conn: Mutex<Option<BufStream<TcpStream>>>,
}

impl RemoteBackend {
    pub fn new(config: RemoteConfig) -> Self {
        Self { config, conn: Mutex::new(None) }
    }

    async fn connect(&self) -> BackendResult<BufStream<TcpStream>> {
        let stream = TcpStream::connect(&self.config.addr).await?;
        info!(addr = %self.config.addr, "connected to terrain backend");
        Ok(BufStream::new(stream))
    }

    /// Send one request and read envelope frames until the terminal terrain
    /// frame or an error frame. Progress frames are forwarded when a sender
    /// is given, dropped otherwise.
    async fn call(
        &self,
        request: Request<'_>,
        progress: Option<&mpsc::UnboundedSender<f32>>,
    ) -> BackendResult<Bytes> {
        let mut guard = self.conn.lock().await;
        if guard.is_none() {
            *guard = Some(self.connect().await?);
        }
        let conn = guard.as_mut().expect("connection established above");

        let mut line = serde_json::to_vec(&request)
            .map_err(|e| BackendError::Transport { reason: e.to_string() })?;
        line.push(b'\n');

        let result = Self::exchange(conn, &line, progress).await;
        if result.is_err() {
            // A failed exchange leaves the stream in an unknown framing
            // state; drop it and reconnect on the next call.
            *guard = None;
        }
        result
    }

    async fn exchange(
        conn: &mut BufStream<TcpStream>,
        line: &[u8],
        progress: Option<&mpsc::UnboundedSender<f32>>,
    ) -> BackendResult<Bytes> {
        conn.write_all(line).await?;
        conn.flush().await?;

        loop {
            let len = conn.read_u32_le().await.map_err(|_| BackendError::Closed)? as usize;
            if len > MAX_FRAME_LEN {
                return Err(BackendError::Transport {
                    reason: format!("oversized envelope frame: {len} bytes"),
                });
            }
            let kind = conn.read_u8().await.map_err(|_| BackendError::Closed)?;
            let mut payload = vec![0u8; len];
            conn.read_exact(&mut payload).await.map_err(|_| BackendError::Closed)?;

            match kind {
                ENVELOPE_TERRAIN => return Ok(Bytes::from(payload)),
                ENVELOPE_PROGRESS => {
                    if payload.len() == 4 {
                        let value =
                            f32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
                        if let Some(tx) = progress {
                            let _ = tx.send(value.clamp(0.0, 1.0));
                        }
                    } else {
                        warn!(len = payload.len(), "malformed progress frame, ignoring");
                    }
                }
                ENVELOPE_ERROR => {
                    let reason = String::from_utf8_lossy(&payload).into_owned();
                    return Err(BackendError::Rejected { reason });
                }
                other => {
                    return Err(BackendError::Transport {
                        reason: format!("unknown envelope kind {other:#04x}"),
                    })
                }
            }
        }
    }
}

#[async_trait]
impl TerrainBackend for RemoteBackend {
    async fn fetch_heightmap(&self) -> BackendResult<Bytes> {
        self.call(Request::GetHeightmap, None).await
    }

    async fn apply_brush_stroke(&self, stroke: BrushStroke) -> BackendResult<Bytes> {
        self.call(Request::ApplyBrushStroke(&stroke), None).await
    }

    async fn generate_terrain(&self, params: NoiseParams) -> BackendResult<Bytes> {
        self.call(Request::GenerateTerrain(&params), None).await
    }

    async fn run_thermal_erosion(&self, params: ThermalParams) -> BackendResult<Bytes> {
        self.call(Request::RunThermalErosion(&params), None).await
    }

    async fn run_hydraulic_erosion(
        &self,
        params: HydraulicParams,
        progress: mpsc::UnboundedSender<f32>,
    ) -> BackendResult<Bytes> {
        self.call(Request::RunHydraulicErosion(&params), Some(&progress)).await
    }

    /// Fire-and-forget. Uses a dedicated short-lived connection because the
    /// primary one is busy streaming the very operation being aborted.
    async fn abort(&self) {
        let line = match serde_json::to_vec(&Request::AbortErosion) {
            Ok(mut l) => {
                l.push(b'\n');
                l
            }
            Err(_) => return,
        };
        match TcpStream::connect(&self.config.addr).await {
            Ok(mut stream) => {
                if let Err(e) = stream.write_all(&line).await {
                    warn!(error = %e, "abort write failed");
                } else {
                    debug!("abort request sent");
                }
            }
            Err(e) => warn!(error = %e, "abort connection failed"),
        }
    }
}
