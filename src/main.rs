use std::sync::Arc;
use terracarve::app::EditorSession;
use terracarve::backend::{RemoteBackend, RemoteConfig};
use terracarve::config;
use terracarve::ui::{self, UiState};
use terracarve::utils::logging::init_logging;
use terracarve::VERSION;
use tracing::info;

struct EditorApp {
    session: EditorSession,
    ui_state: UiState,
    // The runtime must outlive every spawned backend task.
    _runtime: tokio::runtime::Runtime,
}

impl eframe::App for EditorApp {
    fn update(&mut self, ctx: &eframe::egui::Context, _frame: &mut eframe::Frame) {
        self.session.tick();
        ui::show_editor(ctx, &mut self.session, &mut self.ui_state);
        // Keep ticking so stroke flushes and backend completions are not
        // stalled behind input events.
        ctx.request_repaint();
    }
}

fn main() -> eframe::Result<()> {
    init_logging();

    let runtime = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");

    let addr = std::env::var("TERRACARVE_BACKEND").unwrap_or_else(|_| RemoteConfig::default().addr);
    info!(%addr, "using terrain backend");
    let backend = Arc::new(RemoteBackend::new(RemoteConfig { addr }));

    let settings = config::load_settings().unwrap_or_default();
    let mut session = EditorSession::new(backend, runtime.handle().clone());
    session.set_brush(settings.brush);
    session.fetch_heightmap();

    let app = EditorApp {
        session,
        ui_state: UiState::new(settings),
        _runtime: runtime,
    };

    eframe::run_native(
        &format!("terracarve {}", VERSION),
        eframe::NativeOptions::default(),
        Box::new(move |_cc| Ok(Box::new(app))),
    )
}
