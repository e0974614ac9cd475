//! Editor chrome: control panel plus the sculptable viewport.
//!
//! Everything here is thin glue; the pipeline invariants live in
//! [`crate::app::EditorSession`] and below. The viewport shows the shaded
//! top-down view and converts pointer positions into heightmap-space
//! coordinates for the stroke scheduler.

use crate::app::EditorSession;
use crate::backend::{BrushOp, NoiseType};
use crate::config::{self, EditorSettings};
use eframe::egui;
use tracing::warn;

/// Side length of the viewport widget, matching the capture resolution.
const VIEWPORT_SIZE: f32 = 512.0;

pub struct UiState {
    pub settings: EditorSettings,
    viewport_tex: Option<egui::TextureHandle>,
    last_view_serial: u64,
    /// Mesh revision the brush cursor was last attached to; a rebuild
    /// invalidates it and the cursor reattaches on the next hover.
    cursor_revision: u64,
    cursor: Option<egui::Pos2>,
}

impl UiState {
    pub fn new(settings: EditorSettings) -> Self {
        Self {
            settings,
            viewport_tex: None,
            last_view_serial: 0,
            cursor_revision: 0,
            cursor: None,
        }
    }
}

pub fn show_editor(ctx: &egui::Context, session: &mut EditorSession, state: &mut UiState) {
    egui::SidePanel::left("controls")
        .resizable(false)
        .show(ctx, |ui| show_controls(ui, session, state));
    egui::CentralPanel::default().show(ctx, |ui| show_viewport(ui, session, state));
}

fn show_controls(ui: &mut egui::Ui, session: &mut EditorSession, state: &mut UiState) {
    ui.heading("Brush");
    let brush = &mut state.settings.brush;
    egui::ComboBox::from_label("Operator")
        .selected_text(format!("{:?}", brush.op))
        .show_ui(ui, |ui| {
            ui.selectable_value(&mut brush.op, BrushOp::Raise, "Raise");
            ui.selectable_value(&mut brush.op, BrushOp::Lower, "Lower");
            ui.selectable_value(&mut brush.op, BrushOp::Smooth, "Smooth");
            ui.selectable_value(&mut brush.op, BrushOp::Flatten, "Flatten");
        });
    ui.add(egui::Slider::new(&mut brush.radius, 1.0..=64.0).text("Radius"));
    ui.add(egui::Slider::new(&mut brush.strength, 0.01..=1.0).text("Strength"));
    session.set_brush(*brush);

    ui.separator();
    ui.heading("Generate");
    let noise = &mut state.settings.noise;
    egui::ComboBox::from_label("Noise")
        .selected_text(format!("{:?}", noise.noise_type))
        .show_ui(ui, |ui| {
            ui.selectable_value(&mut noise.noise_type, NoiseType::Perlin, "Perlin");
            ui.selectable_value(&mut noise.noise_type, NoiseType::Simplex, "Simplex");
        });
    ui.horizontal(|ui| {
        ui.label("Seed");
        ui.add(egui::DragValue::new(&mut noise.seed));
    });
    ui.add(egui::Slider::new(&mut noise.octaves, 1..=10).text("Octaves"));
    ui.add(egui::Slider::new(&mut noise.frequency, 0.1..=8.0).text("Frequency"));
    if ui
        .add_enabled(!session.is_busy(), egui::Button::new("Generate terrain"))
        .clicked()
    {
        session.generate_terrain(state.settings.noise);
    }

    ui.separator();
    ui.heading("Erosion");
    if ui
        .add_enabled(!session.is_busy(), egui::Button::new("Thermal erosion"))
        .clicked()
    {
        session.run_thermal_erosion(state.settings.thermal);
    }
    if ui
        .add_enabled(!session.is_busy(), egui::Button::new("Hydraulic erosion"))
        .clicked()
    {
        session.run_hydraulic_erosion(state.settings.hydraulic);
    }
    if session.is_busy() {
        if let Some(progress) = session.progress() {
            ui.add(egui::ProgressBar::new(progress).show_percentage());
        } else {
            ui.spinner();
        }
        if ui.button("Abort").clicked() {
            session.abort();
        }
    }

    ui.separator();
    ui.heading("Texture");
    if ui
        .add_enabled(session.has_mesh(), egui::Button::new("Apply texture edit"))
        .clicked()
    {
        apply_texture_edit(session);
    }
    if ui
        .add_enabled(session.has_texture(), egui::Button::new("Clear texture"))
        .clicked()
    {
        session.clear_texture();
    }

    ui.separator();
    ui.heading("Export");
    if ui
        .add_enabled(session.has_mesh(), egui::Button::new("Capture view PNG"))
        .clicked()
    {
        match session.capture_png() {
            Ok(bytes) => write_export(session, "capture.png", &bytes),
            Err(e) => session.last_error = Some(e.to_string()),
        }
    }
    if ui
        .add_enabled(session.has_mesh(), egui::Button::new("Export heightmap PNG"))
        .clicked()
    {
        match session.export_heightmap_png16() {
            Ok(bytes) => write_export(session, "heightmap16.png", &bytes),
            Err(e) => session.last_error = Some(e.to_string()),
        }
    }

    ui.separator();
    ui.horizontal(|ui| {
        if ui.button("Save settings").clicked() {
            if let Err(e) = config::save_settings(&state.settings) {
                session.last_error = Some(e.to_string());
            }
        }
        if ui.button("Load settings").clicked() {
            match config::load_settings() {
                Ok(settings) => {
                    session.set_brush(settings.brush);
                    state.settings = settings;
                }
                Err(e) => session.last_error = Some(e.to_string()),
            }
        }
    });

    ui.separator();
    ui.label(&session.status_message);
    if let Some(err) = session.last_error.clone() {
        ui.colored_label(egui::Color32::LIGHT_RED, err);
        if ui.small_button("Dismiss").clicked() {
            session.last_error = None;
        }
    }
}

fn show_viewport(ui: &mut egui::Ui, session: &mut EditorSession, state: &mut UiState) {
    if session.viewport_image().is_none() {
        ui.centered_and_justified(|ui| {
            ui.label("No terrain yet. Generate one or connect a backend.");
        });
        return;
    }

    let refreshed = session.view_serial();
    if state.viewport_tex.is_none() || refreshed != state.last_view_serial {
        let color = {
            let img = session.viewport_image().expect("rendered above");
            egui::ColorImage::from_rgba_unmultiplied(
                [img.width() as usize, img.height() as usize],
                img.as_raw(),
            )
        };
        match state.viewport_tex.as_mut() {
            Some(tex) => tex.set(color, egui::TextureOptions::LINEAR),
            None => {
                state.viewport_tex =
                    Some(ui.ctx().load_texture("viewport", color, egui::TextureOptions::LINEAR));
            }
        }
        state.last_view_serial = refreshed;
    }

    let Some(tex) = state.viewport_tex.as_ref() else {
        return;
    };
    let response = ui.add(
        egui::Image::new(tex)
            .fit_to_exact_size(egui::vec2(VIEWPORT_SIZE, VIEWPORT_SIZE))
            .sense(egui::Sense::click_and_drag()),
    );

    // A full rebuild replaces the geometry the cursor referenced.
    if session.mesh_revision() != state.cursor_revision {
        state.cursor = None;
        state.cursor_revision = session.mesh_revision();
    }

    let Some((mesh_w, mesh_h)) = session.mesh().map(|m| (m.width(), m.height())) else {
        return;
    };
    let rect = response.rect;
    let to_heightmap = move |pos: egui::Pos2| -> (f32, f32) {
        let u = ((pos.x - rect.left()) / rect.width()).clamp(0.0, 1.0);
        let v = ((pos.y - rect.top()) / rect.height()).clamp(0.0, 1.0);
        (u * (mesh_w - 1) as f32, v * (mesh_h - 1) as f32)
    };

    if response.drag_started() {
        if let Some((x, y)) = response.interact_pointer_pos().map(to_heightmap) {
            session.pointer_down(x, y);
        }
    } else if response.dragged() {
        if let Some((x, y)) = response.interact_pointer_pos().map(to_heightmap) {
            session.pointer_move(x, y);
        }
    }
    if response.drag_stopped() || (!response.hovered() && !response.dragged()) {
        session.pointer_up();
    }

    state.cursor = response.hover_pos();
    if let Some(pos) = state.cursor {
        if let Some(mesh) = session.mesh() {
            let px_per_cell = response.rect.width() / (mesh.width().max(2) - 1) as f32;
            let radius = session.brush().radius * px_per_cell;
            ui.painter().circle_stroke(
                pos,
                radius,
                egui::Stroke::new(1.5, egui::Color32::from_white_alpha(180)),
            );
        }
    }
}

/// The external editing workflow drops its result and mask next to the
/// working directory; compositing picks them up from there.
fn apply_texture_edit(session: &mut EditorSession) {
    let result = std::fs::read("edit_result.png");
    let mask = std::fs::read("edit_mask.png");
    match (result, mask) {
        (Ok(result), Ok(mask)) => {
            if let Err(e) = session.composite_texture(&result, &mask) {
                session.last_error = Some(e.to_string());
            } else {
                session.status_message = "Texture edit composited".to_string();
            }
        }
        (r, m) => {
            if let Err(e) = r.and(m) {
                warn!(error = %e, "texture edit files missing");
                session.last_error =
                    Some("expected edit_result.png and edit_mask.png in working directory".into());
            }
        }
    }
}

fn write_export(session: &mut EditorSession, name: &str, bytes: &[u8]) {
    match std::fs::write(name, bytes) {
        Ok(()) => session.status_message = format!("Wrote {name}"),
        Err(e) => session.last_error = Some(format!("writing {name}: {e}")),
    }
}
