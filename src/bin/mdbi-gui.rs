/*!
 * Desktop dashboard for mdbi-rs - financial indicators of multilateral development banks
 *
 * An interactive chart window providing:
 * - Preset, metric and year-over-year selection
 * - Adding, hiding and removing MDBs
 * - Hover tooltips and a draggable year range slider
 * - SVG/PNG export of the current view
 *
 * Platform support: Windows, macOS, Linux
 */

use eframe::egui;
use std::path::PathBuf;
use std::sync::{Arc, mpsc};
use std::thread;

use mdbi_rs::config::{self, PRESET_NAMES};
use mdbi_rs::error::RenderError;
use mdbi_rs::layout::Rect;
use mdbi_rs::loader::{self, LoadOutcome};
use mdbi_rs::transform::map_locale;
use mdbi_rs::viz::colors::Color;
use mdbi_rs::viz::surface::{Anchor, FillStyle, StrokeStyle, TextStyle};
use mdbi_rs::viz::{self, Surface};
use mdbi_rs::{ChartSession, Client, EntityId, LoadState};

const EXPORT_SIZE: (f64, f64) = (1000.0, 600.0);

fn main() -> Result<(), eframe::Error> {
    env_logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 720.0])
            .with_min_inner_size([640.0, 480.0])
            .with_title("MDB Indicators - mdbi-rs"),
        ..Default::default()
    };

    eframe::run_native(
        "MDB Indicators",
        options,
        Box::new(|_cc| Ok(Box::new(MdbiApp::new()))),
    )
}

struct MdbiApp {
    client: Arc<Client>,
    preset_name: String,
    locale: String,
    session: ChartSession,
    entity_choice: Option<EntityId>,

    // UI state
    status_message: String,
    error_message: String,

    // Loads share one channel so late results still reach the session's stale check.
    load_sender: mpsc::Sender<LoadOutcome>,
    load_receiver: mpsc::Receiver<LoadOutcome>,
    operation_receiver: Option<mpsc::Receiver<OperationResult>>,
}

#[derive(Debug)]
enum OperationResult {
    Success(String),
    Error(String),
}

impl MdbiApp {
    fn new() -> Self {
        let (load_sender, load_receiver) = mpsc::channel();
        let preset_name = PRESET_NAMES[0].to_string();
        let session = match config::preset(&preset_name) {
            Ok(cfg) => ChartSession::new(cfg),
            Err(err) => {
                log::error!("built-in preset failed to load: {err}");
                ChartSession::new(config::ChartConfig::new(Vec::new(), ""))
            }
        };
        Self {
            client: Arc::new(Client::default()),
            preset_name,
            locale: "en".to_string(),
            session,
            entity_choice: None,
            status_message: String::new(),
            error_message: String::new(),
            load_sender,
            load_receiver,
            operation_receiver: None,
        }
    }

    fn switch_preset(&mut self) {
        match config::preset(&self.preset_name) {
            Ok(cfg) => {
                self.session = ChartSession::new(cfg).with_locale(map_locale(&self.locale));
                self.entity_choice = None;
                self.error_message.clear();
            }
            Err(err) => self.error_message = err.to_string(),
        }
    }

    /// Apply finished loads and start the next one if the view asks for it.
    fn pump_loads(&mut self) {
        while let Ok(outcome) = self.load_receiver.try_recv() {
            self.session.apply_load(outcome);
        }
        if let Some(req) = self.session.take_load_request() {
            loader::spawn_load(self.client.clone(), req, self.load_sender.clone());
        }
    }

    fn start_export(&mut self) {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let Some(path) = rfd::FileDialog::new()
            .set_directory(home)
            .set_file_name("mdbi_chart.svg")
            .add_filter("SVG", &["svg"])
            .add_filter("PNG", &["png"])
            .save_file()
        else {
            return;
        };

        // Export without hover state; restore it on the next frame.
        self.session.pointer_left();
        let frame = self.session.prepare(EXPORT_SIZE.0, EXPORT_SIZE.1);
        let (sender, receiver) = mpsc::channel();
        self.operation_receiver = Some(receiver);
        self.status_message = "Exporting chart...".to_string();

        thread::spawn(move || {
            let result = match viz::render_to_file(&frame, &path) {
                Ok(()) => OperationResult::Success(format!("Saved chart to {}", path.display())),
                Err(err) => OperationResult::Error(format!("Failed to export chart: {err}")),
            };
            let _ = sender.send(result);
        });
    }

    fn check_operation_result(&mut self) {
        if let Some(receiver) = &self.operation_receiver
            && let Ok(result) = receiver.try_recv()
        {
            self.operation_receiver = None;

            match result {
                OperationResult::Success(message) => {
                    self.status_message = message;
                    self.error_message.clear();
                }
                OperationResult::Error(error) => {
                    self.error_message = error;
                    self.status_message.clear();
                }
            }
        }
    }

    fn controls(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("Chart:");
            let before = self.preset_name.clone();
            egui::ComboBox::from_id_salt("preset")
                .selected_text(&self.preset_name)
                .show_ui(ui, |ui| {
                    for name in PRESET_NAMES {
                        ui.selectable_value(&mut self.preset_name, name.to_string(), name);
                    }
                });
            if self.preset_name != before {
                self.switch_preset();
            }

            ui.separator();
            ui.label("Metric:");
            let current = self.session.view().selected_metric_id.clone();
            let mut chosen = current.clone();
            let selected_text = self
                .session
                .config()
                .metric(&current)
                .map_or(current.clone(), |m| m.picker_label().to_string());
            egui::ComboBox::from_id_salt("metric")
                .selected_text(selected_text)
                .show_ui(ui, |ui| {
                    for m in &self.session.config().metrics {
                        ui.selectable_value(&mut chosen, m.id.clone(), m.picker_label());
                    }
                });
            if chosen != current {
                self.session.select_metric(&chosen);
            }

            let mut yoy = self.session.view().yoy_mode;
            if ui.checkbox(&mut yoy, "Var % YoY").changed() {
                self.session.set_yoy(yoy);
            }

            ui.separator();
            let before = self.locale.clone();
            egui::ComboBox::from_id_salt("locale")
                .selected_text(&self.locale)
                .show_ui(ui, |ui| {
                    for (tag, name) in [
                        ("en", "English (en)"),
                        ("de", "German (de)"),
                        ("fr", "French (fr)"),
                        ("es", "Spanish (es)"),
                    ] {
                        ui.selectable_value(&mut self.locale, tag.to_string(), name);
                    }
                });
            if self.locale != before {
                self.session.set_locale(map_locale(&self.locale));
            }

            ui.separator();
            let busy = self.operation_receiver.is_some();
            if ui
                .add_enabled(!busy, egui::Button::new("Export..."))
                .clicked()
            {
                self.start_export();
            }
        });
    }

    fn legend(&mut self, ui: &mut egui::Ui) {
        ui.heading("MDBs");
        ui.add_space(5.0);
        for entry in self.session.legend_entries() {
            ui.horizontal(|ui| {
                let mut visible = !entry.hidden;
                let color = color32(entry.color, if entry.has_data { 1.0 } else { 0.4 });
                if ui.checkbox(&mut visible, "").changed() {
                    self.session.toggle_visibility(entry.key);
                }
                let label = ui.colored_label(color, &entry.label);
                if !entry.has_data {
                    label.on_hover_text("No data for this metric");
                }
                if ui.small_button("×").on_hover_text("Remove").clicked() {
                    self.session.remove_entity(entry.key);
                }
            });
        }

        ui.add_space(10.0);
        let addable = self.session.addable_entities();
        if addable.is_empty() {
            return;
        }
        let selected_text = self
            .entity_choice
            .and_then(|id| addable.iter().find(|e| e.id == id))
            .map_or_else(|| "Add MDB...".to_string(), |e| e.label());
        egui::ComboBox::from_id_salt("add-entity")
            .selected_text(selected_text)
            .show_ui(ui, |ui| {
                for e in &addable {
                    ui.selectable_value(&mut self.entity_choice, Some(e.id), e.label());
                }
            });
        if let Some(id) = self.entity_choice
            && ui.button("Add").clicked()
        {
            self.session.add_entity(id);
            self.entity_choice = None;
        }
    }

    fn chart(&mut self, ui: &mut egui::Ui) {
        let size = ui.available_size();
        let (response, painter) = ui.allocate_painter(size, egui::Sense::click_and_drag());
        let origin = response.rect.min;
        let local = |p: egui::Pos2| ((p.x - origin.x) as f64, (p.y - origin.y) as f64);

        if response.drag_started()
            && let Some(p) = ui.input(|i| i.pointer.press_origin())
        {
            let (x, y) = local(p);
            self.session.pointer_pressed(x, y);
        }
        if let Some(p) = response.hover_pos().or(response.interact_pointer_pos()) {
            let (x, y) = local(p);
            self.session.pointer_moved(x, y);
        } else if !self.session.is_dragging() {
            self.session.pointer_left();
        }
        if self.session.is_dragging() && ui.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.session.cancel_drag();
        }
        if response.drag_stopped() {
            self.session.pointer_released();
        }
        if response.clicked()
            && let Some(p) = response.interact_pointer_pos()
        {
            let (x, y) = local(p);
            self.session.click(x, y);
        }

        let frame = self
            .session
            .prepare(response.rect.width() as f64, response.rect.height() as f64);
        let mut surface = EguiSurface {
            painter: &painter,
            origin,
        };
        painter.rect_filled(response.rect, 0.0, egui::Color32::WHITE);
        if let Err(err) = viz::render_frame(&frame, &mut surface) {
            log::error!("chart render failed: {err}");
        }
    }
}

impl eframe::App for MdbiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.pump_loads();
        self.check_operation_result();

        if *self.session.state() == LoadState::Loading || self.operation_receiver.is_some() {
            ctx.request_repaint();
        }

        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            ui.add_space(4.0);
            self.controls(ui);
            if !self.status_message.is_empty() {
                ui.colored_label(egui::Color32::DARK_GREEN, &self.status_message);
            }
            if !self.error_message.is_empty() {
                ui.colored_label(egui::Color32::RED, &self.error_message);
            }
            ui.add_space(4.0);
        });

        egui::SidePanel::right("legend")
            .resizable(false)
            .default_width(180.0)
            .show(ctx, |ui| self.legend(ui));

        egui::CentralPanel::default().show(ctx, |ui| self.chart(ui));
    }
}

fn color32(c: Color, opacity: f64) -> egui::Color32 {
    let a = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
    egui::Color32::from_rgba_unmultiplied(c.r, c.g, c.b, a)
}

fn stroke(s: StrokeStyle) -> egui::Stroke {
    egui::Stroke::new(s.width as f32, color32(s.color, s.opacity))
}

/// [`Surface`] over the egui painter; frame coordinates are relative to `origin`.
struct EguiSurface<'a> {
    painter: &'a egui::Painter,
    origin: egui::Pos2,
}

impl EguiSurface<'_> {
    fn pos(&self, p: (f64, f64)) -> egui::Pos2 {
        self.origin + egui::vec2(p.0 as f32, p.1 as f32)
    }
}

impl Surface for EguiSurface<'_> {
    fn rect(
        &mut self,
        rect: Rect,
        fill: Option<FillStyle>,
        stroke_style: Option<StrokeStyle>,
    ) -> Result<(), RenderError> {
        let r = egui::Rect::from_min_size(
            self.pos((rect.x, rect.y)),
            egui::vec2(rect.width as f32, rect.height as f32),
        );
        if let Some(f) = fill {
            self.painter.rect_filled(r, 0.0, color32(f.color, f.opacity));
        }
        if let Some(s) = stroke_style {
            self.painter.rect_stroke(r, 0.0, stroke(s));
        }
        Ok(())
    }

    fn polyline(&mut self, points: &[(f64, f64)], s: StrokeStyle) -> Result<(), RenderError> {
        if points.len() < 2 {
            return Ok(());
        }
        let pts = points.iter().map(|p| self.pos(*p)).collect();
        self.painter.add(egui::Shape::line(pts, stroke(s)));
        Ok(())
    }

    fn area(
        &mut self,
        upper: &[(f64, f64)],
        baseline: f64,
        fill: FillStyle,
    ) -> Result<(), RenderError> {
        // egui only fills convex polygons; one trapezoid per segment.
        let color = color32(fill.color, fill.opacity);
        for w in upper.windows(2) {
            let (a, b) = (w[0], w[1]);
            let quad = vec![
                self.pos(a),
                self.pos(b),
                self.pos((b.0, baseline)),
                self.pos((a.0, baseline)),
            ];
            self.painter
                .add(egui::Shape::convex_polygon(quad, color, egui::Stroke::NONE));
        }
        Ok(())
    }

    fn circle(
        &mut self,
        center: (f64, f64),
        radius: f64,
        fill: Option<FillStyle>,
        stroke_style: Option<StrokeStyle>,
    ) -> Result<(), RenderError> {
        let fill = fill.map_or(egui::Color32::TRANSPARENT, |f| color32(f.color, f.opacity));
        let s = stroke_style.map_or(egui::Stroke::NONE, stroke);
        self.painter.circle(self.pos(center), radius as f32, fill, s);
        Ok(())
    }

    fn text(&mut self, pos: (f64, f64), text: &str, style: TextStyle) -> Result<(), RenderError> {
        let align = match style.anchor {
            Anchor::Start => egui::Align2::LEFT_CENTER,
            Anchor::Middle => egui::Align2::CENTER_CENTER,
            Anchor::End => egui::Align2::RIGHT_CENTER,
        };
        self.painter.text(
            self.pos(pos),
            align,
            text,
            egui::FontId::proportional(style.size as f32),
            color32(style.color, style.opacity),
        );
        Ok(())
    }
}
