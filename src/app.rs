use std::path::PathBuf;

use eframe::egui;

use crate::config::AppConfig;
use crate::image_host::{ImageDecoder, RasterDecoder};
use crate::record::{Kind, Point};
use crate::render::{self, Brush};
use crate::session::{Action, FocusScope, Session};
use crate::shortcuts;
use crate::tools::{Hit, InputEvent};

pub const TITLE: &str = "DICOM annotator";

// ── App ─────────────────────────────────────────────────────────────────────

pub struct AnnotatorApp<D = RasterDecoder> {
    session: Session<D>,
    config: AppConfig,
    texture: Option<(u64, egui::TextureHandle)>,
}

impl AnnotatorApp {
    pub fn new(config: AppConfig, initial_image: Option<PathBuf>) -> Self {
        let mut session = Session::new(RasterDecoder);
        if let Some(path) = initial_image {
            session.perform(Action::OpenImage(path));
        }
        Self {
            session,
            config,
            texture: None,
        }
    }
}

impl<D: ImageDecoder> AnnotatorApp<D> {
    fn brush(&self) -> Brush {
        Brush {
            color: self.config.draw_color.to_egui(),
            stroke_width: self.config.stroke_width,
            font_size: self.config.font_size,
        }
    }

    /// Uploads the image once per open; only the overlay is redrawn per frame.
    fn ensure_texture(&mut self, ctx: &egui::Context) {
        let Some(image) = self.session.image() else {
            self.texture = None;
            return;
        };
        if matches!(&self.texture, Some((generation, _)) if *generation == image.generation) {
            return;
        }
        let pixels = &image.pixels;
        let color_image = egui::ColorImage::from_gray(
            [pixels.width(), pixels.height()],
            &pixels.to_gray8(),
        );
        let handle = ctx.load_texture("image", color_image, egui::TextureOptions::NEAREST);
        ctx.send_viewport_cmd(egui::ViewportCommand::Title(format!(
            "{TITLE} - {}",
            image
                .path
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
        )));
        self.texture = Some((image.generation, handle));
    }

    fn toolbar(&mut self, ui: &mut egui::Ui) -> Vec<Action> {
        let mut actions = Vec::new();
        ui.horizontal(|ui| {
            let active = self.session.active_kind();
            for kind in Kind::ALL {
                if ui
                    .selectable_label(active == Some(kind), tool_label(kind))
                    .on_hover_text(shortcuts::label(kind))
                    .clicked()
                {
                    actions.push(Action::ActivateTool(kind));
                }
            }
            ui.separator();
            if ui.button("Open image…").clicked() {
                if let Some(path) = pick_image() {
                    actions.push(Action::OpenImage(path));
                }
            }
            if ui.button("Save annotations").clicked() {
                actions.push(Action::Save);
            }
            if self.session.focus() == FocusScope::TextEntry {
                ui.separator();
                ui.label("Typing: Enter to finish");
            }
        });
        actions
    }

    fn canvas(&mut self, ui: &mut egui::Ui) {
        let (response, painter) =
            ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
        let canvas_rect = response.rect;
        painter.rect_filled(canvas_rect, 0.0, egui::Color32::from_gray(40));

        // Image space maps 1:1 onto screen points from the canvas corner. Only
        // the part of the image inside the canvas counts as drawing surface.
        let image_rect = self
            .texture
            .as_ref()
            .map(|(_, texture)| egui::Rect::from_min_size(canvas_rect.min, texture.size_vec2()));
        let surface = image_rect.map(|rect| rect.intersect(canvas_rect));

        let events = ui.ctx().input(|i| i.events.clone());
        for event in &events {
            for input in to_input(event, canvas_rect.min, surface) {
                self.session.handle(input);
            }
        }

        let (Some(image_rect), Some(surface), Some((_, texture))) =
            (image_rect, surface, &self.texture)
        else {
            painter.text(
                canvas_rect.center(),
                egui::Align2::CENTER_CENTER,
                "Open an image to start annotating",
                egui::FontId::proportional(16.0),
                egui::Color32::GRAY,
            );
            return;
        };
        painter.image(
            texture.id(),
            image_rect,
            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
            egui::Color32::WHITE,
        );

        let brush = self.brush();
        let painter = painter.with_clip_rect(surface);
        for item in self.session.display().iter() {
            render::paint(&painter, image_rect.min, &brush, item);
        }
        for item in &self.session.preview() {
            render::paint(&painter, image_rect.min, &brush, item);
        }
    }
}

impl<D: ImageDecoder> eframe::App for AnnotatorApp<D> {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.ensure_texture(ctx);

        let actions = egui::TopBottomPanel::top("toolbar")
            .show(ctx, |ui| self.toolbar(ui))
            .inner;

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(self.session.status().unwrap_or("Ready"));
                if self.session.image().is_some() {
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let store = self.session.store();
                        let counts: Vec<_> = Kind::ALL
                            .iter()
                            .map(|&kind| format!("{}: {}", kind, store.records(kind).len()))
                            .collect();
                        ui.label(counts.join("  "));
                    });
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| self.canvas(ui));

        for action in actions {
            self.session.perform(action);
        }
    }
}

// ── Input translation ───────────────────────────────────────────────────────

/// `surface` is the visible part of the image; `None` when no image is shown.
fn to_input(event: &egui::Event, origin: egui::Pos2, surface: Option<egui::Rect>) -> Vec<InputEvent> {
    let hit = |pos: egui::Pos2| -> Hit {
        surface
            .is_some_and(|rect| rect.contains(pos))
            .then(|| Point::new(pos.x - origin.x, pos.y - origin.y))
    };
    match event {
        egui::Event::PointerMoved(pos) => vec![InputEvent::Move(hit(*pos))],
        egui::Event::PointerButton {
            pos,
            button: egui::PointerButton::Primary,
            pressed,
            ..
        } => {
            if *pressed {
                vec![InputEvent::Press(hit(*pos))]
            } else {
                vec![InputEvent::Release(hit(*pos))]
            }
        }
        other => shortcuts::translate(other)
            .into_iter()
            .map(InputEvent::Key)
            .collect(),
    }
}

fn tool_label(kind: Kind) -> &'static str {
    match kind {
        Kind::Line => "Lines",
        Kind::Rectangle => "Rectangles",
        Kind::Text => "Text",
    }
}

fn pick_image() -> Option<PathBuf> {
    rfd::FileDialog::new().set_title("Open").pick_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::Key;

    fn rect() -> egui::Rect {
        egui::Rect::from_min_size(egui::pos2(100.0, 50.0), egui::vec2(64.0, 32.0))
    }

    fn button(x: f32, y: f32, pressed: bool) -> egui::Event {
        egui::Event::PointerButton {
            pos: egui::pos2(x, y),
            button: egui::PointerButton::Primary,
            pressed,
            modifiers: egui::Modifiers::NONE,
        }
    }

    fn key(key: egui::Key, modifiers: egui::Modifiers) -> egui::Event {
        egui::Event::Key {
            key,
            physical_key: None,
            pressed: true,
            repeat: false,
            modifiers,
        }
    }

    /// Runs one frame of the canvas with a 400x300 screen.
    fn frame(ctx: &egui::Context, app: &mut AnnotatorApp, events: Vec<egui::Event>) {
        let input = egui::RawInput {
            screen_rect: Some(egui::Rect::from_min_size(
                egui::Pos2::ZERO,
                egui::vec2(400.0, 300.0),
            )),
            events,
            ..Default::default()
        };
        let _ = ctx.run(input, |ctx| {
            app.ensure_texture(ctx);
            egui::CentralPanel::default().show(ctx, |ui| app.canvas(ui));
        });
    }

    /// An app showing a 600x600 image, larger than the screen.
    fn app_with_large_image(dir: &std::path::Path) -> AnnotatorApp {
        let path = dir.join("scan.png");
        image::GrayImage::new(600, 600)
            .save(&path)
            .expect("png should be written");
        let app = AnnotatorApp::new(AppConfig::default(), Some(path));
        assert!(app.session.image().is_some());
        app
    }

    #[test]
    fn pointer_inside_image_maps_to_pixels() {
        assert_eq!(
            to_input(&button(110.0, 70.0, true), rect().min, Some(rect())),
            vec![InputEvent::Press(Some(Point::new(10.0, 20.0)))]
        );
    }

    #[test]
    fn pointer_outside_surface_has_no_hit() {
        assert_eq!(
            to_input(&button(10.0, 10.0, false), rect().min, Some(rect())),
            vec![InputEvent::Release(None)]
        );
        assert_eq!(
            to_input(&egui::Event::PointerMoved(egui::pos2(500.0, 500.0)), rect().min, Some(rect())),
            vec![InputEvent::Move(None)]
        );
        assert_eq!(
            to_input(&button(110.0, 70.0, true), rect().min, None),
            vec![InputEvent::Press(None)]
        );
    }

    #[test]
    fn secondary_button_is_ignored() {
        let event = egui::Event::PointerButton {
            pos: egui::pos2(110.0, 70.0),
            button: egui::PointerButton::Secondary,
            pressed: true,
            modifiers: egui::Modifiers::NONE,
        };
        assert!(to_input(&event, rect().min, Some(rect())).is_empty());
    }

    #[test]
    fn keys_pass_through() {
        assert_eq!(
            to_input(&egui::Event::Text("x".into()), rect().min, None),
            vec![InputEvent::Key(Key::Char('x'))]
        );
    }

    #[test]
    fn shortcut_works_before_any_image_is_open() {
        let ctx = egui::Context::default();
        let mut app = AnnotatorApp::new(AppConfig::default(), None);
        frame(&ctx, &mut app, vec![key(egui::Key::T, egui::Modifiers::CTRL)]);
        assert_eq!(app.session.active_kind(), Some(Kind::Text));
    }

    #[test]
    fn release_below_visible_canvas_discards_line() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let ctx = egui::Context::default();
        let mut app = app_with_large_image(dir.path());

        frame(
            &ctx,
            &mut app,
            vec![
                key(egui::Key::L, egui::Modifiers::CTRL),
                button(50.0, 50.0, true),
                egui::Event::PointerMoved(egui::pos2(350.0, 1500.0)),
                button(350.0, 1500.0, false),
            ],
        );
        assert_eq!(app.session.active_kind(), Some(Kind::Line));
        assert!(app.session.store().records(Kind::Line).is_empty());
    }

    #[test]
    fn release_inside_visible_canvas_records_line() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let ctx = egui::Context::default();
        let mut app = app_with_large_image(dir.path());

        frame(&ctx, &mut app, vec![key(egui::Key::L, egui::Modifiers::CTRL)]);
        frame(&ctx, &mut app, vec![button(50.0, 50.0, true)]);
        frame(&ctx, &mut app, vec![button(150.0, 100.0, false)]);

        let lines = app.session.store().records(Kind::Line);
        assert_eq!(lines.len(), 1);
        let (origin, end) = (lines[0].origin, lines[0].endpoint.expect("line endpoint"));
        assert_eq!((end.x - origin.x, end.y - origin.y), (100.0, 50.0));
    }

    #[test]
    fn typed_text_is_committed_on_enter() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let ctx = egui::Context::default();
        let mut app = app_with_large_image(dir.path());

        frame(
            &ctx,
            &mut app,
            vec![
                key(egui::Key::T, egui::Modifiers::CTRL),
                button(60.0, 60.0, true),
                button(60.0, 60.0, false),
                egui::Event::Text("hi".into()),
            ],
        );
        assert_eq!(app.session.focus(), FocusScope::TextEntry);

        frame(&ctx, &mut app, vec![key(egui::Key::Enter, egui::Modifiers::NONE)]);
        let texts = app.session.store().records(Kind::Text);
        assert_eq!(texts.len(), 1);
        assert_eq!(texts[0].text, "hi");
        assert_eq!(app.session.focus(), FocusScope::Shortcuts);
    }
}
