use eframe::egui;
use serde::{Deserialize, Serialize};

use crate::record::{Kind, Point, Record};

// ── Color ───────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DrawColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl DrawColor {
    pub fn to_egui(self) -> egui::Color32 {
        egui::Color32::from_rgb(
            (self.r.clamp(0.0, 1.0) * 255.0) as u8,
            (self.g.clamp(0.0, 1.0) * 255.0) as u8,
            (self.b.clamp(0.0, 1.0) * 255.0) as u8,
        )
    }
}

impl Default for DrawColor {
    fn default() -> Self {
        Self {
            r: 1.0,
            g: 0.0,
            b: 0.0,
        }
    }
}

// ── Primitives ──────────────────────────────────────────────────────────────

/// What the display collaborator knows how to draw, in image space.
#[derive(Clone, Debug, PartialEq)]
pub enum Primitive {
    Segment { from: Point, to: Point },
    Text { at: Point, text: String },
}

pub fn segment(from: Point, to: Point) -> Primitive {
    Primitive::Segment { from, to }
}

/// The four sides of the axis-aligned box with opposite corners `a` and `b`,
/// walked a → (b.x, a.y) → b → (a.x, b.y) → a.
pub fn box_segments(a: Point, b: Point) -> [Primitive; 4] {
    let top_right = Point::new(b.x, a.y);
    let bottom_left = Point::new(a.x, b.y);
    [
        segment(a, top_right),
        segment(top_right, b),
        segment(b, bottom_left),
        segment(bottom_left, a),
    ]
}

pub fn primitives(record: &Record) -> Vec<Primitive> {
    match (record.kind, record.endpoint) {
        (Kind::Line, Some(end)) => vec![segment(record.origin, end)],
        (Kind::Rectangle, Some(corner)) => box_segments(record.origin, corner).to_vec(),
        (Kind::Text, _) => vec![Primitive::Text {
            at: record.origin,
            text: record.text.clone(),
        }],
        (Kind::Line | Kind::Rectangle, None) => Vec::new(),
    }
}

/// Everything already committed to the overlay, in draw order.
#[derive(Debug, Default)]
pub struct DisplayList {
    items: Vec<Primitive>,
}

impl DisplayList {
    pub fn push_record(&mut self, record: &Record) {
        self.items.extend(primitives(record));
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Primitive> {
        self.items.iter()
    }
}

#[cfg(test)]
impl DisplayList {
    pub fn len(&self) -> usize {
        self.items.len()
    }
}

// ── Painting ────────────────────────────────────────────────────────────────

pub struct Brush {
    pub color: egui::Color32,
    pub stroke_width: f32,
    pub font_size: f32,
}

/// Paints one primitive with image space anchored at `image_origin` on screen.
pub fn paint(painter: &egui::Painter, image_origin: egui::Pos2, brush: &Brush, item: &Primitive) {
    let to_screen = |p: Point| image_origin + egui::vec2(p.x, p.y);
    match item {
        Primitive::Segment { from, to } => {
            painter.line_segment(
                [to_screen(*from), to_screen(*to)],
                egui::Stroke::new(brush.stroke_width, brush.color),
            );
        }
        Primitive::Text { at, text } => {
            painter.text(
                to_screen(*at),
                egui::Align2::LEFT_BOTTOM,
                text,
                egui::FontId::proportional(brush.font_size),
                brush.color,
            );
        }
    }
}
