use eframe::egui;

use crate::record::Kind;
use crate::tools::Key;

pub fn tool_for(key: &Key) -> Option<Kind> {
    match key {
        Key::Ctrl('l') => Some(Kind::Line),
        Key::Ctrl('r') => Some(Kind::Rectangle),
        Key::Ctrl('t') => Some(Kind::Text),
        _ => None,
    }
}

pub fn label(kind: Kind) -> &'static str {
    match kind {
        Kind::Line => "Ctrl+L",
        Kind::Rectangle => "Ctrl+R",
        Kind::Text => "Ctrl+T",
    }
}

/// Keys carried by one toolkit event. Typed text arrives as `Event::Text`,
/// editing and modifier chords as `Event::Key`.
pub fn translate(event: &egui::Event) -> Vec<Key> {
    match event {
        egui::Event::Text(text) => text.chars().map(Key::Char).collect(),
        egui::Event::Key {
            key,
            pressed: true,
            modifiers,
            ..
        } => {
            if modifiers.ctrl || modifiers.command {
                return letter(*key).map(Key::Ctrl).into_iter().collect();
            }
            match key {
                egui::Key::Backspace => vec![Key::Backspace],
                egui::Key::Enter => vec![Key::Enter],
                _ => Vec::new(),
            }
        }
        _ => Vec::new(),
    }
}

fn letter(key: egui::Key) -> Option<char> {
    let mut chars = key.name().chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => Some(c.to_ascii_lowercase()),
        _ => None,
    }
}
