mod app;
mod config;
mod image_host;
mod record;
mod render;
mod session;
mod shortcuts;
mod store;
mod tools;

use std::path::PathBuf;

use eframe::egui;

use crate::app::{AnnotatorApp, TITLE};
use crate::config::AppConfig;

fn main() -> eframe::Result {
    let (config, config_error) = match AppConfig::load() {
        Ok(config) => (config, None),
        Err(err) => (AppConfig::default(), Some(err)),
    };

    env_logger::Builder::new()
        .parse_filters(&config.log_filter)
        .init();
    if let Some(err) = config_error {
        log::warn!("using default configuration: {err}");
    }

    // An image given on the command line is opened straight away.
    let initial_image = std::env::args_os().nth(1).map(PathBuf::from);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(config.window_size)
            .with_title(TITLE),
        ..Default::default()
    };

    eframe::run_native(
        TITLE,
        options,
        Box::new(move |_cc| Ok(Box::new(AnnotatorApp::new(config, initial_image)))),
    )
}
