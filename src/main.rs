use anyhow::Result;
use clap::Parser;
use eframe::{egui, run_native, NativeOptions};

use flipbook::app::FlipbookApp;
use flipbook::config::{Cli, Config};

fn main() -> Result<()> {
    let config = Config::from_cli(Cli::parse());

    env_logger::Builder::new()
        .filter_level(config.log_level)
        .parse_default_env()
        .init();

    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([1280.0, 960.0])
        .with_title("Flipbook")
        .with_drag_and_drop(true)
        .with_fullscreen(config.fullscreen);

    let native_options = NativeOptions {
        viewport,
        ..Default::default()
    };

    run_native(
        "Flipbook",
        native_options,
        Box::new(|cc| Ok(Box::new(FlipbookApp::new(cc, config)))),
    )
    .map_err(|e| anyhow::anyhow!("Failed to start application: {}", e))
}
