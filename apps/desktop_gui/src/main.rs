mod backend_bridge;
mod config;
mod controller;
mod media;
mod ui;

use std::path::PathBuf;

use clap::Parser;
use crossbeam_channel::bounded;
use eframe::egui;

use crate::backend_bridge::commands::WorkerCommand;
use crate::controller::events::UiEvent;
use crate::ui::app::{PersistedSettings, SETTINGS_STORAGE_KEY};
use crate::ui::GreenVisionApp;

/// Command-line overrides; anything not given here falls back to the config
/// file, then the environment, then defaults.
#[derive(Debug, Parser)]
#[command(name = "greenvision", about = "Tree detection from satellite images")]
struct Cli {
    /// Base URL of the inference service.
    #[arg(long)]
    server_url: Option<String>,
    /// Path to a greenvision.toml config file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Log filter, e.g. `info` or `client_core=debug`.
    #[arg(long)]
    log: Option<String>,
}

fn main() -> eframe::Result<()> {
    let cli = Cli::parse();
    let settings = config::load_settings(cli.config.as_deref());
    let log_filter = cli.log.clone().unwrap_or_else(|| settings.log_filter.clone());
    tracing_subscriber::fmt().with_env_filter(log_filter).init();

    let (cmd_tx, cmd_rx) = bounded::<WorkerCommand>(256);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(2048);
    backend_bridge::runtime::launch(cmd_rx, ui_tx);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("GreenVision")
            .with_inner_size([1180.0, 840.0])
            .with_min_inner_size([900.0, 600.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };
    eframe::run_native(
        "GreenVision",
        options,
        Box::new(move |cc| {
            let persisted = cc.storage.and_then(|storage| {
                storage
                    .get_string(SETTINGS_STORAGE_KEY)
                    .and_then(|text| serde_json::from_str::<PersistedSettings>(&text).ok())
            });
            Ok(Box::new(GreenVisionApp::new(
                cmd_tx,
                ui_rx,
                settings,
                persisted,
                cli.server_url,
            )))
        }),
    )
}
