pub mod config;
pub mod intersection;
pub mod ui;

use crate::config::SimulationConfig;
use crate::intersection::IntersectionHandle;
use crate::ui::CrosslightUI;
use color_eyre::{eyre::eyre, Result};
use eframe::egui;
use tokio::sync::mpsc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config = SimulationConfig::load_or_default()?;
    info!("starting crosslight with config: {:?}", config);

    let (click_sender, click_receiver) = mpsc::channel(100);

    let handle = IntersectionHandle::spawn(&config, click_receiver);
    let snapshot_receiver = handle.subscribe();

    info!("starting UI");
    let mut native_options = eframe::NativeOptions::default();
    native_options.viewport = egui::ViewportBuilder::default()
        .with_inner_size(egui::vec2(200.0 * config.lane_count as f32, 420.0))
        .with_title("Crosslight");

    eframe::run_native(
        "Crosslight",
        native_options,
        Box::new(|cc| {
            Ok(Box::new(CrosslightUI::new(
                cc,
                click_sender,
                snapshot_receiver,
            )))
        }),
    )
    .map_err(|e| eyre!("UI terminated: {}", e))?;

    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
