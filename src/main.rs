mod app;
mod assistant;
mod config;
mod editor;
mod error;
mod event;
mod logging;
mod notes;
mod theme;
mod ui;

use app::ScribbyApp;
use assistant::client::AssistantClient;
use assistant::{Assistant, CannedResponses};
use config::AppConfig;
use eframe::egui;
use notes::state::NotesStore;
use notes::store::FileStorage;
use std::sync::mpsc;
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let data_dir = config::data_dir();
    let dir_warning = config::ensure_data_dir(&data_dir);
    let (config, config_warning) = AppConfig::load_or_default(&data_dir);

    if let Err(err) = logging::init(&data_dir, &config.log_filter) {
        eprintln!("logging disabled: {err}");
    }
    let mut startup_warnings = Vec::new();
    if let Some(warning) = dir_warning {
        tracing::warn!(warning = %warning, "data directory unavailable");
        startup_warnings.push(warning);
    }
    if let Some(warning) = config_warning {
        tracing::warn!(warning = %warning, "using default configuration");
        startup_warnings.push(warning);
    }

    let (tx, rx) = mpsc::channel();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .thread_name("scribby-runtime")
        .build()?;

    let assistant = Assistant::new(
        Arc::new(CannedResponses::default()),
        config.assistant_delay(),
        config.assistant_timeout(),
    );
    let client = AssistantClient::new(assistant, tx, runtime.handle().clone());

    let storage = FileStorage::in_dir(&data_dir);
    tracing::info!(path = %storage.path().display(), "opening notes");
    let store = NotesStore::open(Box::new(storage));

    let app = ScribbyApp::new(rx, store, client, &config, startup_warnings);
    let _runtime = runtime;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([720.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Scribby",
        native_options,
        Box::new(move |_creation_context| Ok(Box::new(app))),
    )?;

    Ok(())
}
