//! Cameo: live webcam preview with toggleable filters, snapshots and recording

use std::path::Path;

use cameo::capture::V4l2Capture;
use cameo::display::{Controls, Sdl2Display};
use cameo::input::InputDispatcher;
use cameo::session::CaptureSession;
use cameo::{app, record, Config, CONFIG_FILE};
use color_eyre::{eyre::eyre, Result};
use tracing::info;

fn main() -> Result<()> {
    // Initialize error handling and logging
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter("cameo=debug")
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .init();

    info!("Cameo launching...");

    let config = Config::load(Path::new(CONFIG_FILE))?;

    let camera = V4l2Capture::open(config.camera.clone())?;

    let sdl_context = sdl2::init().map_err(|e| eyre!(e))?;
    let controls = Controls::new(
        config.processing.contrast,
        config.processing.brightness,
        config.processing.slider_max,
    );
    let display = Sdl2Display::new(&sdl_context, config.window.clone(), controls)?;

    let mut session = CaptureSession::new(
        camera,
        display,
        record::default_factory(),
        config.processing.clone(),
    );
    let dispatcher = InputDispatcher::new(&config.capture);

    app::run(&mut session, &dispatcher)?;

    info!("Cameo shutting down");
    Ok(())
}
