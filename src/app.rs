//! Main poll loop

use tracing::info;

use crate::capture::FrameSource;
use crate::display::DisplaySurface;
use crate::error::Result;
use crate::input::InputDispatcher;
use crate::session::CaptureSession;

/// Drive the session until its display is closed
pub fn run<S, D>(session: &mut CaptureSession<S, D>, dispatcher: &InputDispatcher) -> Result<()>
where
    S: FrameSource,
    D: DisplaySurface,
{
    session.display_mut().create()?;
    info!("Running; space = snapshot, tab = record, esc = quit");

    while session.display().is_open() {
        session.enter_frame();
        session.frame();

        let (contrast, brightness) = session
            .display()
            .controls()
            .map_or((0, 0), |c| (c.contrast, c.brightness));
        session.exit_frame(contrast, brightness);

        if let Some(key) = session.display_mut().poll_input() {
            dispatcher.dispatch(key, session);
        }
    }

    session.stop_recording();
    info!(frames = session.frames_processed(), "Display closed");
    Ok(())
}
