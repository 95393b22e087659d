//! Keypress to session action table

use std::path::PathBuf;

use tracing::debug;

use crate::capture::FrameSource;
use crate::display::{DisplaySurface, Key};
use crate::record::FourCc;
use crate::session::CaptureSession;
use crate::CaptureConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Snapshot,
    ToggleRecording,
    Quit,
    ToggleMirror,
    ToggleGaussianBlur,
    ToggleMedianBlur,
    FourierPreview,
    ToggleSharpen,
}

impl Action {
    pub fn for_key(key: Key) -> Option<Self> {
        match key {
            Key::Space => Some(Action::Snapshot),
            Key::Tab => Some(Action::ToggleRecording),
            Key::Escape => Some(Action::Quit),
            Key::Char('m') => Some(Action::ToggleMirror),
            Key::Char('g') => Some(Action::ToggleGaussianBlur),
            Key::Char('h') => Some(Action::ToggleMedianBlur),
            Key::Char('f') => Some(Action::FourierPreview),
            Key::Char('s') => Some(Action::ToggleSharpen),
            _ => None,
        }
    }
}

/// Applies actions to a session. Holds only the default output targets.
#[derive(Debug, Clone)]
pub struct InputDispatcher {
    snapshot_path: PathBuf,
    video_path: PathBuf,
    codec: FourCc,
}

impl InputDispatcher {
    pub fn new(config: &CaptureConfig) -> Self {
        Self {
            snapshot_path: config.snapshot_path.clone(),
            video_path: config.video_path.clone(),
            codec: config.codec,
        }
    }

    /// Handle one input code; returns the action taken, if any
    pub fn dispatch<S, D>(&self, key: Key, session: &mut CaptureSession<S, D>) -> Option<Action>
    where
        S: FrameSource,
        D: DisplaySurface,
    {
        let action = Action::for_key(key)?;
        debug!(?key, ?action, "Dispatching");

        match action {
            Action::Snapshot => session.request_snapshot(self.snapshot_path.clone()),
            Action::ToggleRecording => {
                if session.is_writing_video() {
                    session.stop_recording();
                } else {
                    session.start_recording(self.video_path.clone(), self.codec);
                }
            }
            Action::Quit => session.display_mut().close(),
            Action::ToggleMirror => session.toggles.mirror = !session.toggles.mirror,
            Action::ToggleGaussianBlur => {
                session.toggles.gaussian_blur = !session.toggles.gaussian_blur
            }
            Action::ToggleMedianBlur => session.toggles.median_blur = !session.toggles.median_blur,
            Action::FourierPreview => session.toggles.fourier_preview = true,
            Action::ToggleSharpen => session.toggles.sharpen = !session.toggles.sharpen,
        }

        Some(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bindings() {
        let table = [
            (Key::Space, Action::Snapshot),
            (Key::Tab, Action::ToggleRecording),
            (Key::Escape, Action::Quit),
            (Key::Char('m'), Action::ToggleMirror),
            (Key::Char('g'), Action::ToggleGaussianBlur),
            (Key::Char('h'), Action::ToggleMedianBlur),
            (Key::Char('f'), Action::FourierPreview),
            (Key::Char('s'), Action::ToggleSharpen),
        ];
        for (key, action) in table {
            assert_eq!(Action::for_key(key), Some(action), "{key:?}");
        }
    }

    #[test]
    fn unbound_keys_do_nothing() {
        assert_eq!(Action::for_key(Key::Char('q')), None);
        assert_eq!(Action::for_key(Key::Char('M')), None);
        assert_eq!(Action::for_key(Key::Other), None);
    }
}
