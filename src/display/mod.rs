pub mod display;

use image::RgbImage;

pub use display::Sdl2Display;

/// Symbolic input codes, independent of any windowing system's key numbering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Space,
    Tab,
    Escape,
    Char(char),
    Other,
}

/// Integer slider pair attached to the main window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub contrast: i32,
    pub brightness: i32,
    pub max: i32,
}

impl Controls {
    pub fn new(contrast: i32, brightness: i32, max: i32) -> Self {
        let max = max.max(0);
        Self {
            contrast: contrast.clamp(0, max),
            brightness: brightness.clamp(0, max),
            max,
        }
    }

    pub fn nudge_contrast(&mut self, delta: i32) {
        self.contrast = (self.contrast + delta).clamp(0, self.max);
    }

    pub fn nudge_brightness(&mut self, delta: i32) {
        self.brightness = (self.brightness + delta).clamp(0, self.max);
    }
}

/// A window that frames are rendered into and input is read from
pub trait DisplaySurface {
    fn create(&mut self) -> crate::Result<()>;

    fn is_open(&self) -> bool;

    fn show(&mut self, frame: &RgbImage) -> crate::Result<()>;

    /// Render into a named secondary window, creating it on first use
    fn show_in(&mut self, name: &str, frame: &RgbImage) -> crate::Result<()>;

    fn close(&mut self);

    /// Next pending input code; `None` when nothing arrived
    fn poll_input(&mut self) -> Option<Key>;

    /// Current slider values; `None` when the surface has no controls
    fn controls(&self) -> Option<Controls> {
        None
    }
}
