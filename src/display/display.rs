//! SDL2 Window Display Module
//! Creates the main preview window plus any named secondary windows, renders
//! RGB frames into them and turns SDL events into symbolic input codes.

use std::collections::{HashMap, VecDeque};

use image::RgbImage;
use sdl2::event::{Event, WindowEvent};
use sdl2::keyboard::{Keycode, Mod};
use sdl2::pixels::PixelFormatEnum;
use sdl2::render::Canvas;
use sdl2::video::Window;
use sdl2::{EventPump, Sdl, VideoSubsystem};
use tracing::{debug, info};

use crate::display::{Controls, DisplaySurface, Key};
use crate::error::{Error, Result};
use crate::WindowConfig;

/// SDL2 Window Display
pub struct Sdl2Display {
    sdl: Sdl,
    video: VideoSubsystem,
    event_pump: EventPump,
    config: WindowConfig,
    main: Option<Canvas<Window>>,
    secondary: HashMap<String, Canvas<Window>>,
    controls: Controls,
    pending: VecDeque<Key>,
}

impl Sdl2Display {
    pub fn new(sdl_context: &Sdl, config: WindowConfig, controls: Controls) -> Result<Self> {
        let video = sdl_context.video().map_err(Error::Display)?;
        let event_pump = sdl_context.event_pump().map_err(Error::Display)?;

        Ok(Self {
            sdl: sdl_context.clone(),
            video,
            event_pump,
            config,
            main: None,
            secondary: HashMap::new(),
            controls,
            pending: VecDeque::new(),
        })
    }

    fn build_canvas(&self, title: &str, width: u32, height: u32) -> Result<Canvas<Window>> {
        let window = self
            .video
            .window(title, width, height)
            .position_centered()
            .resizable()
            .build()
            .map_err(|e| Error::Display(e.to_string()))?;

        window
            .into_canvas()
            .present_vsync()
            .build()
            .map_err(|e| Error::Display(e.to_string()))
    }

    fn render(canvas: &mut Canvas<Window>, frame: &RgbImage) -> Result<()> {
        let (width, height) = frame.dimensions();
        let texture_creator = canvas.texture_creator();

        let mut texture = texture_creator
            .create_texture_streaming(PixelFormatEnum::RGB24, width, height)
            .map_err(|e| Error::Display(e.to_string()))?;

        texture
            .update(None, frame.as_raw(), (width * 3) as usize)
            .map_err(|e| Error::Display(e.to_string()))?;

        canvas.clear();
        canvas.copy(&texture, None, None).map_err(Error::Display)?;
        canvas.present();
        Ok(())
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Quit { .. } => {
                info!("Quit event received");
                self.close();
            }
            Event::Window {
                window_id,
                win_event: WindowEvent::Close,
                ..
            } => {
                if self.main.as_ref().map(|c| c.window().id()) == Some(window_id) {
                    self.close();
                } else {
                    self.secondary.retain(|_, c| c.window().id() != window_id);
                }
            }
            Event::KeyDown {
                keycode: Some(keycode),
                repeat: false,
                ..
            } => self.pending.push_back(map_keycode(keycode)),
            Event::MouseWheel { y, .. } if y != 0 => {
                let shift = self
                    .sdl
                    .keyboard()
                    .mod_state()
                    .intersects(Mod::LSHIFTMOD | Mod::RSHIFTMOD);
                if shift {
                    self.controls.nudge_brightness(y);
                } else {
                    self.controls.nudge_contrast(y);
                }
                debug!(
                    contrast = self.controls.contrast,
                    brightness = self.controls.brightness,
                    "Controls adjusted"
                );
            }
            _ => {}
        }
    }
}

fn map_keycode(keycode: Keycode) -> Key {
    let name = keycode.name();
    match name.as_str() {
        "Space" => Key::Space,
        "Tab" => Key::Tab,
        "Escape" => Key::Escape,
        _ => {
            let mut chars = name.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Key::Char(c.to_ascii_lowercase()),
                _ => Key::Other,
            }
        }
    }
}

impl DisplaySurface for Sdl2Display {
    fn create(&mut self) -> Result<()> {
        if self.main.is_none() {
            let canvas =
                self.build_canvas(&self.config.title, self.config.width, self.config.height)?;
            info!("Window '{}' created", self.config.title);
            self.main = Some(canvas);
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.main.is_some()
    }

    fn show(&mut self, frame: &RgbImage) -> Result<()> {
        match self.main.as_mut() {
            Some(canvas) => Self::render(canvas, frame),
            None => Err(Error::Display("main window is closed".into())),
        }
    }

    fn show_in(&mut self, name: &str, frame: &RgbImage) -> Result<()> {
        if !self.secondary.contains_key(name) {
            let canvas = self.build_canvas(name, frame.width(), frame.height())?;
            debug!("Secondary window '{}' created", name);
            self.secondary.insert(name.to_string(), canvas);
        }
        match self.secondary.get_mut(name) {
            Some(canvas) => Self::render(canvas, frame),
            None => Ok(()),
        }
    }

    fn close(&mut self) {
        if self.main.take().is_some() {
            info!("Window '{}' closed", self.config.title);
        }
        self.secondary.clear();
    }

    fn poll_input(&mut self) -> Option<Key> {
        let events: Vec<Event> = self.event_pump.poll_iter().collect();
        for event in events {
            self.handle_event(event);
        }
        self.pending.pop_front()
    }

    fn controls(&self) -> Option<Controls> {
        Some(self.controls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keycodes_map_to_bindings() {
        assert_eq!(map_keycode(Keycode::Space), Key::Space);
        assert_eq!(map_keycode(Keycode::Tab), Key::Tab);
        assert_eq!(map_keycode(Keycode::Escape), Key::Escape);
        assert_eq!(map_keycode(Keycode::M), Key::Char('m'));
        assert_eq!(map_keycode(Keycode::F), Key::Char('f'));
        assert_eq!(map_keycode(Keycode::Left), Key::Other);
        assert_eq!(map_keycode(Keycode::F1), Key::Other);
    }
}
