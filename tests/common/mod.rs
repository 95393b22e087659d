//! In-memory stand-ins for the camera, window, video writer and clock.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::{Duration, Instant};

use cameo::capture::FrameSource;
use cameo::display::{Controls, DisplaySurface, Key};
use cameo::record::{SinkFactory, SinkSpec, VideoSink};
use cameo::session::Clock;
use cameo::{Error, Result};
use image::{Rgb, RgbImage};

pub const WIDTH: u32 = 24;
pub const HEIGHT: u32 = 16;

/// Frame `n` (1-based) carries `n` in the red channel of its first pixel
pub fn numbered_frame(n: u32) -> RgbImage {
    let mut img = RgbImage::from_fn(WIDTH, HEIGHT, |x, y| {
        Rgb([(x * 7 + y) as u8, (y * 11) as u8, ((x * y) % 256) as u8])
    });
    img.put_pixel(0, 0, Rgb([n as u8, 0, 0]));
    img
}

pub fn frame_number(img: &RgbImage) -> u32 {
    u32::from(img.get_pixel(0, 0).0[0])
}

/// Camera producing `limit` numbered frames, then nothing
pub struct FakeSource {
    pub produced: u32,
    pub limit: u32,
    pub fps: f64,
    gaps: u32,
    grabbed: bool,
}

impl FakeSource {
    pub fn new(limit: u32, fps: f64) -> Self {
        Self {
            produced: 0,
            limit,
            fps,
            gaps: 0,
            grabbed: false,
        }
    }

    /// Report no frame for the first `gaps` grabs
    pub fn after_gaps(mut self, gaps: u32) -> Self {
        self.gaps = gaps;
        self
    }
}

impl FrameSource for FakeSource {
    fn is_opened(&self) -> bool {
        true
    }

    fn grab(&mut self) -> bool {
        if self.gaps > 0 {
            self.gaps -= 1;
            self.grabbed = false;
            return false;
        }
        self.grabbed = self.produced < self.limit;
        if self.grabbed {
            self.produced += 1;
        }
        self.grabbed
    }

    fn retrieve(&mut self) -> Option<RgbImage> {
        if std::mem::take(&mut self.grabbed) {
            Some(numbered_frame(self.produced))
        } else {
            None
        }
    }

    fn fps(&self) -> f64 {
        self.fps
    }

    fn frame_size(&self) -> (u32, u32) {
        (WIDTH, HEIGHT)
    }
}

/// Window that records what it was asked to show and replays scripted keys
#[derive(Default)]
pub struct FakeDisplay {
    pub open: bool,
    pub shown: Vec<RgbImage>,
    pub secondary: Vec<(String, RgbImage)>,
    pub script: VecDeque<Key>,
    pub controls: Option<Controls>,
}

impl FakeDisplay {
    pub fn opened() -> Self {
        Self {
            open: true,
            ..Self::default()
        }
    }

    pub fn scripted(keys: impl IntoIterator<Item = Key>) -> Self {
        Self {
            script: keys.into_iter().collect(),
            ..Self::default()
        }
    }
}

impl DisplaySurface for FakeDisplay {
    fn create(&mut self) -> Result<()> {
        self.open = true;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn show(&mut self, frame: &RgbImage) -> Result<()> {
        self.shown.push(frame.clone());
        Ok(())
    }

    fn show_in(&mut self, name: &str, frame: &RgbImage) -> Result<()> {
        self.secondary.push((name.to_string(), frame.clone()));
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn poll_input(&mut self) -> Option<Key> {
        let key = self.script.pop_front();
        if key.is_none() {
            // Out of script: behave like a user closing the window
            self.close();
        }
        key
    }

    fn controls(&self) -> Option<Controls> {
        self.controls
    }
}

/// Everything written to sinks opened through a [`FakeSinks`]
#[derive(Default)]
pub struct SinkLog {
    pub opened: Vec<SinkSpec>,
    pub frames: Vec<u32>,
}

#[derive(Clone, Default)]
pub struct FakeSinks {
    pub log: Rc<RefCell<SinkLog>>,
    pub fail: Rc<Cell<bool>>,
}

struct FakeSink {
    log: Rc<RefCell<SinkLog>>,
}

impl VideoSink for FakeSink {
    fn write(&mut self, frame: &RgbImage) -> Result<()> {
        self.log.borrow_mut().frames.push(frame_number(frame));
        Ok(())
    }
}

impl SinkFactory for FakeSinks {
    fn open(&mut self, spec: &SinkSpec) -> Result<Box<dyn VideoSink>> {
        if self.fail.get() {
            return Err(Error::Sink("refused".into()));
        }
        self.log.borrow_mut().opened.push(spec.clone());
        Ok(Box::new(FakeSink {
            log: Rc::clone(&self.log),
        }))
    }
}

/// Clock advanced by hand
#[derive(Clone)]
pub struct ManualClock {
    base: Instant,
    offset: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Rc::new(Cell::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.offset.set(self.offset.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.offset.get()
    }
}
