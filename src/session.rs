//! Per-frame capture lifecycle: enter, process, persist, exit

use std::path::PathBuf;
use std::time::Instant;

use image::{DynamicImage, RgbImage};
use tracing::{debug, info, warn};

use crate::capture::FrameSource;
use crate::display::DisplaySurface;
use crate::ops;
use crate::record::{FourCc, SinkFactory, SinkSpec, VideoSink};
use crate::ProcessingConfig;

/// Secondary window the Fourier spectrum is rendered into
pub const FOURIER_WINDOW: &str = "Transformed";

/// Frames that must be processed before the running estimate may stand in
/// for an unknown camera frame rate
pub const FPS_WARMUP_FRAMES: u64 = 20;

/// Wall-clock source for the FPS estimate
pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Processing switches; all of them may be on at once
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Toggles {
    pub mirror: bool,
    pub gaussian_blur: bool,
    pub median_blur: bool,
    /// One-shot, cleared once the spectrum has been shown
    pub fourier_preview: bool,
    pub sharpen: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recording {
    pub path: PathBuf,
    pub codec: FourCc,
}

pub struct CaptureSession<S, D> {
    source: S,
    display: D,
    sinks: Box<dyn SinkFactory>,
    clock: Box<dyn Clock>,
    processing: ProcessingConfig,

    pub toggles: Toggles,

    pending_snapshot: Option<PathBuf>,
    recording: Option<Recording>,
    sink: Option<Box<dyn VideoSink>>,
    /// First frame rate resolved for the current recording
    recording_fps: Option<f64>,
    sink_error_reported: bool,

    current: Option<RgbImage>,
    entered: bool,
    frames_processed: u64,
    start_time: Option<Instant>,
    estimated_fps: u64,
}

impl<S: FrameSource, D: DisplaySurface> CaptureSession<S, D> {
    pub fn new(
        source: S,
        display: D,
        sinks: Box<dyn SinkFactory>,
        processing: ProcessingConfig,
    ) -> Self {
        Self {
            source,
            display,
            sinks,
            clock: Box::new(SystemClock),
            processing,
            toggles: Toggles::default(),
            pending_snapshot: None,
            recording: None,
            sink: None,
            recording_fps: None,
            sink_error_reported: false,
            current: None,
            entered: false,
            frames_processed: 0,
            start_time: None,
            estimated_fps: 0,
        }
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Coarse frames-per-second figure; zero until a full second has elapsed
    pub fn estimated_fps(&self) -> u64 {
        self.estimated_fps
    }

    pub fn is_writing_image(&self) -> bool {
        self.pending_snapshot.is_some()
    }

    pub fn is_writing_video(&self) -> bool {
        self.recording.is_some()
    }

    pub fn recording(&self) -> Option<&Recording> {
        self.recording.as_ref()
    }

    /// Ask the source to advance. Nothing is decoded yet.
    pub fn enter_frame(&mut self) {
        self.entered = self.source.is_opened() && self.source.grab();
    }

    /// The frame grabbed by the last `enter_frame`, retrieved on first access
    pub fn frame(&mut self) -> Option<&RgbImage> {
        if self.entered && self.current.is_none() {
            self.current = self.source.retrieve();
        }
        self.current.as_ref()
    }

    /// Finish the tick: process, show, persist and release the current frame.
    ///
    /// A tick without a frame is skipped entirely, FPS bookkeeping included;
    /// a pending snapshot stays pending.
    pub fn exit_frame(&mut self, contrast: i32, brightness: i32) {
        self.frame();
        let Some(mut frame) = self.current.take() else {
            self.entered = false;
            return;
        };

        self.update_fps_estimate();
        self.frames_processed += 1;

        if self.display.is_open() {
            frame = self.process(frame, contrast, brightness);
            if let Err(e) = self.display.show(&frame) {
                warn!("Failed to show frame: {}", e);
            }
        }

        if let Some(path) = self.pending_snapshot.take() {
            match ops::write_image(&path, &frame) {
                Ok(()) => info!("Snapshot written to {}", path.display()),
                Err(e) => warn!("Snapshot to {} failed: {}", path.display(), e),
            }
        }

        self.write_video_frame(&frame);

        self.entered = false;
    }

    /// Persist the next produced frame to `path`, once
    pub fn request_snapshot(&mut self, path: impl Into<PathBuf>) {
        self.pending_snapshot = Some(path.into());
    }

    /// Record every following frame to `path`.
    ///
    /// An already open sink is left as is; only the target and codec used for
    /// the next open change.
    pub fn start_recording(&mut self, path: impl Into<PathBuf>, codec: FourCc) {
        let recording = Recording {
            path: path.into(),
            codec,
        };
        info!(
            "Recording to {} ({})",
            recording.path.display(),
            recording.codec
        );
        self.recording = Some(recording);
        self.recording_fps = None;
        self.sink_error_reported = false;
    }

    pub fn stop_recording(&mut self) {
        if let Some(recording) = self.recording.take() {
            info!("Recording to {} stopped", recording.path.display());
        }
        self.sink = None;
    }

    fn update_fps_estimate(&mut self) {
        let now = self.clock.now();
        match self.start_time {
            Some(start) if self.frames_processed > 0 => {
                let elapsed = now.saturating_duration_since(start).as_secs();
                if elapsed != 0 {
                    self.estimated_fps = self.frames_processed / elapsed;
                }
            }
            _ => self.start_time = Some(now),
        }
    }

    fn process(&mut self, mut frame: RgbImage, contrast: i32, brightness: i32) -> RgbImage {
        if self.toggles.mirror {
            ops::flip_horizontal(&mut frame);
        }
        if self.toggles.gaussian_blur {
            frame = ops::gaussian_blur(&frame, self.processing.gaussian_kernel);
        }
        if self.toggles.median_blur {
            frame = ops::median_blur(&frame, self.processing.median_kernel);
        }
        if self.toggles.fourier_preview {
            self.show_fourier(&frame);
        }
        if self.toggles.sharpen {
            frame = ops::sharpen(&frame);
        }
        ops::adjust_contrast_brightness(&mut frame, contrast, brightness);
        frame
    }

    fn show_fourier(&mut self, frame: &RgbImage) {
        let spectrum = DynamicImage::ImageLuma8(ops::fourier_magnitude(frame)).to_rgb8();
        if let Err(e) = self.display.show_in(FOURIER_WINDOW, &spectrum) {
            warn!("Failed to show spectrum: {}", e);
        }
        self.toggles.fourier_preview = false;
    }

    fn resolve_recording_fps(&mut self) -> Option<f64> {
        if self.recording_fps.is_none() {
            let native = self.source.fps();
            if native > 0.0 {
                self.recording_fps = Some(native);
            } else if self.frames_processed >= FPS_WARMUP_FRAMES && self.estimated_fps > 0 {
                self.recording_fps = Some(self.estimated_fps as f64);
            }
        }
        self.recording_fps
    }

    fn write_video_frame(&mut self, frame: &RgbImage) {
        let Some(recording) = self.recording.clone() else {
            return;
        };

        if self.sink.is_none() {
            let Some(fps) = self.resolve_recording_fps() else {
                debug!(
                    frames = self.frames_processed,
                    "Frame rate unknown yet, recording deferred"
                );
                return;
            };

            let (width, height) = match self.source.frame_size() {
                (0, _) | (_, 0) => frame.dimensions(),
                size => size,
            };
            let spec = SinkSpec {
                path: recording.path,
                codec: recording.codec,
                fps,
                width,
                height,
            };

            match self.sinks.open(&spec) {
                Ok(sink) => {
                    info!(
                        "Video sink opened: {} {}x{} @ {} fps",
                        spec.path.display(),
                        width,
                        height,
                        fps
                    );
                    self.sink = Some(sink);
                }
                Err(e) => {
                    if !self.sink_error_reported {
                        warn!("Video sink unavailable: {}", e);
                        self.sink_error_reported = true;
                    }
                    return;
                }
            }
        }

        if let Some(sink) = self.sink.as_mut() {
            if let Err(e) = sink.write(frame) {
                debug!("Dropped video frame: {}", e);
            }
        }
    }
}
