//! Video recording sinks

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Four-character codec identifier, e.g. `I420`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FourCc([u8; 4]);

impl FourCc {
    pub const I420: FourCc = FourCc(*b"I420");

    pub const fn new(repr: [u8; 4]) -> Self {
        FourCc(repr)
    }

    pub fn as_str(&self) -> &str {
        // Only ASCII is ever stored
        std::str::from_utf8(&self.0).unwrap_or("????")
    }
}

impl Default for FourCc {
    fn default() -> Self {
        FourCc::I420
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FourCc {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = s.as_bytes();
        if bytes.len() != 4 || !bytes.iter().all(|b| b.is_ascii_graphic()) {
            return Err(Error::Sink(format!("'{s}' is not a four-character code")));
        }
        Ok(FourCc([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

impl TryFrom<String> for FourCc {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<FourCc> for String {
    fn from(value: FourCc) -> Self {
        value.to_string()
    }
}

/// Parameters a sink is opened with
#[derive(Debug, Clone, PartialEq)]
pub struct SinkSpec {
    pub path: PathBuf,
    pub codec: FourCc,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
}

/// An open video file frames are appended to
pub trait VideoSink {
    fn write(&mut self, frame: &RgbImage) -> Result<()>;
}

/// Opens video sinks on demand
pub trait SinkFactory {
    fn open(&mut self, spec: &SinkSpec) -> Result<Box<dyn VideoSink>>;
}

/// Factory for builds without a recording backend; every open fails
#[derive(Debug, Default)]
pub struct NoRecording;

impl SinkFactory for NoRecording {
    fn open(&mut self, spec: &SinkSpec) -> Result<Box<dyn VideoSink>> {
        Err(Error::Sink(format!(
            "no recording backend for {}",
            spec.path.display()
        )))
    }
}

/// Factory matching the enabled features
pub fn default_factory() -> Box<dyn SinkFactory> {
    #[cfg(feature = "gstreamer-pipeline")]
    {
        Box::new(gst::GstSinkFactory)
    }
    #[cfg(not(feature = "gstreamer-pipeline"))]
    {
        Box::new(NoRecording)
    }
}

/// GStreamer caps/encoder fragment for a codec
pub fn codec_stage(codec: FourCc) -> String {
    match codec.as_str() {
        "MJPG" => "jpegenc".to_string(),
        "XVID" | "DIVX" | "FMP4" => "avenc_mpeg4".to_string(),
        "H264" | "X264" | "AVC1" => "x264enc tune=zerolatency".to_string(),
        raw => format!("video/x-raw,format={}", raw.replace("YUYV", "YUY2")),
    }
}

/// Frame rate as a GStreamer fraction with millihertz precision
pub fn fps_fraction(fps: f64) -> (i32, i32) {
    let rounded = (fps * 1000.0).round();
    if rounded.fract() == 0.0 && (rounded as i64) % 1000 == 0 {
        ((rounded / 1000.0) as i32, 1)
    } else {
        (rounded as i32, 1000)
    }
}

pub fn pipeline_description(spec: &SinkSpec) -> String {
    let (num, den) = fps_fraction(spec.fps);
    format!(
        "appsrc name=appsrc caps=video/x-raw,format=RGB,width={},height={},framerate={}/{} ! \
         videoconvert ! \
         {} ! \
         avimux ! \
         filesink location=\"{}\"",
        spec.width,
        spec.height,
        num,
        den,
        codec_stage(spec.codec),
        escape_location(&spec.path),
    )
}

fn escape_location(path: &Path) -> String {
    path.display().to_string().replace('"', "\\\"")
}

#[cfg(feature = "gstreamer-pipeline")]
pub mod gst {
    //! AVI writer on top of an appsrc pipeline

    use gstreamer as gst;
    use gstreamer::prelude::*;
    use gstreamer_app as gst_app;
    use image::RgbImage;
    use tracing::{debug, info, warn};

    use super::{pipeline_description, SinkFactory, SinkSpec, VideoSink};
    use crate::error::{Error, Result};

    #[derive(Debug, Default)]
    pub struct GstSinkFactory;

    impl SinkFactory for GstSinkFactory {
        fn open(&mut self, spec: &SinkSpec) -> Result<Box<dyn VideoSink>> {
            Ok(Box::new(GstVideoSink::new(spec)?))
        }
    }

    pub struct GstVideoSink {
        pipeline: gst::Pipeline,
        appsrc: gst_app::AppSrc,
        spec: SinkSpec,
        frame_duration: gst::ClockTime,
        frames: u64,
    }

    impl GstVideoSink {
        pub fn new(spec: &SinkSpec) -> Result<Self> {
            gst::init().map_err(|e| Error::Sink(format!("Failed to initialize GStreamer: {e}")))?;

            let pipeline_str = pipeline_description(spec);
            debug!("Recording pipeline: {}", pipeline_str);

            let pipeline = gst::parse::launch(&pipeline_str)
                .map_err(|e| Error::Sink(e.to_string()))?
                .downcast::<gst::Pipeline>()
                .map_err(|_| Error::Sink("Failed to create pipeline".into()))?;

            let appsrc = pipeline
                .by_name("appsrc")
                .ok_or_else(|| Error::Sink("Failed to find appsrc".into()))?
                .downcast::<gst_app::AppSrc>()
                .map_err(|_| Error::Sink("Failed to cast to AppSrc".into()))?;

            appsrc.set_property("is-live", false);
            appsrc.set_property("block", true);
            appsrc.set_property("format", gst::Format::Time);

            if let Err(e) = pipeline.set_state(gst::State::Playing) {
                // Elements left above NULL are never disposed
                if pipeline.set_state(gst::State::Null).is_err() {
                    warn!("Failed to tear down recording pipeline");
                }
                return Err(Error::Sink(format!("Failed to start pipeline: {e:?}")));
            }
            info!(path = %spec.path.display(), fps = spec.fps, "Recording started");

            let frame_duration =
                gst::ClockTime::from_nseconds((1_000_000_000.0 / spec.fps).round() as u64);

            Ok(Self {
                pipeline,
                appsrc,
                spec: spec.clone(),
                frame_duration,
                frames: 0,
            })
        }
    }

    impl VideoSink for GstVideoSink {
        fn write(&mut self, frame: &RgbImage) -> Result<()> {
            if frame.dimensions() != (self.spec.width, self.spec.height) {
                return Err(Error::Sink(format!(
                    "frame is {}x{}, sink expects {}x{}",
                    frame.width(),
                    frame.height(),
                    self.spec.width,
                    self.spec.height
                )));
            }

            let mut buffer = gst::Buffer::from_slice(frame.as_raw().clone());
            {
                let buffer_ref = buffer
                    .get_mut()
                    .ok_or_else(|| Error::Sink("buffer not writable".into()))?;
                buffer_ref.set_pts(gst::ClockTime::from_nseconds(
                    self.frame_duration.nseconds() * self.frames,
                ));
                buffer_ref.set_duration(self.frame_duration);
            }

            self.appsrc
                .push_buffer(buffer)
                .map_err(|e| Error::Sink(format!("Failed to push buffer: {e:?}")))?;
            self.frames += 1;
            Ok(())
        }
    }

    impl GstVideoSink {
        /// Push EOS and wait for avimux to write its index
        fn drain(&self) -> Result<()> {
            self.appsrc
                .end_of_stream()
                .map_err(|e| Error::Sink(format!("Failed to send EOS: {e:?}")))?;

            let bus = self
                .pipeline
                .bus()
                .ok_or_else(|| Error::Sink("pipeline has no bus".into()))?;
            match bus.timed_pop_filtered(
                gst::ClockTime::from_seconds(2),
                &[gst::MessageType::Eos, gst::MessageType::Error],
            ) {
                Some(msg) => match msg.view() {
                    gst::MessageView::Error(err) => Err(Error::Sink(format!(
                        "Recording pipeline error: {}",
                        err.error()
                    ))),
                    _ => Ok(()),
                },
                None => Err(Error::Sink("Timed out waiting for EOS".into())),
            }
        }
    }

    impl Drop for GstVideoSink {
        fn drop(&mut self) {
            if let Err(e) = self.drain() {
                warn!(path = %self.spec.path.display(), "{}; the AVI index may be missing", e);
            }
            if let Err(e) = self.pipeline.set_state(gst::State::Null) {
                warn!(path = %self.spec.path.display(), "Failed to stop recording pipeline: {:?}", e);
            }
            info!(
                path = %self.spec.path.display(),
                frames = self.frames,
                "Recording finalized"
            );
        }
    }

}
