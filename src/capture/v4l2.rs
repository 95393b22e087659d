//! V4L2 camera source

use bytes::Bytes;
use image::RgbImage;
use tracing::{debug, info, instrument, warn};
use v4l::buffer::Type;
use v4l::capability::Flags as CapFlags;
use v4l::io::traits::CaptureStream;
use v4l::prelude::MmapStream;
use v4l::video::Capture;
use v4l::{Device, FourCC};

use crate::{
    capture::{
        decoder,
        frame::{FrameMetadata, PixelFormat, RawFrame},
        FrameSource,
    },
    error::{Error, Result},
    CameraConfig,
};

/// Memory-mapped V4L2 capture
pub struct V4l2Capture {
    device: Box<Device>,
    stream: Option<MmapStream<'static>>,
    config: CameraConfig,
    width: u32,
    height: u32,
    format: PixelFormat,
    fps: f64,
    sequence: u64,
    pending: Option<RawFrame>,
}

impl V4l2Capture {
    /// Open the device and negotiate a format
    #[instrument(skip(config), fields(device = %config.device))]
    pub fn open(config: CameraConfig) -> Result<Self> {
        info!("Initializing V4L2 capture");

        let device = Device::with_path(&config.device)
            .map_err(|e| Error::Source(format!("open {}: {e}", config.device)))?;

        let caps = device.query_caps()?;
        info!("Device: {} ({})", caps.card, caps.driver);

        if !caps.capabilities.contains(CapFlags::VIDEO_CAPTURE) {
            return Err(Error::Source("device doesn't support video capture".into()));
        }

        let mut fmt = device.format()?;
        fmt.width = config.width;
        fmt.height = config.height;
        fmt.fourcc = FourCC::new(&config.format.fourcc());
        let fmt = device.set_format(&fmt)?;

        // The driver may substitute its own format
        let format = PixelFormat::from_fourcc(fmt.fourcc.repr).ok_or_else(|| {
            Error::Source(format!("device picked unsupported format {}", fmt.fourcc))
        })?;
        info!(
            "Negotiated {}x{} {:?}",
            fmt.width, fmt.height, format
        );

        let fps = match device.params() {
            Ok(params) if params.interval.numerator != 0 => {
                f64::from(params.interval.denominator) / f64::from(params.interval.numerator)
            }
            Ok(_) => 0.0,
            Err(e) => {
                warn!("Frame interval unavailable: {}", e);
                0.0
            }
        };
        debug!("Native frame rate: {}", fps);

        let mut capture = Self {
            device: Box::new(device),
            stream: None,
            width: fmt.width,
            height: fmt.height,
            format,
            fps,
            config,
            sequence: 0,
            pending: None,
        };
        capture.start_stream()?;
        Ok(capture)
    }

    /// Start streaming with memory-mapped buffers
    fn start_stream(&mut self) -> Result<()> {
        let stream =
            MmapStream::with_buffers(&self.device, Type::VideoCapture, self.config.buffer_count)?;

        self.stream = Some(stream);
        info!(
            "Capture stream started with {} buffers",
            self.config.buffer_count
        );
        Ok(())
    }
}

impl FrameSource for V4l2Capture {
    fn is_opened(&self) -> bool {
        self.stream.is_some()
    }

    fn grab(&mut self) -> bool {
        let Some(stream) = self.stream.as_mut() else {
            return false;
        };

        let (buf, meta) = match stream.next() {
            Ok(next) => next,
            Err(e) => {
                debug!("No frame dequeued: {}", e);
                return false;
            }
        };

        let used = (meta.bytesused as usize).min(buf.len());
        let used = if used == 0 { buf.len() } else { used };
        self.sequence += 1;

        self.pending = Some(RawFrame {
            data: Bytes::copy_from_slice(&buf[..used]),
            meta: FrameMetadata {
                sequence: self.sequence,
                width: self.width,
                height: self.height,
                format: self.format,
            },
        });
        true
    }

    fn retrieve(&mut self) -> Option<RgbImage> {
        let raw = self.pending.take()?;
        match decoder::decode_frame(&raw) {
            Ok(image) => Some(image),
            Err(e) => {
                warn!(sequence = raw.meta.sequence, "Dropping undecodable frame: {}", e);
                None
            }
        }
    }

    fn fps(&self) -> f64 {
        self.fps
    }

    fn frame_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
