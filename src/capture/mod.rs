pub mod decoder;
pub mod frame;
pub mod v4l2;

use image::RgbImage;

pub use frame::{PixelFormat, RawFrame};
pub use v4l2::V4l2Capture;

/// A camera-like producer of frames.
///
/// Mirrors the grab/retrieve split of capture devices: `grab` advances the
/// device, `retrieve` decodes whatever was last grabbed.
pub trait FrameSource {
    fn is_opened(&self) -> bool;

    /// Attempt to advance to the next frame. `false` when nothing is ready.
    fn grab(&mut self) -> bool;

    /// Fetch the last grabbed frame, `None` if there is none.
    fn retrieve(&mut self) -> Option<RgbImage>;

    /// Native frame rate reported by the device, `0.0` when unknown.
    fn fps(&self) -> f64;

    fn frame_size(&self) -> (u32, u32);
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn is_opened(&self) -> bool {
        (**self).is_opened()
    }

    fn grab(&mut self) -> bool {
        (**self).grab()
    }

    fn retrieve(&mut self) -> Option<RgbImage> {
        (**self).retrieve()
    }

    fn fps(&self) -> f64 {
        (**self).fps()
    }

    fn frame_size(&self) -> (u32, u32) {
        (**self).frame_size()
    }
}
