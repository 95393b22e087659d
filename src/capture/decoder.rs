use image::RgbImage;
use jpeg_decoder::{Decoder, PixelFormat as JpegPixelFormat};

use super::frame::{PixelFormat, RawFrame};
use crate::error::{Error, Result};

/// Decode a raw device buffer into an RGB image
pub fn decode_frame(frame: &RawFrame) -> Result<RgbImage> {
    let width = frame.meta.width;
    let height = frame.meta.height;
    let data = &frame.data[..];

    let pixels = match frame.meta.format {
        PixelFormat::Mjpeg => return decode_mjpeg(data),
        PixelFormat::Rgb24 => data.to_vec(),
        PixelFormat::Bgr24 => data
            .chunks_exact(3)
            .flat_map(|bgr| [bgr[2], bgr[1], bgr[0]])
            .collect(),
        PixelFormat::Yuyv => yuyv_to_rgb(data),
    };

    RgbImage::from_raw(width, height, pixels).ok_or_else(|| {
        Error::Source(format!(
            "{:?} buffer too short for {}x{}",
            frame.meta.format, width, height
        ))
    })
}

fn decode_mjpeg(data: &[u8]) -> Result<RgbImage> {
    let mut decoder = Decoder::new(data);
    let pixels = decoder
        .decode()
        .map_err(|e| Error::Source(format!("jpeg decode: {e}")))?;
    let info = decoder
        .info()
        .ok_or_else(|| Error::Source("jpeg without header".into()))?;

    let rgb = match info.pixel_format {
        JpegPixelFormat::RGB24 => pixels,
        JpegPixelFormat::L8 => pixels.iter().flat_map(|&l| [l, l, l]).collect(),
        other => {
            return Err(Error::Source(format!(
                "unsupported jpeg pixel format {other:?}"
            )))
        }
    };

    RgbImage::from_raw(u32::from(info.width), u32::from(info.height), rgb)
        .ok_or_else(|| Error::Source("jpeg size mismatch".into()))
}

/// YUYV 4:2:2 to packed RGB, BT.601 integer approximation
fn yuyv_to_rgb(data: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(data.len() / 2 * 3);
    for chunk in data.chunks_exact(4) {
        let (y0, u, y1, v) = (chunk[0], chunk[1], chunk[2], chunk[3]);
        rgb.extend_from_slice(&yuv_to_rgb(y0, u, v));
        rgb.extend_from_slice(&yuv_to_rgb(y1, u, v));
    }
    rgb
}

fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let c = i32::from(y) - 16;
    let d = i32::from(u) - 128;
    let e = i32::from(v) - 128;
    let clamp = |x: i32| ((x + 128) >> 8).clamp(0, 255) as u8;
    [
        clamp(298 * c + 409 * e),
        clamp(298 * c - 100 * d - 208 * e),
        clamp(298 * c + 516 * d),
    ]
}
