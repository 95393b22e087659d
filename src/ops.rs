//! Per-frame image operations

use std::path::Path;

use image::imageops::{self, GaussianBlurParameters};
use image::{GrayImage, Luma, RgbImage};
use rustfft::{num_complex::Complex, FftPlanner};

use crate::error::Result;

/// Mirror the frame around its vertical axis
pub fn flip_horizontal(frame: &mut RgbImage) {
    imageops::flip_horizontal_in_place(frame);
}

/// Sigma a Gaussian kernel of `kernel_size` taps gets when none is given
pub fn gaussian_sigma(kernel_size: u32) -> f32 {
    0.3 * ((kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Gaussian blur with a `kernel_size` x `kernel_size` kernel; sigma follows
/// from the size via [`gaussian_sigma`]
pub fn gaussian_blur(frame: &RgbImage, kernel_size: u32) -> RgbImage {
    if kernel_size <= 1 {
        return frame.clone();
    }
    imageops::blur_advanced(
        frame,
        GaussianBlurParameters::new_from_kernel_size(kernel_size as f32),
    )
}

/// Square median filter; even sizes are rounded down to the nearest odd one
pub fn median_blur(frame: &RgbImage, kernel_size: u32) -> RgbImage {
    let radius = kernel_size / 2;
    if radius == 0 {
        return frame.clone();
    }
    imageproc::filter::median_filter(frame, radius, radius)
}

/// 3x3 sharpen: `5*c - left - right - up - down` per channel, border zeroed
pub fn sharpen(frame: &RgbImage) -> RgbImage {
    let (width, height) = frame.dimensions();
    let mut out = RgbImage::new(width, height);
    if width < 3 || height < 3 {
        return out;
    }

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let c = frame.get_pixel(x, y).0;
            let l = frame.get_pixel(x - 1, y).0;
            let r = frame.get_pixel(x + 1, y).0;
            let u = frame.get_pixel(x, y - 1).0;
            let d = frame.get_pixel(x, y + 1).0;
            let px = out.get_pixel_mut(x, y);
            for ch in 0..3 {
                let v = 5 * i32::from(c[ch])
                    - i32::from(l[ch])
                    - i32::from(r[ch])
                    - i32::from(u[ch])
                    - i32::from(d[ch]);
                px.0[ch] = v.clamp(0, 255) as u8;
            }
        }
    }
    out
}

/// Magnitude spectrum of the frame's luma, min-max normalised to 0..=255
pub fn fourier_magnitude(frame: &RgbImage) -> GrayImage {
    let gray = imageops::grayscale(frame);
    let (width, height) = gray.dimensions();
    let (w, h) = (width as usize, height as usize);
    if w == 0 || h == 0 {
        return GrayImage::new(width, height);
    }

    let mut planner = FftPlanner::<f32>::new();

    // Rows first; `process` walks the buffer in row-sized chunks
    let mut rows: Vec<Complex<f32>> = gray
        .as_raw()
        .iter()
        .map(|&v| Complex::new(f32::from(v), 0.0))
        .collect();
    planner.plan_fft_forward(w).process(&mut rows);

    // Then columns, through a transposed copy
    let mut cols = vec![Complex::new(0.0, 0.0); w * h];
    for y in 0..h {
        for x in 0..w {
            cols[x * h + y] = rows[y * w + x];
        }
    }
    planner.plan_fft_forward(h).process(&mut cols);

    let magnitude: Vec<f32> = cols.iter().map(|c| c.norm()).collect();
    let (min, max) = magnitude
        .iter()
        .fold((f32::MAX, f32::MIN), |(lo, hi), &m| (lo.min(m), hi.max(m)));
    let range = max - min;

    GrayImage::from_fn(width, height, |x, y| {
        let m = magnitude[x as usize * h + y as usize];
        let v = if range > 0.0 {
            (m - min) / range * 255.0
        } else {
            0.0
        };
        Luma([v.round() as u8])
    })
}

/// `|px * (1 + contrast / 10) + brightness|`, saturated to 0..=255.
///
/// `contrast / 10` is integer division, so the gain moves in whole steps.
pub fn adjust_contrast_brightness(frame: &mut RgbImage, contrast: i32, brightness: i32) {
    let gain = 1 + contrast / 10;
    if gain == 1 && brightness == 0 {
        return;
    }
    for sub in frame.iter_mut() {
        *sub = (i32::from(*sub) * gain + brightness).abs().min(255) as u8;
    }
}

/// Persist a frame; the format follows the file extension
pub fn write_image(path: &Path, frame: &RgbImage) -> Result<()> {
    frame.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 10) as u8, (y * 10) as u8, ((x + y) * 5) as u8])
        })
    }

    #[test]
    fn flip_swaps_columns() {
        let mut img = gradient(4, 2);
        let before = *img.get_pixel(0, 1);
        flip_horizontal(&mut img);
        assert_eq!(*img.get_pixel(3, 1), before);
    }

    #[test]
    fn sigma_for_default_kernel() {
        assert!((gaussian_sigma(13) - 2.3).abs() < 1e-5);
    }

    #[test]
    fn blurs_keep_flat_images_flat() {
        let flat = RgbImage::from_pixel(20, 20, Rgb([80, 120, 160]));
        assert_eq!(median_blur(&flat, 13), flat);

        let blurred = gaussian_blur(&flat, 13);
        for px in blurred.pixels() {
            for (got, want) in px.0.iter().zip([80u8, 120, 160]) {
                assert!(got.abs_diff(want) <= 1);
            }
        }
    }

    #[test]
    fn gaussian_spread_stops_at_kernel_edge() {
        let mut img = RgbImage::new(15, 15);
        img.put_pixel(7, 7, Rgb([255, 255, 255]));
        let out = gaussian_blur(&img, 5);
        assert!(out.get_pixel(9, 7).0[0] > 0);
        assert_eq!(out.get_pixel(10, 7).0[0], 0);
        assert_eq!(out.get_pixel(7, 4).0[0], 0);
    }

    #[test]
    fn median_removes_salt_noise() {
        let mut img = RgbImage::from_pixel(9, 9, Rgb([10, 10, 10]));
        img.put_pixel(4, 4, Rgb([255, 255, 255]));
        let out = median_blur(&img, 3);
        assert_eq!(*out.get_pixel(4, 4), Rgb([10, 10, 10]));
    }

    #[test]
    fn sharpen_zeroes_border_and_keeps_flat_interior() {
        let img = RgbImage::from_pixel(5, 4, Rgb([50, 60, 70]));
        let out = sharpen(&img);
        for x in 0..5 {
            assert_eq!(*out.get_pixel(x, 0), Rgb([0, 0, 0]));
            assert_eq!(*out.get_pixel(x, 3), Rgb([0, 0, 0]));
        }
        for y in 0..4 {
            assert_eq!(*out.get_pixel(0, y), Rgb([0, 0, 0]));
            assert_eq!(*out.get_pixel(4, y), Rgb([0, 0, 0]));
        }
        assert_eq!(*out.get_pixel(2, 1), Rgb([50, 60, 70]));
    }

    #[test]
    fn sharpen_saturates() {
        let mut img = RgbImage::from_pixel(3, 3, Rgb([0, 0, 0]));
        img.put_pixel(1, 1, Rgb([100, 0, 0]));
        img.put_pixel(1, 0, Rgb([0, 200, 0]));
        let out = sharpen(&img);
        assert_eq!(*out.get_pixel(1, 1), Rgb([255, 0, 0]));
    }

    #[test]
    fn spectrum_of_flat_image_peaks_at_dc() {
        let img = RgbImage::from_pixel(8, 6, Rgb([90, 90, 90]));
        let spectrum = fourier_magnitude(&img);
        assert_eq!(spectrum.dimensions(), (8, 6));
        assert_eq!(spectrum.get_pixel(0, 0).0[0], 255);
        assert_eq!(spectrum.get_pixel(3, 2).0[0], 0);
    }

    #[test]
    fn contrast_uses_whole_gain_steps() {
        let mut img = RgbImage::from_pixel(1, 1, Rgb([10, 100, 200]));
        adjust_contrast_brightness(&mut img, 9, 0);
        assert_eq!(*img.get_pixel(0, 0), Rgb([10, 100, 200]));

        adjust_contrast_brightness(&mut img, 10, 5);
        assert_eq!(*img.get_pixel(0, 0), Rgb([25, 205, 255]));
    }

    #[test]
    fn write_image_creates_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.png");
        write_image(&path, &gradient(3, 3)).unwrap();
        let back = image::open(&path).unwrap().to_rgb8();
        assert_eq!(back, gradient(3, 3));
    }
}
