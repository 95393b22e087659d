pub mod app;
pub mod capture;
pub mod display;
pub mod error;
pub mod input;
pub mod ops;
pub mod record;
pub mod session;

use std::path::{Path, PathBuf};

use capture::frame::PixelFormat;
use record::FourCc;
use serde::{Deserialize, Serialize};

pub use error::{Error, Result};

/// Default config file, looked up in the working directory
pub const CONFIG_FILE: &str = "cameo.toml";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub camera: CameraConfig,
    pub window: WindowConfig,
    pub capture: CaptureConfig,
    pub processing: ProcessingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    pub device: String,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub buffer_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

/// Where snapshots and recordings go
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureConfig {
    pub snapshot_path: PathBuf,
    pub video_path: PathBuf,
    pub codec: FourCc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingConfig {
    pub gaussian_kernel: u32,
    pub median_kernel: u32,
    /// Initial slider positions
    pub contrast: i32,
    pub brightness: i32,
    pub slider_max: i32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "/dev/video0".into(),
            width: 640,
            height: 480,
            format: PixelFormat::Mjpeg,
            buffer_count: 4,
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Cameo".into(),
            width: 1024,
            height: 768,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            snapshot_path: "screenshot.png".into(),
            video_path: "screenvideo.avi".into(),
            codec: FourCc::I420,
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            gaussian_kernel: 13,
            median_kernel: 13,
            contrast: 0,
            brightness: 0,
            slider_max: 100,
        }
    }
}

impl Config {
    /// Defaults overlaid with `path` when it exists
    pub fn load(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Config::default())?)
            .add_source(config::File::from(path).required(false))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}
