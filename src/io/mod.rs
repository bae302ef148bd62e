use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageError, ImageFormat, RgbaImage};
use image::imageops::{self, FilterType};
use log::{debug};

use crate::{Error, Result, Sink};

pub mod cli;

mod pixels;
pub use pixels::{GrayImage, LevelImage, opaque, TRANSPARENT};

// ----------------------------------------------------------------------------

/// The ITU-R 601-2 luma of one pixel, in 16-bit fixed point with rounding.
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 19595 + g as u32 * 38470 + b as u32 * 7471 + 0x8000) >> 16) as u8
}

/// Reduces `img` to its [`luma`]. Alpha is ignored.
pub fn to_gray(img: &DynamicImage) -> Result<GrayImage> {
    let rgb = img.to_rgb8();
    let samples = rgb.pixels().map(|p| luma(p[0], p[1], p[2])).collect();
    GrayImage::new(rgb.width() as usize, rgb.height() as usize, samples)
}

/// Load the specified file into a `GrayImage`.
pub fn load_image(path: impl AsRef<Path>) -> Result<GrayImage> {
    let path = path.as_ref();
    let img = image::io::Reader::open(path)
        .map_err(|e| Error::unavailable(path, e))?
        .with_guessed_format()
        .map_err(|e| Error::unavailable(path, e))?
        .decode()
        .map_err(|e| Error::unavailable(path, e))?;
    debug!("decoded {} ({}x{})", path.display(), img.width(), img.height());
    to_gray(&img).map_err(|e| Error::unavailable(path, e))
}

// ----------------------------------------------------------------------------

/// The name of the file that holds `level`.
pub fn file_name(level: u8) -> String { format!("gray_{}.png", level) }

/// Scales `img` down so that neither edge exceeds `max_edge`, preserving the
/// aspect ratio. Images that already fit are returned unchanged.
pub fn thumbnail(img: &RgbaImage, max_edge: u32) -> RgbaImage {
    let (width, height) = img.dimensions();
    let longest = width.max(height);
    if longest <= max_edge { return img.clone(); }
    let scale = |edge: u32| ((edge as u64 * max_edge as u64 + longest as u64 / 2) / longest as u64).max(1) as u32;
    imageops::resize(img, scale(width), scale(height), FilterType::Triangle)
}

// ----------------------------------------------------------------------------

/// A [`Sink`] that writes every level into one directory as
/// `gray_<level>.png`.
#[derive(Debug, Clone)]
pub struct Directory {
    path: PathBuf,
}

impl Directory {
    /// Uses `path`, creating it (and its parents) if it does not exist.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(Error::InvalidParameter("empty output directory".into()));
        }
        std::fs::create_dir_all(&path).map_err(|e| Error::unavailable(&path, e))?;
        Ok(Self {path})
    }

    pub fn path(&self) -> &Path { &self.path }

    /// Where `level` is written.
    pub fn artifact_path(&self, level: u8) -> PathBuf { self.path.join(file_name(level)) }
}

impl Sink for Directory {
    fn emit(&mut self, level: u8, image: &LevelImage) -> Result<PathBuf> {
        let path = self.artifact_path(level);
        image.to_rgba().save_with_format(&path, ImageFormat::Png).map_err(|e| match e {
            ImageError::IoError(e) => Error::unavailable(&path, e),
            e => Error::EncodingFailure {level, source: e},
        })?;
        Ok(path)
    }
}

// ----------------------------------------------------------------------------
