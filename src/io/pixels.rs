use image::{ImageBuffer, Rgba, RgbaImage};
use multidimension::{Index, View, Array};

use crate::{Error, Grid, Result};

// ----------------------------------------------------------------------------

/// A rectangular grid of 8-bit gray samples, row-major.
///
/// Once constructed it is never modified, so one `GrayImage` can be shared by
/// every level pass of a run.
#[derive(Clone)]
pub struct GrayImage(Array<Grid, u8>);

impl GrayImage {
    /// Wraps `samples`, which must hold `width * height` values in row-major
    /// order. Both dimensions must be non-zero.
    pub fn new(width: usize, height: usize, samples: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidParameter(format!("empty image {}x{}", width, height)));
        }
        if samples.len() != width * height {
            return Err(Error::InvalidParameter(format!(
                "{} samples do not fill a {}x{} image", samples.len(), width, height,
            )));
        }
        Ok(Self(Array::new((height, width), samples)))
    }

    /// Returns `(height, width)`.
    pub fn size(&self) -> Grid { self.0.size() }

    pub fn width(&self) -> usize { self.size().1 }

    pub fn height(&self) -> usize { self.size().0 }

    /// Builds a raster of the same size by mapping every sample through `f`.
    pub fn map<T: Copy>(&self, f: impl Fn(u8) -> T) -> Array<Grid, T> {
        <Grid>::all(self.size()).map(|yx| f(self[yx])).collect()
    }
}

impl std::ops::Index<Grid> for GrayImage {
    type Output = u8;
    fn index(&self, index: Grid) -> &Self::Output { &self.0[index] }
}

impl std::fmt::Debug for GrayImage {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "GrayImage({}x{})", self.width(), self.height())
    }
}

// ----------------------------------------------------------------------------

/// An opaque pixel of gray value `v`.
pub const fn opaque(v: u8) -> [u8; 4] { [v, v, v, 255] }

/// The colour of every pixel that does not belong to a level.
pub const TRANSPARENT: [u8; 4] = [255, 255, 255, 0];

/// The RGBA raster of one level: matched pixels are [`opaque`], all others
/// are [`TRANSPARENT`].
#[derive(Clone)]
pub struct LevelImage(Array<Grid, [u8; 4]>);

impl LevelImage {
    pub fn new(pixels: Array<Grid, [u8; 4]>) -> Self { Self(pixels) }

    /// Returns `(height, width)`.
    pub fn size(&self) -> Grid { self.0.size() }

    pub fn width(&self) -> usize { self.size().1 }

    pub fn height(&self) -> usize { self.size().0 }

    /// Counts the opaque pixels.
    pub fn coverage(&self) -> usize {
        let (height, width) = self.size();
        (0..height).flat_map(|y| (0..width).map(move |x| (y, x)))
            .filter(|&yx| self[yx][3] != 0)
            .count()
    }

    /// Copies `self` into an `image` buffer, for encoding or resizing.
    pub fn to_rgba(&self) -> RgbaImage {
        let (height, width) = self.size();
        ImageBuffer::from_fn(width as u32, height as u32, |x, y| {
            Rgba(self[(y as usize, x as usize)])
        })
    }
}

impl std::ops::Index<Grid> for LevelImage {
    type Output = [u8; 4];
    fn index(&self, index: Grid) -> &Self::Output { &self.0[index] }
}

impl std::fmt::Debug for LevelImage {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "LevelImage({}x{}, {} opaque)", self.width(), self.height(), self.coverage())
    }
}

impl PartialEq for LevelImage {
    fn eq(&self, other: &Self) -> bool {
        let (height, width) = self.size();
        self.size() == other.size() && (0..height).all(|y| {
            (0..width).all(|x| self[(y, x)] == other[(y, x)])
        })
    }
}

impl Eq for LevelImage {}

// ----------------------------------------------------------------------------
