use std::path::{PathBuf};

/// Everything that can go wrong while decomposing an image into gray levels.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A level count, path or buffer was rejected before any work began.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The source image could not be decoded, or the destination could not
    /// be created or written.
    #[error("resource unavailable: {}: {source}", .path.display())]
    ResourceUnavailable {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The encoder rejected the raster for `level`.
    #[error("failed to encode level {level}: {source}")]
    EncodingFailure {
        level: u8,
        #[source]
        source: image::ImageError,
    },
}

impl Error {
    pub(crate) fn unavailable(
        path: impl Into<PathBuf>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::ResourceUnavailable {path: path.into(), source: source.into()}
    }
}

// ----------------------------------------------------------------------------

/// A general `Result` type.
pub type Result<T=()> = std::result::Result<T, Error>;

// ----------------------------------------------------------------------------

/// Pixel coordinates, with `(0, 0)` at the top left. The coordinates are
/// listed in the order `(row, column)`, i.e. y-coordinate first.
pub type Grid = (usize, usize);

// ----------------------------------------------------------------------------

pub mod io;
pub use io::{GrayImage, LevelImage, Directory};

pub mod quantize;
pub use quantize::{derive_levels, LevelSet, OverlapPolicy};

mod decompose;
pub use decompose::{Decomposer, Decomposition, ProgressEvent, Sink, decompose_levels};

pub mod worker;
pub use worker::{Event, Job, Worker};
