use std::path::{PathBuf};

use image::{RgbaImage};
use log::{debug};

use crate::io::{self, GrayImage, LevelImage, opaque, TRANSPARENT};
use crate::{LevelSet, OverlapPolicy, Result};

// ----------------------------------------------------------------------------

/// Persists the raster of each level as it is produced.
pub trait Sink {
    /// Stores `image` as the artifact for `level` and returns where it went.
    fn emit(&mut self, level: u8, image: &LevelImage) -> Result<PathBuf>;
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn emit(&mut self, level: u8, image: &LevelImage) -> Result<PathBuf> {
        (**self).emit(level, image)
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn emit(&mut self, level: u8, image: &LevelImage) -> Result<PathBuf> {
        (**self).emit(level, image)
    }
}

// ----------------------------------------------------------------------------

/// Reports that one level has been persisted.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    /// The gray value of the level.
    pub level: u8,

    /// Where the [`Sink`] put the raster.
    pub artifact: PathBuf,

    /// The full-resolution raster, exactly as persisted.
    pub image: LevelImage,
}

impl ProgressEvent {
    /// Returns the raster scaled down to fit within `max_edge` pixels.
    pub fn preview(&self, max_edge: u32) -> RgbaImage {
        io::thumbnail(&self.image.to_rgba(), max_edge)
    }
}

// ----------------------------------------------------------------------------

/// Splits a [`GrayImage`] into one [`LevelImage`] per level.
#[derive(Debug, Clone)]
pub struct Decomposer<'a> {
    gray: &'a GrayImage,
    levels: &'a LevelSet,
    policy: OverlapPolicy,
}

impl<'a> Decomposer<'a> {
    pub fn new(gray: &'a GrayImage, levels: &'a LevelSet) -> Self {
        Self {gray, levels, policy: OverlapPolicy::default()}
    }

    /// Selects how samples near a band boundary are assigned.
    pub fn policy(mut self, policy: OverlapPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Classifies and composites a single level in one pass over the image.
    /// Matched samples are drawn in the gray of `level` itself.
    pub fn level_image(&self, level: u8) -> LevelImage {
        let mask = self.levels.mask(level, self.policy);
        let matched = opaque(level);
        LevelImage::new(self.gray.map(|p| if mask[p as usize] { matched } else { TRANSPARENT }))
    }

    /// Returns an iterator that produces, persists and reports each level in
    /// ascending order. Nothing is computed until the iterator is advanced.
    pub fn decompose<S: Sink>(self, sink: S) -> Decomposition<'a, S> {
        Decomposition {decomposer: self, sink, next: 0, failed: false}
    }
}

// ----------------------------------------------------------------------------

/// The lazy sequence of [`ProgressEvent`]s returned by
/// [`Decomposer::decompose()`].
///
/// After the first error it yields nothing more. Levels emitted before the
/// error are left with the sink.
pub struct Decomposition<'a, S: Sink> {
    decomposer: Decomposer<'a>,
    sink: S,
    next: usize,
    failed: bool,
}

impl<'a, S: Sink> Decomposition<'a, S> {
    /// Returns the sink, e.g. to inspect what it collected.
    pub fn into_sink(self) -> S { self.sink }
}

impl<'a, S: Sink> Iterator for Decomposition<'a, S> {
    type Item = Result<ProgressEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed { return None; }
        let level = *self.decomposer.levels.as_slice().get(self.next)?;
        self.next += 1;
        let image = self.decomposer.level_image(level);
        debug!("level {}: {} opaque pixels", level, image.coverage());
        match self.sink.emit(level, &image) {
            Ok(artifact) => Some(Ok(ProgressEvent {level, artifact, image})),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            },
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = if self.failed { 0 } else { self.decomposer.levels.len() - self.next };
        (0, Some(remaining))
    }
}

impl<'a, S: Sink> std::iter::FusedIterator for Decomposition<'a, S> {}

/// Runs a whole decomposition, returning every event or the first error.
pub fn decompose_levels(
    gray: &GrayImage,
    levels: &LevelSet,
    policy: OverlapPolicy,
    sink: impl Sink,
) -> Result<Vec<ProgressEvent>> {
    Decomposer::new(gray, levels).policy(policy).decompose(sink).collect()
}

// ----------------------------------------------------------------------------
