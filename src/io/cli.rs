use std::path::{Path, PathBuf};
use clap::{Parser};

use crate::{Error, Job, OverlapPolicy, Result};

/// The level count used when none is given.
pub const DEFAULT_LEVELS: i32 = 8;

/// The longest edge of the preview written after every level.
pub const PREVIEW_EDGE: u32 = 280;

/// Strip the directory and file extension from a file path.
fn file_stem(path: &Path) -> Result<&str> {
    let s = path.file_stem().ok_or(Error::InvalidParameter("empty filename".into()))?;
    let s = s.to_str().ok_or(Error::InvalidParameter("invalid unicode in filename".into()))?;
    Ok(s)
}

/// Constructs a default output directory from `in_path` and `program_name`.
///
/// - in_path - the input path.
/// - program_name - the name of the program.
pub fn default_out_dir(in_path: &Path, program_name: &str) -> Result<PathBuf> {
    let mut out_dir = std::env::temp_dir();
    out_dir.push(format!("{}-{}", file_stem(in_path)?, program_name));
    Ok(out_dir)
}

// ----------------------------------------------------------------------------

#[derive(Debug, Parser)]
#[command(about = "Split an image into one transparent PNG per gray level.")]
#[command(author, version, long_about = None)]
pub struct Args {
    /// Input image path.
    pub in_path: PathBuf,

    /// Output directory, created if absent.
    #[arg(short, long)]
    pub out_dir: Option<PathBuf>,

    /// The number of gray levels, between 1 and 256.
    #[arg(short = 'n', long, allow_negative_numbers = true)]
    pub levels: Option<i32>,

    /// Assign every pixel to its single nearest level.
    #[arg(long)]
    pub nearest: bool,

    /// Overwrite this file with a thumbnail of each level as it completes.
    #[arg(long)]
    pub preview: Option<PathBuf>,
}

impl Args {
    /// Returns `out_dir` or `default_out_dir(program_name)`.
    pub fn out_dir(&self, program_name: &str) -> Result<PathBuf> {
        self.out_dir.clone().map_or_else(|| default_out_dir(&self.in_path, program_name), Ok)
    }

    /// Returns the `levels` or the specified default value.
    pub fn levels(&self, default_levels: i32) -> i32 {
        self.levels.unwrap_or(default_levels)
    }

    pub fn policy(&self) -> OverlapPolicy {
        if self.nearest { OverlapPolicy::NearestOnly } else { OverlapPolicy::AllowMultiMatch }
    }

    /// Collects the arguments into a [`Job`].
    pub fn job(&self, program_name: &str) -> Result<Job> {
        let job = Job::new(&self.in_path, self.out_dir(program_name)?, self.levels(DEFAULT_LEVELS));
        Ok(job.policy(self.policy()))
    }
}

// ----------------------------------------------------------------------------
