use crate::{Error, Result};

/// The number of distinct 8-bit gray samples.
pub const NUM_SAMPLES: usize = 256;

// ----------------------------------------------------------------------------

/// How a sample that lies within the window of more than one level (or of
/// none) is assigned.
#[derive(Debug, Default, Copy, Clone, Hash, PartialEq, Eq)]
pub enum OverlapPolicy {
    /// A sample `p` matches level `l` iff `|l - p| < band_width`, tested
    /// independently for every level. A sample may therefore appear in two
    /// adjacent levels, and samples in the residual top band beyond the last
    /// window appear in none.
    #[default]
    AllowMultiMatch,

    /// Every sample matches exactly one level: the nearest one, with ties
    /// going to the lower level.
    NearestOnly,
}

// ----------------------------------------------------------------------------

/// The representative gray values of a decomposition, in increasing order.
///
/// For a count `n`, `band_width() == 256 / n` and the `i`th level is
/// `i * band_width()`. When `256 % n != 0` the top band is wider than the
/// others; the levels are kept exactly as computed because they name the
/// output files.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct LevelSet {
    band_width: u16,
    levels: Box<[u8]>,
}

impl LevelSet {
    /// Derives the levels for `count` bands. `count` must be in `1..=256`.
    pub fn new(count: i32) -> Result<Self> {
        if !(1..=NUM_SAMPLES as i32).contains(&count) {
            return Err(Error::InvalidParameter(format!(
                "level count must be between 1 and {}, got {}", NUM_SAMPLES, count,
            )));
        }
        let band_width = (NUM_SAMPLES as i32 / count) as u16;
        let levels = (0..count as u16).map(|i| (i * band_width) as u8).collect();
        Ok(Self {band_width, levels})
    }

    /// The half-open tolerance around each level.
    pub fn band_width(&self) -> u16 { self.band_width }

    /// The number of levels.
    pub fn len(&self) -> usize { self.levels.len() }

    /// Always `false`; a `LevelSet` has at least one level.
    pub fn is_empty(&self) -> bool { self.levels.is_empty() }

    pub fn as_slice(&self) -> &[u8] { &self.levels }

    pub fn iter(&self) -> impl '_ + Iterator<Item=u8> { self.levels.iter().copied() }

    /// Returns the level nearest to `sample`, preferring the lower one on a
    /// tie.
    pub fn nearest(&self, sample: u8) -> u8 {
        let i = (sample as usize / self.band_width as usize).min(self.len() - 1);
        let lower = self.levels[i];
        match self.levels.get(i + 1) {
            Some(&upper) if upper - sample < sample - lower => upper,
            _ => lower,
        }
    }

    /// Returns `true` if `sample` belongs to `level` under `policy`.
    pub fn matches(&self, level: u8, sample: u8, policy: OverlapPolicy) -> bool {
        match policy {
            OverlapPolicy::AllowMultiMatch => {
                (level as i32 - sample as i32).abs() < self.band_width as i32
            },
            OverlapPolicy::NearestOnly => self.nearest(sample) == level,
        }
    }

    /// Classifies every possible sample against `level`, so that a pass over
    /// an image costs one table lookup per pixel.
    pub fn mask(&self, level: u8, policy: OverlapPolicy) -> [bool; NUM_SAMPLES] {
        std::array::from_fn(|sample| self.matches(level, sample as u8, policy))
    }
}

impl<'a> IntoIterator for &'a LevelSet {
    type Item = u8;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, u8>>;
    fn into_iter(self) -> Self::IntoIter { self.levels.iter().copied() }
}

/// Derives the [`LevelSet`] for `count` bands.
pub fn derive_levels(count: i32) -> Result<LevelSet> { LevelSet::new(count) }

// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_valid_count() {
        for count in 1..=256 {
            let levels = derive_levels(count).unwrap();
            let w = 256 / count as usize;
            assert_eq!(levels.len(), count as usize);
            assert_eq!(levels.band_width() as usize, w);
            for (i, level) in levels.iter().enumerate() {
                assert_eq!(level as usize, i * w);
            }
            assert!(levels.as_slice().windows(2).all(|p| p[0] < p[1]));
        }
    }

    #[test]
    fn invalid_counts() {
        for count in [0, 257, -1, i32::MIN, i32::MAX] {
            assert!(matches!(derive_levels(count), Err(Error::InvalidParameter(_))));
        }
    }

    #[test]
    fn residual_top_band() {
        let levels = derive_levels(3).unwrap();
        assert_eq!(levels.as_slice(), &[0, 85, 170]);
        assert_eq!(levels.band_width(), 85);
        // 255 is 85 away from 170, outside its window.
        let matched = levels.iter()
            .filter(|&l| levels.matches(l, 255, OverlapPolicy::AllowMultiMatch))
            .count();
        assert_eq!(matched, 0);
        assert_eq!(levels.nearest(255), 170);
    }

    #[test]
    fn overlapping_windows() {
        let levels = derive_levels(2).unwrap();
        assert_eq!(levels.as_slice(), &[0, 128]);
        let policy = OverlapPolicy::AllowMultiMatch;
        assert!(levels.matches(0, 10, policy));
        assert!(levels.matches(128, 10, policy));
        assert!(!levels.matches(0, 200, policy));
        assert!(levels.matches(128, 200, policy));
    }

    #[test]
    fn nearest_is_a_partition() {
        for count in [1, 2, 3, 7, 8, 100, 255, 256] {
            let levels = derive_levels(count).unwrap();
            for sample in 0..=255u8 {
                let matched: Vec<u8> = levels.iter()
                    .filter(|&l| levels.matches(l, sample, OverlapPolicy::NearestOnly))
                    .collect();
                assert_eq!(matched.len(), 1, "count {} sample {}", count, sample);
            }
        }
    }

    #[test]
    fn nearest_ties_go_down() {
        let levels = derive_levels(4).unwrap();
        assert_eq!(levels.nearest(32), 0);
        assert_eq!(levels.nearest(33), 64);
        assert_eq!(levels.nearest(250), 192);
    }

    #[test]
    fn coverage_when_bands_are_even() {
        for count in [1, 2, 4, 8, 16, 32, 64, 128, 256] {
            let levels = derive_levels(count).unwrap();
            for sample in 0..=255u8 {
                assert!(
                    levels.iter().any(|l| levels.matches(l, sample, OverlapPolicy::AllowMultiMatch)),
                    "count {} sample {}", count, sample,
                );
            }
        }
    }

    #[test]
    fn mask_agrees_with_matches() {
        let levels = derive_levels(5).unwrap();
        for policy in [OverlapPolicy::AllowMultiMatch, OverlapPolicy::NearestOnly] {
            for level in &levels {
                let mask = levels.mask(level, policy);
                for sample in 0..=255u8 {
                    assert_eq!(mask[sample as usize], levels.matches(level, sample, policy));
                }
            }
        }
    }
}
