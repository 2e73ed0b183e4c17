//! Piecewise geometric model (PGM) rank hasher.
//!
//! Level 0 is a greedy ±`epsilon` segmentation of the sample CDF; each level
//! above segments the first-keys of the level below with
//! ±`epsilon_recursive`, until a level stops shrinking (with a recursive
//! error bound of at least 1 that leaves a single segment on top). A query
//! walks the levels top-down, narrowing each step to the small index window
//! the level above guarantees, and keeps the bottom prediction in full
//! precision so the sample-to-full scaling does not collapse nearby keys
//! onto one slot.

mod builder;
mod segment;

pub use builder::Builder;
pub use segment::Segment;

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::error::Error;
use crate::hasher::{BoundedRankHasher, RankHasher};
use crate::key::Key;
use crate::util::SearchBound;

use segment::fit_level;

pub const DEFAULT_EPSILON: usize = 64;
pub const DEFAULT_EPSILON_RECURSIVE: usize = 4;

/// Piecewise-geometric-model hash function.
///
/// The returned rank is within `±epsilon · full_size / sample_len` of the true
/// rank for every sample key, and the function is monotone non-decreasing over
/// the whole integer key domain.
///
/// # Example
///
/// ```
/// use learned_hashing::PgmHash;
///
/// let sample: Vec<u64> = (0..1000).map(|i| i * 17).collect();
/// let pgm = PgmHash::new(&sample, 100_000, 16, 4).unwrap();
///
/// for (i, &key) in sample.iter().enumerate() {
///     let h = pgm.hash(key);
///     assert!(h < 100_000);
///     assert!(h.abs_diff(i * 100) <= 1700);
/// }
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(bound = "K: serde::Serialize + serde::de::DeserializeOwned")
)]
pub struct PgmHash<K: Key> {
    epsilon: usize,
    epsilon_recursive: usize,
    sample_len: usize,
    full_size: usize,
    scale_fac: f64,
    /// `levels[0]` covers the sample; `levels[l]` covers the first-keys of
    /// `levels[l - 1]`.
    levels: Vec<Vec<Segment<K>>>,
}

impl<K: Key> PgmHash<K> {
    /// Trains on a sorted sample, extrapolating ranks to `[0, full_size)`.
    pub fn new(
        sample: &[K],
        full_size: usize,
        epsilon: usize,
        epsilon_recursive: usize,
    ) -> Result<Self, Error> {
        Self::with_max_segments(sample, full_size, epsilon, epsilon_recursive, usize::MAX)
    }

    /// Like [`new`](Self::new), failing with [`Error::TooManySegments`] when
    /// the level-0 segmentation exceeds `max_segments`.
    pub fn with_max_segments(
        sample: &[K],
        full_size: usize,
        epsilon: usize,
        epsilon_recursive: usize,
        max_segments: usize,
    ) -> Result<Self, Error> {
        if epsilon == 0 {
            return Err(Error::InvalidEpsilon);
        }
        debug_assert!(
            sample.windows(2).all(|w| w[0] <= w[1]),
            "sample must be sorted"
        );

        let n = sample.len();
        let mut levels: Vec<Vec<Segment<K>>> = Vec::new();

        if n > 0 {
            let bottom = fit_level(sample, epsilon);
            if bottom.len() > max_segments {
                return Err(Error::TooManySegments {
                    count: bottom.len(),
                    max: max_segments,
                });
            }
            levels.push(bottom);

            // Stack index levels until one shrinks no further.
            while epsilon_recursive > 0 {
                let top_len = levels[levels.len() - 1].len();
                if top_len == 1 {
                    break;
                }
                let first_keys: Vec<K> = levels[levels.len() - 1]
                    .iter()
                    .map(|s| s.first_key)
                    .collect();
                let upper = fit_level(&first_keys, epsilon_recursive);
                if upper.len() >= top_len {
                    break;
                }
                levels.push(upper);
            }
        }

        Ok(Self {
            epsilon,
            epsilon_recursive,
            sample_len: n,
            full_size: if n == 0 { 0 } else { full_size },
            scale_fac: if n == 0 {
                0.0
            } else {
                full_size as f64 / n as f64
            },
            levels,
        })
    }

    /// Index of the last segment in `level[lo..hi]` whose first key is at
    /// most `key` (or `lo` when none is).
    #[inline]
    fn predecessor(level: &[Segment<K>], key: K, lo: usize, hi: usize) -> usize {
        lo + level[lo..hi]
            .partition_point(|s| s.first_key <= key)
            .saturating_sub(1)
    }

    /// Walks the tower top-down to the level-0 segment covering `key`.
    fn bottom_index(&self, key: K) -> usize {
        let top = self.levels.len() - 1;
        let mut idx = Self::predecessor(&self.levels[top], key, 0, self.levels[top].len());

        for depth in (0..top).rev() {
            let level = &self.levels[depth];
            // The segment above predicts where `key` sits among this level's
            // first-keys, up to its recursive error bound (plus one for the
            // prediction rounding).
            let guess_f = self.levels[depth + 1][idx].extrapolate(key);
            let guess = (guess_f.max(0.0) as usize).min(level.len() - 1);

            let window_lo = guess.saturating_sub(self.epsilon_recursive + 1);
            let window_hi = (guess + self.epsilon_recursive + 2).min(level.len());
            idx = Self::predecessor(level, key, window_lo, window_hi);
        }

        idx
    }

    /// Full-precision rank estimate within the sample, in `[0, sample_len]`.
    fn estimate(&self, key: K) -> f64 {
        let bottom = &self.levels[0];
        let idx = self.bottom_index(key);

        // Never predict past the successor's start rank; this keeps the
        // estimate monotone across segment boundaries.
        let cap = match bottom.get(idx + 1) {
            Some(next) => next.first_rank as f64,
            None => self.sample_len as f64,
        };
        bottom[idx].extrapolate(key).clamp(0.0, cap)
    }

    /// Estimated rank of `key` in `[0, full_size)`, monotone in `key`.
    #[inline]
    pub fn hash(&self, key: K) -> usize {
        if self.levels.is_empty() || self.full_size == 0 {
            return 0;
        }
        if key == K::max_value() {
            return self.full_size - 1;
        }

        let hashed = (self.scale_fac * self.estimate(key)) as usize;
        hashed.min(self.full_size - 1)
    }

    /// Scaled rank interval containing `key`'s true rank.
    pub fn bounds(&self, key: K) -> SearchBound {
        let pos = self.hash(key);
        let eps = (self.epsilon as f64 * self.scale_fac).ceil() as usize;
        SearchBound::around(pos, eps, self.full_size)
    }

    pub fn name(&self) -> String {
        format!(
            "pgm_hash_eps{}_epsrec{}",
            self.epsilon, self.epsilon_recursive
        )
    }

    #[inline]
    pub fn epsilon(&self) -> usize {
        self.epsilon
    }

    #[inline]
    pub fn epsilon_recursive(&self) -> usize {
        self.epsilon_recursive
    }

    /// Number of levels in the tower.
    #[inline]
    pub fn height(&self) -> usize {
        self.levels.len()
    }

    /// Segments across all levels.
    #[inline]
    pub fn model_count(&self) -> usize {
        self.levels.iter().map(Vec::len).sum()
    }

    pub fn byte_size(&self) -> usize {
        let segments: usize = self
            .levels
            .iter()
            .map(|level| level.capacity() * core::mem::size_of::<Segment<K>>())
            .sum();
        core::mem::size_of::<Self>()
            + self.levels.capacity() * core::mem::size_of::<Vec<Segment<K>>>()
            + segments
    }
}

impl<K: Key> RankHasher<K> for PgmHash<K> {
    fn train(sample: &[K], full_size: usize) -> Result<Self, Error> {
        Self::new(sample, full_size, DEFAULT_EPSILON, DEFAULT_EPSILON_RECURSIVE)
    }

    #[inline]
    fn hash(&self, key: K) -> usize {
        self.hash(key)
    }

    fn name(&self) -> String {
        self.name()
    }

    fn byte_size(&self) -> usize {
        self.byte_size()
    }

    fn model_count(&self) -> usize {
        self.model_count()
    }
}

impl<K: Key> BoundedRankHasher<K> for PgmHash<K> {
    #[inline]
    fn bounds(&self, key: K) -> SearchBound {
        self.bounds(key)
    }
}
