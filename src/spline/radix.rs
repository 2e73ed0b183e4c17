use alloc::format;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use crate::error::Error;
use crate::hasher::{BoundedRankHasher, RankHasher};
use crate::key::Key;
use crate::util::SearchBound;

use super::{SplinePoint, bits_for, fit_spline, interpolate, to_bin};

pub const DEFAULT_RADIX_BITS: usize = 18;
pub const DEFAULT_MAX_ERROR: usize = 32;

/// Spline-based CDF with a flat radix directory.
///
/// The directory maps the `num_radix_bits` high bits of `key - min_key` to
/// the first spline point of that bucket, so a lookup binary-searches only a
/// handful of points before interpolating. Monotone non-decreasing over the
/// whole key domain.
///
/// # Example
///
/// ```
/// use learned_hashing::RadixSplineHash;
///
/// let sample: Vec<u64> = vec![1, 2, 4, 7, 10, 1000];
/// let rs = RadixSplineHash::new(&sample, 6);
///
/// let mut last = 0;
/// for key in 1..=1000u64 {
///     let h = rs.hash(key);
///     assert!(h < 6 && h >= last);
///     last = h;
/// }
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(bound = "K: serde::Serialize + serde::de::DeserializeOwned")
)]
pub struct RadixSplineHash<K: Key> {
    min_key: K,
    max_key: K,
    shift: usize,
    table: Vec<u32>,
    points: Vec<SplinePoint<K>>,
    out_scale: f64,
    full_size: usize,
    num_radix_bits: usize,
    max_error: usize,
}

impl<K: Key> RadixSplineHash<K> {
    /// Trains with the reference parameters (18 radix bits, max error 32).
    pub fn new(sample: &[K], full_size: usize) -> Self {
        Self::build(sample, full_size, DEFAULT_RADIX_BITS, DEFAULT_MAX_ERROR)
    }

    /// Trains with explicit parameters and a spline-point cap.
    pub fn with_params(
        sample: &[K],
        full_size: usize,
        num_radix_bits: usize,
        max_error: usize,
        max_models: usize,
    ) -> Result<Self, Error> {
        if max_error == 0 {
            return Err(Error::InvalidEpsilon);
        }
        let this = Self::build(sample, full_size, num_radix_bits, max_error);
        if this.points.len() > max_models {
            return Err(Error::TooManySegments {
                count: this.points.len(),
                max: max_models,
            });
        }
        Ok(this)
    }

    fn build(sample: &[K], full_size: usize, num_radix_bits: usize, max_error: usize) -> Self {
        debug_assert!(
            sample.windows(2).all(|w| w[0] <= w[1]),
            "sample must be sorted"
        );

        let n = sample.len();
        if n == 0 {
            return Self {
                min_key: K::zero(),
                max_key: K::zero(),
                shift: 0,
                table: Vec::new(),
                points: Vec::new(),
                out_scale: 0.0,
                full_size: 0,
                num_radix_bits,
                max_error,
            };
        }

        let (min_key, max_key) = (sample[0], sample[n - 1]);
        let points = fit_spline(sample, max_error);

        let min_u = min_key.to_unsigned();
        let range = max_key.to_unsigned() - min_u;
        let shift = bits_for(range).saturating_sub(num_radix_bits);
        let num_bins = to_bin(range >> shift) + 1;

        // table[b] = index of the first spline point whose bucket is >= b.
        let mut table = vec![0u32; num_bins + 1];
        let mut next_bin = 0usize;
        for (i, point) in points.iter().enumerate() {
            let b = to_bin((point.x.to_unsigned() - min_u) >> shift);
            while next_bin <= b {
                table[next_bin] = i as u32;
                next_bin += 1;
            }
        }
        while next_bin < table.len() {
            table[next_bin] = points.len() as u32;
            next_bin += 1;
        }

        Self {
            min_key,
            max_key,
            shift,
            table,
            points,
            out_scale: (full_size.saturating_sub(1)) as f64 / n as f64,
            full_size,
            num_radix_bits,
            max_error,
        }
    }

    /// Rank estimate within the sample, in `[0, sample_len)`.
    pub fn estimate(&self, key: K) -> f64 {
        if key <= self.min_key {
            return 0.0;
        }
        if key >= self.max_key {
            return self.points[self.points.len() - 1].y;
        }

        let b = to_bin((key.to_unsigned() - self.min_key.to_unsigned()) >> self.shift);
        let lo = self.table[b] as usize;
        let hi = self.table[b + 1] as usize + 1;
        interpolate(&self.points, lo, hi, key)
    }

    /// Estimated rank of `key` in `[0, full_size)`, monotone in `key`.
    #[inline]
    pub fn hash(&self, key: K) -> usize {
        if self.full_size == 0 {
            return 0;
        }
        if key == K::max_value() {
            return self.full_size - 1;
        }
        (self.estimate(key) * self.out_scale) as usize
    }

    /// Scaled rank interval containing `key`'s true rank.
    pub fn bounds(&self, key: K) -> SearchBound {
        let pos = self.hash(key);
        let eps = (self.max_error as f64 * self.out_scale).ceil() as usize;
        SearchBound::around(pos, eps, self.full_size)
    }

    pub fn name(&self) -> String {
        format!(
            "radix_spline_err{}_rbits{}",
            self.max_error, self.num_radix_bits
        )
    }

    /// Number of spline points.
    #[inline]
    pub fn model_count(&self) -> usize {
        self.points.len()
    }

    pub fn byte_size(&self) -> usize {
        core::mem::size_of::<Self>()
            + self.points.capacity() * core::mem::size_of::<SplinePoint<K>>()
            + self.table.capacity() * core::mem::size_of::<u32>()
    }
}

impl<K: Key> RankHasher<K> for RadixSplineHash<K> {
    fn train(sample: &[K], full_size: usize) -> Result<Self, Error> {
        Ok(Self::new(sample, full_size))
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

impl<K: Key> BoundedRankHasher<K> for RadixSplineHash<K> {
    #[inline]
    fn bounds(&self, key: K) -> SearchBound {
        self.bounds(key)
    }
}
