use alloc::collections::VecDeque;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use num_traits::{NumCast, Zero};

use crate::error::Error;
use crate::hasher::{BoundedRankHasher, RankHasher};
use crate::key::Key;
use crate::util::SearchBound;

use super::{SplinePoint, bits_for, fit_spline, interpolate, low_bits, to_bin};

pub const DEFAULT_NUM_BINS: usize = 64;
pub const DEFAULT_MAX_ERROR: usize = 32;

/// Entry high bit marks a leaf; the remaining bits index `leaf_ranges`.
const LEAF_FLAG: u32 = 1 << 31;

/// Spline-based CDF with a compact hierarchical trie directory.
///
/// Every trie level splits its key range into `num_bins` equal sub-ranges.
/// A bin whose spline points span at most `max_error` ranks becomes a leaf
/// recording the candidate spline-point range; otherwise a child node splits
/// it further. Nodes live in one flat entry array (children are offsets, not
/// pointers), so the model is cache-friendly and trivially movable.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(bound = "K: serde::Serialize + serde::de::DeserializeOwned")
)]
pub struct ChtHash<K: Key> {
    min_key: K,
    max_key: K,
    log_num_bins: usize,
    root_shift: usize,
    entries: Vec<u32>,
    leaf_ranges: Vec<(u32, u32)>,
    points: Vec<SplinePoint<K>>,
    out_scale: f64,
    full_size: usize,
    num_bins: usize,
    max_error: usize,
}

impl<K: Key> ChtHash<K> {
    /// Trains with the reference parameters (64 bins, max error 32).
    pub fn new(sample: &[K], full_size: usize) -> Self {
        Self::build(sample, full_size, DEFAULT_NUM_BINS, DEFAULT_MAX_ERROR)
    }

    /// Trains with an explicit bin count (rounded up to a power of two) and
    /// error bound.
    pub fn with_params(
        sample: &[K],
        full_size: usize,
        num_bins: usize,
        max_error: usize,
    ) -> Result<Self, Error> {
        if max_error == 0 {
            return Err(Error::InvalidEpsilon);
        }
        Ok(Self::build(sample, full_size, num_bins, max_error))
    }

    fn build(sample: &[K], full_size: usize, num_bins: usize, max_error: usize) -> Self {
        debug_assert!(
            sample.windows(2).all(|w| w[0] <= w[1]),
            "sample must be sorted"
        );

        // A node cannot extract more bits than the key width offers.
        let key_bits = core::mem::size_of::<K::Unsigned>() * 8;
        let log_num_bins = (num_bins.next_power_of_two().max(2).trailing_zeros() as usize)
            .min(key_bits - 1);
        let num_bins = 1usize << log_num_bins;

        let n = sample.len();
        if n == 0 {
            return Self {
                min_key: K::zero(),
                max_key: K::zero(),
                log_num_bins,
                root_shift: 0,
                entries: Vec::new(),
                leaf_ranges: Vec::new(),
                points: Vec::new(),
                out_scale: 0.0,
                full_size: 0,
                num_bins,
                max_error,
            };
        }

        let (min_key, max_key) = (sample[0], sample[n - 1]);
        let points = fit_spline(sample, max_error);

        let min_u = min_key.to_unsigned();
        let range = max_key.to_unsigned() - min_u;
        let root_shift = bits_for(range).saturating_sub(log_num_bins);

        struct Task<U> {
            entry_base: usize,
            base: U,
            shift: usize,
        }

        let mut entries = alloc::vec![0u32; num_bins];
        let mut leaf_ranges: Vec<(u32, u32)> = Vec::new();
        let mut queue: VecDeque<Task<K::Unsigned>> = VecDeque::new();
        queue.push_back(Task {
            entry_base: 0,
            base: K::Unsigned::zero(),
            shift: root_shift,
        });

        let offset_of = |p: &SplinePoint<K>| p.x.to_unsigned() - min_u;

        while let Some(task) = queue.pop_front() {
            for bin in 0..num_bins {
                let step: K::Unsigned = NumCast::from(bin).unwrap();
                let bin_lo = task.base | (step << task.shift);
                let bin_hi = bin_lo | low_bits::<K::Unsigned>(task.shift);

                // Conservative candidate range: [first point at or past the
                // bin, first point past it], so a lookup always finds the
                // straddling pair.
                let lo = points.partition_point(|p| offset_of(p) < bin_lo);
                let hi = points.partition_point(|p| offset_of(p) <= bin_hi);

                let span = if hi > lo {
                    points[(hi).min(points.len() - 1)].y - points[lo.min(points.len() - 1)].y
                } else {
                    0.0
                };

                // Descending below log_num_bins bits would misalign the bin
                // extraction, so such bins stay leaves.
                if task.shift < log_num_bins || hi - lo <= 1 || span <= max_error as f64 {
                    let leaf_id = leaf_ranges.len() as u32;
                    leaf_ranges.push((lo as u32, hi as u32));
                    entries[task.entry_base + bin] = LEAF_FLAG | leaf_id;
                } else {
                    let child_id = entries.len() / num_bins;
                    entries[task.entry_base + bin] = child_id as u32;
                    entries.resize(entries.len() + num_bins, 0);
                    queue.push_back(Task {
                        entry_base: child_id * num_bins,
                        base: bin_lo,
                        shift: task.shift - log_num_bins,
                    });
                }
            }
        }

        Self {
            min_key,
            max_key,
            log_num_bins,
            root_shift,
            entries,
            leaf_ranges,
            points,
            out_scale: (full_size.saturating_sub(1)) as f64 / n as f64,
            full_size,
            num_bins,
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

        let off = key.to_unsigned() - self.min_key.to_unsigned();
        let mask = low_bits::<K::Unsigned>(self.log_num_bins);
        let mut entry_base = 0usize;
        let mut shift = self.root_shift;

        loop {
            let bin = to_bin((off >> shift) & mask);
            let entry = self.entries[entry_base + bin];
            if entry & LEAF_FLAG != 0 {
                let (lo, hi) = self.leaf_ranges[(entry & !LEAF_FLAG) as usize];
                return interpolate(&self.points, lo as usize, hi as usize + 1, key);
            }
            entry_base = entry as usize * self.num_bins;
            shift -= self.log_num_bins;
        }
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
        format!("cht_{}_{}", self.num_bins, self.max_error)
    }

    /// Number of spline points.
    #[inline]
    pub fn model_count(&self) -> usize {
        self.points.len()
    }

    pub fn byte_size(&self) -> usize {
        core::mem::size_of::<Self>()
            + self.points.capacity() * core::mem::size_of::<SplinePoint<K>>()
            + self.entries.capacity() * core::mem::size_of::<u32>()
            + self.leaf_ranges.capacity() * core::mem::size_of::<(u32, u32)>()
    }
}

impl<K: Key> RankHasher<K> for ChtHash<K> {
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

impl<K: Key> BoundedRankHasher<K> for ChtHash<K> {
    #[inline]
    fn bounds(&self, key: K) -> SearchBound {
        self.bounds(key)
    }
}
