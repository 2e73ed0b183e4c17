//! Two-level recursive model indexes used as hash functions.
//!
//! A root [`LinearSegment`] routes each key to one of up to `M` leaf
//! segments; the chosen leaf extrapolates the key's rank into the output
//! range. [`RmiHash`] is the plain variant (fast, but only monotone on the
//! trained keys); [`MonotoneRmiHash`] stitches neighbouring leaves together
//! so the composite function is monotone for every integer in the key
//! domain.

mod monotone;

pub use monotone::MonotoneRmiHash;

use alloc::format;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::marker::PhantomData;

use crate::error::Error;
use crate::hasher::RankHasher;
use crate::key::Key;
use crate::segment::LinearSegment;

/// Guarantees each leaf sees at least this many sample keys on average, so a
/// large requested leaf count does not waste space on tiny samples.
pub(crate) const MIN_AVG_KEYS_PER_MODEL: usize = 2;

/// Leaf-model count used by the [`RankHasher::train`] shorthand.
pub const DEFAULT_LEAF_MODELS: usize = 1000;

/// Construction algorithm selector for [`RmiHash`].
///
/// Both produce equal models; the single-pass walk avoids the intermediate
/// per-bucket allocations and is the default.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildMode {
    /// One pass over the sample, training leaves as their buckets complete.
    SinglePass,
    /// Materialise per-leaf training buckets first, then fit each leaf.
    Bucketed,
}

/// Two-level piecewise-linear rank predictor.
///
/// # Example
///
/// ```
/// use learned_hashing::RmiHash;
///
/// let sample: Vec<u64> = (20_000..21_000).collect();
/// let rmi = RmiHash::new(&sample, 1000, 100);
///
/// for (i, &key) in sample.iter().enumerate() {
///     let h = rmi.hash(key);
///     assert!(h < 1000);
///     assert!(h.abs_diff(i) <= 2);
/// }
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RmiHash<K: Key> {
    root: LinearSegment,
    leaves: Vec<LinearSegment>,
    max_output: usize,
    max_leaf_models: usize,
    _key: PhantomData<K>,
}

impl<K: Key> RmiHash<K> {
    /// Trains on a sorted sample, extrapolating to `[0, full_size)` with at
    /// most `max_leaf_models` leaves.
    pub fn new(sample: &[K], full_size: usize, max_leaf_models: usize) -> Self {
        Self::with_mode(sample, full_size, max_leaf_models, BuildMode::SinglePass)
    }

    /// Like [`new`](Self::new), with an explicit construction algorithm.
    pub fn with_mode(
        sample: &[K],
        full_size: usize,
        max_leaf_models: usize,
        mode: BuildMode,
    ) -> Self {
        debug_assert!(
            sample.windows(2).all(|w| w[0] <= w[1]),
            "sample must be sorted"
        );

        let n = sample.len();
        if n == 0 {
            return Self {
                root: LinearSegment::default(),
                leaves: Vec::new(),
                max_output: 0,
                max_leaf_models,
                _key: PhantomData,
            };
        }

        let root = LinearSegment::from_ranks(sample, 0, n - 1);
        let num_leaves = if max_leaf_models == 0 {
            0
        } else {
            max_leaf_models.min(n / MIN_AVG_KEYS_PER_MODEL)
        };

        let leaves = if num_leaves == 0 {
            Vec::new()
        } else {
            match mode {
                BuildMode::SinglePass => Self::train_single_pass(sample, &root, num_leaves),
                BuildMode::Bucketed => Self::train_bucketed(sample, &root, num_leaves),
            }
        };

        Self {
            root,
            leaves,
            max_output: full_size.saturating_sub(1),
            max_leaf_models,
            _key: PhantomData,
        }
    }

    /// Single pass over the sample: a leaf's training window is frozen as
    /// soon as the root routes a key past it.
    fn train_single_pass(sample: &[K], root: &LinearSegment, num_leaves: usize) -> Vec<LinearSegment> {
        let mut leaves = vec![LinearSegment::default(); num_leaves];

        let mut finished_end = 0usize;
        let mut previous_end = 0usize;
        let mut last_index = 0usize;
        let mut train_until = |upto: usize, previous_end: usize| {
            while last_index < upto {
                leaves[last_index] = LinearSegment::from_ranks(sample, finished_end, previous_end);
                last_index += 1;
                finished_end = previous_end;
            }
        };

        for (i, &key) in sample.iter().enumerate() {
            let leaf_index = root.evaluate(key, num_leaves - 1);
            train_until(leaf_index, previous_end);
            previous_end = i;
        }
        train_until(num_leaves, previous_end);

        leaves
    }

    /// Reference algorithm: materialise each leaf's training bucket, then
    /// fit an endpoint spline per bucket. Buckets short of two points borrow
    /// the previous bucket's last point, so neighbouring leaves share an
    /// anchor.
    fn train_bucketed(sample: &[K], root: &LinearSegment, num_leaves: usize) -> Vec<LinearSegment> {
        let n = sample.len() as f64;
        let mut buckets: Vec<Vec<(K, f64)>> = vec![Vec::new(); num_leaves];

        for (i, &key) in sample.iter().enumerate() {
            let leaf_index = root.evaluate(key, num_leaves - 1);

            // The previous bucket is complete once a key routes past it, so
            // its last point doubles as this bucket's left anchor.
            if buckets[leaf_index].is_empty() && leaf_index > 0 {
                if let Some(j) = (0..leaf_index).rev().find(|&j| !buckets[j].is_empty()) {
                    let carried = *buckets[j].last().unwrap();
                    buckets[leaf_index].push(carried);
                }
            }

            buckets[leaf_index].push((key, i as f64 / n));
        }

        // The first bucket may hold a single point; pad with the origin.
        while buckets[0].len() < 2 {
            buckets[0].insert(0, (K::zero(), 0.0));
        }

        let mut leaves = Vec::with_capacity(num_leaves);
        for idx in 0..num_leaves {
            while buckets[idx].len() < 2 {
                let carried = *buckets[idx - 1].last().unwrap();
                buckets[idx].insert(0, carried);
            }
            leaves.push(LinearSegment::endpoint_spline(&buckets[idx]));
        }

        leaves
    }

    /// Estimated rank of `key` in `[0, full_size)`.
    #[inline]
    pub fn hash(&self, key: K) -> usize {
        if key == K::max_value() {
            return self.max_output;
        }
        if self.leaves.is_empty() {
            return self.root.evaluate(key, self.max_output);
        }

        let leaf_index = self.root.evaluate(key, self.leaves.len() - 1);
        self.leaves[leaf_index].evaluate(key, self.max_output)
    }

    pub fn name(&self) -> String {
        format!("rmi_hash_{}", self.max_leaf_models)
    }

    /// Root plus leaf models.
    #[inline]
    pub fn model_count(&self) -> usize {
        1 + self.leaves.len()
    }

    pub fn byte_size(&self) -> usize {
        core::mem::size_of::<Self>()
            + self.leaves.capacity() * core::mem::size_of::<LinearSegment>()
    }
}

impl<K: Key> RankHasher<K> for RmiHash<K> {
    fn train(sample: &[K], full_size: usize) -> Result<Self, Error> {
        Ok(Self::new(sample, full_size, DEFAULT_LEAF_MODELS))
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
