//! The common hasher contract every model kind implements.
//!
//! A rank hasher owns an immutable trained model plus its output scaling and
//! maps any key of the domain to `[0, full_size)`. All implementations are
//! interchangeable: training takes the same inputs, errors surface the same
//! way, and queries are total.

use alloc::string::String;

use crate::error::Error;
use crate::key::Key;
use crate::util::SearchBound;

/// A learned hash function trained on a sorted key sample.
///
/// `train` uses each family's default parameters (the concrete types expose
/// richer constructors). After `train` returns, the model is frozen: `hash`
/// is a pure function and concurrent readers need no synchronisation.
///
/// # Example
///
/// ```
/// use learned_hashing::{RankHasher, RmiHash};
///
/// let sample: Vec<u64> = (0..1000).map(|i| i * 3).collect();
/// let rmi: RmiHash<u64> = RankHasher::train(&sample, 10_000).unwrap();
///
/// for &key in &sample {
///     assert!(rmi.hash(key) < 10_000);
/// }
/// ```
pub trait RankHasher<K: Key>: Sized {
    /// Trains on a sorted (non-decreasing) sample, extrapolating ranks to
    /// `[0, full_size)`. An empty sample yields a model hashing every key
    /// to 0.
    fn train(sample: &[K], full_size: usize) -> Result<Self, Error>;

    /// Maps `key` to its estimated rank in `[0, full_size)`. Total: keys
    /// outside the trained domain saturate, `K::max_value()` hashes to
    /// `full_size - 1`.
    fn hash(&self, key: K) -> usize;

    /// Identifier including the parameter values, e.g. `"rmi_hash_100"`.
    fn name(&self) -> String;

    /// Approximate memory usage in bytes.
    fn byte_size(&self) -> usize;

    /// Number of trained models (segments, spline points, ...).
    fn model_count(&self) -> usize;
}

/// Rank hashers that can bound the true rank of a key, not just estimate it.
pub trait BoundedRankHasher<K: Key>: RankHasher<K> {
    /// Returns a rank interval guaranteed to contain `key`'s true rank,
    /// derived from the model's error bound. `end` is exclusive and never
    /// exceeds the output range.
    fn bounds(&self, key: K) -> SearchBound;
}
