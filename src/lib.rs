//! # Learned Hashing
//!
//! Learned hash functions for sorted integer keys. Each model trains on a
//! sorted sample of a key distribution and maps any key to its approximate
//! rank, scaled into a caller-chosen output range `[0, full_size)`. The
//! result is a compact, monotone-ish hash function for learned indexes,
//! order-preserving hash tables and histogram builders.
//!
//! ## Quick Start
//!
//! ```rust
//! use learned_hashing::{PgmHash, RadixSplineHash, RmiHash};
//!
//! let sample: Vec<u64> = (0..10_000).map(|i| i * 3).collect();
//!
//! // Two-level RMI with up to 100 leaf models.
//! let rmi = RmiHash::new(&sample, 10_000, 100);
//! assert!(rmi.hash(15_000) < 10_000);
//!
//! // Radix spline with bounded rank error.
//! let rs = RadixSplineHash::new(&sample, 10_000);
//! let bound = rs.bounds(15_000);
//! assert!(bound.begin <= bound.pos && bound.pos < bound.end);
//!
//! // PGM with a recursive segment tower.
//! let pgm = PgmHash::new(&sample, 10_000, 64, 4).unwrap();
//! assert!(pgm.hash(15_000) < 10_000);
//! ```
//!
//! ## Model kinds
//!
//! - [`RmiHash`]: two-level recursive model index; fastest to query, monotone
//!   on trained keys only.
//! - [`MonotoneRmiHash`]: RMI with stitched leaves, monotone for every
//!   integer in the key domain.
//! - [`RadixSplineHash`] / [`ChtHash`] / [`TrieSplineHash`]: greedy spline
//!   CDFs behind a radix, fixed-fanout trie, or adaptive trie directory;
//!   monotone with a `±max_error` rank guarantee and search bounds.
//! - [`PgmHash`]: piecewise geometric model with a recursive tower; monotone
//!   with a `±epsilon` rank guarantee.
//!
//! All models implement [`RankHasher`]; the ones with an error bound also
//! implement [`BoundedRankHasher`]. Models are immutable after training and
//! safe to query concurrently.
//!
//! ## Features
//!
//! - `std` (default): implements `std::error::Error` for [`Error`]
//! - `serde`: serialization/deserialization for every model type

#![cfg_attr(not(feature = "std"), no_std)]
extern crate alloc;

pub mod error;
pub mod hasher;
pub mod key;
pub mod pgm;
pub mod rmi;
pub mod segment;
pub mod spline;
pub mod util;

pub use error::Error;
pub use hasher::{BoundedRankHasher, RankHasher};
pub use key::Key;
pub use segment::LinearSegment;
pub use util::SearchBound;

// Re-export the hashers at the crate root for convenience.
pub use pgm::PgmHash;
pub use rmi::{BuildMode, MonotoneRmiHash, RmiHash};
pub use spline::{ChtHash, RadixSplineHash, TrieSplineHash};

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn check_contract<K, H>(sample: &[K], full_size: usize)
    where
        K: Key,
        H: RankHasher<K>,
    {
        let hasher = H::train(sample, full_size).unwrap();

        let mut last = 0usize;
        for &key in sample {
            let h = hasher.hash(key);
            assert!(h < full_size, "{}: hash out of range", hasher.name());
            assert!(h >= last, "{}: not monotone on sample keys", hasher.name());
            last = h;
        }

        assert_eq!(hasher.hash(K::max_value()), full_size - 1);
        assert!(hasher.model_count() >= 1);
        assert!(hasher.byte_size() > 0);
    }

    #[test]
    fn test_contract_all_models() {
        let sample: Vec<u64> = (0..10_000).map(|i| 20_000 + i * 7).collect();

        check_contract::<u64, RmiHash<u64>>(&sample, 50_000);
        check_contract::<u64, MonotoneRmiHash<u64>>(&sample, 50_000);
        check_contract::<u64, RadixSplineHash<u64>>(&sample, 50_000);
        check_contract::<u64, ChtHash<u64>>(&sample, 50_000);
        check_contract::<u64, TrieSplineHash<u64>>(&sample, 50_000);
        check_contract::<u64, PgmHash<u64>>(&sample, 50_000);
    }

    #[test]
    fn test_contract_signed_keys() {
        let sample: Vec<i64> = (-5000..5000).map(|i| i * 3).collect();

        check_contract::<i64, RmiHash<i64>>(&sample, 10_000);
        check_contract::<i64, PgmHash<i64>>(&sample, 10_000);
        check_contract::<i64, RadixSplineHash<i64>>(&sample, 10_000);
    }

    #[test]
    fn test_bounded_hashers_agree_with_hash() {
        let sample: Vec<u64> = (0..5000).map(|i| i * 13).collect();

        fn check<H: BoundedRankHasher<u64>>(sample: &[u64], full_size: usize) {
            let hasher = H::train(sample, full_size).unwrap();
            for &key in sample.iter().step_by(37) {
                let b = hasher.bounds(key);
                assert!(b.begin <= b.pos && b.pos < b.end);
                assert!(b.end <= full_size);
                assert_eq!(b.pos, hasher.hash(key));
            }
        }

        check::<RadixSplineHash<u64>>(&sample, 5000);
        check::<ChtHash<u64>>(&sample, 5000);
        check::<TrieSplineHash<u64>>(&sample, 5000);
        check::<PgmHash<u64>>(&sample, 5000);
    }

    #[test]
    fn test_names_are_distinct() {
        let sample: Vec<u64> = (0..100).collect();
        let names = [
            RmiHash::new(&sample, 100, 10).name(),
            MonotoneRmiHash::new(&sample, 100, 10).name(),
            RadixSplineHash::new(&sample, 100).name(),
            ChtHash::new(&sample, 100).name(),
            TrieSplineHash::new(&sample, 100).name(),
            PgmHash::new(&sample, 100, 4, 1).unwrap().name(),
        ];
        for (i, a) in names.iter().enumerate() {
            for b in names.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
