use alloc::vec::Vec;

use crate::key::Key;

/// One linear piece of a PGM level.
///
/// The segment covers the keys from `first_key` up to the next segment's
/// first key; within that span the rank grows from `first_rank` at `slope`
/// per key unit. Keeping the start rank as an integer makes the
/// monotonicity clamp against the successor segment exact.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Segment<K: Key> {
    pub first_key: K,
    pub first_rank: usize,
    pub slope: f64,
}

impl<K: Key> Segment<K> {
    /// Rank prediction for `key`, unclamped. Negative below `first_key` when
    /// the slope is positive; callers clamp into their level's range.
    #[inline(always)]
    pub fn extrapolate(&self, key: K) -> f64 {
        self.first_rank as f64 + self.slope * (key.to_f64_fast() - self.first_key.to_f64_fast())
    }
}

/// Greedy ±`epsilon` segmentation of one level.
///
/// Each outer iteration opens a segment at `keys[start]` and widens it while
/// some slope through the start point stays within `epsilon` ranks of every
/// key in the window; the admissible slopes form an interval that only ever
/// shrinks, so the first key that empties it starts the next segment. The
/// midpoint of the final interval becomes the segment's slope.
pub(crate) fn fit_level<K: Key>(keys: &[K], epsilon: usize) -> Vec<Segment<K>> {
    let eps = epsilon as f64;
    let mut segments = Vec::new();

    let mut start = 0usize;
    while start < keys.len() {
        let origin = keys[start];
        let origin_x = origin.to_f64_fast();
        let mut admissible = (f64::NEG_INFINITY, f64::INFINITY);

        let mut end = start + 1;
        while end < keys.len() {
            let dx = keys[end].to_f64_fast() - origin_x;
            let dy = (end - start) as f64;

            if dx > 0.0 {
                let narrowed = (
                    admissible.0.max((dy - eps) / dx),
                    admissible.1.min((dy + eps) / dx),
                );
                if narrowed.0 > narrowed.1 {
                    break;
                }
                admissible = narrowed;
            }
            // dx == 0 is a duplicate key; it never constrains the slope.
            end += 1;
        }

        let slope = match (admissible.0.is_finite(), admissible.1.is_finite()) {
            (true, true) => (admissible.0 + admissible.1) / 2.0,
            (true, false) => admissible.0,
            (false, true) => admissible.1,
            (false, false) => 0.0,
        };
        segments.push(Segment {
            first_key: origin,
            first_rank: start,
            slope,
        });

        start = end;
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn rank_of<K: Key>(segments: &[Segment<K>], key: K) -> f64 {
        let idx = segments
            .partition_point(|s| s.first_key <= key)
            .saturating_sub(1);
        segments[idx].extrapolate(key)
    }

    #[test]
    fn test_extrapolate() {
        let seg = Segment {
            first_key: 10u64,
            first_rank: 5,
            slope: 0.5,
        };
        assert_eq!(seg.extrapolate(10), 5.0);
        assert_eq!(seg.extrapolate(20), 10.0);
        assert_eq!(seg.extrapolate(0), 0.0);
    }

    #[test]
    fn test_uniform_needs_one_segment() {
        let keys: Vec<u64> = (0..1000).collect();
        let segments = fit_level(&keys, 8);
        assert_eq!(segments.len(), 1);
        assert!(segments[0].slope > 0.0);
    }

    #[test]
    fn test_single_key() {
        let segments = fit_level(&[42u64], 8);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].first_key, 42);
        assert_eq!(segments[0].first_rank, 0);
        assert_eq!(segments[0].slope, 0.0);
    }

    #[test]
    fn test_empty() {
        let segments = fit_level::<u64>(&[], 8);
        assert!(segments.is_empty());
    }

    #[test]
    fn test_quadratic_splits() {
        let keys: Vec<u64> = (0..1000).map(|i| i * i).collect();
        let segments = fit_level(&keys, 32);
        assert!(segments.len() > 1);
    }

    #[test]
    fn test_segments_partition_the_keys() {
        let keys: Vec<u64> = (0..5000).map(|i| i * i / 7).collect();
        let segments = fit_level(&keys, 4);

        assert_eq!(segments[0].first_rank, 0);
        for w in segments.windows(2) {
            assert!(w[0].first_key < w[1].first_key);
            assert!(w[0].first_rank < w[1].first_rank);
        }
    }

    #[test]
    fn test_epsilon_guarantee() {
        let keys: Vec<u64> = (0..10_000).map(|i| i * 7 + i / 13).collect();
        let epsilon = 16usize;
        let segments = fit_level(&keys, epsilon);

        for (i, &key) in keys.iter().enumerate() {
            let predicted = rank_of(&segments, key);
            let error = (predicted - i as f64).abs();
            assert!(
                error <= epsilon as f64 + 1.0,
                "error {} > epsilon {} for key {} at rank {}",
                error,
                epsilon,
                key,
                i
            );
        }
    }

    #[test]
    fn test_duplicates_stay_in_one_segment() {
        let keys: Vec<u64> = alloc::vec![5, 5, 5, 5, 9, 9, 20];
        let segments = fit_level(&keys, 4);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].first_key, 5);
    }
}
