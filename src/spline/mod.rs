//! Radix-bucketed approximate CDFs.
//!
//! The three hashers in this module share one representation: a sequence of
//! spline points fitted over the sample CDF with a greedy error corridor, and
//! a directory keyed on high bits of the key that narrows every lookup to a
//! small spline-point range. They differ only in the directory:
//!
//! - [`RadixSplineHash`]: a flat radix table.
//! - [`ChtHash`]: a fixed-fanout hierarchical trie, with search bounds.
//! - [`TrieSplineHash`]: a trie whose fanout adapts per node.

mod cht;
mod radix;
mod trie;

pub use cht::ChtHash;
pub use radix::RadixSplineHash;
pub use trie::TrieSplineHash;

use alloc::vec::Vec;
use num_traits::{PrimInt, ToPrimitive};

use crate::key::Key;

/// A CDF anchor: `y` is the rank of `x` within the sample.
///
/// Spline points have strictly increasing `x` and strictly increasing `y`
/// (duplicate sample keys keep their first rank).
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SplinePoint<K> {
    pub x: K,
    pub y: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Orientation {
    Collinear,
    Clockwise,
    CounterClockwise,
}

/// Sign of the cross product of `(dx1, dy1)` and `(dx2, dy2)`.
#[inline]
fn orientation(dx1: f64, dy1: f64, dx2: f64, dy2: f64) -> Orientation {
    let expr = dy1 * dx2 - dy2 * dx1;
    if expr > f64::EPSILON {
        Orientation::Clockwise
    } else if expr < -f64::EPSILON {
        Orientation::CounterClockwise
    } else {
        Orientation::Collinear
    }
}

/// Streaming greedy-corridor spline fit.
///
/// Keeps the upper and lower corridor limits (`rank ± max_error`) relative to
/// the last emitted spline point; while a new CDF point stays inside the
/// corridor the current segment is extended, otherwise the previous point is
/// emitted as an anchor and the corridor restarts there. The first and last
/// sample keys are always emitted, so every key of the trained domain lies
/// between two anchors.
struct SplineBuilder<K: Key> {
    max_error: f64,
    points: Vec<SplinePoint<K>>,
    num_keys: usize,
    num_distinct: usize,
    prev_key: K,
    prev_point: SplinePoint<K>,
    upper: (f64, f64),
    lower: (f64, f64),
}

impl<K: Key> SplineBuilder<K> {
    fn new(max_error: usize) -> Self {
        Self {
            max_error: max_error as f64,
            points: Vec::new(),
            num_keys: 0,
            num_distinct: 0,
            prev_key: K::zero(),
            prev_point: SplinePoint {
                x: K::zero(),
                y: 0.0,
            },
            upper: (0.0, 0.0),
            lower: (0.0, 0.0),
        }
    }

    fn add_key(&mut self, key: K) {
        debug_assert!(
            self.num_keys == 0 || key >= self.prev_key,
            "keys must be added in sorted order"
        );
        let position = self.num_keys as f64;
        self.possibly_add(key, position);
        self.num_keys += 1;
        self.prev_key = key;
    }

    fn possibly_add(&mut self, key: K, position: f64) {
        if self.num_distinct == 0 {
            self.points.push(SplinePoint { x: key, y: position });
            self.prev_point = SplinePoint { x: key, y: position };
            self.num_distinct = 1;
            return;
        }

        // Duplicates keep their first rank.
        if key == self.prev_key {
            return;
        }
        self.num_distinct += 1;

        let x = key.to_f64_fast();
        let upper_y = position + self.max_error;
        let lower_y = (position - self.max_error).max(0.0);

        if self.num_distinct == 2 {
            self.upper = (x, upper_y);
            self.lower = (x, lower_y);
            self.prev_point = SplinePoint { x: key, y: position };
            return;
        }

        let last = self.points[self.points.len() - 1];
        let (lx, ly) = (last.x.to_f64_fast(), last.y);

        let inside_upper =
            orientation(self.upper.0 - lx, self.upper.1 - ly, x - lx, position - ly)
                == Orientation::Clockwise;
        let inside_lower =
            orientation(self.lower.0 - lx, self.lower.1 - ly, x - lx, position - ly)
                == Orientation::CounterClockwise;

        if !inside_upper || !inside_lower {
            // Corridor violated: the previous CDF point becomes an anchor and
            // the corridor restarts relative to it.
            self.points.push(self.prev_point);
            self.upper = (x, upper_y);
            self.lower = (x, lower_y);
        } else {
            if orientation(self.upper.0 - lx, self.upper.1 - ly, x - lx, upper_y - ly)
                == Orientation::Clockwise
            {
                self.upper = (x, upper_y);
            }
            if orientation(self.lower.0 - lx, self.lower.1 - ly, x - lx, lower_y - ly)
                == Orientation::CounterClockwise
            {
                self.lower = (x, lower_y);
            }
        }

        self.prev_point = SplinePoint { x: key, y: position };
    }

    fn finalize(mut self) -> Vec<SplinePoint<K>> {
        if self.num_keys > 0 && self.points[self.points.len() - 1].x != self.prev_point.x {
            self.points.push(self.prev_point);
        }
        self.points
    }
}

/// Fits a spline over the sorted sample with `|estimate(k_i) - i| <= max_error`
/// for every sample key.
pub(crate) fn fit_spline<K: Key>(sample: &[K], max_error: usize) -> Vec<SplinePoint<K>> {
    let mut builder = SplineBuilder::new(max_error);
    for &key in sample {
        builder.add_key(key);
    }
    builder.finalize()
}

/// Searches `points[lo..hi)` for the pair straddling `key` and interpolates
/// linearly between them. `lo`/`hi` must bracket the global successor of
/// `key`; the predecessor may lie before `lo`.
pub(crate) fn interpolate<K: Key>(
    points: &[SplinePoint<K>],
    lo: usize,
    hi: usize,
    key: K,
) -> f64 {
    let hi = hi.min(points.len());
    let lo = lo.min(hi);
    let idx = lo + points[lo..hi].partition_point(|p| p.x < key);

    if idx == 0 {
        return points[0].y;
    }
    if idx >= points.len() {
        return points[points.len() - 1].y;
    }

    let (p0, p1) = (points[idx - 1], points[idx]);
    let dx = p1.x.to_f64_fast() - p0.x.to_f64_fast();
    p0.y + (p1.y - p0.y) * (key.to_f64_fast() - p0.x.to_f64_fast()) / dx
}

/// Number of significant bits in `range`.
#[inline]
pub(crate) fn bits_for<U: PrimInt>(range: U) -> usize {
    (core::mem::size_of::<U>() * 8) - range.leading_zeros() as usize
}

/// Mask with the `n` lowest bits set.
#[inline]
pub(crate) fn low_bits<U: PrimInt>(n: usize) -> U {
    if n >= core::mem::size_of::<U>() * 8 {
        U::max_value()
    } else {
        (U::one() << n) - U::one()
    }
}

/// Bucket values always fit `usize` by construction of the directories.
#[inline]
pub(crate) fn to_bin<U: PrimInt + ToPrimitive>(v: U) -> usize {
    v.to_usize().unwrap_or(usize::MAX)
}
