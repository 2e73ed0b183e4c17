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

pub const DEFAULT_MAX_ERROR: usize = 16;

/// Largest fanout a single trie node may use (2^16 children).
const MAX_NODE_BITS: usize = 16;

const LEAF_FLAG: u32 = 1 << 31;

/// One trie level: `bits` of the key starting at `shift` index the node's
/// children, which start at `entry_base` in the flat entry array.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
struct TrieNode {
    entry_base: u32,
    shift: u8,
    bits: u8,
}

/// Spline-based CDF with a trie directory whose radix adapts per node.
///
/// Unlike [`ChtHash`](super::ChtHash), which splits every level into the same
/// number of bins, each node here sizes its fanout from the number of spline
/// points it covers, so sparse key regions get shallow wide nodes and dense
/// regions descend further.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(bound = "K: serde::Serialize + serde::de::DeserializeOwned")
)]
pub struct TrieSplineHash<K: Key> {
    min_key: K,
    max_key: K,
    nodes: Vec<TrieNode>,
    entries: Vec<u32>,
    leaf_ranges: Vec<(u32, u32)>,
    points: Vec<SplinePoint<K>>,
    out_scale: f64,
    full_size: usize,
    max_error: usize,
}

impl<K: Key> TrieSplineHash<K> {
    /// Trains with the reference error bound (16).
    pub fn new(sample: &[K], full_size: usize) -> Self {
        Self::build(sample, full_size, DEFAULT_MAX_ERROR)
    }

    pub fn with_params(sample: &[K], full_size: usize, max_error: usize) -> Result<Self, Error> {
        if max_error == 0 {
            return Err(Error::InvalidEpsilon);
        }
        Ok(Self::build(sample, full_size, max_error))
    }

    /// Fanout bits for a node covering `count` spline points, limited to the
    /// `avail` key bits below its parent.
    fn node_bits(count: usize, avail: usize) -> usize {
        let wanted = (count + 1).next_power_of_two().trailing_zeros() as usize;
        wanted.clamp(1, MAX_NODE_BITS).min(avail)
    }

    fn build(sample: &[K], full_size: usize, max_error: usize) -> Self {
        debug_assert!(
            sample.windows(2).all(|w| w[0] <= w[1]),
            "sample must be sorted"
        );

        let n = sample.len();
        if n == 0 {
            return Self {
                min_key: K::zero(),
                max_key: K::zero(),
                nodes: Vec::new(),
                entries: Vec::new(),
                leaf_ranges: Vec::new(),
                points: Vec::new(),
                out_scale: 0.0,
                full_size: 0,
                max_error,
            };
        }

        let (min_key, max_key) = (sample[0], sample[n - 1]);
        let points = fit_spline(sample, max_error);

        let min_u = min_key.to_unsigned();
        let range = max_key.to_unsigned() - min_u;
        let used_bits = bits_for(range);

        struct Task<U> {
            // Entry to patch with the created node's id; the root has none.
            parent_entry: Option<usize>,
            base: U,
            avail: usize,
            lo: usize,
            hi: usize,
        }

        let mut nodes: Vec<TrieNode> = Vec::new();
        let mut entries: Vec<u32> = Vec::new();
        let mut leaf_ranges: Vec<(u32, u32)> = Vec::new();
        let mut queue: VecDeque<Task<K::Unsigned>> = VecDeque::new();
        queue.push_back(Task {
            parent_entry: None,
            base: K::Unsigned::zero(),
            avail: used_bits,
            lo: 0,
            hi: points.len(),
        });

        let offset_of = |p: &SplinePoint<K>| p.x.to_unsigned() - min_u;

        while let Some(task) = queue.pop_front() {
            let bits = Self::node_bits(task.hi - task.lo, task.avail);
            let shift = task.avail - bits;
            let node_id = nodes.len() as u32;
            let entry_base = entries.len();
            entries.resize(entry_base + (1usize << bits), 0);
            nodes.push(TrieNode {
                entry_base: entry_base as u32,
                shift: shift as u8,
                bits: bits as u8,
            });
            if let Some(parent_entry) = task.parent_entry {
                entries[parent_entry] = node_id;
            }

            for bin in 0..(1usize << bits) {
                let step: K::Unsigned = NumCast::from(bin).unwrap();
                let bin_lo = task.base | (step << shift);
                let bin_hi = bin_lo | low_bits::<K::Unsigned>(shift);

                let lo = points.partition_point(|p| offset_of(p) < bin_lo);
                let hi = points.partition_point(|p| offset_of(p) <= bin_hi);

                let span = if hi > lo {
                    points[hi.min(points.len() - 1)].y - points[lo.min(points.len() - 1)].y
                } else {
                    0.0
                };

                if shift == 0 || hi - lo <= 1 || span <= max_error as f64 {
                    let leaf_id = leaf_ranges.len() as u32;
                    leaf_ranges.push((lo as u32, hi as u32));
                    entries[entry_base + bin] = LEAF_FLAG | leaf_id;
                } else {
                    queue.push_back(Task {
                        parent_entry: Some(entry_base + bin),
                        base: bin_lo,
                        avail: shift,
                        lo,
                        hi,
                    });
                }
            }
        }

        Self {
            min_key,
            max_key,
            nodes,
            entries,
            leaf_ranges,
            points,
            out_scale: (full_size.saturating_sub(1)) as f64 / n as f64,
            full_size,
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
        let mut node = self.nodes[0];

        loop {
            let mask = low_bits::<K::Unsigned>(node.bits as usize);
            let bin = to_bin((off >> node.shift as usize) & mask);
            let entry = self.entries[node.entry_base as usize + bin];
            if entry & LEAF_FLAG != 0 {
                let (lo, hi) = self.leaf_ranges[(entry & !LEAF_FLAG) as usize];
                return interpolate(&self.points, lo as usize, hi as usize + 1, key);
            }
            node = self.nodes[entry as usize];
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
        format!("trie_spline_err{}", self.max_error)
    }

    /// Number of spline points.
    #[inline]
    pub fn model_count(&self) -> usize {
        self.points.len()
    }

    pub fn byte_size(&self) -> usize {
        core::mem::size_of::<Self>()
            + self.points.capacity() * core::mem::size_of::<SplinePoint<K>>()
            + self.nodes.capacity() * core::mem::size_of::<TrieNode>()
            + self.entries.capacity() * core::mem::size_of::<u32>()
            + self.leaf_ranges.capacity() * core::mem::size_of::<(u32, u32)>()
    }
}

impl<K: Key> RankHasher<K> for TrieSplineHash<K> {
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

impl<K: Key> BoundedRankHasher<K> for TrieSplineHash<K> {
    #[inline]
    fn bounds(&self, key: K) -> SearchBound {
        self.bounds(key)
    }
}
