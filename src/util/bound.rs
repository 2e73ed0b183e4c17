/// Rank interval returned by [`bounds`](crate::hasher::BoundedRankHasher::bounds).
///
/// `pos` is the predicted rank; the true rank of the key (if it is present in
/// the full dataset) lies in `[begin, end)`. `end` never exceeds the hasher's
/// output range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchBound {
    /// The predicted rank of the key.
    pub pos: usize,
    /// The lowest rank the key can occupy.
    pub begin: usize,
    /// One past the highest rank the key can occupy.
    pub end: usize,
}

impl SearchBound {
    #[inline]
    pub fn new(pos: usize, begin: usize, end: usize) -> Self {
        Self { pos, begin, end }
    }

    /// Builds the `±eps` window around `pos`, clamped to `[0, size)`.
    #[inline]
    pub fn around(pos: usize, eps: usize, size: usize) -> Self {
        Self {
            pos,
            begin: super::search::sub_eps(pos, eps),
            end: super::search::add_eps(pos, eps, size),
        }
    }
}
