use crate::error::Error;
use crate::key::Key;

use super::{DEFAULT_EPSILON, DEFAULT_EPSILON_RECURSIVE, PgmHash};

/// Builder for [`PgmHash`] instances with custom parameters.
///
/// # Example
///
/// ```
/// use learned_hashing::pgm::Builder;
///
/// let sample: Vec<u64> = (0..10_000).collect();
///
/// let pgm = Builder::new()
///     .epsilon(128)
///     .epsilon_recursive(8)
///     .build(&sample, 10_000)
///     .unwrap();
///
/// assert_eq!(pgm.epsilon(), 128);
/// ```
#[derive(Clone, Debug)]
pub struct Builder {
    epsilon: usize,
    epsilon_recursive: usize,
    max_segments: usize,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            epsilon_recursive: DEFAULT_EPSILON_RECURSIVE,
            max_segments: usize::MAX,
        }
    }
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Error bound for the bottom level (larger means fewer segments).
    pub fn epsilon(mut self, epsilon: usize) -> Self {
        self.epsilon = epsilon.max(1);
        self
    }

    /// Error bound for the upper levels; 0 keeps a single level.
    pub fn epsilon_recursive(mut self, epsilon_recursive: usize) -> Self {
        self.epsilon_recursive = epsilon_recursive;
        self
    }

    /// Fails the build when level 0 needs more than `max_segments` segments.
    pub fn max_segments(mut self, max_segments: usize) -> Self {
        self.max_segments = max_segments;
        self
    }

    pub fn build<K: Key>(&self, sample: &[K], full_size: usize) -> Result<PgmHash<K>, Error> {
        PgmHash::with_max_segments(
            sample,
            full_size,
            self.epsilon,
            self.epsilon_recursive,
            self.max_segments,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn test_builder_default() {
        let sample: Vec<u64> = (0..1000).collect();
        let pgm = Builder::new().build(&sample, 1000).unwrap();
        assert_eq!(pgm.epsilon(), 64);
        assert_eq!(pgm.epsilon_recursive(), 4);
    }

    #[test]
    fn test_builder_custom() {
        let sample: Vec<u64> = (0..1000).collect();
        let pgm = Builder::new()
            .epsilon(16)
            .epsilon_recursive(2)
            .build(&sample, 2000)
            .unwrap();
        assert_eq!(pgm.epsilon(), 16);
        assert_eq!(pgm.epsilon_recursive(), 2);
    }

    #[test]
    fn test_builder_segment_cap() {
        let sample: Vec<u64> = (0..2000).map(|i| i * i).collect();
        let result = Builder::new().epsilon(1).max_segments(2).build(&sample, 2000);
        assert!(matches!(result, Err(Error::TooManySegments { .. })));
    }
}
