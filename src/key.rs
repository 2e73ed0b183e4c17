use core::ops::{Add, Sub};
use num_traits::{Bounded, NumCast, PrimInt, ToPrimitive, Unsigned, Zero};

/// Integer key usable by the learned models.
///
/// Models need three views of a key: its total order, an order-preserving
/// unsigned image (for radix bucketing and bit shifts), and a lossy `f64`
/// projection (for slopes and intercepts).
pub trait Key:
    Copy
    + Ord
    + Default
    + Send
    + Sync
    + ToPrimitive
    + Bounded
    + Zero
    + Add<Output = Self>
    + Sub<Output = Self>
{
    type Unsigned: PrimInt + Unsigned + ToPrimitive + NumCast + Send + Sync;

    /// Order-preserving map into the unsigned image.
    fn to_unsigned(self) -> Self::Unsigned;

    fn to_f64_fast(self) -> f64;

    /// Truncating conversion back from `f64`, saturating at the domain ends.
    /// NaN maps to zero.
    fn from_f64_clamped(v: f64) -> Self;
}

macro_rules! impl_key_unsigned {
    ($($t:ty),*) => {
        $(
            impl Key for $t {
                type Unsigned = $t;

                #[inline]
                fn to_unsigned(self) -> Self::Unsigned {
                    self
                }

                #[inline]
                fn to_f64_fast(self) -> f64 {
                    self as f64
                }

                #[inline]
                fn from_f64_clamped(v: f64) -> Self {
                    if v.is_nan() {
                        return 0;
                    }
                    <$t as NumCast>::from(v).unwrap_or(if v < 0.0 { 0 } else { <$t>::MAX })
                }
            }
        )*
    };
}

macro_rules! impl_key_signed {
    ($(($signed:ty, $unsigned:ty)),*) => {
        $(
            impl Key for $signed {
                type Unsigned = $unsigned;

                #[inline]
                fn to_unsigned(self) -> Self::Unsigned {
                    const OFFSET: $unsigned = <$signed>::MIN as $unsigned;
                    (self as $unsigned).wrapping_sub(OFFSET)
                }

                #[inline]
                fn to_f64_fast(self) -> f64 {
                    self as f64
                }

                #[inline]
                fn from_f64_clamped(v: f64) -> Self {
                    if v.is_nan() {
                        return 0;
                    }
                    <$signed as NumCast>::from(v).unwrap_or(if v < 0.0 {
                        <$signed>::MIN
                    } else {
                        <$signed>::MAX
                    })
                }
            }
        )*
    };
}

impl_key_unsigned!(u8, u16, u32, u64, u128, usize);
impl_key_signed!(
    (i8, u8),
    (i16, u16),
    (i32, u32),
    (i64, u64),
    (i128, u128),
    (isize, usize)
);

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    #[test]
    fn test_unsigned_monotonic() {
        let vals: Vec<u64> = vec![0, 1, 100, 1000, u64::MAX];
        for w in vals.windows(2) {
            assert!(w[0].to_unsigned() < w[1].to_unsigned());
        }
    }

    #[test]
    fn test_signed_monotonic() {
        let vals: Vec<i64> = vec![i64::MIN, -1000, -1, 0, 1, 1000, i64::MAX];
        for w in vals.windows(2) {
            assert!(
                w[0].to_unsigned() < w[1].to_unsigned(),
                "{} -> {} should be < {} -> {}",
                w[0],
                w[0].to_unsigned(),
                w[1],
                w[1].to_unsigned()
            );
        }
    }

    #[test]
    fn test_from_f64_saturates() {
        assert_eq!(u64::from_f64_clamped(-1.5), 0);
        assert_eq!(u64::from_f64_clamped(42.9), 42);
        assert_eq!(u64::from_f64_clamped(1e300), u64::MAX);
        assert_eq!(u32::from_f64_clamped(f64::NAN), 0);
        assert_eq!(i32::from_f64_clamped(-1e300), i32::MIN);
    }
}
