use core::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The requested error bound was zero.
    InvalidEpsilon,
    /// Training produced more segments/spline points than the configured cap.
    TooManySegments { count: usize, max: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidEpsilon => write!(f, "error bound must be greater than 0"),
            Error::TooManySegments { count, max } => {
                write!(f, "model had more segments than allowed: {} > {}", count, max)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
