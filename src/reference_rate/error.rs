//! Reference rate feed error types.

use std::fmt;

#[derive(Debug)]
#[non_exhaustive]
pub enum ReferenceRateError {
    /// A new rate was non-positive; the feed never accepts a zero or
    /// negative reference rate.
    NonPositiveRate { micro_rate: i128 },
}

impl fmt::Display for ReferenceRateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceRateError::NonPositiveRate { micro_rate } => {
                write!(f, "reference rate update rejected: non-positive rate {micro_rate}")
            }
        }
    }
}

impl std::error::Error for ReferenceRateError {}
