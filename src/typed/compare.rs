//! Tolerance-aware value comparison

use crate::config::CompareOptions;
use crate::error::{Error, Result};
use crate::model::CellValue;

/// Value comparator with combined relative and absolute float tolerances
pub struct ValueComparator {
    rel_tolerance: f64,
    abs_tolerance: f64,
}

impl ValueComparator {
    /// Create a comparator with explicit tolerances
    pub fn new(rel_tolerance: f64, abs_tolerance: f64) -> Self {
        Self {
            rel_tolerance,
            abs_tolerance,
        }
    }

    /// Create a comparator from comparison options
    pub fn from_options(options: &CompareOptions) -> Self {
        Self::new(options.rel_tolerance, options.abs_tolerance)
    }

    /// Test whether two values are equal or close.
    ///
    /// Two nulls are equal; exactly-equal present values are equal; two floats
    /// are close when `|a - b| <= max(rel * max(|a|, |b|), abs)`. Any other
    /// pairing (type mismatch, one null) is incomparable and yields an error
    /// rather than `false`.
    pub fn is_close(&self, a: &CellValue, b: &CellValue) -> Result<bool> {
        if a.is_null() && b.is_null() {
            return Ok(true);
        }
        if !a.is_null() && !b.is_null() && a == b {
            return Ok(true);
        }
        match (a, b) {
            (CellValue::Float(av), CellValue::Float(bv)) => {
                let bound = f64::max(self.rel_tolerance * f64::max(av.abs(), bv.abs()), self.abs_tolerance);
                Ok((av - bv).abs() <= bound)
            }
            _ => Err(Error::Incomparable {
                left: a.clone(),
                right: b.clone(),
            }),
        }
    }

    /// Compare two float value lists pairwise, stopping at the first unequal
    /// pair. Empty lists compare equal; the result is initialized per call and
    /// never carried over from a previous column.
    pub fn lists_close<'a, I, J>(&self, a_values: I, b_values: J) -> Result<bool>
    where
        I: IntoIterator<Item = &'a CellValue>,
        J: IntoIterator<Item = &'a CellValue>,
    {
        for (av, bv) in a_values.into_iter().zip(b_values) {
            if !self.is_close(av, bv)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl Default for ValueComparator {
    fn default() -> Self {
        Self::from_options(&CompareOptions::default())
    }
}
