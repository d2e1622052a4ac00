//! Per-call configuration for casting and comparison

/// Missing-value policy for the casting pass.
///
/// When `use_reserved_markers` is set (the default), absent cells and cast
/// failures are rewritten with the mmCIF reserved markers: '.' for mandatory
/// attributes, '?' for optional ones. Otherwise the caller-supplied per-type
/// defaults are used; unset defaults substitute a null cell.
#[derive(Debug, Clone)]
pub struct CastOptions {
    /// Suppress logging of per-cell cast failures
    pub ignore_cast_errors: bool,
    /// Substitute the reserved markers '.' / '?' instead of typed defaults
    pub use_reserved_markers: bool,
    /// Substitute for missing values in string attributes
    pub missing_string: Option<String>,
    /// Substitute for missing values in integer attributes
    pub missing_integer: Option<i64>,
    /// Substitute for missing values in float attributes
    pub missing_float: Option<f64>,
}

impl Default for CastOptions {
    fn default() -> Self {
        Self {
            ignore_cast_errors: false,
            use_reserved_markers: true,
            missing_string: None,
            missing_integer: None,
            missing_float: None,
        }
    }
}

impl CastOptions {
    /// Create options with the default missing-value policy
    pub fn new() -> Self {
        Self::default()
    }

    /// Suppress cast-failure logging
    pub fn with_ignore_cast_errors(mut self, ignore: bool) -> Self {
        self.ignore_cast_errors = ignore;
        self
    }

    /// Choose between reserved markers and typed defaults for missing values
    pub fn with_reserved_markers(mut self, use_markers: bool) -> Self {
        self.use_reserved_markers = use_markers;
        self
    }

    /// Set the missing-value substitute for string attributes
    pub fn with_missing_string(mut self, value: impl Into<String>) -> Self {
        self.missing_string = Some(value.into());
        self
    }

    /// Set the missing-value substitute for integer attributes
    pub fn with_missing_integer(mut self, value: i64) -> Self {
        self.missing_integer = Some(value);
        self
    }

    /// Set the missing-value substitute for float attributes
    pub fn with_missing_float(mut self, value: f64) -> Self {
        self.missing_float = Some(value);
        self
    }
}

/// Configuration for cross-table value comparison
#[derive(Debug, Clone)]
pub struct CompareOptions {
    /// Sort both value lists before comparing
    pub ignore_order: bool,
    /// Relative tolerance for float closeness
    pub rel_tolerance: f64,
    /// Absolute tolerance for float closeness
    pub abs_tolerance: f64,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            ignore_order: true,
            rel_tolerance: 1.0e-5,
            abs_tolerance: 1.0e-4,
        }
    }
}

impl CompareOptions {
    /// Create options with default tolerances (rel 1e-5, abs 1e-4)
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare value lists positionally instead of sorted
    pub fn with_ignore_order(mut self, ignore: bool) -> Self {
        self.ignore_order = ignore;
        self
    }

    /// Set the relative tolerance for float closeness
    pub fn with_rel_tolerance(mut self, tolerance: f64) -> Self {
        self.rel_tolerance = tolerance;
        self
    }

    /// Set the absolute tolerance for float closeness
    pub fn with_abs_tolerance(mut self, tolerance: f64) -> Self {
        self.abs_tolerance = tolerance;
        self
    }
}
