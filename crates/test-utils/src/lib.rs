//! Shared test utilities for the nexus workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Catalog, path and time fixtures
//! - Raw sample buffer generators
//! - A scriptable mock data source
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your integration tests:
//!
//! ```ignore
//! use test_utils::{fixtures, MockBehavior, MockDataSource};
//! ```
//!
//! The crate depends on `nexus-catalog` and `nexus-pipeline`, so only their
//! `tests/` directories can use it.

pub mod fixtures;
pub mod generators;
pub mod mock;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;
pub use mock::{MockBehavior, MockDataSource, MockStats};

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f32, 1.0_f32, 0.001_f32);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Macro for approximate equality of two series, where `NaN` only equals `NaN`.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_series_approx_eq;
///
/// assert_series_approx_eq!(&[1.0, f64::NAN], &[1.0001, f64::NAN], 0.001);
/// ```
#[macro_export]
macro_rules! assert_series_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: &[f64] = $left;
        let right: &[f64] = $right;
        assert_eq!(left.len(), right.len(), "series lengths differ");
        for (index, (l, r)) in left.iter().zip(right.iter()).enumerate() {
            if l.is_nan() || r.is_nan() {
                if !(l.is_nan() && r.is_nan()) {
                    panic!(
                        "assertion failed: NaN mismatch at index {}\n  left: `{:?}`,\n right: `{:?}`",
                        index, l, r
                    );
                }
            } else {
                $crate::assert_approx_eq!(*l, *r, $epsilon);
            }
        }
    }};
}
