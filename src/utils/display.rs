//! Utilities related to displaying things.

use std::fmt;

/// Utility struct for displaying a percentage that has already been
/// computed. Non-finite values are shown as `N/A`.
pub struct PercentageFormat(pub f64);

impl fmt::Display for PercentageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.0.is_finite() {
            f.write_str("N/A")
        } else {
            write!(f, "{:.2}%", self.0)
        }
    }
}

/// Utility struct for displaying a sequencing depth (e.g. `42.50x`).
/// Non-finite values are shown as `N/A`.
pub struct DepthFormat(pub f64);

impl fmt::Display for DepthFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.0.is_finite() {
            f.write_str("N/A")
        } else {
            write!(f, "{:.2}x", self.0)
        }
    }
}

/// Utility struct for displaying a fraction with four decimal places.
/// Non-finite values are shown as `N/A`.
pub struct FractionFormat(pub f64);

impl fmt::Display for FractionFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.0.is_finite() {
            f.write_str("N/A")
        } else {
            write!(f, "{:.4}", self.0)
        }
    }
}
