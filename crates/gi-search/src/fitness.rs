//! Fitness ordering
//!
//! Fitness is minimised. A missing value (non-viable patch) is worse than
//! any measured one.

/// Whether `a` is strictly better than `b`
///
/// Irreflexive and transitive; `None` never dominates.
#[inline]
#[must_use]
pub fn dominates(a: Option<f64>, b: Option<f64>) -> bool {
    match (a, b) {
        (Some(_), None) => true,
        (Some(a), Some(b)) => a < b,
        (None, _) => false,
    }
}
