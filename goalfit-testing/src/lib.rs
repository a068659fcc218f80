//! Testing helpers shared across the workspace.

use assert_float_eq::*;

pub fn assert_slice_f64_relative(expected: &[f64], actual: &[f64], epsilon: f64) {
    assert_eq!(
        expected.len(),
        actual.len(),
        "lengths do not match: {} ≠ {}",
        expected.len(),
        actual.len()
    );
    for (index, (&expected, &actual)) in expected.iter().zip(actual).enumerate() {
        if actual != expected {
            assert!(
                expected.is_finite() && actual.is_finite(),
                "non-finite value at index {index}: {expected} ≠ {actual}"
            );
            assert_float_relative_eq!(expected, actual, epsilon);
        }
    }
}

/// Asserts that `actual` lies within `tolerance` of `expected`, naming the quantity on failure.
pub fn assert_within(what: &str, expected: f64, actual: f64, tolerance: f64) {
    assert!(
        (expected - actual).abs() <= tolerance,
        "{what}: expected {expected} ± {tolerance}, got {actual}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_slices() {
        assert_slice_f64_relative(&[1.0, 2.0], &[1.0, 2.0 + 1e-12], 1e-9);
    }

    #[test]
    #[should_panic = "lengths do not match: 2 ≠ 1"]
    fn relative_slices_length_mismatch() {
        assert_slice_f64_relative(&[1.0, 2.0], &[1.0], 1e-9);
    }

    #[test]
    #[should_panic = "theta: expected 1.5 ± 0.1, got 1.7"]
    fn outside_tolerance() {
        assert_within("theta", 1.5, 1.7, 0.1);
    }
}
