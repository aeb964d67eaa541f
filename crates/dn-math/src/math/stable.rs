//! Numerically careful primitives for probability tables.
//!
//! Factor tables are products and sums of many small probabilities, so the
//! helpers here keep accumulated rounding error out of normalization checks
//! and make sure floating noise never yields a negative probability.

/// Compensated (Neumaier) summation.
///
/// Returns 0.0 for empty input. NaN and infinities propagate.
pub fn stable_sum(values: &[f64]) -> f64 {
    stable_sum_iter(values.iter().copied())
}

/// Compensated summation over an iterator.
pub fn stable_sum_iter<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    let mut sum = 0.0f64;
    let mut compensation = 0.0f64;
    for v in values {
        let t = sum + v;
        if sum.abs() >= v.abs() {
            compensation += (sum - t) + v;
        } else {
            compensation += (v - t) + sum;
        }
        sum = t;
    }
    let total = sum + compensation;
    if total.is_nan() && !sum.is_nan() {
        // inf - inf inside the compensation term
        return sum;
    }
    total
}

/// Clamp a probability-like value at zero.
///
/// Negative values can only arise from rounding, so they collapse to 0.0.
/// NaN is returned unchanged so callers can reject it.
pub fn clamp_non_negative(value: f64) -> f64 {
    if value < 0.0 {
        0.0
    } else {
        value
    }
}

/// Clamp every entry of a slice at zero.
pub fn clamp_slice(values: &mut [f64]) {
    for v in values.iter_mut() {
        *v = clamp_non_negative(*v);
    }
}

/// Normalize a slice in place so it sums to 1.
///
/// Returns the pre-normalization total, or `None` when the total is zero,
/// negative, or not finite (the slice is left untouched in that case).
pub fn normalize_in_place(values: &mut [f64]) -> Option<f64> {
    clamp_slice(values);
    let total = stable_sum(values);
    if !total.is_finite() || total <= 0.0 {
        return None;
    }
    for v in values.iter_mut() {
        *v /= total;
    }
    Some(total)
}

/// Absolute-tolerance float comparison. NaN never compares equal.
pub fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    if a.is_nan() || b.is_nan() {
        return false;
    }
    if a.is_infinite() || b.is_infinite() {
        return a == b;
    }
    (a - b).abs() <= tol
}

/// Mixed absolute/relative comparison, useful for utilities of large magnitude.
pub fn approx_eq_rel(a: f64, b: f64, tol: f64) -> bool {
    if !approx_eq(a, b, f64::INFINITY) {
        return false;
    }
    (a - b).abs() <= tol.max(tol * a.abs().max(b.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_sum_empty_is_zero() {
        assert_eq!(stable_sum(&[]), 0.0);
    }

    #[test]
    fn stable_sum_recovers_small_terms() {
        let values = [1.0, 1e100, 1.0, -1e100];
        assert_eq!(stable_sum(&values), 2.0);
    }

    #[test]
    fn stable_sum_tenths() {
        let values = [0.1; 10];
        assert!(approx_eq(stable_sum(&values), 1.0, 1e-15));
    }

    #[test]
    fn stable_sum_nan_propagates() {
        assert!(stable_sum(&[0.5, f64::NAN]).is_nan());
    }

    #[test]
    fn clamp_collapses_rounding_noise() {
        assert_eq!(clamp_non_negative(-1e-18), 0.0);
        assert_eq!(clamp_non_negative(0.25), 0.25);
        assert!(clamp_non_negative(f64::NAN).is_nan());
    }

    #[test]
    fn normalize_scales_to_one() {
        let mut v = [2.0, 6.0];
        let total = normalize_in_place(&mut v).unwrap();
        assert_eq!(total, 8.0);
        assert!(approx_eq(v[0], 0.25, 1e-15));
        assert!(approx_eq(v[1], 0.75, 1e-15));
    }

    #[test]
    fn normalize_rejects_zero_mass() {
        let mut v = [0.0, 0.0, -0.0];
        assert!(normalize_in_place(&mut v).is_none());
    }

    #[test]
    fn normalize_rejects_infinite_mass() {
        let mut v = [f64::INFINITY, 1.0];
        assert!(normalize_in_place(&mut v).is_none());
        assert_eq!(v[1], 1.0);
    }

    #[test]
    fn approx_eq_rel_scales_with_magnitude() {
        assert!(approx_eq_rel(-1000.0, -1000.000_000_1, 1e-9));
        assert!(!approx_eq_rel(-1000.0, -1001.0, 1e-9));
        assert!(!approx_eq_rel(f64::NAN, 1.0, 1.0));
    }
}
