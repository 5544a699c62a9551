//! Float helpers shared by the conversion and validation code.

use crate::CoreError;

/// Scalar type for engineering values.
pub type Real = f64;

/// Absolute and relative tolerance for float comparisons.
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

/// `true` if `a` and `b` agree within either tolerance.
pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    diff <= tol.abs || diff <= tol.rel * a.abs().max(b.abs())
}

/// Reject NaN and infinities, naming the offending field.
pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if !v.is_finite() {
        return Err(CoreError::NonFinite { what, value: v });
    }
    Ok(v)
}

/// Require a finite, strictly positive value.
pub fn ensure_positive(v: Real, what: &'static str) -> Result<Real, CoreError> {
    match ensure_finite(v, what)? {
        v if v > 0.0 => Ok(v),
        _ => Err(CoreError::InvalidArg { what }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voltages_compare_within_tolerance() {
        let tol = Tolerances {
            abs: 1e-6,
            rel: 1e-9,
        };
        assert!(nearly_equal(1650.549_450_5, 1650.549_450_6, tol));
        assert!(nearly_equal(0.0, 5e-7, tol));
        assert!(!nearly_equal(3300.0, 3300.1, tol));
    }

    #[test]
    fn relative_tolerance_scales_with_magnitude() {
        let tol = Tolerances { abs: 0.0, rel: 1e-3 };
        assert!(nearly_equal(-551.85, -551.9, tol));
        assert!(!nearly_equal(0.05, 0.1, tol));
    }

    #[test]
    fn ensure_finite_names_field() {
        let err = ensure_finite(Real::NAN, "offset_mv").unwrap_err();
        assert!(err.to_string().contains("offset_mv"));
        assert_eq!(ensure_finite(716.0, "offset_mv"), Ok(716.0));
    }

    #[test]
    fn ensure_positive_rejects_zero_and_negative() {
        assert!(ensure_positive(1.62, "slope").is_ok());
        assert_eq!(
            ensure_positive(0.0, "slope"),
            Err(CoreError::InvalidArg { what: "slope" })
        );
        assert!(ensure_positive(-3.3, "vref").is_err());
        assert!(ensure_positive(Real::INFINITY, "vref").is_err());
    }
}
