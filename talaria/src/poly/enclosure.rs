//! Interval enclosure of a polynomial over the integration step.
//!
//! A Horner loop lifted to `(lo, hi)` pairs proves, cheaply, that an event
//! equation cannot change sign inside the step, so the much more expensive
//! root isolation can be skipped for the vast majority of events.

use num_traits::Zero;

use super::sgn;
use crate::Scalar;

#[inline]
fn ival_sum<T: Scalar>(a: (T, T), b: (T, T)) -> (T, T) {
    (a.0 + b.0, a.1 + b.1)
}

#[inline]
fn ival_prod<T: Scalar>(a: (T, T), b: (T, T)) -> (T, T) {
    let t1 = a.0 * b.0;
    let t2 = a.0 * b.1;
    let t3 = a.1 * b.0;
    let t4 = a.1 * b.1;
    (t1.min(t2).min(t3.min(t4)), t1.max(t2).max(t3.max(t4)))
}

/// Enclosure of `a` over `[0, h]` (or `[h, 0]` when `backward`) via interval
/// Horner.
///
/// The interval operations run in round-to-nearest arithmetic, so the bounds
/// are tight to within a couple of ulps per operation rather than formally
/// certified.
pub fn enclose<T: Scalar>(a: &[T], h: T, backward: bool) -> (T, T) {
    let n = a.len() - 1;
    let h_iv = if backward {
        (h, T::zero())
    } else {
        (T::zero(), h)
    };

    let mut acc = (a[n], a[n]);
    for i in 1..=n {
        let c = a[n - i];
        acc = ival_sum((c, c), ival_prod(acc, h_iv));
    }
    acc
}

/// Fast exclusion check: `true` when the enclosure proves that `a` has no
/// sign change over the step, `false` when a root is possible.
///
/// Non-finite coefficients silently yield `false`; the stepper checks the
/// Taylor coefficients for finiteness on its own.
pub fn fex_check<T: Scalar>(a: &[T], h: T, backward: bool) -> bool {
    let (lo, hi) = enclose(a, h, backward);
    let s_lo = sgn(lo);
    let s_hi = sgn(hi);
    s_lo == s_hi && s_lo != 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poly::poly_eval;

    #[test]
    fn test_enclosure_soundness() {
        // Sample the polynomial across the step and check every value falls
        // inside the computed bounds.
        let a = [1.0, -3.0, 2.0, 0.5];
        let h = 0.8;
        let (lo, hi) = enclose(&a, h, false);
        for k in 0..=100 {
            let x = h * (k as f64) / 100.0;
            let v = poly_eval(&a, x);
            assert!(v >= lo - 1e-12 && v <= hi + 1e-12);
        }
    }

    #[test]
    fn test_enclosure_soundness_backward() {
        let a = [0.25, 1.5, -2.0];
        let h = -0.6;
        let (lo, hi) = enclose(&a, h, true);
        for k in 0..=100 {
            let x = h * (k as f64) / 100.0;
            let v = poly_eval(&a, x);
            assert!(v >= lo - 1e-12 && v <= hi + 1e-12);
        }
    }

    #[test]
    fn test_fex_check_excludes() {
        // Strictly positive over the step.
        let a = [1.0, 0.0, 1.0];
        assert!(fex_check(&a, 1.0, false));
        assert!(fex_check(&a, -1.0, true));
    }

    #[test]
    fn test_fex_check_possible_root() {
        // Sign change at x = 0.5.
        let a = [-0.5, 1.0, 0.0];
        assert!(!fex_check(&a, 1.0, false));
    }

    #[test]
    fn test_fex_check_zero_constant_term() {
        // p(0) = 0: the enclosure always contains zero going forward.
        let a = [0.0, 2.0, 1.0];
        assert!(!fex_check(&a, 1.0, false));
    }

    #[test]
    fn test_fex_check_non_finite() {
        let a = [1.0, f64::NAN, 1.0];
        assert!(!fex_check(&a, 1.0, false));
    }
}
