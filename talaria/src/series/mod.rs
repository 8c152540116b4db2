//! Helpers for hand-written Taylor recursions.
//!
//! Truncated power series use the same convention as the `poly` module:
//! ascending coefficient slices. Jet providers build their rows one
//! coefficient at a time, so the helpers here produce single coefficients
//! rather than whole products.

use num_traits::{One, Zero};

use crate::Scalar;

/// `k`-th coefficient of the Cauchy product `a * b`.
pub fn mul_coeff<T: Scalar>(a: &[T], b: &[T], k: usize) -> T {
    let mut acc = T::zero();
    for j in 0..=k {
        acc += a[j] * b[k - j];
    }
    acc
}

/// Next coefficient pair of `(sin(u), cos(u))`.
///
/// Given the coefficients of `u` up to order `k` and of the pair up to
/// `k - 1`, the differential relations `s' = u' c` and `c' = -u' s` give
///
/// `s_k = (1/k) * sum_{j=1..k} j u_j c_{k-j}`,
/// `c_k = -(1/k) * sum_{j=1..k} j u_j s_{k-j}`.
///
/// Requires `k >= 1`.
pub fn sin_cos_next<T: Scalar>(u: &[T], s: &[T], c: &[T], k: usize) -> (T, T) {
    debug_assert!(k >= 1);

    let mut ds = T::zero();
    let mut dc = T::zero();
    for j in 1..=k {
        let ju = T::from(j as f64) * u[j];
        ds += ju * c[k - j];
        dc += ju * s[k - j];
    }
    let inv_k = T::one() / T::from(k as f64);
    (ds * inv_k, -dc * inv_k)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mul_coeff() {
        // (1 + t)^2 = 1 + 2 t + t^2
        let a = [1.0, 1.0, 0.0];
        assert_eq!(mul_coeff(&a, &a, 0), 1.0);
        assert_eq!(mul_coeff(&a, &a, 1), 2.0);
        assert_eq!(mul_coeff(&a, &a, 2), 1.0);
    }

    #[test]
    fn test_sin_cos_maclaurin() {
        // u = t reproduces the Maclaurin coefficients of sin and cos.
        let order = 7;
        let mut u = vec![0.0; order + 1];
        u[1] = 1.0;
        let mut s = vec![0.0; order + 1];
        let mut c = vec![0.0; order + 1];
        s[0] = 0.0;
        c[0] = 1.0;
        for k in 1..=order {
            let (sk, ck) = sin_cos_next(&u, &s, &c, k);
            s[k] = sk;
            c[k] = ck;
        }
        assert!((s[1] - 1.0).abs() < 1e-15);
        assert!((s[3] + 1.0 / 6.0).abs() < 1e-15);
        assert!((s[5] - 1.0 / 120.0).abs() < 1e-15);
        assert!((c[2] + 0.5).abs() < 1e-15);
        assert!((c[4] - 1.0 / 24.0).abs() < 1e-15);
        assert_eq!(c[1], 0.0);
        assert_eq!(s[2], 0.0);
    }
}
