//! Bracketed scalar root refinement on isolated intervals.
//!
//! The isolator guarantees a single sign change inside each interval it
//! hands over; the refiner shrinks the bracket with the TOMS 748 scheme
//! (inverse-cubic and Newton-quadratic interpolation with a double-secant
//! step and a bisection safeguard, so the interval is guaranteed to shrink
//! every full iteration).

use log::debug;
use num_traits::{One, Zero};

use crate::poly::{poly_eval, sgn};
use crate::Scalar;

/// Outcome of [`bracketed_root_find`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BracketStatus {
    /// Converged within the iteration cap.
    Converged,
    /// Iteration cap exhausted; the returned value is the best estimate.
    IterLimit,
    /// The bracket was invalid or an evaluation produced a non-finite value.
    Domain,
}

const MAX_ITER: usize = 100;

/// Division with a fallback for tiny or vanishing denominators.
#[inline]
fn safe_div<T: Scalar>(num: T, denom: T, r: T) -> T {
    if denom == T::zero() {
        return r;
    }
    let q = num / denom;
    if q.is_finite() {
        q
    } else {
        r
    }
}

/// Relative-width convergence test on the bracket.
#[inline]
fn tol_reached<T: Scalar>(a: T, b: T) -> bool {
    (a - b).abs() <= T::EPSILON * T::from(4.0) * a.abs().min(b.abs())
}

fn secant_step<T: Scalar>(a: T, b: T, fa: T, fb: T) -> T {
    let tol = T::EPSILON * T::from(5.0);
    let c = a - (fa / (fb - fa)) * (b - a);
    if c <= a + a.abs() * tol || c >= b - b.abs() * tol {
        (a + b) / T::from(2.0)
    } else {
        c
    }
}

/// Newton iteration on the quadratic interpolating `(a, fa)`, `(b, fb)`,
/// `(d, fd)`, seeded at whichever endpoint the curvature points away from.
fn quadratic_step<T: Scalar>(a: T, b: T, d: T, fa: T, fb: T, fd: T, count: usize) -> T {
    let b1 = safe_div(fb - fa, b - a, T::INFINITY);
    let a1 = safe_div(fd - fb, d - b, T::INFINITY);
    let a2 = safe_div(a1 - b1, d - a, T::zero());

    if a2 == T::zero() {
        return secant_step(a, b, fa, fb);
    }

    let two = T::from(2.0);
    let mut c = if sgn(a2) * sgn(fa) > 0 { a } else { b };
    for _ in 0..count {
        let num = fa + (b1 + a2 * (c - b)) * (c - a);
        let denom = b1 + a2 * (two * c - a - b);
        c -= safe_div(num, denom, T::one() + c - a);
    }

    if c <= a || c >= b {
        secant_step(a, b, fa, fb)
    } else {
        c
    }
}

/// Inverse-cubic interpolation through the last four points, falling back to
/// the quadratic step when it lands outside the bracket.
#[allow(clippy::too_many_arguments)]
fn cubic_step<T: Scalar>(a: T, b: T, d: T, e: T, fa: T, fb: T, fd: T, fe: T, count: usize) -> T {
    let q11 = (d - e) * fd / (fe - fd);
    let q21 = (b - d) * fb / (fd - fb);
    let q31 = (a - b) * fa / (fb - fa);
    let d21 = (b - d) * fd / (fd - fb);
    let d31 = (a - b) * fb / (fb - fa);
    let q22 = (d21 - q11) * fb / (fe - fb);
    let q32 = (d31 - q21) * fa / (fd - fa);
    let d32 = (d31 - q21) * fd / (fd - fa);
    let q33 = (d32 - q22) * fa / (fe - fa);

    let c = q31 + q32 + q33 + a;
    if !c.is_finite() || c <= a || c >= b {
        quadratic_step(a, b, d, fa, fb, fd, count)
    } else {
        c
    }
}

/// Evaluate at `c` (clamped a safe distance inside the bracket) and shrink
/// `[a, b]` around the sign change, demoting the dropped endpoint to `d`.
/// An exact zero is signalled by `fa == 0` with `a` holding the root.
#[allow(clippy::too_many_arguments)]
fn bracket<T: Scalar, F: Fn(T) -> T>(
    f: &F,
    a: &mut T,
    b: &mut T,
    c: T,
    fa: &mut T,
    fb: &mut T,
    d: &mut T,
    fd: &mut T,
) {
    let tol = T::EPSILON * T::from(2.0);
    let two = T::from(2.0);

    let mut c = c;
    if (*b - *a) < two * tol * *a {
        c = *a + (*b - *a) / two;
    } else if c <= *a + a.abs() * tol {
        c = *a + a.abs() * tol;
    } else if c >= *b - b.abs() * tol {
        c = *b - b.abs() * tol;
    }

    let fc = f(c);
    if fc == T::zero() {
        *a = c;
        *fa = T::zero();
        *d = T::zero();
        *fd = T::zero();
        return;
    }

    if sgn(*fa) * sgn(fc) < 0 {
        *d = *b;
        *fd = *fb;
        *b = c;
        *fb = fc;
    } else {
        *d = *a;
        *fd = *fa;
        *a = c;
        *fa = fc;
    }
}

/// Find the single root of `poly` bracketed by `[lb, ub)`.
///
/// The upper bound is first nudged one ulp toward `lb` so that a root
/// sitting exactly on it is reported by the adjacent isolating interval
/// instead of twice.
pub fn bracketed_root_find<T: Scalar>(poly: &[T], lb: T, ub: T) -> (T, BracketStatus) {
    let mut ub = ub;
    if lb.is_finite() && ub.is_finite() && ub > lb {
        ub = ub.next_after(lb);
    }

    let f = |x: T| poly_eval(poly, x);

    let mut a = lb;
    let mut b = ub;
    let mut fa = f(a);
    let mut fb = f(b);

    if !a.is_finite() || !b.is_finite() || !fa.is_finite() || !fb.is_finite() {
        return (T::zero(), BracketStatus::Domain);
    }
    if fa == T::zero() {
        return (a, BracketStatus::Converged);
    }
    if fb == T::zero() {
        return (b, BracketStatus::Converged);
    }
    if sgn(fa) * sgn(fb) > 0 {
        return (T::zero(), BracketStatus::Domain);
    }

    let two = T::from(2.0);
    let mu = T::from(0.5);
    let min_diff = T::from(f64::MIN_POSITIVE * 32.0);
    let mut count = MAX_ITER;

    let mut d = T::zero();
    let mut fd = T::zero();
    // Dummy history values keep the cubic step disabled until four genuine
    // points exist.
    let mut e = T::from(1.0e5);
    let mut fe = T::from(1.0e5);

    // Opening moves: one secant step, then one Newton-quadratic step.
    let c = secant_step(a, b, fa, fb);
    bracket(&f, &mut a, &mut b, c, &mut fa, &mut fb, &mut d, &mut fd);
    count -= 1;
    if count > 0 && fa != T::zero() && !tol_reached(a, b) {
        let c = quadratic_step(a, b, d, fa, fb, fd, 2);
        bracket(&f, &mut a, &mut b, c, &mut fa, &mut fb, &mut d, &mut fd);
        count -= 1;
    }

    while count > 0 && fa != T::zero() && !tol_reached(a, b) {
        let a0 = a;
        let b0 = b;

        let distinct = |fa: T, fb: T, fd: T, fe: T| {
            (fa - fb).abs() >= min_diff
                && (fa - fd).abs() >= min_diff
                && (fa - fe).abs() >= min_diff
                && (fb - fd).abs() >= min_diff
                && (fb - fe).abs() >= min_diff
                && (fd - fe).abs() >= min_diff
        };

        let c = if distinct(fa, fb, fd, fe) {
            cubic_step(a, b, d, e, fa, fb, fd, fe, 2)
        } else {
            quadratic_step(a, b, d, fa, fb, fd, 2)
        };
        e = d;
        fe = fd;
        bracket(&f, &mut a, &mut b, c, &mut fa, &mut fb, &mut d, &mut fd);
        count -= 1;
        if count == 0 || fa == T::zero() || tol_reached(a, b) {
            break;
        }

        let c = if distinct(fa, fb, fd, fe) {
            cubic_step(a, b, d, e, fa, fb, fd, fe, 3)
        } else {
            quadratic_step(a, b, d, fa, fb, fd, 3)
        };
        bracket(&f, &mut a, &mut b, c, &mut fa, &mut fb, &mut d, &mut fd);
        count -= 1;
        if count == 0 || fa == T::zero() || tol_reached(a, b) {
            break;
        }

        // Double-length secant from the endpoint with the smaller ordinate.
        let (u, fu) = if fa.abs() < fb.abs() { (a, fa) } else { (b, fb) };
        let mut c = u - two * (fu / (fb - fa)) * (b - a);
        if (c - u).abs() > (b - a) / two {
            c = a + (b - a) / two;
        }
        e = d;
        fe = fd;
        bracket(&f, &mut a, &mut b, c, &mut fa, &mut fb, &mut d, &mut fd);
        count -= 1;
        if count == 0 || fa == T::zero() || tol_reached(a, b) {
            break;
        }

        // Bisect when the interval failed to shrink enough this round.
        if (b - a) < mu * (b0 - a0) {
            continue;
        }
        e = d;
        fe = fd;
        let c = a + (b - a) / two;
        bracket(&f, &mut a, &mut b, c, &mut fa, &mut fb, &mut d, &mut fd);
        count -= 1;
    }

    debug!(
        "bracketed root refinement finished after {} iterations",
        MAX_ITER - count
    );

    if fa == T::zero() {
        return (a, BracketStatus::Converged);
    }
    let root = (a + b) / two;
    if !root.is_finite() {
        return (T::zero(), BracketStatus::Domain);
    }
    if count == 0 && !tol_reached(a, b) {
        return (root, BracketStatus::IterLimit);
    }
    (root, BracketStatus::Converged)
}
