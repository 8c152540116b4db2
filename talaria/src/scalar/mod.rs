use nalgebra::RealField;

pub type IndexType = usize;

/// The scalar type driving the integrator and the event-detection core.
///
/// This is [`nalgebra::RealField`] plus the handful of floating-point
/// details the core needs: machine constants, ulp stepping for the
/// half-open root brackets, and a lossy conversion for diagnostics.
pub trait Scalar: RealField + Copy + From<f64> + std::fmt::Debug + 'static {
    const EPSILON: Self;
    const INFINITY: Self;
    const NAN: Self;

    /// Next representable value from `self` in the direction of `toward`.
    fn next_after(self, toward: Self) -> Self;

    /// Lossy conversion used for error payloads and log messages.
    fn to_f64(self) -> f64;
}

impl Scalar for f64 {
    const EPSILON: Self = f64::EPSILON;
    const INFINITY: Self = f64::INFINITY;
    const NAN: Self = f64::NAN;

    fn next_after(self, toward: Self) -> Self {
        if self.is_nan() || toward.is_nan() {
            return f64::NAN;
        }
        if self == toward {
            return toward;
        }
        if self == 0.0 {
            return if toward > 0.0 {
                f64::from_bits(1)
            } else {
                -f64::from_bits(1)
            };
        }
        let bits = self.to_bits();
        let next = if (toward > self) == (self >= 0.0) {
            bits + 1
        } else {
            bits - 1
        };
        f64::from_bits(next)
    }

    fn to_f64(self) -> f64 {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_after() {
        assert_eq!(1.0f64.next_after(2.0), 1.0 + f64::EPSILON);
        assert!(1.0f64.next_after(0.0) < 1.0);
        assert!((-1.0f64).next_after(0.0) > -1.0);
        assert!((-1.0f64).next_after(-2.0) < -1.0);
        assert_eq!(0.0f64.next_after(1.0), f64::from_bits(1));
        assert_eq!(3.5f64.next_after(3.5), 3.5);
        assert!(f64::NAN.next_after(0.0).is_nan());
    }

    #[test]
    fn test_next_after_is_one_ulp() {
        let x = 0.728f64;
        let up = x.next_after(1.0);
        assert!(up > x);
        // No representable value lies strictly between the two.
        assert_eq!(up.to_bits() - x.to_bits(), 1);
    }
}
