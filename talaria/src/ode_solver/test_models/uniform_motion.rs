use num_traits::Zero;

use crate::ode_solver::equations::TaylorSystem;
use crate::series::mul_coeff;
use crate::Scalar;

/// Two point particles in the plane moving with constant velocities.
///
/// State layout: `(x0, y0, x1, y1, vx0, vy0, vx1, vy1)`. The single event
/// equation is the squared mutual distance minus `r2`.
pub struct UniformMotion<T> {
    pub r2: T,
}

impl<T: Scalar> UniformMotion<T> {
    pub fn new(r2: T) -> Self {
        Self { r2 }
    }
}

impl<T: Scalar> TaylorSystem<T> for UniformMotion<T> {
    fn dim(&self) -> usize {
        8
    }

    fn n_event_eqs(&self) -> usize {
        1
    }

    fn state_jet(&self, _t: T, y: &[T], order: usize, jet: &mut [T]) {
        let span = order + 1;
        for c in jet.iter_mut() {
            *c = T::zero();
        }
        for i in 0..4 {
            jet[i * span] = y[i];
            jet[i * span + 1] = y[4 + i];
            jet[(4 + i) * span] = y[4 + i];
        }
    }

    fn event_jet(&self, _eq: usize, _t: T, state_jet: &[T], order: usize, out: &mut [T]) {
        let span = order + 1;
        let mut u = vec![T::zero(); span];
        let mut w = vec![T::zero(); span];
        for k in 0..span {
            u[k] = state_jet[k] - state_jet[2 * span + k];
            w[k] = state_jet[span + k] - state_jet[3 * span + k];
        }
        for k in 0..=order {
            out[k] = mul_coeff(&u, &u, k) + mul_coeff(&w, &w, k);
        }
        out[0] -= self.r2;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poly::poly_eval;

    #[test]
    fn test_event_polynomial() {
        let sys = UniformMotion::new(4.0);
        let order = 4;
        let span = order + 1;
        let y = [0.0, 0.0, -10.0, 2.0, 0.0, 0.0, 1.0, 0.0];
        let mut jet = vec![0.0; 8 * span];
        sys.state_jet(0.0, &y, order, &mut jet);
        let mut g = vec![0.0; span];
        sys.event_jet(0, 0.0, &jet, order, &mut g);

        // d^2(s) - 4 = (s - 10)^2 + 4 - 4 at the initial configuration.
        assert_eq!(poly_eval(&g, 0.0), 100.0);
        assert_eq!(poly_eval(&g, 10.0), 0.0);
        assert_eq!(poly_eval(&g, 8.0), 4.0);
    }
}
