use nalgebra::DVector;
use num_traits::Zero;

use super::equations::TaylorSystem;
use super::taylor::TaylorAdaptive;
use crate::errors::TalariaError;
use crate::event::detection::EventData;
use crate::event::{NtEvent, TEvent, DEFAULT_COOLDOWN_FACTOR};
use crate::Scalar;

/// Builder for [`TaylorAdaptive`] problems.
///
/// The Taylor order follows from the tolerance as
/// `max(2, ceil(-ln(tol) / 2))`, so the default (machine epsilon) yields an
/// order around 19 for `f64`.
pub struct TaylorBuilder<T: Scalar> {
    tol: T,
    cooldown_factor: T,
    t_events: Vec<TEvent<T>>,
    nt_events: Vec<NtEvent<T>>,
}

impl<T: Scalar> Default for TaylorBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar> TaylorBuilder<T> {
    pub fn new() -> Self {
        Self {
            tol: T::EPSILON,
            cooldown_factor: T::from(DEFAULT_COOLDOWN_FACTOR),
            t_events: Vec::new(),
            nt_events: Vec::new(),
        }
    }

    pub fn tolerance(mut self, tol: T) -> Self {
        self.tol = tol;
        self
    }

    /// Safety factor for automatically deduced terminal-event cooldowns.
    pub fn cooldown_factor(mut self, factor: T) -> Self {
        self.cooldown_factor = factor;
        self
    }

    pub fn t_events(mut self, events: Vec<TEvent<T>>) -> Self {
        self.t_events = events;
        self
    }

    pub fn nt_events(mut self, events: Vec<NtEvent<T>>) -> Self {
        self.nt_events = events;
        self
    }

    pub fn build<Sys: TaylorSystem<T>>(
        self,
        sys: Sys,
        t0: T,
        y0: DVector<T>,
    ) -> Result<TaylorAdaptive<T, Sys>, TalariaError> {
        if !self.tol.is_finite() || !(self.tol > T::zero()) {
            return Err(TalariaError::InvalidTolerance {
                tol: self.tol.to_f64(),
            });
        }
        if y0.len() != sys.dim() {
            return Err(TalariaError::StateDimensionMismatch {
                len: y0.len(),
                dim: sys.dim(),
            });
        }
        for eq in self
            .t_events
            .iter()
            .map(TEvent::equation)
            .chain(self.nt_events.iter().map(NtEvent::equation))
        {
            if eq >= sys.n_event_eqs() {
                return Err(TalariaError::EventEquationOutOfRange {
                    eq,
                    n: sys.n_event_eqs(),
                });
            }
        }

        let order = (-self.tol.ln() / T::from(2.0)).ceil().to_f64() as usize;
        let order = order.max(2);

        let ed = if self.t_events.is_empty() && self.nt_events.is_empty() {
            None
        } else {
            let mut ed = EventData::new(self.t_events, self.nt_events, order, sys.dim())?;
            ed.set_cooldown_factor(self.cooldown_factor);
            Some(ed)
        };

        Ok(TaylorAdaptive::from_parts(sys, t0, y0, self.tol, order, ed))
    }
}
