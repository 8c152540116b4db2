use log::debug;
use nalgebra::DVector;
use num_traits::{One, Zero};
use serde::Serialize;

use super::equations::TaylorSystem;
use crate::errors::TalariaError;
use crate::event::detection::EventData;
use crate::event::DetectedTEvent;
use crate::poly::poly_eval;
use crate::Scalar;

/// Outcome of a single adaptive step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome<T> {
    /// The step completed over the full deduced (or clamped) size.
    Advanced { h: T },
    /// A terminal event truncated the step; `stop` is set when its callback
    /// requested an end to propagation.
    TerminalEvent { idx: usize, h: T, stop: bool },
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Statistics {
    pub number_of_steps: usize,
    pub number_of_terminal_events: usize,
    pub number_of_nonterminal_events: usize,
}

/// Adaptive Taylor-series integrator.
///
/// Each step expands the solution (and the event equations, if any) into
/// Taylor polynomials around the current state, deduces a step size from the
/// decay of the coefficients, runs event detection over the step and then
/// advances the state with a Horner evaluation of the jet.
#[derive(Debug)]
pub struct TaylorAdaptive<T: Scalar, Sys: TaylorSystem<T>> {
    sys: Sys,
    t: T,
    y: DVector<T>,
    order: usize,
    tol: T,
    /// Taylor coefficients of the last accepted step (dense output),
    /// `dim` rows of `order + 1`.
    tc: Vec<T>,
    last_t0: T,
    last_h: T,
    ed: Option<EventData<T>>,
    stats: Statistics,
}

impl<T: Scalar, Sys: TaylorSystem<T>> TaylorAdaptive<T, Sys> {
    pub(crate) fn from_parts(
        sys: Sys,
        t0: T,
        y0: DVector<T>,
        tol: T,
        order: usize,
        ed: Option<EventData<T>>,
    ) -> Self {
        let tc = vec![T::zero(); sys.dim() * (order + 1)];
        Self {
            sys,
            t: t0,
            y: y0,
            order,
            tol,
            tc,
            last_t0: t0,
            last_h: T::zero(),
            ed,
            stats: Statistics::default(),
        }
    }

    pub fn time(&self) -> T {
        self.t
    }

    pub fn state(&self) -> &DVector<T> {
        &self.y
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn tolerance(&self) -> T {
        self.tol
    }

    pub fn system(&self) -> &Sys {
        &self.sys
    }

    pub fn get_statistics(&self) -> Statistics {
        self.stats
    }

    pub fn event_data(&self) -> Option<&EventData<T>> {
        self.ed.as_ref()
    }

    pub fn event_data_mut(&mut self) -> Option<&mut EventData<T>> {
        self.ed.as_mut()
    }

    /// Expand the state jet around the current `(t, y)` and reject
    /// non-finite coefficients.
    fn fill_state_jet(&mut self) -> Result<(), TalariaError> {
        self.sys
            .state_jet(self.t, self.y.as_slice(), self.order, &mut self.tc);
        if self.tc.iter().any(|c| !c.is_finite()) {
            return Err(TalariaError::NonFiniteState { t: self.t.to_f64() });
        }
        Ok(())
    }

    /// Deduce the step size from the infinity norms of the last two
    /// coefficient rows, clamped to `max_dt` (whose sign selects the
    /// direction of time).
    fn deduce_h(&self, scale: T, max_dt: T) -> Result<T, TalariaError> {
        let span = self.order + 1;
        let mut m1 = T::zero();
        let mut m2 = T::zero();
        for row in 0..self.sys.dim() {
            let base = row * span;
            m1 = m1.max(self.tc[base + self.order - 1].abs());
            m2 = m2.max(self.tc[base + self.order].abs());
        }

        let tol_s = self.tol * scale;
        let rho_of = |m: T, p: usize| {
            if m == T::zero() {
                T::INFINITY
            } else {
                (tol_s / m).powf(T::one() / T::from(p as f64))
            }
        };
        let rho = rho_of(m1, self.order - 1).min(rho_of(m2, self.order));
        let h_abs = (rho * T::from(0.9)).min(max_dt.abs());

        if !h_abs.is_finite() {
            return Err(TalariaError::StepSizeUndetermined { t: self.t.to_f64() });
        }
        if h_abs == T::zero() {
            return Err(TalariaError::StepSizeTooSmall { t: self.t.to_f64() });
        }
        Ok(if max_dt < T::zero() { -h_abs } else { h_abs })
    }

    /// Take one adaptive step of at most `|max_dt|`, in the direction of its
    /// sign, firing event callbacks for anything detected inside the step.
    pub fn step(&mut self, max_dt: T) -> Result<StepOutcome<T>, TalariaError> {
        if !(max_dt.abs() > T::zero()) {
            return Err(TalariaError::InvalidMaxStep {
                max_dt: max_dt.to_f64(),
            });
        }

        self.fill_state_jet()?;

        let scale = self
            .y
            .iter()
            .fold(T::one(), |m, &v| m.max(v.abs()));
        let h = self.deduce_h(scale, max_dt)?;
        let g_eps = self.tol * scale;

        // Event detection over the candidate step.
        if let Some(ed) = self.ed.as_mut() {
            ed.fill_event_rows(&self.sys, self.t, &self.tc);
            ed.prune_cooldowns(self.t, h);
            ed.detect_events(self.t, h, g_eps);
        }

        // The earliest terminal event truncates the step.
        let te: Option<DetectedTEvent<T>> = self.ed.as_ref().and_then(|ed| {
            ed.d_tes
                .iter()
                .copied()
                .min_by(|a, b| {
                    a.t.abs()
                        .partial_cmp(&b.t.abs())
                        .unwrap()
                        .then_with(|| a.idx.cmp(&b.idx))
                })
        });

        // Non-terminal callbacks fire in encounter order: |time| ascending,
        // ties broken by event index, then discovery order.
        let mut ntes = self
            .ed
            .as_ref()
            .map(|ed| ed.d_ntes.clone())
            .unwrap_or_default();
        ntes.sort_by(|a, b| {
            a.t.abs()
                .partial_cmp(&b.t.abs())
                .unwrap()
                .then_with(|| a.idx.cmp(&b.idx))
        });

        let h_eff = match te {
            Some(ev) => ev.t,
            None => h,
        };

        // Advance the state through the jet and commit the step.
        let t0 = self.t;
        let span = self.order + 1;
        for row in 0..self.sys.dim() {
            let base = row * span;
            self.y[row] = poly_eval(&self.tc[base..base + span], h_eff);
        }
        self.last_t0 = t0;
        self.last_h = h_eff;
        self.t = t0 + h_eff;
        self.stats.number_of_steps += 1;

        let cutoff = h_eff.abs();
        for ev in &ntes {
            if te.is_some() && ev.t.abs() > cutoff {
                continue;
            }
            self.stats.number_of_nonterminal_events += 1;
            if let Some(ed) = self.ed.as_mut() {
                if let Some(cb) = ed.nt_events[ev.idx].callback.as_mut() {
                    cb(t0 + ev.t, ev.d_sgn);
                }
            }
        }

        if let Some(ev) = te {
            self.stats.number_of_terminal_events += 1;
            let ed = self.ed.as_mut().expect("terminal event without event data");
            ed.arm_cooldown(ev.idx, self.t, ev.abs_der, g_eps);
            debug!(
                "terminal event {} triggered, cooldown armed at t = {}",
                ev.idx,
                self.t.to_f64()
            );
            let stop = match ed.t_events[ev.idx].callback.as_mut() {
                Some(cb) => !cb(self.y.as_mut_slice(), t0 + ev.t, ev.multi_roots),
                None => false,
            };
            return Ok(StepOutcome::TerminalEvent {
                idx: ev.idx,
                h: h_eff,
                stop,
            });
        }

        Ok(StepOutcome::Advanced { h: h_eff })
    }

    /// Propagate to `t_end` (forward or backward), firing event callbacks
    /// along the way. Returns early when a terminal-event callback requests
    /// a stop.
    pub fn propagate_until(&mut self, t_end: T) -> Result<(), TalariaError> {
        if !t_end.is_finite() {
            return Err(TalariaError::NonFiniteTimeTarget { t: t_end.to_f64() });
        }

        loop {
            let remaining = t_end - self.t;
            if remaining == T::zero() {
                return Ok(());
            }
            // A remainder below one ulp of the current time cannot advance
            // the clock; snap to the target.
            if self.t + remaining == self.t {
                self.t = t_end;
                return Ok(());
            }
            match self.step(remaining)? {
                StepOutcome::TerminalEvent { stop: true, .. } => return Ok(()),
                // The step was clamped to the remainder: land exactly on the
                // target instead of accumulating rounding.
                StepOutcome::Advanced { h } if h == remaining => {
                    self.t = t_end;
                    return Ok(());
                }
                _ => {}
            }
        }
    }

    /// Dense output over the last accepted step.
    pub fn interpolate(&self, t: T) -> Result<DVector<T>, TalariaError> {
        if self.stats.number_of_steps == 0 {
            return Err(TalariaError::InterpolationBeforeFirstStep);
        }
        let s = t - self.last_t0;
        let inside = if self.last_h >= T::zero() {
            s >= T::zero() && s <= self.last_h
        } else {
            s <= T::zero() && s >= self.last_h
        };
        if !inside {
            return Err(TalariaError::InterpolationOutsideStep { t: t.to_f64() });
        }

        let span = self.order + 1;
        let vals: Vec<T> = (0..self.sys.dim())
            .map(|row| poly_eval(&self.tc[row * span..(row + 1) * span], s))
            .collect();
        Ok(DVector::from_vec(vals))
    }
}
