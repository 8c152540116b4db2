//! Per-step event detection: fast exclusion, real-root isolation and
//! refinement over the Taylor polynomials of the event equations.
//!
//! The isolator is a branch-and-bound over sub-intervals of the unit
//! interval. Each candidate polynomial is run through the Descartes
//! transform (reverse, translate by one); the sign-change count of the
//! result bounds the number of roots in the sub-interval from above with
//! matching parity, so zero discards the interval, one isolates a root and
//! anything larger forces a bisection.

use std::rc::Rc;

use log::{debug, warn};
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};

use crate::errors::TalariaError;
use crate::event::{
    deduce_cooldown_with_factor, Cooldown, DetectedNtEvent, DetectedTEvent, NtEvent, TEvent,
    DEFAULT_COOLDOWN_FACTOR,
};
use crate::poly::cache::{PolyBuf, PolyCache};
use crate::poly::enclosure::fex_check;
use crate::poly::{
    count_sign_changes, poly_eval, poly_eval_1, poly_rescale, poly_rescale_p2, poly_reverse,
    poly_translate_1, sgn, BinomialTable,
};
use crate::root_finder::{bracketed_root_find, BracketStatus};
use crate::Scalar;

/// The per-order routines event detection consumes from the kernel layer.
///
/// A code-generating backend would hand out compiled entry points for a
/// fixed order; [`NativePolyOps`] is the interpreted implementation built on
/// the `poly` primitives.
pub trait PolyOps<T: Scalar> {
    /// Write the coefficients of `a(x + 1)` into `out`.
    fn poly_translate_1(&self, out: &mut [T], a: &[T]);

    /// Reverse `a` into `out1`, translate that by one into `out2` and return
    /// the number of sign changes in `out2`.
    fn poly_rtscc(&self, out1: &mut [T], out2: &mut [T], a: &[T]) -> u32;

    /// Interval-Horner exclusion check over the step.
    fn fex_check(&self, a: &[T], h: T, backward: bool) -> bool;
}

/// Interpreted kernel: scalar batch, binomial table built at construction.
pub struct NativePolyOps<T> {
    bc: BinomialTable<T>,
}

impl<T: Scalar> NativePolyOps<T> {
    pub fn new(order: usize) -> Self {
        Self {
            bc: BinomialTable::new(order),
        }
    }
}

impl<T: Scalar> PolyOps<T> for NativePolyOps<T> {
    fn poly_translate_1(&self, out: &mut [T], a: &[T]) {
        poly_translate_1(out, a, &self.bc);
    }

    fn poly_rtscc(&self, out1: &mut [T], out2: &mut [T], a: &[T]) -> u32 {
        poly_reverse(out1, a);
        poly_translate_1(out2, out1, &self.bc);
        count_sign_changes(out2)
    }

    fn fex_check(&self, a: &[T], h: T, backward: bool) -> bool {
        fex_check(a, h, backward)
    }
}

// Working-list bound from observed pathological cases; a degree-n polynomial
// cannot have more than n real roots, which caps the isolating list.
const WLIST_CAP: usize = 250;

struct WorkItem<T: Scalar> {
    lb: T,
    ub: T,
    poly: PolyBuf<T>,
}

/// Per-integrator event-detection state: the event lists, the jet buffer,
/// the cooldown vector, the buffer cache, the isolation scratch lists and
/// the detected-event output vectors.
///
/// The jet is laid out as `(dim + |T| + |N|)` rows of `order + 1`
/// coefficients: state rows first, then one row per terminal event, then
/// one row per non-terminal event.
pub struct EventData<T: Scalar> {
    pub(crate) t_events: Vec<TEvent<T>>,
    pub(crate) nt_events: Vec<NtEvent<T>>,
    pub(crate) ev_jet: Vec<T>,
    pub(crate) te_cooldowns: Vec<Option<Cooldown<T>>>,
    pub(crate) d_tes: Vec<DetectedTEvent<T>>,
    pub(crate) d_ntes: Vec<DetectedNtEvent<T>>,
    cache: Rc<PolyCache<T>>,
    wlist: Vec<WorkItem<T>>,
    isol: Vec<(T, T)>,
    roots: Vec<T>,
    ops: Box<dyn PolyOps<T>>,
    order: usize,
    dim: usize,
    cooldown_factor: T,
}

impl<T: Scalar> std::fmt::Debug for EventData<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventData")
            .field("t_events", &self.t_events)
            .field("nt_events", &self.nt_events)
            .field("ev_jet", &self.ev_jet)
            .field("te_cooldowns", &self.te_cooldowns)
            .field("d_tes", &self.d_tes)
            .field("d_ntes", &self.d_ntes)
            .field("isol", &self.isol)
            .field("roots", &self.roots)
            .field("order", &self.order)
            .field("dim", &self.dim)
            .field("cooldown_factor", &self.cooldown_factor)
            .finish()
    }
}

impl<T: Scalar> EventData<T> {
    pub fn new(
        t_events: Vec<TEvent<T>>,
        nt_events: Vec<NtEvent<T>>,
        order: usize,
        dim: usize,
    ) -> Result<Self, TalariaError> {
        if order < 2 {
            return Err(TalariaError::OrderTooLow { order });
        }

        let n_events = t_events.len() + nt_events.len();
        let jet_len = order
            .checked_add(1)
            .and_then(|span| dim.checked_add(n_events)?.checked_mul(span))
            .ok_or(TalariaError::JetSizeOverflow {
                dim,
                n_events,
                order,
            })?;

        let n_te = t_events.len();
        Ok(Self {
            t_events,
            nt_events,
            ev_jet: vec![T::zero(); jet_len],
            te_cooldowns: vec![None; n_te],
            d_tes: Vec::new(),
            d_ntes: Vec::new(),
            cache: Rc::new(PolyCache::new(order)),
            wlist: Vec::new(),
            isol: Vec::new(),
            roots: Vec::new(),
            ops: Box::new(NativePolyOps::new(order)),
            order,
            dim,
            cooldown_factor: T::from(DEFAULT_COOLDOWN_FACTOR),
        })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn n_terminal(&self) -> usize {
        self.t_events.len()
    }

    pub fn n_nonterminal(&self) -> usize {
        self.nt_events.len()
    }

    /// The jet buffer: `(dim + |T| + |N|) x (order + 1)` scalars.
    pub fn jet(&self) -> &[T] {
        &self.ev_jet
    }

    pub fn jet_mut(&mut self) -> &mut [T] {
        &mut self.ev_jet
    }

    pub fn detected_terminal(&self) -> &[DetectedTEvent<T>] {
        &self.d_tes
    }

    pub fn detected_nonterminal(&self) -> &[DetectedNtEvent<T>] {
        &self.d_ntes
    }

    pub fn cooldowns(&self) -> &[Option<Cooldown<T>>] {
        &self.te_cooldowns
    }

    pub fn cache_depth(&self) -> usize {
        self.cache.depth()
    }

    pub fn cooldown_factor(&self) -> T {
        self.cooldown_factor
    }

    /// Tune the safety factor used when deducing terminal-event cooldowns.
    pub fn set_cooldown_factor(&mut self, factor: T) {
        self.cooldown_factor = factor;
    }

    /// Fill the state rows of the jet from `state_jet` and expand the event
    /// rows through the system.
    pub(crate) fn fill_event_rows<S: crate::ode_solver::equations::TaylorSystem<T> + ?Sized>(
        &mut self,
        sys: &S,
        t: T,
        state_jet: &[T],
    ) {
        let span = self.order + 1;
        self.ev_jet[..self.dim * span].copy_from_slice(state_jet);
        for (k, ev) in self.t_events.iter().enumerate() {
            let off = (self.dim + k) * span;
            sys.event_jet(
                ev.eq,
                t,
                state_jet,
                self.order,
                &mut self.ev_jet[off..off + span],
            );
        }
        let n_te = self.t_events.len();
        for (k, ev) in self.nt_events.iter().enumerate() {
            let off = (self.dim + n_te + k) * span;
            sys.event_jet(
                ev.eq,
                t,
                state_jet,
                self.order,
                &mut self.ev_jet[off..off + span],
            );
        }
    }

    /// Clear cooldown records whose window no longer overlaps the step
    /// `[t, t + h]`.
    pub(crate) fn prune_cooldowns(&mut self, t: T, h: T) {
        for rec in self.te_cooldowns.iter_mut() {
            if let Some(cd) = *rec {
                let expired = if h >= T::zero() {
                    cd.t_trigger + cd.duration < t
                } else {
                    cd.t_trigger - cd.duration > t
                };
                if expired {
                    *rec = None;
                }
            }
        }
    }

    /// Record a cooldown for terminal event `idx` triggered at absolute time
    /// `t_trigger` with derivative magnitude `abs_der` at the root.
    pub(crate) fn arm_cooldown(&mut self, idx: usize, t_trigger: T, abs_der: T, g_eps: T) {
        let cd = match self.t_events[idx].cooldown {
            Some(cd) => cd,
            None => deduce_cooldown_with_factor(g_eps, abs_der, self.cooldown_factor),
        };
        self.te_cooldowns[idx] = Some(Cooldown {
            t_trigger,
            duration: cd,
        });
    }

    /// Locate all event-equation roots inside the step `[0, h)` (or
    /// `(h, 0]` when integrating backward) and append them to the
    /// detected-event vectors, cleared on entry. `t` is the absolute time at
    /// the start of the step and `g_eps` the maximum absolute error on the
    /// Taylor series of the event equations.
    ///
    /// On return the working and isolating lists are empty (their reserved
    /// capacity is retained) and every recorded root time is finite.
    pub fn detect_events(&mut self, t: T, h: T, g_eps: T) {
        self.d_tes.clear();
        self.d_ntes.clear();

        if !h.is_finite() {
            warn!("event detection skipped due to an invalid timestep value");
            return;
        }
        if !g_eps.is_finite() {
            warn!("event detection skipped due to an invalid error bound on the event equations");
            return;
        }
        if h == T::zero() {
            return;
        }

        debug_assert!(self.order >= 2);

        self.run_detection(t, h, g_eps, true);
        self.run_detection(t, h, g_eps, false);

        // Scratch lists end every call empty, with their capacity retained.
        self.isol.clear();
        self.roots.clear();
    }

    fn run_detection(&mut self, t: T, h: T, g_eps: T, terminal: bool) {
        let span = self.order + 1;
        let order = self.order;
        let n_te = self.t_events.len();
        let n_ev = if terminal { n_te } else { self.nt_events.len() };
        let backward = h < T::zero();

        for i in 0..n_ev {
            let off = (self.dim + if terminal { i } else { n_te + i }) * span;

            // Fast exclusion: if the interval Horner proves a constant sign
            // over the step there is nothing to isolate. Non-finite Taylor
            // coefficients can at worst skip detection here; the stepper
            // checks them independently.
            if self
                .ops
                .fex_check(&self.ev_jet[off..off + span], h, backward)
            {
                continue;
            }

            // For a terminal event on cooldown, the fraction of the step
            // still inside the suppression window; roots below it are
            // ignored.
            let lb_offset = if terminal {
                match self.te_cooldowns[i] {
                    Some(cd) => {
                        let frac = if backward {
                            (t - (cd.t_trigger - cd.duration)) / h.abs()
                        } else {
                            ((cd.t_trigger + cd.duration) - t) / h.abs()
                        };
                        frac.max(T::zero())
                    }
                    None => T::zero(),
                }
            } else {
                T::zero()
            };

            if lb_offset >= T::one() {
                debug!(
                    "the integration timestep falls entirely within the cooldown of terminal event {i}, skipping"
                );
                continue;
            }

            self.isol.clear();
            self.wlist.clear();
            self.roots.clear();

            // Rescale so that the step maps to the unit interval and seed
            // the working list with it.
            let mut q = self.cache.acquire();
            poly_rescale(&mut q, &self.ev_jet[off..off + span], h);
            self.wlist.push(WorkItem {
                lb: T::zero(),
                ub: T::one(),
                poly: q,
            });

            let mut loop_failed = false;
            while let Some(WorkItem { lb, ub, poly: q }) = self.wlist.pop() {
                // A root exactly at the lower endpoint shows up as a zero
                // constant term; only report it when the remaining
                // coefficients are finite.
                if q[0] == T::zero() && q[1..].iter().all(|c| c.is_finite()) {
                    if terminal && lb < lb_offset {
                        debug!(
                            "terminal event {i} at the start of a sub-interval is inside the cooldown window, ignoring"
                        );
                    } else {
                        self.roots.push(lb * h);
                    }
                }

                let mut tmp1 = self.cache.acquire();
                let mut tmp2 = self.cache.acquire();
                let n_sc = self.ops.poly_rtscc(&mut tmp1, &mut tmp2, &q);

                if n_sc == 1 {
                    self.isol.push((lb, ub));
                } else if n_sc > 1 {
                    // Bisect: tmp1 <- 2^n q(x/2), tmp2 <- 2^n q((x+1)/2).
                    poly_rescale_p2(&mut tmp1, &q);
                    self.ops.poly_translate_1(&mut tmp2, &tmp1);

                    let mid = (lb + ub) / T::from(2.0);
                    if lb_offset < mid {
                        self.wlist.push(WorkItem {
                            lb,
                            ub: mid,
                            poly: tmp1,
                        });
                    } else {
                        // The lower half lies entirely in the cooldown
                        // window; its buffer goes straight back to the cache.
                        debug!("dropping a bisection half inside the cooldown window");
                    }
                    self.wlist.push(WorkItem {
                        lb: mid,
                        ub,
                        poly: tmp2,
                    });
                }

                if self.wlist.len() > WLIST_CAP || self.isol.len() > order {
                    warn!(
                        "the polynomial root isolation algorithm failed during event detection: the working list size is {} and the number of isolating intervals is {}",
                        self.wlist.len(),
                        self.isol.len()
                    );
                    loop_failed = true;
                    break;
                }
            }

            // Anything left on the working list goes back to the cache.
            self.wlist.clear();

            if !self.isol.is_empty() && !loop_failed {
                // Refinement runs on the unit-rescaled polynomial, because
                // the isolating intervals live in the unit variable too.
                let mut rp = self.cache.acquire();
                poly_rescale(&mut rp, &self.ev_jet[off..off + span], h);

                for k in 0..self.isol.len() {
                    let (mut lb, ub) = self.isol[k];

                    if terminal && lb < lb_offset {
                        // Advance past the cooldown and re-check that the
                        // interval still brackets a root.
                        lb = lb_offset;
                        debug_assert!(lb < ub);
                        let f_lb = poly_eval(&rp, lb);
                        let f_ub = poly_eval(&rp, ub);
                        if !(f_lb * f_ub < T::zero()) {
                            debug!("terminal event {i} is inside the cooldown window, ignoring");
                            continue;
                        }
                    }

                    match bracketed_root_find(&rp, lb, ub) {
                        (root, BracketStatus::Converged) => self.roots.push(root * h),
                        (_, BracketStatus::IterLimit) => {
                            warn!(
                                "polynomial root refinement during event detection failed due to too many iterations"
                            );
                        }
                        (_, BracketStatus::Domain) => {
                            warn!(
                                "polynomial root refinement during event detection ran into a numerical error"
                            );
                        }
                    }
                }
            }

            // Post-process the roots, in discovery order, into detected-event
            // records.
            let a = &self.ev_jet[off..off + span];
            for k in 0..self.roots.len() {
                let root = self.roots[k];
                if !root.is_finite() {
                    warn!("polynomial root finding produced a non-finite root, skipping the event");
                    continue;
                }

                // The derivative is taken on the unrescaled polynomial: it
                // feeds the cooldown deduction and the direction test in
                // physical time.
                let der = poly_eval_1(a, root);
                if !der.is_finite() {
                    warn!(
                        "polynomial root finding produced a root with a non-finite derivative, skipping the event"
                    );
                    continue;
                }
                let abs_der = der.abs();
                let d_sgn = sgn(der);

                if terminal {
                    let ev = &self.t_events[i];
                    if !ev.direction.matches(d_sgn) {
                        continue;
                    }
                    let cd = match ev.cooldown {
                        Some(cd) => cd,
                        None => deduce_cooldown_with_factor(g_eps, abs_der, self.cooldown_factor),
                    };
                    // Probe both edges of the cooldown window: equal signs
                    // there mean more roots are hiding inside it.
                    let multi_roots = if cd > T::zero() {
                        let e1 = poly_eval(a, root + cd);
                        let e2 = poly_eval(a, root - cd);
                        (e1 > T::zero()) == (e2 > T::zero())
                    } else {
                        false
                    };
                    self.d_tes.push(DetectedTEvent {
                        idx: i,
                        t: root,
                        multi_roots,
                        d_sgn,
                        abs_der,
                    });
                } else {
                    let ev = &self.nt_events[i];
                    if !ev.direction.matches(d_sgn) {
                        continue;
                    }
                    self.d_ntes.push(DetectedNtEvent {
                        idx: i,
                        t: root,
                        d_sgn,
                    });
                }
            }
        }
    }

    /// Capture the persistent part of the detection state: descriptors,
    /// cooldown records, jet contents and cache parameters. Callbacks and
    /// scratch contents are rebuilt on [`EventData::restore`].
    pub fn checkpoint(&self) -> EventCheckpoint<T> {
        EventCheckpoint {
            t_events: self.t_events.iter().map(TEvent::clone_descriptor).collect(),
            nt_events: self
                .nt_events
                .iter()
                .map(NtEvent::clone_descriptor)
                .collect(),
            te_cooldowns: self.te_cooldowns.clone(),
            ev_jet: self.ev_jet.clone(),
            cache_depth: self.cache.depth(),
            order: self.order,
            dim: self.dim,
            cooldown_factor: self.cooldown_factor,
        }
    }

    /// Rebuild the detection state from a checkpoint. Event callbacks must
    /// be re-attached by the caller.
    pub fn restore(ck: EventCheckpoint<T>) -> Result<Self, TalariaError> {
        let mut ed = Self::new(ck.t_events, ck.nt_events, ck.order, ck.dim)?;
        if ck.ev_jet.len() != ed.ev_jet.len() {
            return Err(TalariaError::InvalidCheckpoint {
                e: format!(
                    "jet length {} does not match the declared layout ({} expected)",
                    ck.ev_jet.len(),
                    ed.ev_jet.len()
                ),
            });
        }
        if ck.te_cooldowns.len() != ed.te_cooldowns.len() {
            return Err(TalariaError::InvalidCheckpoint {
                e: format!(
                    "{} cooldown records for {} terminal events",
                    ck.te_cooldowns.len(),
                    ed.te_cooldowns.len()
                ),
            });
        }
        ed.ev_jet = ck.ev_jet;
        ed.te_cooldowns = ck.te_cooldowns;
        ed.cooldown_factor = ck.cooldown_factor;
        ed.cache.refill(ck.cache_depth);
        Ok(ed)
    }

    pub fn t_events(&self) -> &[TEvent<T>] {
        &self.t_events
    }

    pub fn t_events_mut(&mut self) -> &mut [TEvent<T>] {
        &mut self.t_events
    }

    pub fn nt_events(&self) -> &[NtEvent<T>] {
        &self.nt_events
    }

    pub fn nt_events_mut(&mut self) -> &mut [NtEvent<T>] {
        &mut self.nt_events
    }
}

/// Serializable snapshot of [`EventData`] for checkpoint/resume.
#[derive(Debug, Serialize, Deserialize)]
pub struct EventCheckpoint<T> {
    pub t_events: Vec<TEvent<T>>,
    pub nt_events: Vec<NtEvent<T>>,
    pub te_cooldowns: Vec<Option<Cooldown<T>>>,
    pub ev_jet: Vec<T>,
    pub cache_depth: usize,
    pub order: usize,
    pub dim: usize,
    pub cooldown_factor: T,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventDirection;

    fn event_only_data(order: usize, nt: Vec<NtEvent<f64>>, te: Vec<TEvent<f64>>) -> EventData<f64> {
        EventData::new(te, nt, order, 0).unwrap()
    }

    fn sorted_nt_times(ed: &EventData<f64>) -> Vec<f64> {
        let mut ts: Vec<f64> = ed.detected_nonterminal().iter().map(|ev| ev.t).collect();
        ts.sort_by(|a, b| a.partial_cmp(b).unwrap());
        ts
    }

    #[test]
    fn test_two_simple_roots() {
        // (s - 0.25)(s - 0.75) over a unit step.
        let mut ed = event_only_data(4, vec![NtEvent::new(0)], vec![]);
        ed.jet_mut()[..5].copy_from_slice(&[0.1875, -1.0, 1.0, 0.0, 0.0]);
        ed.detect_events(0.0, 1.0, 1e-14);

        assert_eq!(ed.detected_nonterminal().len(), 2);
        let ts = sorted_nt_times(&ed);
        assert!((ts[0] - 0.25).abs() < 1e-13);
        assert!((ts[1] - 0.75).abs() < 1e-13);
        // Derivative signs at the two crossings.
        let mut sgns: Vec<i32> = ed.detected_nonterminal().iter().map(|ev| ev.d_sgn).collect();
        sgns.sort_unstable();
        assert_eq!(sgns, vec![-1, 1]);
    }

    #[test]
    fn test_direction_filter() {
        let mut ed = event_only_data(
            4,
            vec![NtEvent::new(0).with_direction(EventDirection::Positive)],
            vec![],
        );
        ed.jet_mut()[..5].copy_from_slice(&[0.1875, -1.0, 1.0, 0.0, 0.0]);
        ed.detect_events(0.0, 1.0, 1e-14);

        assert_eq!(ed.detected_nonterminal().len(), 1);
        assert!((ed.detected_nonterminal()[0].t - 0.75).abs() < 1e-13);
        assert_eq!(ed.detected_nonterminal()[0].d_sgn, 1);
    }

    #[test]
    fn test_boundary_root() {
        // s (s - 2): only the boundary root lies inside the step.
        let mut ed = event_only_data(3, vec![NtEvent::new(0)], vec![]);
        ed.jet_mut()[..4].copy_from_slice(&[0.0, -2.0, 1.0, 0.0]);
        ed.detect_events(0.0, 1.0, 1e-14);

        assert_eq!(ed.detected_nonterminal().len(), 1);
        assert_eq!(ed.detected_nonterminal()[0].t, 0.0);
    }

    #[test]
    fn test_fast_exclusion() {
        let mut ed = event_only_data(3, vec![NtEvent::new(0)], vec![]);
        ed.jet_mut()[..4].copy_from_slice(&[1.0, 0.5, 1.0, 0.0]);
        ed.detect_events(0.0, 1.0, 1e-14);
        assert!(ed.detected_nonterminal().is_empty());
    }

    #[test]
    fn test_backward_step() {
        // Roots at s = -0.25 and s = -0.75 when stepping back one unit.
        let mut ed = event_only_data(4, vec![NtEvent::new(0)], vec![]);
        ed.jet_mut()[..5].copy_from_slice(&[0.1875, 1.0, 1.0, 0.0, 0.0]);
        ed.detect_events(0.0, -1.0, 1e-14);

        assert_eq!(ed.detected_nonterminal().len(), 2);
        let ts = sorted_nt_times(&ed);
        assert!((ts[0] + 0.75).abs() < 1e-13);
        assert!((ts[1] + 0.25).abs() < 1e-13);
    }

    #[test]
    fn test_scratch_state_after_detection() {
        let mut ed = event_only_data(4, vec![NtEvent::new(0)], vec![]);
        ed.jet_mut()[..5].copy_from_slice(&[0.1875, -1.0, 1.0, 0.0, 0.0]);
        ed.detect_events(0.0, 1.0, 1e-14);

        // Postconditions: scratch lists drained, buffers parked in the cache.
        assert!(ed.wlist.is_empty());
        assert!(ed.isol.is_empty());
        assert!(ed.cache_depth() > 0);

        // A second pass over the same jet reuses the cached buffers and
        // reproduces the result.
        let before = ed.cache_depth();
        ed.detect_events(0.0, 1.0, 1e-14);
        assert_eq!(ed.detected_nonterminal().len(), 2);
        assert_eq!(ed.cache_depth(), before);
    }

    #[test]
    fn test_descartes_bound_and_parity() {
        // The sign-change count of the Descartes transform bounds the root
        // count in (0, 1) from above with the same parity.
        let ops = NativePolyOps::<f64>::new(4);
        let mut o1 = [0.0; 5];
        let mut o2 = [0.0; 5];

        // Two roots inside the unit interval.
        let two = [0.1875, -1.0, 1.0, 0.0, 0.0];
        let nsc = ops.poly_rtscc(&mut o1, &mut o2, &two);
        assert!(nsc >= 2 && nsc % 2 == 0);

        // One root inside.
        let one = [-0.25, 1.0, 0.0, 0.0, 0.0];
        let nsc = ops.poly_rtscc(&mut o1, &mut o2, &one);
        assert_eq!(nsc, 1);

        // No roots inside.
        let zero = [1.0, 1.0, 1.0, 0.0, 0.0];
        let nsc = ops.poly_rtscc(&mut o1, &mut o2, &zero);
        assert_eq!(nsc, 0);
    }

    #[test]
    fn test_terminal_cooldown_gating() {
        // Roots at 0.1 and 0.6; a cooldown window covering the first fifth
        // of the step suppresses the early root.
        let coeffs = [0.06, -0.7, 1.0, 0.0, 0.0];

        let mut ed = event_only_data(4, vec![], vec![TEvent::new(0)]);
        ed.jet_mut()[..5].copy_from_slice(&coeffs);
        ed.detect_events(0.0, 1.0, 1e-14);
        assert_eq!(ed.detected_terminal().len(), 2);

        let mut ed = event_only_data(4, vec![], vec![TEvent::new(0)]);
        ed.jet_mut()[..5].copy_from_slice(&coeffs);
        ed.te_cooldowns[0] = Some(Cooldown {
            t_trigger: -0.1,
            duration: 0.3,
        });
        ed.detect_events(0.0, 1.0, 1e-14);
        assert_eq!(ed.detected_terminal().len(), 1);
        assert!((ed.detected_terminal()[0].t - 0.6).abs() < 1e-13);
    }

    #[test]
    fn test_full_step_in_cooldown() {
        let mut ed = event_only_data(4, vec![], vec![TEvent::new(0)]);
        ed.jet_mut()[..5].copy_from_slice(&[0.05, -0.6, 1.0, 0.0, 0.0]);
        ed.te_cooldowns[0] = Some(Cooldown {
            t_trigger: 0.0,
            duration: 2.0,
        });
        ed.detect_events(0.0, 1.0, 1e-14);
        assert!(ed.detected_terminal().is_empty());
    }

    #[test]
    fn test_cooldown_pruning() {
        let mut ed = event_only_data(4, vec![], vec![TEvent::new(0)]);
        ed.te_cooldowns[0] = Some(Cooldown {
            t_trigger: 1.0,
            duration: 0.5,
        });
        // Still overlapping the next step.
        ed.prune_cooldowns(1.2, 0.1);
        assert!(ed.te_cooldowns[0].is_some());
        // Fully behind the step.
        ed.prune_cooldowns(2.0, 0.1);
        assert!(ed.te_cooldowns[0].is_none());
    }

    #[test]
    fn test_multi_root_flag() {
        // Roots at 0.45 and 0.55 with an explicit cooldown wide enough to
        // cover both: the probe points land on the same sign.
        let mut ed = event_only_data(4, vec![], vec![TEvent::new(0).with_cooldown(0.3)]);
        ed.jet_mut()[..5].copy_from_slice(&[0.2475, -1.0, 1.0, 0.0, 0.0]);
        ed.detect_events(0.0, 1.0, 1e-14);

        assert_eq!(ed.detected_terminal().len(), 2);
        assert!(ed.detected_terminal().iter().all(|ev| ev.multi_roots));
    }

    #[test]
    fn test_zero_step_skips() {
        let mut ed = event_only_data(4, vec![NtEvent::new(0)], vec![]);
        ed.jet_mut()[..5].copy_from_slice(&[0.1875, -1.0, 1.0, 0.0, 0.0]);
        ed.detect_events(0.0, 0.0, 1e-14);
        assert!(ed.detected_nonterminal().is_empty());

        ed.detect_events(0.0, f64::NAN, 1e-14);
        assert!(ed.detected_nonterminal().is_empty());
    }

    #[test]
    fn test_order_too_low() {
        let err = EventData::<f64>::new(vec![], vec![NtEvent::new(0)], 1, 1).unwrap_err();
        assert!(matches!(err, TalariaError::OrderTooLow { order: 1 }));
    }

    #[test]
    fn test_checkpoint_roundtrip() {
        let mut ed = event_only_data(
            4,
            vec![NtEvent::new(1).with_direction(EventDirection::Negative)],
            vec![TEvent::new(0).with_cooldown(0.25)],
        );
        ed.jet_mut().copy_from_slice(&[
            0.1875, -1.0, 1.0, 0.0, 0.0, //
            1.0, 2.0, 3.0, 4.0, 5.0,
        ]);
        ed.te_cooldowns[0] = Some(Cooldown {
            t_trigger: 0.5,
            duration: 0.1,
        });
        ed.detect_events(0.0, 1.0, 1e-14);
        let depth = ed.cache_depth();
        assert!(depth > 0);

        let json = serde_json::to_string(&ed.checkpoint()).unwrap();
        let ck: EventCheckpoint<f64> = serde_json::from_str(&json).unwrap();
        let restored = EventData::restore(ck).unwrap();

        assert_eq!(restored.jet(), ed.jet());
        assert_eq!(restored.cooldowns(), ed.cooldowns());
        assert_eq!(restored.cache_depth(), depth);
        assert_eq!(restored.n_terminal(), 1);
        assert_eq!(restored.n_nonterminal(), 1);
        assert_eq!(restored.t_events()[0].cooldown(), Some(0.25));
        assert_eq!(
            restored.nt_events()[0].direction(),
            EventDirection::Negative
        );
    }

    #[test]
    fn test_checkpoint_jet_mismatch() {
        let ed = event_only_data(4, vec![NtEvent::new(0)], vec![]);
        let mut ck = ed.checkpoint();
        ck.ev_jet.pop();
        assert!(matches!(
            EventData::restore(ck),
            Err(TalariaError::InvalidCheckpoint { .. })
        ));
    }
}
