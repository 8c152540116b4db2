//! Event descriptors, detected-event records and cooldown bookkeeping.

use std::fmt;

use log::warn;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use crate::Scalar;

pub mod detection;

/// Direction filter for an event's zero crossings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventDirection {
    /// Trigger on crossings in either direction.
    #[default]
    Any,
    /// Trigger only when the event equation is increasing through zero.
    Positive,
    /// Trigger only when the event equation is decreasing through zero.
    Negative,
}

impl EventDirection {
    pub(crate) fn matches(self, d_sgn: i32) -> bool {
        match self {
            EventDirection::Any => true,
            EventDirection::Positive => d_sgn > 0,
            EventDirection::Negative => d_sgn < 0,
        }
    }
}

/// Callback for a detected non-terminal event: `(event time, derivative sign)`.
pub type NtCallback<T> = Box<dyn FnMut(T, i32)>;

/// Callback fired when a terminal event triggers:
/// `(state, event time, multiple roots suspected)`. Returning `false`
/// requests an end to propagation.
pub type TCallback<T> = Box<dyn FnMut(&mut [T], T, bool) -> bool>;

/// A non-terminal event: its callback is read-only and propagation
/// continues through the trigger.
#[derive(Serialize, Deserialize)]
#[serde(bound(deserialize = ""))]
pub struct NtEvent<T> {
    pub(crate) eq: usize,
    pub(crate) direction: EventDirection,
    #[serde(skip)]
    pub(crate) callback: Option<NtCallback<T>>,
}

impl<T: Scalar> NtEvent<T> {
    /// Event on equation `eq` of the system, with no direction filter.
    pub fn new(eq: usize) -> Self {
        Self {
            eq,
            direction: EventDirection::Any,
            callback: None,
        }
    }

    pub fn with_direction(mut self, direction: EventDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_callback(mut self, callback: impl FnMut(T, i32) + 'static) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }

    pub fn equation(&self) -> usize {
        self.eq
    }

    pub fn direction(&self) -> EventDirection {
        self.direction
    }

    /// Re-attach the callback, e.g. after a checkpoint restore.
    pub fn set_callback(&mut self, callback: impl FnMut(T, i32) + 'static) {
        self.callback = Some(Box::new(callback));
    }

    pub(crate) fn clone_descriptor(&self) -> Self {
        Self {
            eq: self.eq,
            direction: self.direction,
            callback: None,
        }
    }
}

impl<T> fmt::Debug for NtEvent<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NtEvent")
            .field("eq", &self.eq)
            .field("direction", &self.direction)
            .finish()
    }
}

/// A terminal event: its trigger ends the step and its callback may mutate
/// the state.
#[derive(Serialize, Deserialize)]
#[serde(bound(deserialize = "T: serde::Deserialize<'de>"))]
pub struct TEvent<T> {
    pub(crate) eq: usize,
    pub(crate) direction: EventDirection,
    /// Explicit cooldown; `None` means deduce it from the error bound and
    /// the derivative at the root.
    pub(crate) cooldown: Option<T>,
    #[serde(skip)]
    pub(crate) callback: Option<TCallback<T>>,
}

impl<T: Scalar> TEvent<T> {
    /// Event on equation `eq` of the system, with no direction filter and an
    /// automatically deduced cooldown.
    pub fn new(eq: usize) -> Self {
        Self {
            eq,
            direction: EventDirection::Any,
            cooldown: None,
            callback: None,
        }
    }

    pub fn with_direction(mut self, direction: EventDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_cooldown(mut self, cooldown: T) -> Self {
        self.cooldown = Some(cooldown);
        self
    }

    pub fn with_callback(mut self, callback: impl FnMut(&mut [T], T, bool) -> bool + 'static) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }

    pub fn equation(&self) -> usize {
        self.eq
    }

    pub fn direction(&self) -> EventDirection {
        self.direction
    }

    pub fn cooldown(&self) -> Option<T> {
        self.cooldown
    }

    /// Re-attach the callback, e.g. after a checkpoint restore.
    pub fn set_callback(&mut self, callback: impl FnMut(&mut [T], T, bool) -> bool + 'static) {
        self.callback = Some(Box::new(callback));
    }

    pub(crate) fn clone_descriptor(&self) -> Self {
        Self {
            eq: self.eq,
            direction: self.direction,
            cooldown: self.cooldown,
            callback: None,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for TEvent<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TEvent")
            .field("eq", &self.eq)
            .field("direction", &self.direction)
            .field("cooldown", &self.cooldown)
            .finish()
    }
}

/// A detected terminal event; `t` is relative to the step start and lies in
/// `[0, h)` (`(h, 0]` when integrating backward).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectedTEvent<T> {
    pub idx: usize,
    pub t: T,
    pub multi_roots: bool,
    pub d_sgn: i32,
    pub abs_der: T,
}

/// A detected non-terminal event; `t` is relative to the step start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectedNtEvent<T> {
    pub idx: usize,
    pub t: T,
    pub d_sgn: i32,
}

/// Cooldown record for a terminal event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cooldown<T> {
    /// Absolute time of the last trigger.
    pub t_trigger: T,
    /// Half-width of the suppression window around it.
    pub duration: T,
}

/// Default safety factor for [`deduce_cooldown`].
pub const DEFAULT_COOLDOWN_FACTOR: f64 = 10.0;

/// Deduce the cooldown of a terminal event from the maximum absolute error
/// on the Taylor series of its equation and the absolute value of the time
/// derivative at the zero, using the default safety factor.
pub fn deduce_cooldown<T: Scalar>(g_eps: T, abs_der: T) -> T {
    deduce_cooldown_with_factor(g_eps, abs_der, T::from(DEFAULT_COOLDOWN_FACTOR))
}

/// [`deduce_cooldown`] with an explicit safety factor.
///
/// The default factor of 10 bundles a bound of 2 from theory, 2 for very
/// small derivatives and 2 for event equations that flip around after the
/// trigger (e.g. collisions), plus margin.
pub fn deduce_cooldown_with_factor<T: Scalar>(g_eps: T, abs_der: T, factor: T) -> T {
    let ret = g_eps / abs_der * factor;

    if ret.is_finite() {
        ret
    } else {
        warn!(
            "deducing a cooldown of zero for a terminal event because the automatic deduction heuristic produced a non-finite value"
        );
        T::zero()
    }
}
