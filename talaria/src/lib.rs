//! An adaptive Taylor-series ODE integrator with event detection.
//!
//! Each step expands the solution and the user's event equations into
//! Taylor polynomials, deduces a step size from the decay of the
//! coefficients, and locates every zero crossing of the event equations
//! inside the step: a cheap interval-arithmetic check excludes most events
//! outright, a Descartes branch-and-bound isolates the real roots of the
//! rest, and a bracketed refiner polishes them to machine precision.
//! Terminal events truncate the step and carry a cooldown so the same root
//! is not triggered twice; non-terminal events invoke read-only callbacks.
//!
//! Systems provide their Taylor coefficients through the
//! [`TaylorSystem`] trait; the `series` module has the recurrence helpers
//! for writing those by hand.
//!
//! ```
//! use nalgebra::DVector;
//! use talaria::ode_solver::test_models::pendulum::Pendulum;
//! use talaria::{NtEvent, TaylorBuilder};
//!
//! // Report every zero of the pendulum's velocity up to t = 1.5.
//! let event = NtEvent::new(0).with_callback(|t: f64, _| println!("v = 0 at t = {t}"));
//! let mut solver = TaylorBuilder::new()
//!     .nt_events(vec![event])
//!     .build(Pendulum::new(9.8, 1e-10), 0.0, DVector::from_vec(vec![-0.25, 0.0]))
//!     .unwrap();
//! solver.propagate_until(1.5).unwrap();
//! ```

pub mod errors;
pub mod event;
pub mod ode_solver;
pub mod poly;
pub mod root_finder;
pub mod scalar;
pub mod series;

pub use errors::TalariaError;
pub use event::detection::{EventCheckpoint, EventData, NativePolyOps, PolyOps};
pub use event::{
    deduce_cooldown, deduce_cooldown_with_factor, Cooldown, DetectedNtEvent, DetectedTEvent,
    EventDirection, NtEvent, TEvent,
};
pub use ode_solver::builder::TaylorBuilder;
pub use ode_solver::equations::TaylorSystem;
pub use ode_solver::taylor::{Statistics, StepOutcome, TaylorAdaptive};
pub use root_finder::{bracketed_root_find, BracketStatus};
pub use scalar::{IndexType, Scalar};
