use thiserror::Error;

#[derive(Error, Debug)]
pub enum TalariaError {
    #[error("Taylor order must be at least 2, got {}", order)]
    OrderTooLow { order: usize },
    #[error(
        "Overflow detected while sizing the jet buffer for dimension {} with {} events at order {}",
        dim,
        n_events,
        order
    )]
    JetSizeOverflow {
        dim: usize,
        n_events: usize,
        order: usize,
    },
    #[error("Initial state has length {} but the system dimension is {}", len, dim)]
    StateDimensionMismatch { len: usize, dim: usize },
    #[error(
        "Event equation index {} is out of range for a system with {} event equations",
        eq,
        n
    )]
    EventEquationOutOfRange { eq: usize, n: usize },
    #[error("Tolerance must be finite and positive, got {}", tol)]
    InvalidTolerance { tol: f64 },
    #[error("Maximum step size must be a non-zero number, got {}", max_dt)]
    InvalidMaxStep { max_dt: f64 },
    #[error("Non-finite Taylor coefficients detected at t = {}", t)]
    NonFiniteState { t: f64 },
    #[error(
        "Unable to deduce a finite timestep at t = {}; pass a finite maximum step size",
        t
    )]
    StepSizeUndetermined { t: f64 },
    #[error("Step size underflowed to zero at t = {}", t)]
    StepSizeTooSmall { t: f64 },
    #[error("Interpolation time {} is not within the last step", t)]
    InterpolationOutsideStep { t: f64 },
    #[error("Interpolation requested before any step was taken")]
    InterpolationBeforeFirstStep,
    #[error("Propagation target must be finite, got {}", t)]
    NonFiniteTimeTarget { t: f64 },
    #[error("Invalid checkpoint: {}", e)]
    InvalidCheckpoint { e: String },
}
