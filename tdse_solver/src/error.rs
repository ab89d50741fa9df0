//! Error types returned by the engine.
//!
//! All errors derive [`thiserror::Error`]. None of them is retried internally:
//! each one is recoverable only by reconfiguring the caller (a smaller time
//! step, another boundary condition, another strategy).

use thiserror::Error;

use crate::solvers::StrategyKind;

/// Returned when a state (or potential) does not have one entry per grid point.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("expected {expected} grid points, got an array of length {got}")]
pub struct LengthError {
    pub expected: usize,
    pub got: usize,
}

impl LengthError {
    pub(crate) fn check(expected: usize, got: usize) -> Result<(), Self> {
        (expected == got)
            .then_some(())
            .ok_or(Self { expected, got })
    }
}

/// Returned while building a grid or an integrator.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigurationError {
    #[error("grids must have 1 or 2 axes; got {0}")]
    AxisCount(usize),

    #[error("axis descriptions have different lengths: {sizes} sizes, {extents} extents, {boundaries} boundary conditions")]
    MismatchedAxes {
        sizes: usize,
        extents: usize,
        boundaries: usize,
    },

    #[error("axis {axis} must have at least 3 points; got {size}")]
    AxisTooSmall { axis: usize, size: usize },

    #[error("axis {axis} must have a positive, finite extent; got {extent}")]
    NonPositiveSpacing { axis: usize, extent: f64 },

    #[error("time step must be positive and finite; got {0}")]
    BadTimeStep(f64),

    #[error("mass must be positive and finite; got {0}")]
    BadMass(f64),

    #[error("at least one elementary step per call is required")]
    ZeroSteps,

    #[error("fast energy estimates are not available for the {0:?} strategy")]
    UnsupportedEnergyMode(StrategyKind),

    #[error("partition boundaries must be strictly increasing and inside (0, {n_points}); got {boundaries:?}")]
    BadPartition {
        boundaries: Vec<usize>,
        n_points: usize,
    },

    #[error("expected one value per axis ({expected}); got {got}")]
    AxisParameters { expected: usize, got: usize },

    #[error("packet width along axis {axis} must be positive and finite; got {width}")]
    NonPositiveWidth { axis: usize, width: f64 },

    #[error("potential length error: {0}")]
    PotentialLength(LengthError),
}

/// Returned from grid construction, integrators and measurements.
#[derive(Debug, Error, PartialEq)]
pub enum TdseError {
    /// [`ConfigurationError`]
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// The energy expectation picked up an imaginary part larger than 0.1% of
    /// its real part.
    #[error("non-physical complex energy: {re} + {im}i")]
    NonPhysicalEnergy { re: f64, im: f64 },

    /// The state passed to an integrator does not match its grid.
    #[error("state length error: {0}")]
    StateLength(#[from] LengthError),

    /// The state cannot be normalized.
    #[error("cannot normalize a state with norm {0}")]
    DegenerateNorm(f64),
}

pub type TdseResult<T> = Result<T, TdseError>;
