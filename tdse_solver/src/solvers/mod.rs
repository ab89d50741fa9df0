use ndarray::Array1;
use num_complex::Complex;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    error::{ConfigurationError, TdseResult},
    grid::Grid,
    measurement::{EnergyEstimate, EnergyMode, NormalizedState},
};

pub mod batched;
pub mod integrator;
pub mod stepper;

pub use batched::BatchedMatrixExponentialRK4Integrator;
pub use integrator::{
    ExplicitEulerIntegrator, LiveRK4Integrator, SteppedIntegrator, StepwiseRK4Integrator,
};
pub use stepper::{EulerStepper, RK4Stepper, StepOutput, Stepper};

/// The available integration strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StrategyKind {
    /// First order explicit Euler, applying the stencil each step
    ExplicitEuler,
    /// Classical RK4, applying the stencil four times per step
    StepwiseRK4,
    /// A single precomputed banded propagator for a whole call
    BatchedMatrixExponentialRK4,
    /// RK4 with a precomputed kinetic matrix and the current potential
    LiveRK4,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 4] = [
        StrategyKind::ExplicitEuler,
        StrategyKind::StepwiseRK4,
        StrategyKind::BatchedMatrixExponentialRK4,
        StrategyKind::LiveRK4,
    ];

    /// Whether the strategy exposes the first RK4 stage needed by [`EnergyMode::Fast`]
    #[must_use]
    pub fn supports_fast_energy(self) -> bool {
        !matches!(self, StrategyKind::ExplicitEuler)
    }
}

/// Everything fixed when an integrator is created.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[allow(clippy::module_name_repetitions)]
pub struct IntegratorConfig {
    pub strategy: StrategyKind,
    /// The elementary time step
    pub delta_tau: f64,
    /// Elementary steps taken by each call to [`Integrator::integrate`]
    pub steps: usize,
    pub mass: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub energy_mode: EnergyMode,
    /// Cut points in the flattened state for [`IntegrationResult::partitioned_norm_fractions`]
    #[cfg_attr(feature = "serde", serde(default))]
    pub partition_boundaries: Option<Vec<usize>>,
}

impl IntegratorConfig {
    #[must_use]
    pub fn new(strategy: StrategyKind, delta_tau: f64, steps: usize, mass: f64) -> Self {
        Self {
            strategy,
            delta_tau,
            steps,
            mass,
            energy_mode: EnergyMode::Off,
            partition_boundaries: None,
        }
    }

    #[must_use]
    pub fn with_energy_mode(mut self, energy_mode: EnergyMode) -> Self {
        self.energy_mode = energy_mode;
        self
    }

    #[must_use]
    pub fn with_partition_boundaries(mut self, boundaries: Vec<usize>) -> Self {
        self.partition_boundaries = Some(boundaries);
        self
    }

    /// Time covered by a single call to [`Integrator::integrate`]
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn elapsed_tau(&self) -> f64 {
        self.delta_tau * self.steps as f64
    }

    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] if the time step or mass is not positive,
    /// no steps are requested, or fast energies are requested from explicit Euler
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !(self.delta_tau.is_finite() && self.delta_tau > 0.0) {
            return Err(ConfigurationError::BadTimeStep(self.delta_tau));
        }
        if !(self.mass.is_finite() && self.mass > 0.0) {
            return Err(ConfigurationError::BadMass(self.mass));
        }
        if self.steps == 0 {
            return Err(ConfigurationError::ZeroSteps);
        }
        if self.energy_mode == EnergyMode::Fast && !self.strategy.supports_fast_energy() {
            return Err(ConfigurationError::UnsupportedEnergyMode(self.strategy));
        }
        Ok(())
    }
}

/// The outcome of a single call to [`Integrator::integrate`]
#[derive(Debug, Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct IntegrationResult {
    /// The unit norm state after the call
    pub state: Array1<Complex<f64>>,
    /// With [`EnergyMode::Fast`] the stepped strategies measure the state one
    /// step before `state`, the one the last RK4 step started from
    pub energy: Option<EnergyEstimate>,
    /// `norm - 1` of the state before it was renormalized
    pub norm_deviation: f64,
    pub elapsed_tau: f64,
    pub partitioned_norm_fractions: Option<Vec<f64>>,
}

impl IntegrationResult {
    pub(crate) fn new(
        normalized: NormalizedState,
        energy: Option<EnergyEstimate>,
        elapsed_tau: f64,
    ) -> Self {
        Self {
            state: normalized.state,
            energy,
            norm_deviation: normalized.norm_deviation,
            elapsed_tau,
            partitioned_norm_fractions: normalized.partitioned_norm_fractions,
        }
    }
}

/// Advances a wavefunction by a fixed number of elementary steps per call.
pub trait Integrator {
    /// Take `steps` elementary steps from `state`, then renormalize and measure.
    ///
    /// # Errors
    ///
    /// Returns an error if the state does not match the grid, cannot be
    /// normalized, or the requested energy is not physical
    fn integrate(&mut self, state: Array1<Complex<f64>>) -> TdseResult<IntegrationResult>;

    /// Replace the potential used by later calls.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] unless there is one value per grid point
    fn set_potential(&mut self, potential: Array1<f64>) -> TdseResult<()>;

    fn potential(&self) -> &Array1<f64>;

    fn grid(&self) -> &Grid;

    fn config(&self) -> &IntegratorConfig;
}

/// Build the integrator selected by `config.strategy`.
///
/// # Errors
///
/// Returns a [`ConfigurationError`] if the configuration is invalid or the
/// potential does not match the grid
pub fn create_integrator(
    config: IntegratorConfig,
    grid: &Grid,
    potential: Array1<f64>,
) -> TdseResult<Box<dyn Integrator + Send>> {
    log::debug!(
        "creating {:?} integrator on a {:?} grid, dt = {}, {} steps per call",
        config.strategy,
        grid.shape(),
        config.delta_tau,
        config.steps
    );
    Ok(match config.strategy {
        StrategyKind::ExplicitEuler => {
            Box::new(ExplicitEulerIntegrator::new(grid, config, potential)?)
        }
        StrategyKind::StepwiseRK4 => Box::new(StepwiseRK4Integrator::new(grid, config, potential)?),
        StrategyKind::BatchedMatrixExponentialRK4 => Box::new(
            BatchedMatrixExponentialRK4Integrator::new(grid, config, potential)?,
        ),
        StrategyKind::LiveRK4 => Box::new(LiveRK4Integrator::new(grid, config, potential)?),
    })
}
