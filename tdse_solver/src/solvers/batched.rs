use ndarray::{linalg::Dot, Array1};
use num_complex::Complex;

use crate::{
    error::TdseResult,
    grid::Grid,
    measurement::{EnergyEstimate, EnergyMode, Normalizer},
    sparse::BandedArray,
    system::{SchrodingerSystem, StencilHamiltonian},
};

use super::{IntegrationResult, Integrator, IntegratorConfig};

/// The operators shared by every call until the potential changes.
#[derive(Debug, Clone)]
struct BatchedOperators {
    /// `F`, such that `d phi / d tau = F phi`
    evolution: BandedArray<Complex<f64>>,
    /// `(I + H)^steps`
    propagator: BandedArray<Complex<f64>>,
}

impl BatchedOperators {
    fn build(hamiltonian: &StencilHamiltonian, config: &IntegratorConfig) -> Self {
        let evolution = hamiltonian.evolution_matrix();
        let n = evolution.shape()[0];
        let identity = BandedArray::identity(n);
        let scaled = evolution.scaled(Complex::from(config.delta_tau));

        // I + H = I + sF (I + sF / 2 (I + sF / 3 (I + sF / 4)))
        // which is RK4 applied to a linear system
        let mut nested = identity.clone();
        for order in (2..=4u32).rev() {
            let term = scaled.scaled(Complex::from(1.0 / f64::from(order)));
            nested = &identity + &term.dot(&nested);
        }
        let single_step = &identity + &scaled.dot(&nested);
        let propagator = single_step.powi(config.steps);

        log::debug!(
            "built batched propagator for {} steps: {} diagonals of length {n}",
            config.steps,
            propagator.n_offsets()
        );
        Self {
            evolution,
            propagator,
        }
    }
}

/// Advances the state with one precomputed matrix per call.
///
/// The propagator `(I + H)^steps` is built once and reused until the
/// potential changes, at which point it is rebuilt on the next call. Cheap
/// for many steps under a fixed potential, expensive when the potential
/// changes every call.
#[derive(Debug, Clone)]
pub struct BatchedMatrixExponentialRK4Integrator {
    hamiltonian: StencilHamiltonian,
    config: IntegratorConfig,
    normalizer: Normalizer,
    operators: Option<BatchedOperators>,
    rebuild_count: usize,
}

impl BatchedMatrixExponentialRK4Integrator {
    /// Build the integrator, assembling the propagator immediately.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`](crate::error::ConfigurationError) if the
    /// configuration is invalid or the potential does not match the grid
    pub fn new(grid: &Grid, config: IntegratorConfig, potential: Array1<f64>) -> TdseResult<Self> {
        config.validate()?;
        let hamiltonian = StencilHamiltonian::new(grid, config.mass, potential)?;
        let normalizer = Normalizer::new(
            grid.cell_volume(),
            grid.n_points(),
            config.partition_boundaries.clone(),
        )?;
        let operators = BatchedOperators::build(&hamiltonian, &config);
        Ok(Self {
            hamiltonian,
            config,
            normalizer,
            operators: Some(operators),
            rebuild_count: 1,
        })
    }

    /// Number of times the propagator has been assembled
    #[must_use]
    pub fn rebuild_count(&self) -> usize {
        self.rebuild_count
    }

    /// Whether the next call can reuse the current propagator
    #[must_use]
    pub fn is_cached(&self) -> bool {
        self.operators.is_some()
    }
}

impl Integrator for BatchedMatrixExponentialRK4Integrator {
    fn integrate(&mut self, state: Array1<Complex<f64>>) -> TdseResult<IntegrationResult> {
        self.grid().check_state(state.len())?;
        log::trace!("applying batched propagator for {} steps", self.config.steps);

        let (hamiltonian, config) = (&self.hamiltonian, &self.config);
        let rebuild_count = &mut self.rebuild_count;
        let operators = self.operators.get_or_insert_with(|| {
            *rebuild_count += 1;
            BatchedOperators::build(hamiltonian, config)
        });

        let raw = operators.propagator.dot(&state);
        let normalized = self.normalizer.measure(&raw)?;
        let energy = match self.config.energy_mode {
            EnergyMode::Off => None,
            EnergyMode::Direct => Some(EnergyEstimate::direct(
                &self.hamiltonian,
                &normalized.state,
            )?),
            EnergyMode::Fast => {
                let first_stage = operators.evolution.dot(&normalized.state);
                Some(EnergyEstimate::fast(&normalized.state, &first_stage)?)
            }
        };
        Ok(IntegrationResult::new(
            normalized,
            energy,
            self.config.elapsed_tau(),
        ))
    }

    fn set_potential(&mut self, potential: Array1<f64>) -> TdseResult<()> {
        self.hamiltonian.set_potential(potential)?;
        self.operators = None;
        Ok(())
    }

    fn potential(&self) -> &Array1<f64> {
        self.hamiltonian.potential()
    }

    fn grid(&self) -> &Grid {
        self.hamiltonian.grid()
    }

    fn config(&self) -> &IntegratorConfig {
        &self.config
    }
}
