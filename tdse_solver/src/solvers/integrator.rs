use ndarray::Array1;
use num_complex::Complex;

use crate::{
    error::TdseResult,
    grid::Grid,
    measurement::{EnergyEstimate, EnergyMode, Normalizer},
    system::{LiveMatrixHamiltonian, SchrodingerSystem, StencilHamiltonian},
};

use super::{
    stepper::{EulerStepper, RK4Stepper, StepOutput, Stepper},
    IntegrationResult, Integrator, IntegratorConfig,
};

/// An integrator that repeatedly applies a [`Stepper`] to a [`SchrodingerSystem`].
#[derive(Debug, Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct SteppedIntegrator<S, T> {
    stepper: S,
    system: T,
    grid: Grid,
    config: IntegratorConfig,
    normalizer: Normalizer,
}

pub type ExplicitEulerIntegrator = SteppedIntegrator<EulerStepper, StencilHamiltonian>;
pub type StepwiseRK4Integrator = SteppedIntegrator<RK4Stepper, StencilHamiltonian>;
pub type LiveRK4Integrator = SteppedIntegrator<RK4Stepper, LiveMatrixHamiltonian>;

impl<S: Stepper, T: SchrodingerSystem> SteppedIntegrator<S, T> {
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`](crate::error::ConfigurationError) if the
    /// configuration is invalid
    pub fn from_parts(
        stepper: S,
        system: T,
        grid: &Grid,
        config: IntegratorConfig,
    ) -> TdseResult<Self> {
        config.validate()?;
        let normalizer = Normalizer::new(
            grid.cell_volume(),
            grid.n_points(),
            config.partition_boundaries.clone(),
        )?;
        Ok(Self {
            stepper,
            system,
            grid: grid.clone(),
            config,
            normalizer,
        })
    }

    #[must_use]
    pub fn system(&self) -> &T {
        &self.system
    }
}

impl SteppedIntegrator<EulerStepper, StencilHamiltonian> {
    /// # Errors
    ///
    /// See [`SteppedIntegrator::from_parts`]
    pub fn new(grid: &Grid, config: IntegratorConfig, potential: Array1<f64>) -> TdseResult<Self> {
        let system = StencilHamiltonian::new(grid, config.mass, potential)?;
        Self::from_parts(EulerStepper {}, system, grid, config)
    }
}

impl SteppedIntegrator<RK4Stepper, StencilHamiltonian> {
    /// # Errors
    ///
    /// See [`SteppedIntegrator::from_parts`]
    pub fn new(grid: &Grid, config: IntegratorConfig, potential: Array1<f64>) -> TdseResult<Self> {
        let system = StencilHamiltonian::new(grid, config.mass, potential)?;
        Self::from_parts(RK4Stepper {}, system, grid, config)
    }
}

impl SteppedIntegrator<RK4Stepper, LiveMatrixHamiltonian> {
    /// # Errors
    ///
    /// See [`SteppedIntegrator::from_parts`]
    pub fn new(grid: &Grid, config: IntegratorConfig, potential: Array1<f64>) -> TdseResult<Self> {
        let system = LiveMatrixHamiltonian::new(grid, config.mass, potential)?;
        Self::from_parts(RK4Stepper {}, system, grid, config)
    }
}

impl<S: Stepper, T: SchrodingerSystem> Integrator for SteppedIntegrator<S, T> {
    fn integrate(&mut self, state: Array1<Complex<f64>>) -> TdseResult<IntegrationResult> {
        self.grid.check_state(state.len())?;
        log::trace!("integrating {} steps of {}", self.config.steps, self.config.delta_tau);

        let mut current = state;
        // The state the last step started from, with its first stage
        let mut last_step = None;
        for _n in 0..self.config.steps {
            let StepOutput { state, first_stage } =
                self.stepper.step(&current, &self.system, self.config.delta_tau);
            last_step = Some((std::mem::replace(&mut current, state), first_stage));
        }

        let normalized = self.normalizer.measure(&current)?;
        let energy = match self.config.energy_mode {
            EnergyMode::Off => None,
            EnergyMode::Direct => Some(EnergyEstimate::direct(&self.system, &normalized.state)?),
            EnergyMode::Fast => last_step
                .map(|(previous, first_stage)| EnergyEstimate::fast(&previous, &first_stage))
                .transpose()?,
        };
        Ok(IntegrationResult::new(
            normalized,
            energy,
            self.config.elapsed_tau(),
        ))
    }

    fn set_potential(&mut self, potential: Array1<f64>) -> TdseResult<()> {
        Ok(self.system.set_potential(potential)?)
    }

    fn potential(&self) -> &Array1<f64> {
        self.system.potential()
    }

    fn grid(&self) -> &Grid {
        &self.grid
    }

    fn config(&self) -> &IntegratorConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use ndarray::Array1;
    use num_complex::Complex;

    use crate::{
        grid::{BoundaryCondition, Grid},
        measurement::{normalize, EnergyEstimate, EnergyMode},
        solvers::{Integrator, IntegratorConfig, StrategyKind},
        system::SchrodingerSystem,
    };

    use super::{ExplicitEulerIntegrator, LiveRK4Integrator, StepwiseRK4Integrator};

    fn grid() -> Grid {
        Grid::one_dimensional(64, 8.0, BoundaryCondition::Periodic).unwrap()
    }

    fn gaussian(grid: &Grid) -> Array1<Complex<f64>> {
        let raw = grid.coordinates(0).mapv(|x| {
            Complex::from_polar((-(x - 4.0) * (x - 4.0)).exp(), 2.0 * x)
        });
        normalize(&raw, grid.cell_volume()).unwrap()
    }

    #[test]
    fn test_euler_gains_norm() {
        let grid = grid();
        let config = IntegratorConfig::new(StrategyKind::ExplicitEuler, 1e-4, 20, 1.0);
        let mut integrator =
            ExplicitEulerIntegrator::new(&grid, config, Array1::zeros(64)).unwrap();

        let result = integrator.integrate(gaussian(&grid)).unwrap();
        // |1 - i lambda dt| > 1 for every mode
        assert!(result.norm_deviation > 0.0);
        assert!(result.norm_deviation < 1e-3);
        assert!(result.energy.is_none());
    }

    #[test]
    fn test_stepwise_and_live_rk4_agree() {
        let grid = grid();
        let potential = grid.coordinates(0).mapv(|x| 0.5 * (x - 4.0) * (x - 4.0));
        let config = IntegratorConfig::new(StrategyKind::StepwiseRK4, 1e-3, 25, 1.0)
            .with_energy_mode(EnergyMode::Direct);
        let mut stepwise =
            StepwiseRK4Integrator::new(&grid, config.clone(), potential.clone()).unwrap();
        let mut live = LiveRK4Integrator::new(&grid, config, potential).unwrap();

        let mut a = gaussian(&grid);
        let mut b = a.clone();
        for _ in 0..4 {
            let ra = stepwise.integrate(a).unwrap();
            let rb = live.integrate(b).unwrap();
            let (ea, eb) = (ra.energy.unwrap().energy, rb.energy.unwrap().energy);
            assert!((ea - eb).abs() < 1e-8 * ea.abs());
            a = ra.state;
            b = rb.state;
        }
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).norm() < 1e-9);
        }
    }

    #[test]
    fn test_fast_energy_lags_one_step() {
        let grid = grid();
        let potential = grid.coordinates(0).mapv(|x| 0.5 * (x - 4.0) * (x - 4.0));
        let config = IntegratorConfig::new(StrategyKind::StepwiseRK4, 1e-2, 1, 1.0)
            .with_energy_mode(EnergyMode::Fast);
        let mut integrator = StepwiseRK4Integrator::new(&grid, config, potential).unwrap();

        let initial = gaussian(&grid);
        let before = EnergyEstimate::direct(integrator.system(), &initial).unwrap();
        let result = integrator.integrate(initial).unwrap();
        let after = EnergyEstimate::direct(integrator.system(), &result.state).unwrap();

        let fast = result.energy.unwrap().energy;
        assert!((fast - before.energy).abs() < 1e-12 * before.energy.abs());
        assert!((fast - after.energy).abs() < 1e-3 * after.energy.abs());
    }

    #[test]
    fn test_set_potential() {
        let grid = grid();
        let config = IntegratorConfig::new(StrategyKind::LiveRK4, 1e-3, 1, 1.0);
        let mut integrator = LiveRK4Integrator::new(&grid, config, Array1::zeros(64)).unwrap();

        integrator.set_potential(Array1::from_elem(64, 2.0)).unwrap();
        assert_eq!(integrator.potential()[10], 2.0);
        assert_eq!(integrator.system().potential()[10], 2.0);

        assert!(integrator.set_potential(Array1::zeros(63)).is_err());
        assert_eq!(integrator.potential()[10], 2.0);
    }

    #[test]
    fn test_rejects_wrong_state_length() {
        let grid = grid();
        let config = IntegratorConfig::new(StrategyKind::StepwiseRK4, 1e-3, 1, 1.0);
        let mut integrator =
            StepwiseRK4Integrator::new(&grid, config, Array1::zeros(64)).unwrap();
        assert!(integrator.integrate(Array1::zeros(65)).is_err());
    }
}
