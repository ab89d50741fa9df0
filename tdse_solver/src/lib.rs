#![warn(clippy::pedantic)]

pub mod distribution;
pub mod error;
pub mod grid;
pub mod laplacian;
pub mod measurement;
pub mod potential;
pub mod solvers;
pub mod sparse;
pub mod system;
pub mod units;
pub mod wavefunction;

pub use error::{ConfigurationError, LengthError, TdseError, TdseResult};
pub use grid::{create_grid, BoundaryCondition, Grid, GridAxis};
pub use measurement::{EnergyEstimate, EnergyMode};
pub use solvers::{create_integrator, IntegrationResult, Integrator, IntegratorConfig, StrategyKind};

#[cfg(test)]
mod tests {
    use std::f64::consts::{PI, TAU};

    use ndarray::{linalg::Dot, Array1, Array2};
    use num_complex::Complex;

    use crate::{
        distribution::random_state,
        error::{ConfigurationError, LengthError, TdseError},
        grid::{create_grid, BoundaryCondition, Grid},
        measurement::{norm, EnergyEstimate, EnergyMode},
        potential::combine_potentials,
        solvers::{create_integrator, IntegratorConfig, StrategyKind},
        sparse::BandedArray,
        system::{kinetic_factor, StencilHamiltonian},
        wavefunction::{gaussian_packet, plane_wave},
    };

    const SIZE: usize = 150;
    const EXTENT: f64 = 10.0;
    const MASS: f64 = 0.5;
    const DELTA_TAU: f64 = 0.0003;

    fn periodic_grid() -> Grid {
        Grid::one_dimensional(SIZE, EXTENT, BoundaryCondition::Periodic).unwrap()
    }

    fn random_matrix(shape: [usize; 2]) -> Array2<Complex<f64>> {
        random_state(&mut rand::thread_rng(), shape[0] * shape[1])
            .into_shape(shape)
            .unwrap()
    }

    fn assert_close(expected: &Array2<Complex<f64>>, actual: &Array2<Complex<f64>>) {
        assert_eq!(expected.shape(), actual.shape());
        for (e, a) in expected.iter().zip(actual.iter()) {
            assert!((e - a).norm() < 1e-8 * (1.0 + e.norm()), "{e} != {a}");
        }
    }

    fn energy_mode(strategy: StrategyKind) -> EnergyMode {
        if strategy.supports_fast_energy() {
            EnergyMode::Fast
        } else {
            EnergyMode::Direct
        }
    }

    #[test]
    fn test_banded_dot_product() {
        let shape = [10, 100];
        let full = random_matrix(shape);
        let banded = BandedArray::from_dense(&full);
        let state = random_state(&mut rand::thread_rng(), shape[1]);

        let expected = full.dot(&state);
        let actual = banded.dot(&state);
        assert_eq!(expected.len(), actual.len());
        for i in 0..shape[0] {
            assert!((expected[i] - actual[i]).norm() < 1e-8);
        }
    }

    #[test]
    fn test_banded_matrix_product() {
        for n in [1, 4, 17] {
            let (a, b) = (random_matrix([n, n]), random_matrix([n, n]));
            let product = BandedArray::from_dense(&a).dot(&BandedArray::from_dense(&b));
            assert_close(&a.dot(&b), &product.to_dense());
        }

        // A periodic tridiagonal matrix times itself stays banded
        let grid = Grid::one_dimensional(9, 1.0, BoundaryCondition::Periodic).unwrap();
        let laplacian = crate::laplacian::StencilLaplacian::new(&grid).to_banded();
        let squared = laplacian.dot(&laplacian);
        assert_eq!(squared.n_offsets(), 5);
        let dense = laplacian.to_dense();
        assert_close(&dense.dot(&dense), &squared.to_dense());
    }

    #[test]
    fn test_banded_powi_and_add() {
        let n = 6;
        let dense = random_matrix([n, n]).mapv(|a| a * 0.5);
        let banded = BandedArray::from_dense(&dense);

        assert_close(&Array2::eye(n), &banded.powi(0).to_dense());
        let mut expected: Array2<Complex<f64>> = Array2::eye(n);
        for _ in 0..5 {
            expected = expected.dot(&dense);
        }
        assert_close(&expected, &banded.powi(5).to_dense());

        let diagonal = BandedArray::from_diagonal(&Array1::from_elem(n, Complex::from(2.0)));
        let triplets = BandedArray::from_triplets(
            [n, n],
            [(0, n - 1, Complex::from(1.0)), (0, n - 1, Complex::from(1.0))],
        );
        let sum = &diagonal + &triplets;
        let identity: Array2<Complex<f64>> = Array2::eye(n);
        let mut expected = identity.mapv(|a| a * 2.0);
        expected[[0, n - 1]] = Complex::from(2.0);
        assert_close(&expected, &sum.to_dense());
        assert_close(&expected.mapv(|a| a * 3.0), &sum.scaled(Complex::from(3.0)).to_dense());
    }

    #[test]
    #[allow(clippy::cast_precision_loss)]
    fn test_free_plane_wave() {
        let grid = periodic_grid();
        let k = TAU / EXTENT;
        let initial = plane_wave(&grid, &[k]).unwrap();
        let modulus = (1.0 / (grid.n_points() as f64 * grid.cell_volume())).sqrt();
        // The kinetic factor is negative, so is the energy of a free wave
        let expected_energy = kinetic_factor(MASS) * k * k;

        for strategy in StrategyKind::ALL {
            let config = IntegratorConfig::new(strategy, DELTA_TAU, 100, MASS)
                .with_energy_mode(energy_mode(strategy));
            let mut integrator =
                create_integrator(config, &grid, Array1::zeros(grid.n_points())).unwrap();

            let mut state = initial.clone();
            for _ in 0..5 {
                let result = integrator.integrate(state).unwrap();
                assert!(result.norm_deviation.abs() < 1e-5, "{strategy:?}");
                let energy = result.energy.unwrap().energy;
                assert!(
                    (energy - expected_energy).abs() < 1e-2 * expected_energy.abs(),
                    "{strategy:?}: {energy} != {expected_energy}"
                );
                assert!((result.elapsed_tau - 100.0 * DELTA_TAU).abs() < 1e-12);
                state = result.state;
            }
            for a in &state {
                assert!((a.norm() - modulus).abs() < 1e-6 * modulus, "{strategy:?}");
            }
        }
    }

    #[test]
    fn test_rk4_conserves_norm() {
        let grid = periodic_grid();
        let initial = gaussian_packet(&grid, &[3.0], &[0.8], &[TAU * 4.0 / EXTENT]).unwrap();
        let potential = grid.coordinates(0).mapv(|x| 0.2 * (x - 5.0) * (x - 5.0));

        for strategy in [
            StrategyKind::StepwiseRK4,
            StrategyKind::BatchedMatrixExponentialRK4,
            StrategyKind::LiveRK4,
        ] {
            let config = IntegratorConfig::new(strategy, DELTA_TAU, 100, MASS);
            let mut integrator = create_integrator(config, &grid, potential.clone()).unwrap();
            let result = integrator.integrate(initial.clone()).unwrap();
            assert!(result.norm_deviation.abs() < 1e-6, "{strategy:?}");
            assert!((norm(&result.state, grid.cell_volume()) - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_batched_and_live_agree_on_barrier() {
        let grid = periodic_grid();
        let barrier = grid
            .coordinates(0)
            .mapv(|x| if (4.5..5.5).contains(&x) { 5.0 } else { 0.0 });
        let initial = gaussian_packet(&grid, &[2.5], &[0.7], &[TAU * 8.0 / EXTENT]).unwrap();

        let mut integrators = [
            StrategyKind::BatchedMatrixExponentialRK4,
            StrategyKind::LiveRK4,
        ]
        .map(|strategy| {
            let config = IntegratorConfig::new(strategy, DELTA_TAU, 50, MASS);
            create_integrator(config, &grid, barrier.clone()).unwrap()
        });

        let mut states = [initial.clone(), initial];
        for _ in 0..4 {
            for (integrator, state) in integrators.iter_mut().zip(states.iter_mut()) {
                *state = integrator.integrate(state.clone()).unwrap().state;
            }
        }
        for (a, b) in states[0].iter().zip(states[1].iter()) {
            assert!((a - b).norm() < 1e-4);
        }
    }

    #[test]
    fn test_open_boundary_packet_at_rest() {
        let grid = Grid::one_dimensional(SIZE, EXTENT, BoundaryCondition::Open).unwrap();
        let walls = grid
            .coordinates(0)
            .mapv(|x| if x < 0.7 || x > EXTENT - 0.7 { 20.0 } else { 0.0 });
        let offset = Array1::from_elem(grid.n_points(), -3.0);
        let potential = combine_potentials(&[walls, offset], true).unwrap();
        let initial = gaussian_packet(&grid, &[EXTENT / 2.0], &[0.3], &[0.0]).unwrap();

        for strategy in StrategyKind::ALL {
            let config = IntegratorConfig::new(strategy, DELTA_TAU, 20, MASS);
            let mut integrator = create_integrator(config, &grid, potential.clone()).unwrap();
            let mut state = initial.clone();
            for _ in 0..10 {
                let result = integrator.integrate(state).unwrap();
                assert!(result.norm_deviation.abs() < 0.05, "{strategy:?}");
                state = result.state;
            }
        }
    }

    #[test]
    #[allow(clippy::cast_precision_loss)]
    fn test_square_well_ground_state() {
        let size = 201;
        let grid = Grid::one_dimensional(size, 4.0, BoundaryCondition::Open).unwrap();
        let width = (size - 1) as f64 * grid.spacing(0);
        let mass = 1.3;
        let expected = kinetic_factor(mass) * PI * PI / (width * width);

        let state = Array1::from_shape_fn(size, |i| {
            Complex::from((PI * i as f64 / (size - 1) as f64).sin())
        });
        let hamiltonian = StencilHamiltonian::new(&grid, mass, Array1::zeros(size)).unwrap();
        let direct = EnergyEstimate::direct(&hamiltonian, &state).unwrap();
        assert!((direct.energy - expected).abs() < 1e-3 * expected.abs());

        let config = IntegratorConfig::new(StrategyKind::StepwiseRK4, 1e-4, 50, mass)
            .with_energy_mode(EnergyMode::Direct);
        let mut integrator = create_integrator(config, &grid, Array1::zeros(size)).unwrap();
        let result = integrator.integrate(state).unwrap();
        let energy = result.energy.unwrap().energy;
        assert!((energy - expected).abs() < 1e-3 * expected.abs());
    }

    #[test]
    fn test_fast_and_direct_energy_agree() {
        let grid = periodic_grid();
        let potential = grid.coordinates(0).mapv(|x| 0.5 * (x - 5.0) * (x - 5.0));
        let initial = gaussian_packet(&grid, &[4.0], &[1.0], &[TAU * 3.0 / EXTENT]).unwrap();

        for strategy in [
            StrategyKind::StepwiseRK4,
            StrategyKind::BatchedMatrixExponentialRK4,
            StrategyKind::LiveRK4,
        ] {
            let [mut fast, mut direct] = [EnergyMode::Fast, EnergyMode::Direct].map(|mode| {
                let config =
                    IntegratorConfig::new(strategy, DELTA_TAU, 30, MASS).with_energy_mode(mode);
                create_integrator(config, &grid, potential.clone()).unwrap()
            });
            let fast = fast.integrate(initial.clone()).unwrap().energy.unwrap();
            let direct = direct.integrate(initial.clone()).unwrap().energy.unwrap();

            assert!(
                (fast.energy - direct.energy).abs() < 1e-4 * direct.energy.abs(),
                "{strategy:?}: {} != {}",
                fast.energy,
                direct.energy
            );
            assert!(fast.imag_to_real_residual < 1e-6);
        }
    }

    #[test]
    fn test_two_dimensional_partitions() {
        let grid = create_grid(
            &[12, 16],
            &[3.0, 4.0],
            &[BoundaryCondition::Open, BoundaryCondition::Periodic],
        )
        .unwrap();
        let boundaries = grid.outer_axis_boundaries(&[6]);
        assert_eq!(boundaries, vec![6 * 16]);

        let initial = gaussian_packet(&grid, &[1.0, 2.0], &[0.3, 0.8], &[0.0, 0.0]).unwrap();
        let config = IntegratorConfig::new(StrategyKind::LiveRK4, 1e-3, 10, 1.0)
            .with_energy_mode(EnergyMode::Fast)
            .with_partition_boundaries(boundaries);
        let mut integrator =
            create_integrator(config, &grid, Array1::zeros(grid.n_points())).unwrap();

        let result = integrator.integrate(initial).unwrap();
        let fractions = result.partitioned_norm_fractions.unwrap();
        assert_eq!(fractions.len(), 2);
        assert!((fractions.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        // The packet starts in the first band of rows
        assert!(fractions[0] > 0.99);
    }

    #[test]
    fn test_error_paths() {
        assert_eq!(
            create_grid(&[2], &[1.0], &[BoundaryCondition::Open]),
            Err(TdseError::Configuration(ConfigurationError::AxisTooSmall {
                axis: 0,
                size: 2
            }))
        );
        assert!(matches!(
            create_grid(&[10], &[0.0], &[BoundaryCondition::Open]),
            Err(TdseError::Configuration(
                ConfigurationError::NonPositiveSpacing { axis: 0, .. }
            ))
        ));

        let grid = periodic_grid();
        let config = IntegratorConfig::new(StrategyKind::BatchedMatrixExponentialRK4, 1e-3, 2, 1.0);
        let mut integrator =
            create_integrator(config, &grid, Array1::zeros(grid.n_points())).unwrap();
        assert!(matches!(
            integrator.integrate(Array1::zeros(SIZE - 1)),
            Err(TdseError::StateLength(LengthError {
                expected: SIZE,
                got: 149
            }))
        ));
        assert!(matches!(
            integrator.integrate(Array1::zeros(SIZE)),
            Err(TdseError::DegenerateNorm(_))
        ));
    }
}
