use std::{f64::consts::TAU, hint::black_box, time::Instant};

use ndarray::Array1;
use num_complex::Complex;
use rand::Rng;
use tdse_solver::{
    create_integrator,
    wavefunction::{gaussian_packet, round_wave_number},
    BoundaryCondition, EnergyMode, Grid, IntegratorConfig, StrategyKind, TdseResult,
};

const SIZE: usize = 150;
const EXTENT: f64 = 10.0;
const MASS: f64 = 0.5;
const DELTA_TAU: f64 = 0.0003;
const STEPS: usize = 100;
const FRAMES: usize = 50;

fn barrier(grid: &Grid, height: f64) -> Array1<f64> {
    grid.coordinates(0)
        .mapv(|x| if (4.5..5.5).contains(&x) { height } else { 0.0 })
}

/// Integrate `FRAMES` calls, optionally replacing the potential before each one.
fn run(strategy: StrategyKind, grid: &Grid, varying_potential: bool) -> TdseResult<()> {
    let energy_mode = if strategy.supports_fast_energy() {
        EnergyMode::Fast
    } else {
        EnergyMode::Direct
    };
    let config = IntegratorConfig::new(strategy, DELTA_TAU, STEPS, MASS)
        .with_energy_mode(energy_mode)
        .with_partition_boundaries(vec![SIZE / 2]);
    let k = round_wave_number(2.0 * TAU / EXTENT, EXTENT);
    let mut state = gaussian_packet(grid, &[2.5], &[0.7], &[k])?;

    let mut rng = rand::thread_rng();
    let start = Instant::now();
    let mut integrator = create_integrator(config, grid, barrier(grid, 5.0))?;
    let mut energy = None;
    let mut worst_deviation = 0f64;
    for _frame in 0..FRAMES {
        if varying_potential {
            integrator.set_potential(barrier(grid, rng.gen_range(4.0..6.0)))?;
        }
        let result = integrator.integrate(state)?;
        worst_deviation = worst_deviation.max(result.norm_deviation.abs());
        energy = result.energy;
        state = result.state;
    }
    let elapsed = start.elapsed();

    let right = state
        .iter()
        .skip(SIZE / 2)
        .map(Complex::norm_sqr)
        .sum::<f64>()
        * grid.cell_volume();
    black_box(&state);
    log::info!(
        "{strategy:?} (varying potential: {varying_potential}): {elapsed:?} for {FRAMES} x {STEPS} steps, \
         energy {:?}, worst norm deviation {worst_deviation:.2e}, right half {right:.4}",
        energy.map(|e| e.energy)
    );
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let grid = match Grid::one_dimensional(SIZE, EXTENT, BoundaryCondition::Periodic) {
        Ok(grid) => grid,
        Err(error) => {
            log::error!("{error}");
            return;
        }
    };
    for varying_potential in [false, true] {
        for strategy in StrategyKind::ALL {
            if let Err(error) = run(strategy, &grid, varying_potential) {
                log::error!("{strategy:?} failed: {error}");
            }
        }
    }
}
