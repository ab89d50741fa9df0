use ndarray::{Array1, Zip};
use num_complex::Complex;

use crate::system::SchrodingerSystem;

/// The result of a single elementary step
pub struct StepOutput {
    pub state: Array1<Complex<f64>>,
    /// `k1 = F(state)` evaluated on the state the step started from
    pub first_stage: Array1<Complex<f64>>,
}

/// Advances a state by a single elementary time step `dt`
pub trait Stepper {
    fn step<T: SchrodingerSystem>(
        &self,
        state: &Array1<Complex<f64>>,
        system: &T,
        dt: f64,
    ) -> StepOutput;
}

// perform the operation `a + v * b`
#[inline]
fn array_step(a: &Array1<Complex<f64>>, v: f64, b: &Array1<Complex<f64>>) -> Array1<Complex<f64>> {
    Zip::from(a).and(b).map_collect(|ak, bk| ak + bk * v)
}

#[derive(Default, Debug, Clone, Copy)]
#[allow(clippy::module_name_repetitions)]
pub struct EulerStepper {}

impl Stepper for EulerStepper {
    fn step<T: SchrodingerSystem>(
        &self,
        state: &Array1<Complex<f64>>,
        system: &T,
        dt: f64,
    ) -> StepOutput {
        // The explicit euler method
        // Y_n+1 = Y_n + F(Y_n) dt
        // cheap, but amplifies every mode slightly, and diverges for large dt
        let first_stage = system.get_derivative(state);
        StepOutput {
            state: array_step(state, dt, &first_stage),
            first_stage,
        }
    }
}

#[derive(Default, Debug, Clone, Copy)]
#[allow(clippy::module_name_repetitions)]
pub struct RK4Stepper {}

impl Stepper for RK4Stepper {
    fn step<T: SchrodingerSystem>(
        &self,
        state: &Array1<Complex<f64>>,
        system: &T,
        dt: f64,
    ) -> StepOutput {
        // k1 = F(Y_n)
        // k2 = F(Y_n + k1 dt / 2)
        // k3 = F(Y_n + k2 dt / 2)
        // k4 = F(Y_n + k3 dt)
        // Y_n+1 = Y_n + dt / 6 (k1 + 2 k2 + 2 k3 + k4)
        let half_dt = 0.5 * dt;
        let k1 = system.get_derivative(state);
        let k2 = system.get_derivative(&array_step(state, half_dt, &k1));
        let k3 = system.get_derivative(&array_step(state, half_dt, &k2));
        let k4 = system.get_derivative(&array_step(state, dt, &k3));

        let mut out = state.to_owned();
        Zip::from(&mut out)
            .and(&k1)
            .and(&k2)
            .and(&k3)
            .and(&k4)
            .for_each(|o, k1i, k2i, k3i, k4i| {
                *o += (k1i + (k2i + k3i) * 2.0 + k4i) * (dt / 6.0);
            });
        StepOutput {
            state: out,
            first_stage: k1,
        }
    }
}
