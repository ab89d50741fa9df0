use ndarray::Array1;
use num_complex::Complex;

use crate::error::ConfigurationError;

pub mod hamiltonian;

pub use hamiltonian::{LiveMatrixHamiltonian, StencilHamiltonian};

pub(crate) const MINUS_I: Complex<f64> = Complex { re: 0f64, im: -1f64 };

/// `-1 / (2 mass)`, the factor in front of the (negative) second difference.
///
/// With this sign a free plane wave `exp(i k x)` has energy close to
/// `-k^2 / (2 mass)`.
#[inline]
#[must_use]
pub fn kinetic_factor(mass: f64) -> f64 {
    -1.0 / (2.0 * mass)
}

/// Represents the discretized Schrödinger equation
///
/// ```latex
/// d phi / d tau = F(phi) = -i H phi
/// ```
///
/// where `H phi = kinetic_factor * L(phi) + V phi`.
#[allow(clippy::module_name_repetitions)]
pub trait SchrodingerSystem {
    /// The total number of grid points
    fn n_points(&self) -> usize;

    fn potential(&self) -> &Array1<f64>;

    /// Replace the potential.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] unless there is one value per grid point
    fn set_potential(&mut self, potential: Array1<f64>) -> Result<(), ConfigurationError>;

    /// Get `H |phi>`
    fn apply_hamiltonian(&self, state: &Array1<Complex<f64>>) -> Array1<Complex<f64>>;

    /// Get `F(phi) = -i H |phi>`
    #[inline]
    fn get_derivative(&self, state: &Array1<Complex<f64>>) -> Array1<Complex<f64>> {
        let mut out = self.apply_hamiltonian(state);
        out.mapv_inplace(|h| h * MINUS_I);
        out
    }
}
