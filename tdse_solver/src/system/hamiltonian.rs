use ndarray::{Array1, Zip};
use num_complex::Complex;

use crate::{
    error::{ConfigurationError, TdseResult},
    grid::Grid,
    laplacian::StencilLaplacian,
    sparse::{BandedArray, Tensor},
    system::{kinetic_factor, SchrodingerSystem, MINUS_I},
};

/// The Hamiltonian evaluated directly from the finite-difference stencil.
///
/// Nothing is assembled up front; this is the form used by the step-by-step
/// strategies and the energy estimator. The matrix forms used by the other
/// strategies are assembled from here so that all of them share one stencil.
#[derive(Debug, Clone)]
pub struct StencilHamiltonian {
    laplacian: StencilLaplacian,
    kinetic_factor: f64,
    potential: Array1<f64>,
}

impl StencilHamiltonian {
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] if the potential does not match the grid
    pub fn new(grid: &Grid, mass: f64, potential: Array1<f64>) -> TdseResult<Self> {
        grid.check_potential(&potential)?;
        Ok(Self {
            laplacian: StencilLaplacian::new(grid),
            kinetic_factor: kinetic_factor(mass),
            potential,
        })
    }

    #[must_use]
    pub fn grid(&self) -> &Grid {
        self.laplacian.grid()
    }

    #[must_use]
    pub fn kinetic_factor(&self) -> f64 {
        self.kinetic_factor
    }

    /// The potential independent part of `F`, `-i * kinetic_factor * L`
    #[must_use]
    pub fn kinetic_matrix(&self) -> BandedArray<Complex<f64>> {
        self.laplacian
            .to_banded()
            .scaled(MINUS_I * self.kinetic_factor)
    }

    /// `-i diag(V)`
    #[must_use]
    pub fn potential_matrix(&self) -> BandedArray<Complex<f64>> {
        BandedArray::from_diagonal(&self.potential.mapv(|v| MINUS_I * v))
    }

    /// The full matrix `F`, such that `F.dot(phi) == get_derivative(phi)`
    #[must_use]
    pub fn evolution_matrix(&self) -> BandedArray<Complex<f64>> {
        &self.kinetic_matrix() + &self.potential_matrix()
    }
}

impl SchrodingerSystem for StencilHamiltonian {
    #[inline]
    fn n_points(&self) -> usize {
        self.potential.len()
    }

    #[inline]
    fn potential(&self) -> &Array1<f64> {
        &self.potential
    }

    fn set_potential(&mut self, potential: Array1<f64>) -> Result<(), ConfigurationError> {
        self.grid().check_potential(&potential)?;
        self.potential = potential;
        Ok(())
    }

    #[inline]
    fn apply_hamiltonian(&self, state: &Array1<Complex<f64>>) -> Array1<Complex<f64>> {
        let mut out = self.laplacian.apply(state);
        Zip::from(&mut out)
            .and(&self.potential)
            .and(state)
            .for_each(|o, &v, &s| *o = *o * self.kinetic_factor + s * v);
        out
    }
}

/// A precomputed kinetic matrix, recombined with the current potential on
/// every application.
///
/// Changing the potential costs nothing here, which is what a potential that
/// changes every frame needs.
#[derive(Debug, Clone)]
pub struct LiveMatrixHamiltonian<K = BandedArray<Complex<f64>>> {
    /// `kinetic_factor * L`, the kinetic part of H
    kinetic: K,
    potential: Array1<f64>,
    grid: Grid,
}

impl LiveMatrixHamiltonian<BandedArray<Complex<f64>>> {
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] if the potential does not match the grid
    pub fn new(grid: &Grid, mass: f64, potential: Array1<f64>) -> TdseResult<Self> {
        grid.check_potential(&potential)?;
        let kinetic = StencilLaplacian::new(grid)
            .to_banded()
            .scaled(Complex::from(kinetic_factor(mass)));
        Ok(Self {
            kinetic,
            potential,
            grid: grid.clone(),
        })
    }
}

impl<K: Tensor> LiveMatrixHamiltonian<K> {
    /// Use an already assembled kinetic operator, `kinetic_factor * L`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] if the potential does not match the grid
    pub fn from_kinetic(grid: &Grid, kinetic: K, potential: Array1<f64>) -> TdseResult<Self> {
        grid.check_potential(&potential)?;
        Ok(Self {
            kinetic,
            potential,
            grid: grid.clone(),
        })
    }

    #[must_use]
    pub fn kinetic(&self) -> &K {
        &self.kinetic
    }
}

impl<K: Tensor> SchrodingerSystem for LiveMatrixHamiltonian<K> {
    #[inline]
    fn n_points(&self) -> usize {
        self.potential.len()
    }

    #[inline]
    fn potential(&self) -> &Array1<f64> {
        &self.potential
    }

    fn set_potential(&mut self, potential: Array1<f64>) -> Result<(), ConfigurationError> {
        self.grid.check_potential(&potential)?;
        self.potential = potential;
        Ok(())
    }

    #[inline]
    fn apply_hamiltonian(&self, state: &Array1<Complex<f64>>) -> Array1<Complex<f64>> {
        let mut out = self.kinetic.dot(state);
        Zip::from(&mut out)
            .and(&self.potential)
            .and(state)
            .for_each(|o, &v, &s| *o += s * v);
        out
    }
}
