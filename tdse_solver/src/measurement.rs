//! Probability and energy bookkeeping applied to every integrated state.

use ndarray::{s, Array1};
use ndarray_linalg::Norm;
use num_complex::Complex;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    error::{ConfigurationError, TdseError, TdseResult},
    system::SchrodingerSystem,
};

/// Relative size of the imaginary part of an energy above which it is rejected.
///
/// The bound is relative to `|Re E|`, so an energy whose real part is close to
/// zero is rejected on rounding noise alone. Shift the potential away from the
/// kinetic energy if that matters.
pub const ENERGY_IMAGINARY_TOLERANCE: f64 = 1e-3;

/// Norm drift above which a warning is logged
pub(crate) const NORM_DRIFT_WARNING: f64 = 1e-3;

/// `sqrt(sum |a|^2 dV)`
#[inline]
#[must_use]
pub fn norm(state: &Array1<Complex<f64>>, cell_volume: f64) -> f64 {
    state.norm_l2() * cell_volume.sqrt()
}

/// Return a copy of `state` with unit norm.
///
/// # Errors
///
/// Returns [`TdseError::DegenerateNorm`] if the norm is zero or not finite
pub fn normalize(state: &Array1<Complex<f64>>, cell_volume: f64) -> TdseResult<Array1<Complex<f64>>> {
    let state_norm = norm(state, cell_volume);
    if !(state_norm.is_finite() && state_norm > 0.0) {
        return Err(TdseError::DegenerateNorm(state_norm));
    }
    Ok(state / Complex::from(state_norm))
}

/// Fraction of the probability held by each contiguous slice of the
/// flattened state, cut at `boundaries`.
#[must_use]
pub fn partitioned_fractions(state: &Array1<Complex<f64>>, boundaries: &[usize]) -> Vec<f64> {
    let total = state.iter().map(num_complex::Complex::norm_sqr).sum::<f64>();
    let mut cuts = Vec::with_capacity(boundaries.len() + 2);
    cuts.push(0);
    cuts.extend_from_slice(boundaries);
    cuts.push(state.len());

    cuts.windows(2)
        .map(|w| {
            let mass = state
                .slice(s![w[0]..w[1]])
                .iter()
                .map(num_complex::Complex::norm_sqr)
                .sum::<f64>();
            if total > 0.0 {
                mass / total
            } else {
                0.0
            }
        })
        .collect()
}

/// Renormalizes states and reports how far they drifted.
#[derive(Debug, Clone)]
pub struct Normalizer {
    cell_volume: f64,
    partition_boundaries: Option<Vec<usize>>,
}

/// A unit norm state together with the drift of the state it came from.
#[derive(Debug, Clone)]
pub struct NormalizedState {
    pub state: Array1<Complex<f64>>,
    /// `norm(raw) - 1`
    pub norm_deviation: f64,
    pub partitioned_norm_fractions: Option<Vec<f64>>,
}

impl Normalizer {
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] unless the boundaries are strictly
    /// increasing and lie strictly inside the state
    pub fn new(
        cell_volume: f64,
        n_points: usize,
        partition_boundaries: Option<Vec<usize>>,
    ) -> Result<Self, ConfigurationError> {
        if let Some(boundaries) = &partition_boundaries {
            let increasing = boundaries.windows(2).all(|w| w[0] < w[1]);
            let inside = boundaries.iter().all(|b| (1..n_points).contains(b));
            if !(increasing && inside) {
                return Err(ConfigurationError::BadPartition {
                    boundaries: boundaries.clone(),
                    n_points,
                });
            }
        }
        Ok(Self {
            cell_volume,
            partition_boundaries,
        })
    }

    #[must_use]
    pub fn cell_volume(&self) -> f64 {
        self.cell_volume
    }

    /// # Errors
    ///
    /// Returns [`TdseError::DegenerateNorm`] if the raw state cannot be normalized.
    /// A large but finite drift is only reported.
    pub fn measure(&self, raw: &Array1<Complex<f64>>) -> TdseResult<NormalizedState> {
        let raw_norm = norm(raw, self.cell_volume);
        let state = normalize(raw, self.cell_volume)?;
        let norm_deviation = raw_norm - 1.0;
        if norm_deviation.abs() > NORM_DRIFT_WARNING {
            log::warn!("norm drifted by {norm_deviation:.3e} during integration");
        }
        let partitioned_norm_fractions = self
            .partition_boundaries
            .as_ref()
            .map(|b| partitioned_fractions(&state, b));
        Ok(NormalizedState {
            state,
            norm_deviation,
            partitioned_norm_fractions,
        })
    }
}

/// How the energy expectation is obtained after each integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EnergyMode {
    /// Do not compute the energy
    #[default]
    Off,
    /// Contract the state with a fresh application of the Hamiltonian
    Direct,
    /// Reuse the first stage `k1 = F(phi)` of the last RK4 step
    Fast,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EnergyEstimate {
    pub energy: f64,
    /// `|Im E| / |Re E|`
    pub imag_to_real_residual: f64,
}

impl EnergyEstimate {
    /// Build an estimate from `<phi|H|phi> / <phi|phi>`
    ///
    /// # Errors
    ///
    /// Returns [`TdseError::NonPhysicalEnergy`] if the imaginary part is larger
    /// than 0.1% of the real part
    pub fn from_complex(energy: Complex<f64>) -> TdseResult<Self> {
        if energy.im.abs() > ENERGY_IMAGINARY_TOLERANCE * energy.re.abs() {
            return Err(TdseError::NonPhysicalEnergy {
                re: energy.re,
                im: energy.im,
            });
        }
        let imag_to_real_residual = if energy.im == 0.0 {
            0.0
        } else {
            (energy.im / energy.re).abs()
        };
        Ok(Self {
            energy: energy.re,
            imag_to_real_residual,
        })
    }

    /// Contract `phi` with an already computed `H |phi>`.
    ///
    /// # Errors
    ///
    /// See [`EnergyEstimate::from_complex`]
    ///
    /// # Panics
    ///
    /// Will panic if the arrays differ in length
    pub fn from_hamiltonian_action(
        state: &Array1<Complex<f64>>,
        h_state: &Array1<Complex<f64>>,
    ) -> TdseResult<Self> {
        assert_eq!(state.len(), h_state.len());
        let conj_state = state.map(num_complex::Complex::conj);
        let expectation = conj_state.dot(h_state);
        // The cell volume cancels between <phi|H|phi> and <phi|phi>
        let norm_sqr = state.iter().map(num_complex::Complex::norm_sqr).sum::<f64>();
        if norm_sqr == 0.0 {
            return Err(TdseError::DegenerateNorm(0.0));
        }
        Self::from_complex(expectation / norm_sqr)
    }

    /// `E = Re(conj(phi) (kinetic_factor L(phi) + V phi))`
    ///
    /// # Errors
    ///
    /// See [`EnergyEstimate::from_complex`]
    pub fn direct<T: SchrodingerSystem>(system: &T, state: &Array1<Complex<f64>>) -> TdseResult<Self> {
        Self::from_hamiltonian_action(state, &system.apply_hamiltonian(state))
    }

    /// `E = Re(i conj(phi) k1)`, where `k1 = F(phi) = -i H phi` is the first
    /// stage of an RK4 step taken from `state`.
    ///
    /// # Errors
    ///
    /// See [`EnergyEstimate::from_complex`]
    pub fn fast(state: &Array1<Complex<f64>>, first_stage: &Array1<Complex<f64>>) -> TdseResult<Self> {
        let h_state = first_stage.map(|k| Complex::<f64>::i() * k);
        Self::from_hamiltonian_action(state, &h_state)
    }
}
