//! Builders for initial states.
//!
//! Every builder returns a state normalized with the grid's cell volume. Wave
//! numbers are used as given; pass them through [`round_wave_number`] first if
//! the state must be continuous across a periodic boundary.

use std::f64::consts::TAU;

use ndarray::Array1;
use num_complex::Complex;

use crate::{
    error::{ConfigurationError, LengthError, TdseError, TdseResult},
    grid::Grid,
    measurement::normalize,
};

fn check_axis_parameters(grid: &Grid, got: usize) -> Result<(), ConfigurationError> {
    if got == grid.n_axes() {
        Ok(())
    } else {
        Err(ConfigurationError::AxisParameters {
            expected: grid.n_axes(),
            got,
        })
    }
}

/// Evaluate `f(axis, x)` along every axis and take the product at each point
fn separable<F: Fn(usize, f64) -> Complex<f64>>(grid: &Grid, f: F) -> Array1<Complex<f64>> {
    Array1::from_shape_fn(grid.n_points(), |flat| {
        grid.axes()
            .iter()
            .enumerate()
            .map(|(axis, description)| {
                let index = (flat / grid.stride(axis)) % description.size;
                #[allow(clippy::cast_precision_loss)]
                let x = index as f64 * description.spacing();
                f(axis, x)
            })
            .product()
    })
}

/// Snap `wave_number` to the nearest multiple of `2 pi / extent`, rounding
/// half away from zero.
#[must_use]
pub fn round_wave_number(wave_number: f64, extent: f64) -> f64 {
    let fundamental = TAU / extent;
    let rounded = (wave_number / fundamental).round() * fundamental;
    if rounded != wave_number {
        log::debug!("rounded wave number {wave_number} to {rounded}");
    }
    rounded
}

/// `exp(i k . x)`, with one wave number per axis.
///
/// # Errors
///
/// Returns a [`ConfigurationError`] unless there is one wave number per axis
pub fn plane_wave(grid: &Grid, wave_numbers: &[f64]) -> TdseResult<Array1<Complex<f64>>> {
    check_axis_parameters(grid, wave_numbers.len())?;
    let raw = separable(grid, |axis, x| Complex::from_polar(1.0, wave_numbers[axis] * x));
    normalize(&raw, grid.cell_volume())
}

/// `exp(-sum ((x - c) / w)^2) exp(i k . x)`, with one center, width and wave
/// number per axis.
///
/// # Errors
///
/// Returns a [`ConfigurationError`] unless there is one of each parameter per
/// axis and every width is positive
pub fn gaussian_packet(
    grid: &Grid,
    centers: &[f64],
    widths: &[f64],
    wave_numbers: &[f64],
) -> TdseResult<Array1<Complex<f64>>> {
    check_axis_parameters(grid, centers.len())?;
    check_axis_parameters(grid, widths.len())?;
    check_axis_parameters(grid, wave_numbers.len())?;
    if let Some((axis, &width)) = widths
        .iter()
        .enumerate()
        .find(|(_, w)| !(w.is_finite() && **w > 0.0))
    {
        return Err(ConfigurationError::NonPositiveWidth { axis, width }.into());
    }

    let raw = separable(grid, |axis, x| {
        let distance = (x - centers[axis]) / widths[axis];
        Complex::from_polar((-distance * distance).exp(), wave_numbers[axis] * x)
    });
    normalize(&raw, grid.cell_volume())
}

/// Sum several states and normalize the result.
///
/// # Errors
///
/// Returns a [`TdseError::StateLength`] if the states differ in length, or
/// [`TdseError::DegenerateNorm`] if the sum vanishes
pub fn combine(states: &[Array1<Complex<f64>>], cell_volume: f64) -> TdseResult<Array1<Complex<f64>>> {
    let Some((first, rest)) = states.split_first() else {
        return Err(TdseError::DegenerateNorm(0.0));
    };
    let mut total = first.clone();
    for state in rest {
        LengthError::check(total.len(), state.len())?;
        total += state;
    }
    normalize(&total, cell_volume)
}
