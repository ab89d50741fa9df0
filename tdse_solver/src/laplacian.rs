use ndarray::Array1;
use num_complex::Complex;

use crate::{
    grid::{BoundaryCondition, Grid},
    sparse::BandedArray,
};

/// Neighbours of a point along one axis, or `None` if the stencil is clamped there.
#[inline]
fn neighbours(
    flat: usize,
    stride: usize,
    size: usize,
    boundary: BoundaryCondition,
) -> Option<(usize, usize)> {
    let position = (flat / stride) % size;
    let is_edge = position == 0 || position == size - 1;
    if is_edge && boundary == BoundaryCondition::Open {
        return None;
    }
    let previous = if position == 0 {
        flat + (size - 1) * stride
    } else {
        flat - stride
    };
    let next = if position == size - 1 {
        flat - (size - 1) * stride
    } else {
        flat + stride
    };
    Some((previous, next))
}

/// The (negative) second-difference operator on a grid.
///
/// Evaluates `(2 x[i] - x[i-1] - x[i+1]) / h^2` along every axis and sums the
/// contributions. On an open axis the two edge points get no contribution
/// from that axis: open boundaries are numerically risky for reflecting
/// wavefunctions.
#[derive(Debug, Clone)]
pub struct StencilLaplacian {
    grid: Grid,
}

impl StencilLaplacian {
    #[must_use]
    pub fn new(grid: &Grid) -> Self {
        Self { grid: grid.clone() }
    }

    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Apply the stencil directly to `x`.
    ///
    /// # Panics
    ///
    /// Will panic if `x` does not have one element per grid point
    #[must_use]
    pub fn apply(&self, x: &Array1<Complex<f64>>) -> Array1<Complex<f64>> {
        assert_eq!(x.len(), self.grid.n_points());
        let mut out = Array1::zeros(x.len());

        for (axis, description) in self.grid.axes().iter().enumerate() {
            let stride = self.grid.stride(axis);
            let inverse_h2 = description.spacing().powi(-2);
            for (flat, o) in out.iter_mut().enumerate() {
                if let Some((previous, next)) =
                    neighbours(flat, stride, description.size, description.boundary)
                {
                    *o += (2.0 * x[flat] - x[previous] - x[next]) * inverse_h2;
                }
            }
        }
        out
    }

    /// Assemble the N x N matrix equivalent to [`StencilLaplacian::apply`].
    #[must_use]
    pub fn to_banded(&self) -> BandedArray<Complex<f64>> {
        let n = self.grid.n_points();
        let mut entries = Vec::with_capacity(3 * n * self.grid.n_axes());

        for (axis, description) in self.grid.axes().iter().enumerate() {
            let stride = self.grid.stride(axis);
            let inverse_h2 = description.spacing().powi(-2);
            for flat in 0..n {
                if let Some((previous, next)) =
                    neighbours(flat, stride, description.size, description.boundary)
                {
                    entries.push((flat, flat, Complex::from(2.0 * inverse_h2)));
                    entries.push((flat, previous, Complex::from(-inverse_h2)));
                    entries.push((flat, next, Complex::from(-inverse_h2)));
                }
            }
        }
        BandedArray::from_triplets([n, n], entries)
    }
}
