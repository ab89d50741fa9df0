use ndarray::Array1;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, LengthError, TdseResult};

/// Behaviour of the finite-difference stencil at the two ends of an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BoundaryCondition {
    /// Neighbours wrap around modulo the axis size.
    Periodic,
    /// The second derivative is clamped to zero on the two edge points.
    ///
    /// This is a crude approximation: a wavefunction reflecting off an open
    /// edge is not well described and the scheme eventually degrades.
    Open,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GridAxis {
    pub size: usize,
    pub extent: f64,
    pub boundary: BoundaryCondition,
}

impl GridAxis {
    #[must_use]
    pub fn new(size: usize, extent: f64, boundary: BoundaryCondition) -> Self {
        Self {
            size,
            extent,
            boundary,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    #[inline]
    #[must_use]
    pub fn spacing(&self) -> f64 {
        self.extent / self.size as f64
    }
}

/// A 1D or 2D regular grid.
///
/// Points are flattened in row-major order: axis 0 is the outer axis, the
/// last axis has stride 1.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Grid {
    axes: Vec<GridAxis>,
}

impl Grid {
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] if there are not 1 or 2 axes, an axis has
    /// fewer than 3 points, or an extent is not strictly positive.
    pub fn new(axes: Vec<GridAxis>) -> TdseResult<Self> {
        if !(1..=2).contains(&axes.len()) {
            return Err(ConfigurationError::AxisCount(axes.len()).into());
        }
        for (axis, a) in axes.iter().enumerate() {
            if a.size < 3 {
                return Err(ConfigurationError::AxisTooSmall { axis, size: a.size }.into());
            }
            if !(a.extent.is_finite() && a.extent > 0.0) {
                return Err(ConfigurationError::NonPositiveSpacing {
                    axis,
                    extent: a.extent,
                }
                .into());
            }
        }
        Ok(Self { axes })
    }

    /// # Errors
    ///
    /// See [`Grid::new`]
    pub fn one_dimensional(size: usize, extent: f64, boundary: BoundaryCondition) -> TdseResult<Self> {
        Self::new(vec![GridAxis::new(size, extent, boundary)])
    }

    /// # Errors
    ///
    /// See [`Grid::new`]
    pub fn two_dimensional(outer: GridAxis, inner: GridAxis) -> TdseResult<Self> {
        Self::new(vec![outer, inner])
    }

    #[inline]
    #[must_use]
    pub fn n_axes(&self) -> usize {
        self.axes.len()
    }

    #[inline]
    #[must_use]
    pub fn axes(&self) -> &[GridAxis] {
        &self.axes
    }

    #[must_use]
    pub fn shape(&self) -> Vec<usize> {
        self.axes.iter().map(|a| a.size).collect()
    }

    #[inline]
    #[must_use]
    pub fn n_points(&self) -> usize {
        self.axes.iter().map(|a| a.size).product()
    }

    /// # Panics
    ///
    /// Will panic if `axis` is out of range
    #[inline]
    #[must_use]
    pub fn spacing(&self, axis: usize) -> f64 {
        self.axes[axis].spacing()
    }

    /// Distance in the flattened array between neighbours along `axis`
    ///
    /// # Panics
    ///
    /// Will panic if `axis` is out of range
    #[must_use]
    pub fn stride(&self, axis: usize) -> usize {
        assert!(axis < self.axes.len());
        self.axes[axis + 1..].iter().map(|a| a.size).product()
    }

    /// Length, area or volume element of a single cell.
    #[must_use]
    pub fn cell_volume(&self) -> f64 {
        self.axes.iter().map(GridAxis::spacing).product()
    }

    /// Position of every cell along `axis`, starting at zero.
    ///
    /// # Panics
    ///
    /// Will panic if `axis` is out of range
    #[must_use]
    pub fn coordinates(&self, axis: usize) -> Array1<f64> {
        let spacing = self.spacing(axis);
        Array1::from_shape_fn(self.axes[axis].size, |i| {
            #[allow(clippy::cast_precision_loss)]
            let i = i as f64;
            i * spacing
        })
    }

    /// Turns indices along the outer axis into boundaries of the flattened state,
    /// so that each partition holds a band of whole rows.
    #[must_use]
    pub fn outer_axis_boundaries(&self, indices: &[usize]) -> Vec<usize> {
        let stride = self.stride(0);
        indices.iter().map(|i| i * stride).collect()
    }

    /// # Errors
    ///
    /// Returns a [`LengthError`] unless there is one amplitude per grid point
    pub fn check_state(&self, len: usize) -> Result<(), LengthError> {
        LengthError::check(self.n_points(), len)
    }

    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] unless there is one value per grid point
    pub fn check_potential(&self, potential: &Array1<f64>) -> Result<(), ConfigurationError> {
        LengthError::check(self.n_points(), potential.len())
            .map_err(ConfigurationError::PotentialLength)
    }
}

/// Builds a grid from parallel per-axis descriptions.
///
/// # Errors
///
/// Returns a [`ConfigurationError`] if the slices differ in length, or for any
/// of the reasons listed in [`Grid::new`].
pub fn create_grid(
    axis_sizes: &[usize],
    axis_extents: &[f64],
    axis_boundary_conditions: &[BoundaryCondition],
) -> TdseResult<Grid> {
    if axis_sizes.len() != axis_extents.len() || axis_sizes.len() != axis_boundary_conditions.len()
    {
        return Err(ConfigurationError::MismatchedAxes {
            sizes: axis_sizes.len(),
            extents: axis_extents.len(),
            boundaries: axis_boundary_conditions.len(),
        }
        .into());
    }
    Grid::new(
        axis_sizes
            .iter()
            .zip(axis_extents)
            .zip(axis_boundary_conditions)
            .map(|((&size, &extent), &boundary)| GridAxis::new(size, extent, boundary))
            .collect(),
    )
}
