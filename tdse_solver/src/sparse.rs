use std::collections::BTreeMap;

use ndarray::{linalg::Dot, Array1, Array2};
use num_complex::Complex;
use num_traits::{One, Zero};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Anything that can be applied to a state vector.
pub trait Tensor: Dot<Array1<Complex<f64>>, Output = Array1<Complex<f64>>> {}

impl<T: Dot<Array1<Complex<f64>>, Output = Array1<Complex<f64>>>> Tensor for T {}

/// Represents an array, stored as a series of (offset) diagonals
/// Each diagonal stores elements M_{i+offset % `N_0`, i}
/// length of diagonals is shape[1]
///
/// Periodic couplings (`M_{0, N-1}` and friends) are ordinary diagonals in this
/// layout, so the Laplacian of a periodic grid stays banded.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BandedArray<T> {
    diagonals: Vec<Vec<T>>,
    offsets: Vec<usize>,
    shape: [usize; 2],
}

impl<T> BandedArray<T> {
    #[inline]
    #[must_use]
    pub fn shape(&self) -> [usize; 2] {
        self.shape
    }

    #[inline]
    #[must_use]
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// The number of stored diagonals
    #[inline]
    #[must_use]
    pub fn n_offsets(&self) -> usize {
        self.offsets.len()
    }

    fn from_map(map: BTreeMap<usize, Vec<T>>, shape: [usize; 2]) -> Self {
        let (offsets, diagonals) = map.into_iter().unzip();
        BandedArray {
            diagonals,
            offsets,
            shape,
        }
    }
}

impl<T: Copy> BandedArray<T> {
    #[must_use]
    pub fn from_dense(dense: &Array2<T>) -> Self {
        let offsets = (0..dense.shape()[0]).collect::<Vec<_>>();
        let diagonals = offsets
            .iter()
            .map(|o| {
                (0..dense.shape()[1])
                    .map(|i| dense[[(i + o) % dense.shape()[0], i]])
                    .collect::<Vec<_>>()
            })
            .collect();

        BandedArray {
            diagonals,
            offsets,
            shape: [dense.shape()[0], dense.shape()[1]],
        }
    }
}

impl<T: Zero + Copy> BandedArray<T> {
    /// Build from `(row, column, value)` entries, summing repeated entries.
    ///
    /// # Panics
    ///
    /// Will panic if an entry lies outside of shape
    #[must_use]
    pub fn from_triplets<I: IntoIterator<Item = (usize, usize, T)>>(
        shape: [usize; 2],
        entries: I,
    ) -> Self {
        let mut map = BTreeMap::<usize, Vec<T>>::new();
        for (row, col, value) in entries {
            assert!(row < shape[0] && col < shape[1]);
            let offset = (row + shape[0] - col % shape[0]) % shape[0];
            let diagonal = map
                .entry(offset)
                .or_insert_with(|| vec![T::zero(); shape[1]]);
            diagonal[col] = diagonal[col] + value;
        }
        Self::from_map(map, shape)
    }

    #[must_use]
    pub fn from_diagonal(diagonal: &Array1<T>) -> Self {
        let n = diagonal.len();
        BandedArray {
            diagonals: vec![diagonal.to_vec()],
            offsets: vec![0],
            shape: [n, n],
        }
    }

    #[must_use]
    pub fn to_dense(&self) -> Array2<T> {
        let mut out = Array2::zeros(self.shape);
        for (offset, diagonal) in self.offsets.iter().zip(self.diagonals.iter()) {
            for (i, d) in diagonal.iter().enumerate() {
                let row = (i + offset) % self.shape[0];
                out[[row, i]] = out[[row, i]] + *d;
            }
        }
        out
    }
}

impl<T: Zero + One + Copy> BandedArray<T> {
    #[must_use]
    pub fn identity(n: usize) -> Self {
        BandedArray {
            diagonals: vec![vec![T::one(); n]],
            offsets: vec![0],
            shape: [n, n],
        }
    }
}

impl<T: Copy + std::ops::Mul<Output = T>> BandedArray<T> {
    #[must_use]
    pub fn scaled(&self, factor: T) -> Self {
        BandedArray {
            diagonals: self
                .diagonals
                .iter()
                .map(|d| d.iter().map(|i| *i * factor).collect())
                .collect(),
            offsets: self.offsets.clone(),
            shape: self.shape,
        }
    }
}

impl<T: Zero + Copy> std::ops::Add for &BandedArray<T> {
    type Output = BandedArray<T>;

    /// # Panics
    ///
    /// Will panic if the shapes differ
    fn add(self, rhs: Self) -> Self::Output {
        assert_eq!(self.shape, rhs.shape);
        let mut map = BTreeMap::<usize, Vec<T>>::new();
        for (offset, diagonal) in self
            .offsets
            .iter()
            .zip(&self.diagonals)
            .chain(rhs.offsets.iter().zip(&rhs.diagonals))
        {
            let out = map
                .entry(*offset)
                .or_insert_with(|| vec![T::zero(); self.shape[1]]);
            out.iter_mut()
                .zip(diagonal)
                .for_each(|(o, d)| *o = *o + *d);
        }
        BandedArray::from_map(map, self.shape)
    }
}

impl<
        T: num_traits::Zero
            + Clone
            + Copy
            + std::ops::AddAssign<<T as std::ops::Mul>::Output>
            + std::ops::Mul,
    > Dot<Array1<T>> for BandedArray<T>
{
    type Output = Array1<T>;

    #[inline]
    fn dot(&self, rhs: &Array1<T>) -> Self::Output {
        assert!(self.shape[1] == rhs.len());
        assert!(self.offsets.len() == self.diagonals.len());

        let mut out = Array1::zeros(self.shape[0]);

        for (offset, diagonal) in self.offsets.iter().zip(self.diagonals.iter()) {
            let mut iter_elem = diagonal.iter().zip(rhs.iter());

            // Take the first N_0 - offset
            // These correspond to i=offset..N_0, j=0..N_0-offset
            (*offset..self.shape[0])
                .zip(&mut iter_elem)
                .for_each(|(i, (d, r))| out[i] += *d * *r);

            // In chunks of N_0, starting at N_0-offset
            // These correspond to i=0..N_0 and some j starting at N_0-offset
            iter_elem
                .zip((0..self.shape[0]).cycle())
                .for_each(|((d, r), i)| out[i] += *d * *r);
        }

        out
    }
}

impl<
        T: num_traits::Zero
            + Copy
            + std::ops::AddAssign<<T as std::ops::Mul>::Output>
            + std::ops::Mul,
    > Dot<BandedArray<T>> for BandedArray<T>
{
    type Output = BandedArray<T>;

    /// Product of two square banded arrays.
    ///
    /// Diagonal `a` of self times diagonal `b` of rhs lands on diagonal
    /// `(a + b) % N`, with `out[c] = lhs[(c + b) % N] * rhs[c]`.
    #[inline]
    fn dot(&self, rhs: &BandedArray<T>) -> Self::Output {
        let n = self.shape[0];
        assert!(self.shape == [n, n] && rhs.shape == [n, n]);

        let mut map = BTreeMap::<usize, Vec<T>>::new();
        for (rhs_offset, rhs_diagonal) in rhs.offsets.iter().zip(&rhs.diagonals) {
            for (lhs_offset, lhs_diagonal) in self.offsets.iter().zip(&self.diagonals) {
                let out = map
                    .entry((lhs_offset + rhs_offset) % n)
                    .or_insert_with(|| vec![T::zero(); n]);
                lhs_diagonal
                    .iter()
                    .cycle()
                    .skip(*rhs_offset)
                    .zip(rhs_diagonal)
                    .zip(out.iter_mut())
                    .for_each(|((l, r), o)| *o += *l * *r);
            }
        }
        BandedArray::from_map(map, self.shape)
    }
}

impl<
        T: num_traits::Zero
            + num_traits::One
            + Copy
            + std::ops::AddAssign<<T as std::ops::Mul>::Output>
            + std::ops::Mul,
    > BandedArray<T>
{
    /// Raise a square array to a non-negative integer power by repeated squaring.
    #[must_use]
    pub fn powi(&self, exponent: usize) -> BandedArray<T> {
        let mut out = BandedArray::identity(self.shape[0]);
        let mut base = self.clone();
        let mut remaining = exponent;
        while remaining > 0 {
            if remaining & 1 == 1 {
                out = out.dot(&base);
            }
            remaining >>= 1;
            if remaining > 0 {
                base = base.dot(&base);
            }
        }
        out
    }
}
