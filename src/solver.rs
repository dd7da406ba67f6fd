//! Dense eigendecomposition of the sweep Hamiltonians.
//!
//! Uses nalgebra's `SymmetricEigen` with a bounded iteration count so a
//! non-converging matrix is reported instead of spinning forever.

use std::cmp::Ordering;
use std::fmt;

use nalgebra::{DMatrix, DVector, SymmetricEigen};

use crate::Real;

/// Eigenvalues in ascending order with eigenvectors as matching columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum<T: Real> {
    pub eigenvalues:  DVector<T>,
    pub eigenvectors: DMatrix<T>,
}

impl<T: Real> Spectrum<T> {
    /// Sort an unordered eigen-decomposition into ascending order.
    pub fn sorted(eigenvalues: DVector<T>, eigenvectors: DMatrix<T>) -> Self {
        let n = eigenvalues.len();
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| {
            eigenvalues[a].partial_cmp(&eigenvalues[b]).unwrap_or(Ordering::Equal)
        });

        let values = DVector::from_iterator(n, order.iter().map(|&i| eigenvalues[i]));
        let vectors = DMatrix::from_fn(eigenvectors.nrows(), n, |r, c| eigenvectors[(r, order[c])]);
        Self { eigenvalues: values, eigenvectors: vectors }
    }

    pub fn dim(&self) -> usize {
        self.eigenvalues.len()
    }

    pub fn ground_energy(&self) -> T {
        self.eigenvalues[0]
    }

    /// E_1 - E_0, zero for a one-dimensional space.
    pub fn gap(&self) -> T {
        if self.dim() < 2 {
            return T::zero();
        }
        self.eigenvalues[1] - self.eigenvalues[0]
    }
}

/// Why a decomposition was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveFailure {
    /// Iteration budget exhausted.
    NoConvergence,
    /// NaN or infinity in the input matrix or the result.
    NonFinite,
}

impl fmt::Display for SolveFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoConvergence => write!(f, "eigensolver did not converge"),
            Self::NonFinite => write!(f, "non-finite values in eigenproblem"),
        }
    }
}

/// Hermitian matrix -> spectrum, or the reason it could not be produced.
pub trait Eigensolver<T: Real> {
    fn solve(&self, h: DMatrix<T>) -> Result<Spectrum<T>, SolveFailure>;
}

/// Full dense solver over all eigenpairs.
#[derive(Debug, Clone, Copy)]
pub struct DenseSolver {
    /// QR sweeps allowed per matrix dimension.
    pub max_iter_per_dim: usize,
}

impl Default for DenseSolver {
    fn default() -> Self {
        Self { max_iter_per_dim: 100 }
    }
}

impl<T: Real> Eigensolver<T> for DenseSolver {
    fn solve(&self, h: DMatrix<T>) -> Result<Spectrum<T>, SolveFailure> {
        if h.iter().any(|x| !x.is_finite()) {
            return Err(SolveFailure::NonFinite);
        }
        let max_iter = (self.max_iter_per_dim * h.nrows()).max(1);
        let eig = SymmetricEigen::try_new(h, T::default_epsilon(), max_iter)
            .ok_or(SolveFailure::NoConvergence)?;
        if eig.eigenvalues.iter().any(|x| !x.is_finite()) {
            return Err(SolveFailure::NonFinite);
        }
        Ok(Spectrum::sorted(eig.eigenvalues, eig.eigenvectors))
    }
}
