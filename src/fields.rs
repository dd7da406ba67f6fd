// fields.rs - Field configuration of one sweep point

use rand::Rng;
use rand_distr::{Distribution, Uniform};

use crate::Real;

/// Fully resolved fields acting on an `L`-site chain.
///
/// The transverse field is uniform; the longitudinal field carries the
/// disorder draw, one value per site.
#[derive(Debug, Clone, PartialEq)]
pub struct Fields<T: Real> {
    qubits:   usize,
    coupling: T,
    bx:       T,
    bz:       T,
    disorder: T,
    bz_sites: Vec<T>,
}

impl<T: Real> Fields<T> {
    /// Draw site fields `bz + δ_i` with `δ_i ~ U[-W, W]`.
    /// A clean chain (`W == 0`) consumes no randomness.
    pub fn new(
        qubits: usize,
        coupling: T,
        bx: T,
        bz: T,
        disorder: T,
        rng: &mut impl Rng,
    ) -> Self {
        let bz_sites = if disorder > T::zero() {
            let dist = Uniform::new_inclusive(-disorder, disorder);
            (0..qubits).map(|_| bz + dist.sample(rng)).collect()
        } else {
            vec![bz; qubits]
        };
        Self { qubits, coupling, bx, bz, disorder, bz_sites }
    }

    /// Rebuild a configuration from stored values (used when reading files back).
    pub fn from_parts(qubits: usize, coupling: T, bx: T, bz: T, disorder: T, bz_sites: Vec<T>) -> Self {
        debug_assert_eq!(bz_sites.len(), qubits);
        Self { qubits, coupling, bx, bz, disorder, bz_sites }
    }

    #[inline(always)]
    pub fn qubits(&self) -> usize {
        self.qubits
    }

    #[inline(always)]
    pub fn coupling(&self) -> T {
        self.coupling
    }

    /// Transverse field.
    #[inline(always)]
    pub fn bx(&self) -> T {
        self.bx
    }

    /// Mean longitudinal field (before disorder).
    #[inline(always)]
    pub fn bz(&self) -> T {
        self.bz
    }

    /// Effective disorder magnitude this point was drawn with.
    #[inline(always)]
    pub fn disorder(&self) -> T {
        self.disorder
    }

    pub fn bz_sites(&self) -> &[T] {
        &self.bz_sites
    }

    /// Hilbert space dimension `2^L`.
    pub fn dim(&self) -> usize {
        1 << self.qubits
    }
}
