// operators.rs - Dense Hamiltonian of the transverse-field Ising chain
//
//   H = -J Σ σz_i σz_{i+1}  -  Σ bz_i σz_i  -  bx Σ σx_i
//
// Open boundaries. Basis state `s` has site `i` on bit `i`, with
// σz_i(s) = +1 for a cleared bit and -1 for a set bit.

use nalgebra::DMatrix;

use crate::fields::Fields;
use crate::Real;

/// Largest chain that still fits a dense `2^L x 2^L` matrix comfortably.
pub const MAX_QUBITS: usize = 14;

/// Turns a field configuration into a Hermitian (here real symmetric) matrix.
pub trait OperatorBuilder<T: Real> {
    fn build(&self, fields: &Fields<T>) -> DMatrix<T>;
}

/// Operator factory for a fixed chain length.
#[derive(Debug, Clone)]
pub struct IsingOperators {
    qubits: usize,
}

impl IsingOperators {
    pub fn new(qubits: usize) -> Self {
        Self { qubits }
    }

    pub fn qubits(&self) -> usize {
        self.qubits
    }

    pub fn dim(&self) -> usize {
        1 << self.qubits
    }
}

/// σz eigenvalue of `site` in basis state `s`.
#[inline(always)]
pub fn spin_z(s: usize, site: usize) -> i32 {
    if (s >> site) & 1 == 0 { 1 } else { -1 }
}

impl<T: Real> OperatorBuilder<T> for IsingOperators {
    fn build(&self, fields: &Fields<T>) -> DMatrix<T> {
        debug_assert_eq!(fields.qubits(), self.qubits, "fields built for another chain length");
        let l = self.qubits;
        let dim = self.dim();
        let j = fields.coupling();
        let bx = fields.bx();
        let bz = fields.bz_sites();

        let mut h = DMatrix::<T>::zeros(dim, dim);
        for s in 0..dim {
            // Diagonal: bond and longitudinal terms.
            let mut diag = T::zero();
            for i in 0..l.saturating_sub(1) {
                if spin_z(s, i) == spin_z(s, i + 1) {
                    diag -= j;
                } else {
                    diag += j;
                }
            }
            for (i, &b) in bz.iter().enumerate() {
                if spin_z(s, i) > 0 {
                    diag -= b;
                } else {
                    diag += b;
                }
            }
            h[(s, s)] = diag;

            // Off-diagonal: σx flips one spin.
            for i in 0..l {
                h[(s ^ (1 << i), s)] -= bx;
            }
        }
        h
    }
}
