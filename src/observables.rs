// observables.rs - Measurements on solved eigenstates

use crate::instance::Instance;
use crate::operators::spin_z;
use crate::{real, Real};

/// Magnetization per site of basis state `s`, `(1/L) Σ σz_i(s)`.
pub fn basis_magnetization<T: Real>(qubits: usize, s: usize) -> T {
    let total: i32 = (0..qubits).map(|i| spin_z(s, i)).sum();
    real::<T>(total as f64) / real::<T>(qubits as f64)
}

/// ⟨ψ| M_z |ψ⟩ / L for a state given by its amplitudes in the
/// computational basis.
pub fn magnetization<T: Real>(qubits: usize, amplitudes: impl IntoIterator<Item = T>) -> T {
    amplitudes
        .into_iter()
        .enumerate()
        .fold(T::zero(), |acc, (s, a)| acc + a * a * basis_magnetization::<T>(qubits, s))
}

/// One line of the verifier output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateSummary<T: Real> {
    pub bx:            T,
    pub bz:            T,
    pub energy:        T,
    pub magnetization: T,
}

/// Energy and magnetization of every eigenstate of a record, ground state first.
pub fn state_summaries<T: Real>(instance: &Instance<T>) -> Vec<StateSummary<T>> {
    let f = instance.fields();
    let s = instance.spectrum();
    (0..s.dim())
        .map(|k| StateSummary {
            bx: f.bx(),
            bz: f.bz(),
            energy: s.eigenvalues[k],
            magnetization: magnetization(f.qubits(), s.eigenvectors.column(k).iter().copied()),
        })
        .collect()
}

/// Ground-state row of the verifier table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundState<T: Real> {
    pub bx:            T,
    pub bz:            T,
    pub disorder:      T,
    pub energy:        T,
    pub gap:           T,
    pub magnetization: T,
}

pub fn ground_state<T: Real>(instance: &Instance<T>) -> GroundState<T> {
    let f = instance.fields();
    let s = instance.spectrum();
    GroundState {
        bx: f.bx(),
        bz: f.bz(),
        disorder: f.disorder(),
        energy: s.ground_energy(),
        gap: s.gap(),
        magnetization: magnetization(f.qubits(), s.eigenvectors.column(0).iter().copied()),
    }
}
