// config.rs - Sweep grid definition and run-time configuration

use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{GenError, Result};
use crate::generator::{Generator, OutputPolicy};
use crate::{real, Real};

/// Value used for an axis with a single point. A zero field makes the
/// Ising chain degenerate, so a one-point axis never sits at zero.
pub const SINGLE_POINT_SENTINEL: f64 = 0.01;

/// Bz points and replicas each get 20 bits of the per-point seed key.
pub const MAX_INNER_POINTS: usize = 1 << 20;

/// Bx points get the remaining 24 bits.
pub const MAX_OUTER_POINTS: usize = 1 << 24;

/// Physical models the generator knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Model {
    Ising,
}

impl FromStr for Model {
    type Err = GenError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ising" => Ok(Model::Ising),
            other => Err(GenError::UnsupportedModel(other.to_string())),
        }
    }
}

/// One evenly spaced sweep dimension over `[min, max]`.
#[derive(Debug, Clone, PartialEq)]
pub struct GridAxis<T: Real> {
    min: T,
    max: T,
    points: usize,
}

impl<T: Real> GridAxis<T> {
    pub fn new(min: T, max: T, points: usize) -> Result<Self> {
        if points == 0 {
            return Err(GenError::InvalidGrid("grid axis needs at least one point".into()));
        }
        if !min.is_finite() || !max.is_finite() {
            return Err(GenError::InvalidGrid("grid axis bounds must be finite".into()));
        }
        Ok(Self { min, max, points })
    }

    pub fn len(&self) -> usize {
        self.points
    }

    /// Always false once constructed; pairs with `len`.
    pub fn is_empty(&self) -> bool {
        self.points == 0
    }

    /// Linearly spaced values including both endpoints, or the sentinel
    /// when the axis has a single point.
    pub fn values(&self) -> Vec<T> {
        if self.points == 1 {
            return vec![real(SINGLE_POINT_SENTINEL)];
        }
        let last = self.points - 1;
        let step = (self.max - self.min) / real::<T>(last as f64);
        (0..self.points)
            .map(|i| if i == last { self.max } else { self.min + step * real::<T>(i as f64) })
            .collect()
    }
}

/// Two field axes plus the disorder replicas taken at every grid point.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepSpec<T: Real> {
    pub bx: GridAxis<T>,
    pub bz: GridAxis<T>,
    pub replicas: usize,
    pub disorder: T,
}

impl<T: Real> SweepSpec<T> {
    pub fn new(bx: GridAxis<T>, bz: GridAxis<T>, replicas: usize, disorder: T) -> Result<Self> {
        if replicas == 0 {
            return Err(GenError::InvalidGrid("replica count must be at least 1".into()));
        }
        if bx.len() >= MAX_OUTER_POINTS {
            return Err(GenError::InvalidGrid(format!(
                "Bx axis has {} points, limit is {}",
                bx.len(),
                MAX_OUTER_POINTS - 1
            )));
        }
        if bz.len() >= MAX_INNER_POINTS || replicas >= MAX_INNER_POINTS {
            return Err(GenError::InvalidGrid(format!(
                "Bz points ({}) and replicas ({replicas}) must stay below {MAX_INNER_POINTS}",
                bz.len()
            )));
        }
        if !disorder.is_finite() || disorder < T::zero() {
            return Err(GenError::InvalidGrid(format!(
                "disorder must be finite and non-negative, got {disorder}"
            )));
        }
        Ok(Self { bx, bz, replicas, disorder })
    }

    /// A single replica is the clean chain.
    pub fn effective_disorder(&self) -> T {
        if self.replicas > 1 { self.disorder } else { T::zero() }
    }

    /// Total number of sweep points, `|Bx| * |Bz| * replicas`.
    pub fn len(&self) -> usize {
        self.bx.len() * self.bz.len() * self.replicas
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Bounds and point count of one axis as read from the command line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisConfig {
    pub min: f64,
    pub max: f64,
    pub points: usize,
}

/// Run-time configuration (single source of truth for a sweep).
#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub model:    String,
    pub qubits:   usize,
    pub coupling: f64,
    pub bx:       AxisConfig,
    pub bz:       AxisConfig,
    pub replicas: usize,
    pub disorder: f64,
    pub seed:     u64,
    pub output:   PathBuf,
    pub policy:   OutputPolicy,
    pub progress: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            model:    "ising".to_string(),
            qubits:   4,
            coupling: 1.0,
            bx:       AxisConfig { min: 0.0, max: 2.0, points: 11 },
            bz:       AxisConfig { min: 0.0, max: 2.0, points: 11 },
            replicas: 1,
            disorder: 0.5,
            seed:     0,
            output:   PathBuf::from("results.eigenset"),
            policy:   OutputPolicy::Truncate,
            progress: true,
        }
    }
}

impl SweepConfig {
    /// Validate and turn the configuration into a generator for one
    /// floating-point width.
    pub fn build<T: Real>(&self) -> Result<Generator<T>> {
        // Model first: an unknown model is rejected before anything else.
        let model: Model = self.model.parse()?;
        let spec: SweepSpec<T> = SweepSpec::new(
            GridAxis::new(real(self.bx.min), real(self.bx.max), self.bx.points)?,
            GridAxis::new(real(self.bz.min), real(self.bz.max), self.bz.points)?,
            self.replicas,
            real(self.disorder),
        )?;
        Ok(Generator::with_model(model, self.qubits, real(self.coupling), spec, &self.output)?
            .with_seed(self.seed)
            .with_policy(self.policy)
            .with_progress(self.progress))
    }
}
