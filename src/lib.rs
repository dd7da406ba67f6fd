pub mod error;
pub mod config;
pub mod fields;
pub mod operators;
pub mod solver;
pub mod instance;
pub mod generator;
pub mod guard;
pub mod observables;
pub mod logging;

use std::fmt::Display;
use std::str::FromStr;

use nalgebra::RealField;
use rand::distributions::uniform::SampleUniform;

pub use error::{GenError, Result};
pub use generator::Generator;

/// Floating-point width the whole pipeline is generic over.
///
/// One width is picked per build at the binary's composition root
/// (`f64` by default, `f32` with the `single-precision` feature).
pub trait Real: RealField + Copy + SampleUniform + Display + FromStr + Send + Sync {}

impl<T> Real for T where T: RealField + Copy + SampleUniform + Display + FromStr + Send + Sync {}

/// Lossless-enough conversion from an `f64` literal or config value.
#[inline(always)]
pub fn real<T: Real>(x: f64) -> T {
    nalgebra::convert::<f64, T>(x)
}
