// error.rs - Failure modes of a dataset sweep
//
// Every variant is fatal for the run. The library only returns them; the
// binaries decide how to report and exit.

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum GenError {
    #[error("CURRENTLY UNSUPPORTED MODEL: {0}")]
    UnsupportedModel(String),

    #[error("invalid sweep configuration: {0}")]
    InvalidGrid(String),

    #[error("DIAGONALIZATION FAILED at point {index} (Bx #{i_a}, Bz #{i_b}, replica {replica})")]
    DiagonalizationFailed {
        index: usize,
        i_a: usize,
        i_b: usize,
        replica: usize,
    },

    #[error("user chose to quit")]
    UserQuit,

    #[error("unrecognized answer: {0:?}")]
    UnrecognizedAnswer(String),

    #[error("malformed eigenset record at line {line}: {reason}")]
    MalformedRecord { line: u64, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, GenError>;
