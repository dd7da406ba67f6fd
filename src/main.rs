//! Eigenset generator for the transverse-field Ising chain.
//!
//! Sweeps Bx × Bz × disorder replicas, diagonalizes every point exactly
//! and appends each spectrum to one output file (see `SweepConfig` for
//! all run parameters and their defaults).
//
//  Compile & run:  `cargo run --release -- --qubits 6 --bx-points 21`

use std::path::PathBuf;
use std::process;

use clap::Parser;

use eigenset::config::{AxisConfig, SweepConfig};
use eigenset::generator::OutputPolicy;
use eigenset::guard::{prompt_if_file, ConsolePrompter};
use eigenset::logging::init_logging;
use eigenset::GenError;

/// Floating-point width for this build.
#[cfg(not(feature = "single-precision"))]
type Precision = f64;
#[cfg(feature = "single-precision")]
type Precision = f32;

#[derive(Parser, Debug)]
#[command(name = "eigenset")]
#[command(about = "Exact-diagonalization dataset generator for spin chains")]
struct Cli {
    /// Physical model (only "ising" is supported)
    #[arg(long, default_value = "ising")]
    model: String,

    /// Chain length L (matrix dimension 2^L)
    #[arg(long, default_value_t = 4)]
    qubits: usize,

    /// Nearest-neighbour coupling J
    #[arg(long, default_value_t = 1.0)]
    coupling: f64,

    /// Transverse field range
    #[arg(long, default_value_t = 0.0)]
    bx_min: f64,
    #[arg(long, default_value_t = 2.0)]
    bx_max: f64,
    #[arg(long, default_value_t = 11)]
    bx_points: usize,

    /// Longitudinal field range
    #[arg(long, default_value_t = 0.0)]
    bz_min: f64,
    #[arg(long, default_value_t = 2.0)]
    bz_max: f64,
    #[arg(long, default_value_t = 11)]
    bz_points: usize,

    /// Disorder realizations per (Bx, Bz) point; 1 means no disorder
    #[arg(long, default_value_t = 1)]
    replicas: usize,

    /// Disorder magnitude W (site fields drawn from [-W, W])
    #[arg(long, default_value_t = 0.5)]
    disorder: f64,

    /// Base seed for the disorder draws
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Output eigenset file
    #[arg(short, long, default_value = "results.eigenset")]
    output: PathBuf,

    /// Ask before touching an existing output file
    #[arg(short, long)]
    interactive: bool,

    /// Diagonalize each Bx row in parallel
    #[arg(long)]
    parallel: bool,

    /// Hide the progress bar
    #[arg(short, long)]
    quiet: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn config(&self) -> SweepConfig {
        SweepConfig {
            model:    self.model.clone(),
            qubits:   self.qubits,
            coupling: self.coupling,
            bx:       AxisConfig { min: self.bx_min, max: self.bx_max, points: self.bx_points },
            bz:       AxisConfig { min: self.bz_min, max: self.bz_max, points: self.bz_points },
            replicas: self.replicas,
            disorder: self.disorder,
            seed:     self.seed,
            output:   self.output.clone(),
            policy:   OutputPolicy::Truncate,
            progress: !self.quiet,
        }
    }
}

fn run(cli: &Cli) -> Result<(), GenError> {
    let cfg = cli.config();

    // Build first so a bad model or grid fails before any prompt or I/O.
    let mut generator = cfg.build::<Precision>()?;

    if cli.interactive {
        let outcome = prompt_if_file(&cfg.output, &mut ConsolePrompter::stdio())?;
        generator = generator.with_policy(outcome.policy());
    }

    if cli.parallel {
        generator.run_parallel()?;
    } else {
        generator.run()?;
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = init_logging(&cli.log_level) {
        eprintln!("Warning: failed to initialize logging: {e}");
    }

    // The only place the process is terminated on error.
    if let Err(err) = run(&cli) {
        match err {
            GenError::DiagonalizationFailed { .. } => eprintln!(" \n{err}\n"),
            GenError::UserQuit => {}
            _ => eprintln!("{err}"),
        }
        process::exit(1);
    }
}
