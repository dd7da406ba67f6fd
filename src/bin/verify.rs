//! Read an eigenset file back and print the magnetization of every
//! eigenstate as `( Bx, Bz, <m> )`, followed by a ground-state table.
//
//  Compile & run:  `cargo run --bin verify -- results.eigenset`

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::info;

use eigenset::instance::read_instances;
use eigenset::logging::init_logging;
use eigenset::observables::{ground_state, state_summaries};

#[derive(Parser)]
struct Cli {
    /// Eigenset file written by `eigenset`
    #[arg(default_value = "results.eigenset")]
    file: PathBuf,

    /// Only print the ground state of each record
    #[arg(long)]
    ground_only: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() {
    let args = Cli::parse();
    if let Err(e) = init_logging(&args.log_level) {
        eprintln!("Warning: failed to initialize logging: {e}");
    }

    let records = match read_instances::<f64>(&args.file) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("cannot read {}: {e}", args.file.display());
            process::exit(1);
        }
    };
    info!(records = records.len(), path = %args.file.display(), "loaded eigenset");

    let Some(first) = records.first() else {
        println!("{} holds no records", args.file.display());
        return;
    };
    println!("{}", records.len());
    println!("{}", first.spectrum().dim());

    if !args.ground_only {
        for inst in &records {
            for s in state_summaries(inst) {
                println!("( {:?}, {:?}, {:?})", s.bx, s.bz, s.magnetization);
            }
        }
        println!();
    }

    // ---------------------------------------------------------------------
    // Ground states
    // ---------------------------------------------------------------------
    println!("{:>10} {:>10} {:>10} {:>14} {:>12} {:>10}", "Bx", "Bz", "W", "E0", "gap", "m0");
    for inst in &records {
        let g = ground_state(inst);
        println!(
            "{:>10.4} {:>10.4} {:>10.4} {:>14.8} {:>12.6} {:>10.6}",
            g.bx, g.bz, g.disorder, g.energy, g.gap, g.magnetization,
        );
    }
}
