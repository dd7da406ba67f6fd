// generator.rs - Sweep engine: Bx × Bz × replica -> eigenset file
//
// Points are visited in a fixed nested order (Bx outer, Bz middle,
// replica inner) and records land in the output file in that order.
// The first failed diagonalization aborts the run; records written for
// earlier points stay on disk.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use crate::config::{Model, SweepSpec};
use crate::error::{GenError, Result};
use crate::fields::Fields;
use crate::instance::{AppendFile, Instance, RecordSink};
use crate::operators::{IsingOperators, OperatorBuilder, MAX_QUBITS};
use crate::solver::{DenseSolver, Eigensolver, SolveFailure, Spectrum};
use crate::Real;

/// What to do with an output file that already exists when the sweep starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputPolicy {
    /// Remove it first (non-interactive runs).
    Truncate,
    /// Keep it and append after the existing bytes.
    Append,
}

/// Externally visible run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepState {
    Idle,
    Sweeping,
    Completed,
    Aborted,
}

/// One grid point in canonical order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepPoint<T: Real> {
    /// Position in the canonical enumeration.
    pub index:   usize,
    pub i_a:     usize,
    pub i_b:     usize,
    pub replica: usize,
    pub bx:      T,
    pub bz:      T,
}

/// Outcome of a completed sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepSummary {
    pub points:      usize,
    /// Σ of per-point build + solve intervals (no file I/O).
    pub diag_time:   Duration,
    pub point_times: Vec<Duration>,
}

impl SweepSummary {
    fn new() -> Self {
        Self { points: 0, diag_time: Duration::ZERO, point_times: Vec::new() }
    }

    fn record(&mut self, dt: Duration) {
        self.points += 1;
        self.diag_time += dt;
        self.point_times.push(dt);
    }
}

/// Parameter-sweep driver for one floating-point width.
#[derive(Debug, Clone)]
pub struct Generator<T: Real> {
    model:    Model,
    qubits:   usize,
    coupling: T,
    spec:     SweepSpec<T>,
    seed:     u64,
    fpath:    PathBuf,
    policy:   OutputPolicy,
    progress: bool,
    state:    SweepState,
}

impl<T: Real> Generator<T> {
    /// Build a generator for the named model. Only `"ising"` is supported;
    /// anything else fails before any I/O happens.
    pub fn new(
        model: &str,
        qubits: usize,
        coupling: T,
        spec: SweepSpec<T>,
        fpath: impl AsRef<Path>,
    ) -> Result<Self> {
        let model: Model = model.parse()?;
        Self::with_model(model, qubits, coupling, spec, fpath)
    }

    pub fn with_model(
        model: Model,
        qubits: usize,
        coupling: T,
        spec: SweepSpec<T>,
        fpath: impl AsRef<Path>,
    ) -> Result<Self> {
        if qubits == 0 || qubits > MAX_QUBITS {
            return Err(GenError::InvalidGrid(format!(
                "chain length must be in 1..={MAX_QUBITS}, got {qubits}"
            )));
        }
        if !coupling.is_finite() {
            return Err(GenError::InvalidGrid("coupling must be finite".into()));
        }
        Ok(Self {
            model,
            qubits,
            coupling,
            spec,
            seed: 0,
            fpath: fpath.as_ref().to_path_buf(),
            policy: OutputPolicy::Truncate,
            progress: false,
            state: SweepState::Idle,
        })
    }

    /// Base seed for the disorder draws.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_policy(mut self, policy: OutputPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Show an indicatif progress bar while sweeping.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn model(&self) -> Model {
        self.model
    }

    pub fn qubits(&self) -> usize {
        self.qubits
    }

    pub fn spec(&self) -> &SweepSpec<T> {
        &self.spec
    }

    pub fn output_path(&self) -> &Path {
        &self.fpath
    }

    pub fn policy(&self) -> OutputPolicy {
        self.policy
    }

    pub fn state(&self) -> SweepState {
        self.state
    }

    /// All grid points in canonical order: Bx outer, Bz middle, replica inner.
    pub fn points(&self) -> impl Iterator<Item = SweepPoint<T>> + '_ {
        let bx = self.spec.bx.values();
        let bz = self.spec.bz.values();
        let replicas = self.spec.replicas;
        let n_b = bz.len();

        bx.into_iter().enumerate().flat_map(move |(i_a, x)| {
            let bz = bz.clone();
            bz.into_iter().enumerate().flat_map(move |(i_b, z)| {
                (0..replicas).map(move |replica| SweepPoint {
                    index: (i_a * n_b + i_b) * replicas + replica,
                    i_a,
                    i_b,
                    replica,
                    bx: x,
                    bz: z,
                })
            })
        })
    }

    /// Resolve a grid point into its field configuration.
    ///
    /// Each point draws from its own RNG seeded by its grid indices, so
    /// the result does not depend on the order points are visited in.
    /// `SweepSpec::new` bounds the indices so the packed key is unique.
    pub fn fields_for(&self, p: &SweepPoint<T>) -> Fields<T> {
        let key = ((p.i_a as u64) << 40) | ((p.i_b as u64) << 20) | p.replica as u64;
        let mut rng = ChaCha20Rng::seed_from_u64(self.seed ^ key);
        Fields::new(self.qubits, self.coupling, p.bx, p.bz, self.spec.effective_disorder(), &mut rng)
    }

    /// Sweep the whole grid into the output file and report the total
    /// diagonalization time.
    pub fn run(&mut self) -> Result<SweepSummary> {
        let builder = IsingOperators::new(self.qubits);
        let mut sink = AppendFile::new(&self.fpath);
        let summary = self.run_with(&builder, &DenseSolver::default(), &mut sink)?;
        println!("Diagonalization time: {} seconds", summary.diag_time.as_secs_f64());
        Ok(summary)
    }

    /// Same as [`run`](Self::run) but solves a window of points in parallel,
    /// one point per worker thread. Records are still appended one by one
    /// in canonical order.
    pub fn run_parallel(&mut self) -> Result<SweepSummary> {
        let builder = IsingOperators::new(self.qubits);
        let mut sink = AppendFile::new(&self.fpath);
        let summary = self.run_parallel_with(&builder, &DenseSolver::default(), &mut sink)?;
        println!("Diagonalization time: {} seconds", summary.diag_time.as_secs_f64());
        Ok(summary)
    }

    /// Serial sweep with injected collaborators.
    pub fn run_with<B, S, K>(&mut self, builder: &B, solver: &S, sink: &mut K) -> Result<SweepSummary>
    where
        B: OperatorBuilder<T>,
        S: Eigensolver<T>,
        K: RecordSink<T>,
    {
        self.begin()?;
        let bar = self.progress_bar();
        let mut summary = SweepSummary::new();

        let points: Vec<SweepPoint<T>> = self.points().collect();
        for p in points {
            let (fields, dt, solved) = self.solve_point(&p, builder, solver);
            summary.record(dt);
            let spectrum = self.check(&p, solved, &bar)?;
            self.commit(sink, Instance::new(fields, spectrum), &bar)?;
        }

        self.finish(&bar, &summary);
        Ok(summary)
    }

    /// Parallel sweep with injected collaborators.
    ///
    /// At most one window of `rayon::current_num_threads()` spectra is held
    /// before it is drained to the sink, and nothing past the window that
    /// holds a failure is diagonalized.
    pub fn run_parallel_with<B, S, K>(
        &mut self,
        builder: &B,
        solver: &S,
        sink: &mut K,
    ) -> Result<SweepSummary>
    where
        B: OperatorBuilder<T> + Sync,
        S: Eigensolver<T> + Sync,
        K: RecordSink<T>,
    {
        self.begin()?;
        let bar = self.progress_bar();
        let mut summary = SweepSummary::new();

        let points: Vec<SweepPoint<T>> = self.points().collect();
        let window = rayon::current_num_threads().max(1);

        for batch in points.chunks(window) {
            // `collect` keeps canonical order.
            let solved: Vec<_> = {
                let this = &*self;
                batch
                    .par_iter()
                    .map(|p| this.solve_point(p, builder, solver))
                    .collect()
            };

            for (p, (fields, dt, result)) in batch.iter().zip(solved) {
                summary.record(dt);
                let spectrum = self.check(p, result, &bar)?;
                self.commit(sink, Instance::new(fields, spectrum), &bar)?;
            }
        }

        self.finish(&bar, &summary);
        Ok(summary)
    }

    // ------------------------------------------------------------------
    // Sweep stages
    // ------------------------------------------------------------------

    fn begin(&mut self) -> Result<()> {
        if self.policy == OutputPolicy::Truncate && self.fpath.exists() {
            info!(path = %self.fpath.display(), "removing existing output file");
            if let Err(e) = std::fs::remove_file(&self.fpath) {
                self.state = SweepState::Aborted;
                return Err(e.into());
            }
        }
        info!(
            model = ?self.model,
            qubits = self.qubits,
            bx_points = self.spec.bx.len(),
            bz_points = self.spec.bz.len(),
            replicas = self.spec.replicas,
            total = self.spec.len(),
            policy = ?self.policy,
            path = %self.fpath.display(),
            "starting sweep"
        );
        self.state = SweepState::Sweeping;
        Ok(())
    }

    /// Build and diagonalize one point, timing both as a single interval.
    fn solve_point<B, S>(
        &self,
        p: &SweepPoint<T>,
        builder: &B,
        solver: &S,
    ) -> (Fields<T>, Duration, std::result::Result<Spectrum<T>, SolveFailure>)
    where
        B: OperatorBuilder<T>,
        S: Eigensolver<T>,
    {
        let fields = self.fields_for(p);
        let start = Instant::now();
        let solved = solver.solve(builder.build(&fields));
        let dt = start.elapsed();
        debug!(
            index = p.index,
            i_a = p.i_a,
            i_b = p.i_b,
            replica = p.replica,
            bx = %p.bx,
            bz = %p.bz,
            elapsed_us = dt.as_micros() as u64,
            "diagonalized"
        );
        (fields, dt, solved)
    }

    fn check(
        &mut self,
        p: &SweepPoint<T>,
        solved: std::result::Result<Spectrum<T>, SolveFailure>,
        bar: &ProgressBar,
    ) -> Result<Spectrum<T>> {
        solved.map_err(|why| {
            error!(index = p.index, bx = %p.bx, bz = %p.bz, replica = p.replica, %why, "aborting sweep");
            bar.abandon();
            self.state = SweepState::Aborted;
            GenError::DiagonalizationFailed {
                index: p.index,
                i_a: p.i_a,
                i_b: p.i_b,
                replica: p.replica,
            }
        })
    }

    fn commit<K: RecordSink<T>>(&mut self, sink: &mut K, instance: Instance<T>, bar: &ProgressBar) -> Result<()> {
        if let Err(e) = sink.append(&instance) {
            warn!(error = %e, "failed to append record");
            bar.abandon();
            self.state = SweepState::Aborted;
            return Err(e);
        }
        bar.inc(1);
        Ok(())
    }

    fn finish(&mut self, bar: &ProgressBar, summary: &SweepSummary) {
        bar.finish();
        self.state = SweepState::Completed;
        info!(
            points = summary.points,
            seconds = summary.diag_time.as_secs_f64(),
            "sweep complete"
        );
    }

    fn progress_bar(&self) -> ProgressBar {
        if !self.progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(self.spec.len() as u64);
        if let Ok(style) = ProgressStyle::with_template(" {bar:40.cyan/blue} {pos}/{len} [{elapsed_precise}]") {
            bar.set_style(style);
        }
        bar
    }
}
