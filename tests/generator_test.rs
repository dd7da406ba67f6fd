use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use eigenset::config::{GridAxis, SweepSpec};
use eigenset::fields::Fields;
use eigenset::generator::{OutputPolicy, SweepState};
use eigenset::instance::{read_instances, AppendFile, Instance, RecordSink};
use eigenset::operators::{IsingOperators, OperatorBuilder};
use eigenset::solver::{DenseSolver, Eigensolver, SolveFailure, Spectrum};
use eigenset::{GenError, Generator};
use nalgebra::{DMatrix, DVector};

// -----------------------------------------------------------------------------
// Stub collaborators
// -----------------------------------------------------------------------------

/// 1×2 "Hamiltonian" carrying the point's Bx and Bz, so a solver can tell
/// points apart.
struct TagBuilder;

impl OperatorBuilder<f64> for TagBuilder {
    fn build(&self, fields: &Fields<f64>) -> DMatrix<f64> {
        DMatrix::from_row_slice(1, 2, &[fields.bx(), fields.bz()])
    }
}

/// Matrix dimension of the two-qubit chains used below.
const DIM: usize = 4;

/// Fails on one (Bx, Bz) pair and returns a trivial two-qubit spectrum
/// for everything else.
struct FailAt {
    bx: f64,
    bz: f64,
}

impl Eigensolver<f64> for FailAt {
    fn solve(&self, h: DMatrix<f64>) -> Result<Spectrum<f64>, SolveFailure> {
        if h[(0, 0)] == self.bx && h[(0, 1)] == self.bz {
            return Err(SolveFailure::NoConvergence);
        }
        Ok(Spectrum {
            eigenvalues: DVector::from_element(DIM, h[(0, 0)]),
            eigenvectors: DMatrix::identity(DIM, DIM),
        })
    }
}

/// Keeps records in memory, optionally sleeping on every append.
#[derive(Default)]
struct MemorySink {
    records: Vec<Instance<f64>>,
    delay: Duration,
}

impl RecordSink<f64> for MemorySink {
    fn append(&mut self, instance: &Instance<f64>) -> eigenset::Result<()> {
        thread::sleep(self.delay);
        self.records.push(instance.clone());
        Ok(())
    }
}

/// Appends through to a file but refuses the record with position `fail_at`.
struct FailingAppend {
    inner:   AppendFile,
    fail_at: usize,
    calls:   usize,
}

impl FailingAppend {
    fn new(path: &Path, fail_at: usize) -> Self {
        Self { inner: AppendFile::new(path), fail_at, calls: 0 }
    }
}

impl RecordSink<f64> for FailingAppend {
    fn append(&mut self, instance: &Instance<f64>) -> eigenset::Result<()> {
        let call = self.calls;
        self.calls += 1;
        if call == self.fail_at {
            return Err(io::Error::new(io::ErrorKind::Other, "disk full").into());
        }
        self.inner.append(instance)
    }
}

/// `FailAt` that also counts how many matrices it was handed.
struct Counting {
    inner: FailAt,
    calls: AtomicUsize,
}

impl Eigensolver<f64> for Counting {
    fn solve(&self, h: DMatrix<f64>) -> Result<Spectrum<f64>, SolveFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.solve(h)
    }
}

fn spec(n_a: usize, n_b: usize, replicas: usize) -> SweepSpec<f64> {
    SweepSpec::new(
        GridAxis::new(0.0, 1.0, n_a).unwrap(),
        GridAxis::new(0.0, 2.0, n_b).unwrap(),
        replicas,
        0.3,
    )
    .unwrap()
}

fn generator(path: &Path, n_a: usize, n_b: usize, replicas: usize) -> Generator<f64> {
    Generator::new("ising", 2, 1.0, spec(n_a, n_b, replicas), path).unwrap().with_seed(11)
}

// -----------------------------------------------------------------------------
// Full runs
// -----------------------------------------------------------------------------

#[test]
fn test_run_writes_every_point_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.eigenset");
    let mut g = generator(&path, 3, 2, 2);
    assert_eq!(g.state(), SweepState::Idle);

    let summary = g.run().unwrap();
    assert_eq!(g.state(), SweepState::Completed);
    assert_eq!(summary.points, 12);

    let records = read_instances::<f64>(&path).unwrap();
    assert_eq!(records.len(), 12);
    for (p, rec) in g.points().zip(&records) {
        assert_eq!(rec.fields().bx(), p.bx);
        assert_eq!(rec.fields().bz(), p.bz);
        assert_eq!(rec.fields(), &g.fields_for(&p));
        assert_eq!(rec.spectrum().dim(), 4);
    }
}

#[test]
fn test_run_is_reproducible() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.eigenset");
    let b = dir.path().join("b.eigenset");
    generator(&a, 2, 2, 3).run().unwrap();
    generator(&b, 2, 2, 3).run().unwrap();
    assert_eq!(fs::read(&a).unwrap(), fs::read(&b).unwrap());
}

#[test]
fn test_truncate_policy_removes_stale_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.eigenset");
    fs::write(&path, "stale bytes that are not a record\n").unwrap();

    generator(&path, 2, 1, 1).run().unwrap();
    let text = fs::read_to_string(&path).unwrap();
    assert!(!text.contains("stale"));
    assert_eq!(read_instances::<f64>(&path).unwrap().len(), 2);
}

#[test]
fn test_append_policy_keeps_prefix() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.eigenset");
    generator(&path, 2, 1, 1).run().unwrap();
    let before = fs::read(&path).unwrap();

    let mut g = generator(&path, 1, 2, 1).with_policy(OutputPolicy::Append);
    g.run().unwrap();
    let after = fs::read(&path).unwrap();
    assert_eq!(&after[..before.len()], &before[..]);
    assert_eq!(read_instances::<f64>(&path).unwrap().len(), 4);
}

// -----------------------------------------------------------------------------
// Fail-fast
// -----------------------------------------------------------------------------

#[test]
fn test_fail_fast_keeps_only_earlier_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.eigenset");
    let mut g = generator(&path, 3, 3, 1);

    // Fail on the point (Bx #1, Bz #2): canonical index 1*3 + 2 = 5.
    let target = g.points().nth(5).unwrap();
    let solver = FailAt { bx: target.bx, bz: target.bz };
    let mut sink = AppendFile::new(&path);

    let err = g.run_with(&TagBuilder, &solver, &mut sink).unwrap_err();
    match err {
        GenError::DiagonalizationFailed { index, i_a, i_b, replica } => {
            assert_eq!((index, i_a, i_b, replica), (5, 1, 2, 0));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(g.state(), SweepState::Aborted);

    let records = read_instances::<f64>(&path).unwrap();
    assert_eq!(records.len(), 5);
    for (p, rec) in g.points().zip(&records) {
        assert_eq!((rec.fields().bx(), rec.fields().bz()), (p.bx, p.bz));
    }
}

#[test]
fn test_fail_on_first_point_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.eigenset");
    let mut g = generator(&path, 2, 2, 1);
    let first = g.points().next().unwrap();
    let mut sink = MemorySink::default();

    let err = g.run_with(&TagBuilder, &FailAt { bx: first.bx, bz: first.bz }, &mut sink);
    assert!(matches!(err, Err(GenError::DiagonalizationFailed { index: 0, .. })));
    assert!(sink.records.is_empty());
    assert!(!path.exists());
}

#[test]
fn test_parallel_fail_fast_matches_serial() {
    let dir = tempfile::tempdir().unwrap();
    let serial = dir.path().join("serial.eigenset");
    let parallel = dir.path().join("parallel.eigenset");

    let mut gs = generator(&serial, 3, 4, 1);
    let target = gs.points().nth(6).unwrap();
    let solver = FailAt { bx: target.bx, bz: target.bz };

    let e1 = gs.run_with(&TagBuilder, &solver, &mut AppendFile::new(&serial)).unwrap_err();
    let mut gp = generator(&parallel, 3, 4, 1);
    let e2 = gp
        .run_parallel_with(&TagBuilder, &solver, &mut AppendFile::new(&parallel))
        .unwrap_err();

    assert!(matches!(e1, GenError::DiagonalizationFailed { index: 6, .. }));
    assert!(matches!(e2, GenError::DiagonalizationFailed { index: 6, .. }));
    assert_eq!(fs::read(&serial).unwrap(), fs::read(&parallel).unwrap());
    assert_eq!(read_instances::<f64>(&parallel).unwrap().len(), 6);
}

#[test]
fn test_parallel_run_matches_serial() {
    let dir = tempfile::tempdir().unwrap();
    let serial = dir.path().join("serial.eigenset");
    let parallel = dir.path().join("parallel.eigenset");

    generator(&serial, 3, 3, 2).run().unwrap();
    let summary = generator(&parallel, 3, 3, 2).run_parallel().unwrap();
    assert_eq!(summary.points, 18);
    assert_eq!(fs::read(&serial).unwrap(), fs::read(&parallel).unwrap());
}

#[test]
fn test_parallel_window_is_bounded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.eigenset");
    let mut g = generator(&path, 1, 40, 1);
    let target = g.points().nth(1).unwrap();
    let solver = Counting { inner: FailAt { bx: target.bx, bz: target.bz }, calls: AtomicUsize::new(0) };

    let err = g.run_parallel_with(&TagBuilder, &solver, &mut AppendFile::new(&path)).unwrap_err();
    assert!(matches!(err, GenError::DiagonalizationFailed { index: 1, .. }));

    // Only the window holding the failure is diagonalized, not the whole row.
    let window = rayon::current_num_threads().max(2);
    let calls = solver.calls.load(Ordering::SeqCst);
    assert!(calls <= window, "{calls} solves for a window of {window}");
    assert_eq!(read_instances::<f64>(&path).unwrap().len(), 1);
}

// -----------------------------------------------------------------------------
// Failed appends
// -----------------------------------------------------------------------------

#[test]
fn test_failed_append_aborts_serial_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.eigenset");
    let mut g = generator(&path, 3, 2, 1);

    let err = g
        .run_with(&IsingOperators::new(2), &DenseSolver::default(), &mut FailingAppend::new(&path, 2))
        .unwrap_err();
    assert!(matches!(err, GenError::Io(_)), "unexpected error {err:?}");
    assert_eq!(g.state(), SweepState::Aborted);

    // The refused record never reaches the file; earlier ones stay intact.
    let records = read_instances::<f64>(&path).unwrap();
    assert_eq!(records.len(), 2);
    for (p, rec) in g.points().zip(&records) {
        assert_eq!(rec.fields(), &g.fields_for(&p));
    }
}

#[test]
fn test_failed_append_aborts_parallel_run() {
    let dir = tempfile::tempdir().unwrap();
    let serial = dir.path().join("serial.eigenset");
    let parallel = dir.path().join("parallel.eigenset");

    let mut gs = generator(&serial, 3, 2, 2);
    let mut gp = generator(&parallel, 3, 2, 2);
    let builder = IsingOperators::new(2);
    let solver = DenseSolver::default();

    let e1 = gs.run_with(&builder, &solver, &mut FailingAppend::new(&serial, 7)).unwrap_err();
    let e2 = gp
        .run_parallel_with(&builder, &solver, &mut FailingAppend::new(&parallel, 7))
        .unwrap_err();

    assert!(matches!(e1, GenError::Io(_)));
    assert!(matches!(e2, GenError::Io(_)));
    assert_eq!(gp.state(), SweepState::Aborted);
    assert_eq!(read_instances::<f64>(&parallel).unwrap().len(), 7);
    assert_eq!(fs::read(&serial).unwrap(), fs::read(&parallel).unwrap());
}

// -----------------------------------------------------------------------------
// Timing
// -----------------------------------------------------------------------------

#[test]
fn test_timing_excludes_append() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("unused.eigenset");
    let mut g = generator(&path, 2, 2, 1);
    let mut sink = MemorySink { records: Vec::new(), delay: Duration::from_millis(25) };

    // Nothing ever fails: no grid point sits at (-1, -1).
    let solver = FailAt { bx: -1.0, bz: -1.0 };
    let summary = g.run_with(&TagBuilder, &solver, &mut sink).unwrap();

    assert_eq!(sink.records.len(), 4);
    assert_eq!(summary.point_times.len(), 4);
    assert_eq!(summary.point_times.iter().sum::<Duration>(), summary.diag_time);
    // Four appends slept 100 ms in total; none of it is counted.
    assert!(summary.diag_time < Duration::from_millis(25), "diag time {:?}", summary.diag_time);
}

#[test]
fn test_timing_accumulates_real_work() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("unused.eigenset");
    let mut g = Generator::new("ising", 6, 1.0, spec(2, 2, 1), &path).unwrap();
    let mut sink = MemorySink::default();

    let summary = g
        .run_with(&IsingOperators::new(6), &DenseSolver::default(), &mut sink)
        .unwrap();
    assert!(summary.diag_time > Duration::ZERO);

    // The running total never decreases as points are added.
    let mut running = Duration::ZERO;
    for dt in &summary.point_times {
        let next = running + *dt;
        assert!(next >= running);
        running = next;
    }
    assert_eq!(running, summary.diag_time);
}
