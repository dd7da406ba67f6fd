// instance.rs - One solved sweep point and the eigenset file it lands in
//
// File layout, one record after another (CSV, variable row length):
//
//   qubits, coupling, bx, bz, disorder, bz_0, …, bz_{L-1}
//   E_0, v_0[0], …, v_0[dim-1]
//   …
//   E_{dim-1}, v_{dim-1}[0], …
//
// with dim = 2^L and eigenpairs in ascending energy order.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use nalgebra::{DMatrix, DVector};

use crate::error::{GenError, Result};
use crate::fields::Fields;
use crate::operators::MAX_QUBITS;
use crate::solver::Spectrum;
use crate::Real;

/// Number of leading header columns before the per-site fields.
const HEADER_COLS: usize = 5;

/// A configuration paired with its spectrum.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance<T: Real> {
    fields:   Fields<T>,
    spectrum: Spectrum<T>,
}

impl<T: Real> Instance<T> {
    pub fn new(fields: Fields<T>, spectrum: Spectrum<T>) -> Self {
        Self { fields, spectrum }
    }

    pub fn fields(&self) -> &Fields<T> {
        &self.fields
    }

    pub fn spectrum(&self) -> &Spectrum<T> {
        &self.spectrum
    }

    /// Serialize the full record into memory.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut wtr = WriterBuilder::new()
            .flexible(true)
            .has_headers(false)
            .from_writer(Vec::new());

        let f = &self.fields;
        let mut header = vec![
            f.qubits().to_string(),
            f.coupling().to_string(),
            f.bx().to_string(),
            f.bz().to_string(),
            f.disorder().to_string(),
        ];
        header.extend(f.bz_sites().iter().map(|b| b.to_string()));
        wtr.write_record(&header)?;

        let s = &self.spectrum;
        for k in 0..s.dim() {
            let column = s.eigenvectors.column(k);
            let row = std::iter::once(s.eigenvalues[k])
                .chain(column.iter().copied())
                .map(|x| x.to_string());
            wtr.write_record(row)?;
        }

        wtr.into_inner().map_err(|e| GenError::Io(e.into_error()))
    }

    /// Append this record to `path`, creating the file if needed.
    ///
    /// The record is rendered first and handed to the OS in one
    /// `write_all`, so a serialization error never leaves half a record.
    pub fn append_to_file(&self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes()?;
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(&bytes)?;
        file.flush()?;
        Ok(())
    }
}

/// Destination for finished records, in the order they are produced.
pub trait RecordSink<T: Real> {
    fn append(&mut self, instance: &Instance<T>) -> Result<()>;
}

/// Production sink: append each record to a file on disk.
#[derive(Debug, Clone)]
pub struct AppendFile {
    path: PathBuf,
}

impl AppendFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<T: Real> RecordSink<T> for AppendFile {
    fn append(&mut self, instance: &Instance<T>) -> Result<()> {
        instance.append_to_file(&self.path)
    }
}

fn malformed(line: u64, reason: impl Into<String>) -> GenError {
    GenError::MalformedRecord { line, reason: reason.into() }
}

fn line_of(rec: &StringRecord) -> u64 {
    rec.position().map(|p| p.line()).unwrap_or(0)
}

fn parse_field<V: std::str::FromStr>(rec: &StringRecord, idx: usize, what: &str) -> Result<V> {
    let raw = rec.get(idx).ok_or_else(|| malformed(line_of(rec), format!("missing {what}")))?;
    raw.trim()
        .parse()
        .map_err(|_| malformed(line_of(rec), format!("cannot parse {what} from {raw:?}")))
}

/// Read every record of an eigenset file, in file order.
///
/// A record cut short (fewer eigenpair rows or columns than its header
/// promises) is reported as `MalformedRecord`.
pub fn read_instances<T: Real>(path: &Path) -> Result<Vec<Instance<T>>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut out = Vec::new();
    let mut rows = rdr.records();

    while let Some(header) = rows.next() {
        let header = header?;
        let line = line_of(&header);

        let qubits: usize = parse_field(&header, 0, "qubit count")?;
        if qubits == 0 || qubits > MAX_QUBITS {
            return Err(malformed(line, format!("qubit count {qubits} out of range")));
        }
        if header.len() != HEADER_COLS + qubits {
            return Err(malformed(
                line,
                format!("header has {} columns, expected {}", header.len(), HEADER_COLS + qubits),
            ));
        }
        let coupling: T = parse_field(&header, 1, "coupling")?;
        let bx: T = parse_field(&header, 2, "Bx")?;
        let bz: T = parse_field(&header, 3, "Bz")?;
        let disorder: T = parse_field(&header, 4, "disorder")?;
        let bz_sites = (0..qubits)
            .map(|i| parse_field(&header, HEADER_COLS + i, "site field"))
            .collect::<Result<Vec<T>>>()?;

        let dim = 1usize << qubits;
        let mut values = Vec::with_capacity(dim);
        let mut vectors = DMatrix::<T>::zeros(dim, dim);
        for k in 0..dim {
            let row = match rows.next() {
                Some(r) => r?,
                None => {
                    return Err(malformed(
                        line,
                        format!("truncated record: expected {dim} eigenpairs, found {k}"),
                    ))
                }
            };
            if row.len() != dim + 1 {
                return Err(malformed(
                    line_of(&row),
                    format!("eigenpair row has {} columns, expected {}", row.len(), dim + 1),
                ));
            }
            values.push(parse_field::<T>(&row, 0, "eigenvalue")?);
            for c in 0..dim {
                vectors[(c, k)] = parse_field(&row, c + 1, "eigenvector component")?;
            }
        }

        let fields = Fields::from_parts(qubits, coupling, bx, bz, disorder, bz_sites);
        let spectrum = Spectrum { eigenvalues: DVector::from_vec(values), eigenvectors: vectors };
        out.push(Instance::new(fields, spectrum));
    }
    Ok(out)
}
