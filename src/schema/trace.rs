//! Traces of atomic-predicate robustness values and their CSV ingestion.
//!
//! A trace folder holds two partitions, `examples/` and `counter-examples/`,
//! each containing CSV files. Every file is one trace: the header row names
//! the atoms (or raw state variables, when mappings are configured) and every
//! further row is one time step.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use super::mapping::StateMapping;

/// Integer identifier of an atomic predicate.
pub type AtomId = usize;

/// Robustness read for an atom that has no value in a valuation.
pub const MISSING_ATOM_ROBUSTNESS: f32 = -1.0;

/// Folder holding traces the predicate should accept.
pub const EXAMPLES_DIR: &str = "examples";
/// Folder holding traces the predicate should reject.
pub const COUNTER_EXAMPLES_DIR: &str = "counter-examples";

/// Stable bijection between atom names and ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AtomTable {
    names: Vec<String>,
    ids: HashMap<String, AtomId>,
}

impl AtomTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for `name`, reserving a fresh one if the name is new.
    pub fn intern(&mut self, name: &str) -> AtomId {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = self.names.len();
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        id
    }

    pub fn id(&self, name: &str) -> Option<AtomId> {
        self.ids.get(name).copied()
    }

    pub fn name(&self, id: AtomId) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AtomId, &str)> {
        self.names.iter().map(String::as_str).enumerate()
    }

    /// Names in lexicographic order.
    pub fn sorted_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.names.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Robustness of every tracked atom at one time step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Valuation {
    values: Vec<Option<f32>>,
}

impl Valuation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, atom: AtomId, value: f32) {
        if atom >= self.values.len() {
            self.values.resize(atom + 1, None);
        }
        self.values[atom] = Some(value);
    }

    /// Builder form of [`Valuation::set`].
    pub fn with(mut self, atom: AtomId, value: f32) -> Self {
        self.set(atom, value);
        self
    }

    pub fn get(&self, atom: AtomId) -> Option<f32> {
        self.values.get(atom).copied().flatten()
    }

    /// Robustness of `atom`, treating a missing value as violated.
    pub fn robustness(&self, atom: AtomId) -> f32 {
        self.get(atom).unwrap_or(MISSING_ATOM_ROBUSTNESS)
    }
}

/// One run, in time order.
pub type Trace = Vec<Valuation>;

/// The traces a predicate is searched against.
#[derive(Debug, Clone, Default)]
pub struct TraceSet {
    pub atoms: AtomTable,
    pub examples: Vec<Trace>,
    pub counter_examples: Vec<Trace>,
}

impl TraceSet {
    /// Load both partitions from `root`.
    ///
    /// With no mappings, CSV headers are atom names. Otherwise each row is a
    /// raw state and is converted through every mapping.
    pub fn load(root: &Path, mappings: &[StateMapping]) -> Result<Self, TraceError> {
        if !root.is_dir() {
            return Err(TraceError::MissingDirectory(root.to_path_buf()));
        }

        let mut atoms = AtomTable::new();
        let mapped: Vec<(AtomId, &StateMapping)> = mappings
            .iter()
            .map(|m| (atoms.intern(&m.predicate_name()), m))
            .collect();

        let examples = load_partition(&root.join(EXAMPLES_DIR), &mut atoms, &mapped)?;
        let counter_examples =
            load_partition(&root.join(COUNTER_EXAMPLES_DIR), &mut atoms, &mapped)?;
        let set = Self {
            atoms,
            examples,
            counter_examples,
        };

        info!(
            "Loaded {} example and {} counter-example traces over {} atoms",
            set.examples.len(),
            set.counter_examples.len(),
            set.atoms.len()
        );
        Ok(set)
    }
}

fn load_partition(
    dir: &Path,
    atoms: &mut AtomTable,
    mapped: &[(AtomId, &StateMapping)],
) -> Result<Vec<Trace>, TraceError> {
    if !dir.is_dir() {
        warn!("Trace folder {} not found, no traces loaded from it", dir.display());
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    collect_csv_files(dir, &mut files)?;
    files.sort();

    let mut traces = Vec::with_capacity(files.len());
    for path in files {
        let content = fs::read_to_string(&path).map_err(|source| TraceError::Io {
            path: path.clone(),
            source,
        })?;
        let table = match CsvTable::parse(&content, &path) {
            Ok(table) => table,
            Err(err @ TraceError::ColumnMismatch { .. }) => {
                warn!("Dropping trace: {}", err);
                continue;
            }
            Err(err) => return Err(err),
        };
        debug!("Read {} steps from {}", table.rows.len(), path.display());
        traces.push(if mapped.is_empty() {
            table.into_trace(atoms)
        } else {
            table.into_mapped_trace(mapped)
        });
    }
    Ok(traces)
}

fn collect_csv_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), TraceError> {
    let io_err = |source| TraceError::Io {
        path: dir.to_path_buf(),
        source,
    };
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_dir() {
            collect_csv_files(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "csv") {
            out.push(path);
        }
    }
    Ok(())
}

/// A parsed CSV file: header names and numeric rows.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<f32>>,
}

impl CsvTable {
    /// Parse CSV text. `source` is only used in error messages.
    ///
    /// Any row whose column count differs from the header is reported as a
    /// [`TraceError::ColumnMismatch`] for the whole table.
    pub fn parse(content: &str, source: &Path) -> Result<Self, TraceError> {
        let mut lines = content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty());

        let Some((_, header)) = lines.next() else {
            return Err(TraceError::Empty(source.to_path_buf()));
        };
        let headers: Vec<String> = header.split(',').map(|h| h.trim().to_string()).collect();

        let mut rows = Vec::new();
        for (index, line) in lines {
            let cells: Vec<&str> = line.split(',').map(str::trim).collect();
            if cells.len() != headers.len() {
                return Err(TraceError::ColumnMismatch {
                    path: source.to_path_buf(),
                    line: index + 1,
                    expected: headers.len(),
                    found: cells.len(),
                });
            }
            let row = cells
                .iter()
                .map(|cell| match cell.parse::<f32>() {
                    Ok(value) if value.is_finite() => Ok(value),
                    _ => Err(TraceError::InvalidValue {
                        path: source.to_path_buf(),
                        line: index + 1,
                        value: cell.to_string(),
                    }),
                })
                .collect::<Result<Vec<f32>, _>>()?;
            rows.push(row);
        }
        Ok(Self { headers, rows })
    }

    /// Treat headers as atom names.
    pub fn into_trace(self, atoms: &mut AtomTable) -> Trace {
        let ids: Vec<AtomId> = self.headers.iter().map(|h| atoms.intern(h)).collect();
        self.rows
            .into_iter()
            .map(|row| {
                let mut valuation = Valuation::new();
                for (&id, value) in ids.iter().zip(row) {
                    valuation.set(id, value);
                }
                valuation
            })
            .collect()
    }

    /// Treat headers as state variables and evaluate every mapping per row.
    pub fn into_mapped_trace(self, mapped: &[(AtomId, &StateMapping)]) -> Trace {
        self.rows
            .into_iter()
            .map(|row| {
                let state: HashMap<String, f32> =
                    self.headers.iter().cloned().zip(row).collect();
                let mut valuation = Valuation::new();
                for (id, mapping) in mapped {
                    valuation.set(*id, mapping.robustness(&state));
                }
                valuation
            })
            .collect()
    }
}

/// Trace loading errors.
#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("Trace folder {0} does not exist")]
    MissingDirectory(PathBuf),
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Trace file {0} has no header row")]
    Empty(PathBuf),
    #[error("{path}:{line}: expected {expected} columns, found {found}")]
    ColumnMismatch {
        path: PathBuf,
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("{path}:{line}: '{value}' is not a finite number")]
    InvalidValue {
        path: PathBuf,
        line: usize,
        value: String,
    },
}
