//! Fixtures shared by the unit tests.

use nalgebra::DVector;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};

use crate::table::{Table, TableError, TableLoader};
use crate::trajectory::*;

/// Serves tables from memory, keyed by file suffix, and remembers which paths
/// were asked for.
#[derive(Default)]
pub(crate) struct MemoryLoader {
    tables: HashMap<String, Table>,
    requested: RefCell<Vec<PathBuf>>,
}

/// Generates a trajectory with recognisable values.
///
/// State variable `j` at time `t` is `t + j`, so every sample is distinct and
/// its time can be read back from it.
#[derive(Debug, Clone)]
pub(crate) struct TrajectoryBuilder {
    pub state_dim: usize,
    pub control_dim: usize,
    pub num_rows: usize,
    pub dt: f64,
    pub constant_gain: bool,

    /// The rollout runs over the same span as the nominal trajectory at twice
    /// the rate.
    pub rollout_rows: usize,

    /// Added to every rollout state variable
    pub rollout_offset: f64,
}

impl MemoryLoader {
    pub fn insert(&mut self, suffix: &str, table: Table) {
        self.tables.insert(suffix.to_string(), table);
    }

    pub fn remove(&mut self, suffix: &str) {
        self.tables.remove(suffix);
    }

    pub fn requested(&self) -> Vec<PathBuf> {
        self.requested.borrow().clone()
    }
}

impl TableLoader for MemoryLoader {
    fn read_table(&self, path: &Path) -> Result<Table, TableError> {
        self.requested.borrow_mut().push(path.to_path_buf());

        let name = path.to_string_lossy();
        self.tables
            .iter()
            .find(|(suffix, _)| name.ends_with(suffix.as_str()))
            .map(|(_, table)| table.clone())
            .ok_or_else(|| {
                TableError::Open(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no table for {}", name),
                ))
            })
    }
}

impl TrajectoryBuilder {
    pub fn new(state_dim: usize, control_dim: usize, num_rows: usize, dt: f64) -> Self {
        Self {
            state_dim,
            control_dim,
            num_rows,
            dt,
            constant_gain: false,
            rollout_rows: 2 * num_rows - 1,
            rollout_offset: 0.25,
        }
    }

    pub fn constant_gain(mut self, constant_gain: bool) -> Self {
        self.constant_gain = constant_gain;
        self
    }

    pub fn time(&self, i: usize) -> f64 {
        i as f64 * self.dt
    }

    fn rollout_time(&self, i: usize) -> f64 {
        i as f64 * (self.dt / 2.0)
    }

    pub fn state_row(&self, i: usize) -> DVector<f64> {
        let t = self.time(i);
        DVector::from_fn(self.state_dim, |j, _| t + j as f64)
    }

    pub fn control_row(&self, i: usize) -> DVector<f64> {
        let t = self.time(i);
        DVector::from_fn(self.control_dim, |j, _| 2.0 * (j + 1) as f64 - t)
    }

    pub fn affine_row(&self, i: usize) -> DVector<f64> {
        let t = self.time(i);
        DVector::from_fn(self.control_dim, |j, _| 0.5 * t + 0.1 * j as f64)
    }

    /// Flattened gain matrix of sample `i`.
    pub fn gain_row(&self, i: usize) -> Vec<f64> {
        let t = if self.constant_gain { 0.0 } else { self.time(i) };
        (0..self.state_dim * self.control_dim)
            .map(|k| 0.25 * k as f64 - 1.0 + t)
            .collect()
    }

    pub fn rollout_row(&self, i: usize) -> DVector<f64> {
        let t = self.rollout_time(i);
        DVector::from_fn(self.state_dim, |j, _| t + j as f64 + self.rollout_offset)
    }

    pub fn state_table(&self, num_rows: usize) -> Table {
        self.table(num_rows, |i| (self.time(i), self.state_row(i).iter().cloned().collect()))
    }

    pub fn control_table(&self, num_rows: usize) -> Table {
        self.table(num_rows, |i| (self.time(i), self.control_row(i).iter().cloned().collect()))
    }

    pub fn gain_table(&self, num_rows: usize) -> Table {
        self.table(num_rows, |i| (self.time(i), self.gain_row(i)))
    }

    pub fn affine_table(&self, num_rows: usize) -> Table {
        self.table(num_rows, |i| (self.time(i), self.affine_row(i).iter().cloned().collect()))
    }

    pub fn rollout_table(&self) -> Table {
        self.table(self.rollout_rows, |i| {
            (self.rollout_time(i), self.rollout_row(i).iter().cloned().collect())
        })
    }

    /// Loader serving every file of this trajectory, including a rollout.
    pub fn loader(&self) -> MemoryLoader {
        let mut loader = MemoryLoader::default();
        for (suffix, table) in self.tables() {
            loader.insert(suffix, table);
        }
        loader
    }

    fn tables(&self) -> Vec<(&'static str, Table)> {
        vec![
            (STATE_SUFFIX, self.state_table(self.num_rows)),
            (CONTROL_SUFFIX, self.control_table(self.num_rows)),
            (GAIN_SUFFIX, self.gain_table(self.num_rows)),
            (AFFINE_SUFFIX, self.affine_table(self.num_rows)),
            (ROLLOUT_SUFFIX, self.rollout_table()),
        ]
    }

    fn table<F>(&self, num_rows: usize, row: F) -> Table
    where
        F: Fn(usize) -> (f64, Vec<f64>),
    {
        let mut values = Vec::new();
        let mut num_cols = 1;

        for i in 0..num_rows {
            let (t, v) = row(i);
            num_cols = v.len() + 1;
            values.push(t);
            values.extend(v);
        }

        Table::from_row_slice(num_rows, num_cols, &values)
    }
}

/// Write every file of the builder's trajectory as CSV under `dir`, returning
/// the filename prefix.
pub(crate) fn write_trajectory(
    dir: &Path,
    name: &str,
    builder: &TrajectoryBuilder,
) -> io::Result<String> {
    let prefix = dir.join(name).to_string_lossy().into_owned();

    for (suffix, table) in builder.tables() {
        let mut csv = String::from("t");
        for i in 1..table.num_cols() {
            write!(csv, ",v{}", i).ok();
        }
        csv.push('\n');

        for row in table.data().row_iter() {
            let fields: Vec<String> = row.iter().map(|v| format!("{}", v)).collect();
            csv.push_str(&fields.join(","));
            csv.push('\n');
        }

        std::fs::write(format!("{}{}", prefix, suffix), csv)?;
    }

    Ok(prefix)
}
