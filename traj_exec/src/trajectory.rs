//! # Trajectory
//!
//! A precomputed trajectory of a dynamical system. It is made up of a nominal
//! state path, a nominal control path, a time-varying linear feedback gain and
//! an affine feedforward offset, all sampled at the same fixed period. If the
//! feedback gain is the same at every sample the trajectory is time-invariant,
//! and a previously simulated rollout of it is loaded alongside for
//! comparison.
//!
//! A trajectory is loaded from a set of files sharing a common prefix `P`,
//! whose last 5 characters are the trajectory's numeric id:
//!
//! | File               | Columns                    | Contents                        |
//! |--------------------|----------------------------|---------------------------------|
//! | `P-x.csv`          | `1 + state_dim`            | time, state                     |
//! | `P-u.csv`          | `1 + control_dim`          | time, control                   |
//! | `P-controller.csv` | `1 + state_dim*control_dim`| time, gain matrix (row-major)   |
//! | `P-affine.csv`     | `1 + control_dim`          | time, affine offset             |
//! | `P-rollout.csv`    | `1 + state_dim`            | time, rollout state (optional)  |
//!
//! Loading either succeeds completely or returns an error, there is no
//! partially loaded trajectory. Once loaded a trajectory is never modified, so
//! it can be shared between threads freely.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info};
use nalgebra::{DMatrix, DVector, Isometry3, Point3, SMatrix};
use std::fmt;
use std::path::{Path, PathBuf};

// Internal
use crate::gain;
use crate::params::Params;
use crate::table::{CsvTableLoader, SpacingError, Table, TableError, TableLoader, SPACING_TOLERANCE};
use crate::time_index::SampleGrid;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of trailing characters of the prefix holding the trajectory id.
pub const ID_SUFFIX_LEN: usize = 5;

pub const STATE_SUFFIX: &str = "-x.csv";
pub const CONTROL_SUFFIX: &str = "-u.csv";
pub const GAIN_SUFFIX: &str = "-controller.csv";
pub const AFFINE_SUFFIX: &str = "-affine.csv";
pub const ROLLOUT_SUFFIX: &str = "-rollout.csv";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A loaded, validated trajectory.
#[derive(Debug, Clone)]
pub struct Trajectory {
    filename_prefix: String,
    trajectory_id: i32,

    state_dim: usize,
    control_dim: usize,

    /// Time base shared by the state, control, gain and affine tables
    grid: SampleGrid,

    state_points: Table,
    control_points: Table,
    gain_points: Table,
    affine_points: Table,

    rollout: Option<Rollout>,
}

/// A simulated execution of a time-invariant trajectory, sampled on its own
/// time base.
#[derive(Debug, Clone)]
struct Rollout {
    grid: SampleGrid,
    points: Table,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which prevent a trajectory from loading.
#[derive(Debug, thiserror::Error)]
pub enum TrajectoryError {
    #[error("Cannot parse a trajectory id from the last 5 characters of {0:?}")]
    InvalidId(String),

    #[error("The delimiter {0:?} is not an ASCII character")]
    InvalidDelimiter(char),

    #[error("Cannot read {path:?}: {source}")]
    Table {
        path: PathBuf,
        #[source]
        source: TableError,
    },

    #[error("Bad time column in {path:?}: {source}")]
    Spacing {
        path: PathBuf,
        #[source]
        source: SpacingError,
    },

    #[error("Expected {expected} columns in {path:?} but found {found}")]
    ColumnMismatch {
        path: PathBuf,
        expected: usize,
        found: usize,
    },

    #[error(
        "Inconsistent number of rows: {prefix}-x: {state}, {prefix}-u: {control}, \
         {prefix}-controller: {gain}, {prefix}-affine: {affine}"
    )]
    RowMismatch {
        prefix: String,
        state: usize,
        control: usize,
        gain: usize,
        affine: usize,
    },

    #[error("Sample period of {path:?} is {found} but the state file's is {expected}")]
    SampleRateMismatch {
        path: PathBuf,
        expected: f64,
        found: f64,
    },
}

/// Broad classes of load failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The trajectory id couldn't be parsed from the prefix
    Parse,

    /// A file couldn't be read, or isn't a well formed table
    Io,

    /// The files disagree on their shape or sample rate
    Schema,

    /// A file's timestamps aren't uniformly spaced
    Spacing,
}

/// Errors returned by trajectory accessors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AccessError {
    #[error("Trajectory is not time-invariant so has no rollout")]
    NoRollout,

    #[error("Index {index} is out of range for a table of {num_rows} rows")]
    IndexOutOfRange { index: usize, num_rows: usize },

    #[error("Requested a {requested:?} matrix but the loaded one is {actual:?}")]
    DimensionMismatch {
        requested: (usize, usize),
        actual: (usize, usize),
    },

    #[error("At least 3 state variables are needed for a position, found {0}")]
    StateTooSmall(usize),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Trajectory {
    /// Load a trajectory from CSV files sharing the given prefix.
    ///
    /// `quiet` only suppresses informational logging.
    pub fn load(filename_prefix: &str, quiet: bool) -> Result<Self, TrajectoryError> {
        Self::load_with_params(
            filename_prefix,
            &Params {
                quiet,
                ..Params::default()
            },
        )
    }

    /// Load a trajectory from CSV files using the given parameters.
    pub fn load_with_params(filename_prefix: &str, params: &Params) -> Result<Self, TrajectoryError> {
        let loader = CsvTableLoader::from_params(params)
            .ok_or(TrajectoryError::InvalidDelimiter(params.delimiter))?;

        Self::load_from(filename_prefix, params.quiet, &loader)
    }

    /// Load a trajectory using any table source.
    pub fn load_from<L: TableLoader>(
        filename_prefix: &str,
        quiet: bool,
        loader: &L,
    ) -> Result<Self, TrajectoryError> {
        if !quiet {
            info!("Loading trajectory: {}", filename_prefix);
        }

        let trajectory_id = parse_trajectory_id(filename_prefix)?;

        let (_, state_points, dt) = load_table(loader, filename_prefix, STATE_SUFFIX, quiet)?;
        let (control_path, control_points, control_dt) =
            load_table(loader, filename_prefix, CONTROL_SUFFIX, quiet)?;
        let (gain_path, gain_points, gain_dt) = load_table(loader, filename_prefix, GAIN_SUFFIX, quiet)?;
        let (affine_path, affine_points, affine_dt) =
            load_table(loader, filename_prefix, AFFINE_SUFFIX, quiet)?;

        // Minus 1 for the time column
        let state_dim = state_points.value_dim();
        let control_dim = control_points.value_dim();

        check_columns(&gain_path, &gain_points, state_dim * control_dim + 1)?;
        check_columns(&affine_path, &affine_points, control_dim + 1)?;

        let num_rows = state_points.num_rows();
        if control_points.num_rows() != num_rows
            || gain_points.num_rows() != num_rows
            || affine_points.num_rows() != num_rows
        {
            return Err(TrajectoryError::RowMismatch {
                prefix: filename_prefix.to_string(),
                state: num_rows,
                control: control_points.num_rows(),
                gain: gain_points.num_rows(),
                affine: affine_points.num_rows(),
            });
        }

        for (path, table_dt) in [
            (&control_path, control_dt),
            (&gain_path, gain_dt),
            (&affine_path, affine_dt),
        ]
        .iter()
        {
            if (table_dt - dt).abs() > SPACING_TOLERANCE {
                return Err(TrajectoryError::SampleRateMismatch {
                    path: path.to_path_buf(),
                    expected: dt,
                    found: *table_dt,
                });
            }
        }

        let grid = grid_for(&state_points, dt);

        let rollout = if gain::is_time_invariant(gain_points.data()) {
            let (_, points, rollout_dt) = load_table(loader, filename_prefix, ROLLOUT_SUFFIX, quiet)?;
            Some(Rollout {
                grid: grid_for(&points, rollout_dt),
                points,
            })
        } else {
            None
        };

        if !quiet {
            info!(
                "Loaded trajectory {}: {} samples at dt = {} s, {} states, {} controls{}",
                trajectory_id,
                num_rows,
                dt,
                state_dim,
                control_dim,
                if rollout.is_some() {
                    ", time-invariant with rollout"
                } else {
                    ""
                }
            );
        }

        Ok(Self {
            filename_prefix: filename_prefix.to_string(),
            trajectory_id,
            state_dim,
            control_dim,
            grid,
            state_points,
            control_points,
            gain_points,
            affine_points,
            rollout,
        })
    }

    pub fn filename_prefix(&self) -> &str {
        &self.filename_prefix
    }

    pub fn trajectory_id(&self) -> i32 {
        self.trajectory_id
    }

    /// Number of state variables
    pub fn state_dim(&self) -> usize {
        self.state_dim
    }

    /// Number of control variables
    pub fn control_dim(&self) -> usize {
        self.control_dim
    }

    /// Sample period of the nominal trajectory
    pub fn dt(&self) -> f64 {
        self.grid.dt
    }

    /// Number of samples in the nominal trajectory
    pub fn num_samples(&self) -> usize {
        self.grid.num_samples()
    }

    /// True if the feedback gain is the same at every sample. Exactly the
    /// time-invariant trajectories have a rollout.
    pub fn is_time_invariant(&self) -> bool {
        self.rollout.is_some()
    }

    /// Time of the first sample
    pub fn min_time(&self) -> f64 {
        self.grid.t0
    }

    /// Time of the last sample
    pub fn max_time(&self) -> f64 {
        self.grid.tf
    }

    /// Index of the nominal sample nearest to `t`, clamped to the trajectory.
    pub fn index_from_time(&self, t: f64) -> usize {
        self.grid.index_from_time(t)
    }

    /// Index of the rollout sample nearest to `t`, clamped to the rollout.
    pub fn rollout_index_from_time(&self, t: f64) -> Result<usize, AccessError> {
        self.rollout
            .as_ref()
            .map(|r| r.grid.index_from_time(t))
            .ok_or(AccessError::NoRollout)
    }

    /// Timestamp stored at the given row of the state table.
    pub fn time_at_index(&self, index: usize) -> Result<f64, AccessError> {
        self.state_points
            .time(index)
            .ok_or(AccessError::IndexOutOfRange {
                index,
                num_rows: self.state_points.num_rows(),
            })
    }

    /// Nominal state at the sample nearest to `t`.
    pub fn state(&self, t: f64) -> DVector<f64> {
        self.state_points.row_values(self.index_from_time(t))
    }

    /// Nominal control at the sample nearest to `t`.
    pub fn control_command(&self, t: f64) -> DVector<f64> {
        self.control_points.row_values(self.index_from_time(t))
    }

    /// Affine (feedforward) control offset at the sample nearest to `t`.
    pub fn affine_offset(&self, t: f64) -> DVector<f64> {
        self.affine_points.row_values(self.index_from_time(t))
    }

    /// Rollout state at the rollout sample nearest to `t`.
    pub fn rollout_state(&self, t: f64) -> Result<DVector<f64>, AccessError> {
        let rollout = self.rollout.as_ref().ok_or(AccessError::NoRollout)?;

        Ok(rollout.points.row_values(rollout.grid.index_from_time(t)))
    }

    /// Feedback gain at the sample nearest to `t`, with shape
    /// `control_dim x state_dim`.
    pub fn gain_matrix(&self, t: f64) -> DMatrix<f64> {
        gain::unpack_gain_row(
            self.gain_points.data(),
            self.index_from_time(t),
            self.control_dim,
            self.state_dim,
        )
    }

    /// Statically sized [`gain_matrix`](Self::gain_matrix). `U` and `X` must
    /// match the control and state dimensions.
    pub fn gain_matrix_fixed<const U: usize, const X: usize>(
        &self,
        t: f64,
    ) -> Result<SMatrix<f64, U, X>, AccessError> {
        if (U, X) != (self.control_dim, self.state_dim) {
            return Err(AccessError::DimensionMismatch {
                requested: (U, X),
                actual: (self.control_dim, self.state_dim),
            });
        }

        Ok(gain::unpack_gain_row_fixed::<U, X>(
            self.gain_points.data(),
            self.index_from_time(t),
        ))
    }

    /// Apply a transform to the position (first three state variables) at the
    /// sample nearest to `t`.
    pub fn transformed_point(
        &self,
        t: f64,
        transform: &Isometry3<f64>,
    ) -> Result<Point3<f64>, AccessError> {
        self.position_at_index(self.index_from_time(t))
            .map(|p| transform * p)
    }

    /// Transformed position of every sample, in order.
    pub fn transformed_points(
        &self,
        transform: &Isometry3<f64>,
    ) -> Result<Vec<Point3<f64>>, AccessError> {
        (0..self.num_samples())
            .map(|i| self.position_at_index(i).map(|p| transform * p))
            .collect()
    }

    /// Largest euclidean distance between a rollout sample and the nominal
    /// state nearest in time to it.
    pub fn max_rollout_deviation(&self) -> Result<f64, AccessError> {
        let rollout = self.rollout.as_ref().ok_or(AccessError::NoRollout)?;

        if rollout.points.value_dim() != self.state_dim {
            return Err(AccessError::DimensionMismatch {
                requested: (rollout.points.value_dim(), 1),
                actual: (self.state_dim, 1),
            });
        }

        let mut max_dev = 0f64;
        for i in 0..rollout.points.num_rows() {
            let t = rollout.points.data()[(i, 0)];
            let dev = (rollout.points.row_values(i) - self.state(t)).norm();
            max_dev = max_dev.max(dev);
        }

        Ok(max_dev)
    }

    /// Print the whole trajectory to stdout.
    pub fn print(&self) {
        println!("{}", self);
    }

    fn position_at_index(&self, index: usize) -> Result<Point3<f64>, AccessError> {
        if self.state_dim < 3 {
            return Err(AccessError::StateTooSmall(self.state_dim));
        }

        let d = self.state_points.data();
        Ok(Point3::new(d[(index, 1)], d[(index, 2)], d[(index, 3)]))
    }
}

impl TrajectoryError {
    /// The class of failure this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TrajectoryError::InvalidId(_) => ErrorKind::Parse,
            TrajectoryError::InvalidDelimiter(_) | TrajectoryError::Table { .. } => ErrorKind::Io,
            TrajectoryError::ColumnMismatch { .. }
            | TrajectoryError::RowMismatch { .. }
            | TrajectoryError::SampleRateMismatch { .. } => ErrorKind::Schema,
            TrajectoryError::Spacing { .. } => ErrorKind::Spacing,
        }
    }
}

impl fmt::Display for Trajectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "------------ Trajectory print -------------")?;
        writeln!(f, "Filename: {}", self.filename_prefix)?;
        writeln!(f, "Trajectory number: {}", self.trajectory_id)?;
        writeln!(f, "Dimension: {}", self.state_dim)?;
        writeln!(f, "u-dimension: {}", self.control_dim)?;
        writeln!(f, "dt: {}", self.grid.dt)?;
        writeln!(f, "Time-invariant: {}", self.is_time_invariant())?;

        write_table(f, "x points", "x", &self.state_points)?;
        write_table(f, "u points", "u", &self.control_points)?;
        write_table(f, "k points", "k", &self.gain_points)?;
        write_table(f, "affine points", "a", &self.affine_points)?;

        if let Some(ref rollout) = self.rollout {
            write_table(f, "rollout points", "x", &rollout.points)?;
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Parse the trajectory id from the last few characters of the prefix.
fn parse_trajectory_id(filename_prefix: &str) -> Result<i32, TrajectoryError> {
    let invalid = || TrajectoryError::InvalidId(filename_prefix.to_string());

    let start = filename_prefix
        .char_indices()
        .rev()
        .nth(ID_SUFFIX_LEN - 1)
        .map(|(i, _)| i)
        .ok_or_else(invalid)?;

    filename_prefix[start..].parse().map_err(|_| invalid())
}

/// Load one table of the trajectory and work out its sample period.
fn load_table<L: TableLoader>(
    loader: &L,
    filename_prefix: &str,
    suffix: &str,
    quiet: bool,
) -> Result<(PathBuf, Table, f64), TrajectoryError> {
    let path = PathBuf::from(format!("{}{}", filename_prefix, suffix));

    if !quiet {
        info!("Loading {}", path.display());
    }

    let table = loader
        .read_table(&path)
        .map_err(|source| TrajectoryError::Table {
            path: path.clone(),
            source,
        })?;

    let dt = table.sample_period().map_err(|source| TrajectoryError::Spacing {
        path: path.clone(),
        source,
    })?;

    debug!(
        "{}: {} rows, {} columns, dt = {}",
        path.display(),
        table.num_rows(),
        table.num_cols(),
        dt
    );

    Ok((path, table, dt))
}

fn check_columns(path: &Path, table: &Table, expected: usize) -> Result<(), TrajectoryError> {
    if table.num_cols() != expected {
        return Err(TrajectoryError::ColumnMismatch {
            path: path.to_path_buf(),
            expected,
            found: table.num_cols(),
        });
    }

    Ok(())
}

/// Time base of a table whose period has already been validated.
fn grid_for(table: &Table, dt: f64) -> SampleGrid {
    let last_index = table.num_rows() - 1;
    let d = table.data();

    SampleGrid {
        t0: d[(0, 0)],
        tf: d[(last_index, 0)],
        dt,
        last_index,
    }
}

fn write_table(f: &mut fmt::Formatter<'_>, title: &str, prefix: &str, table: &Table) -> fmt::Result {
    writeln!(f, "------------- {} ----------------", title)?;

    write!(f, "{:>12}", "t")?;
    for i in 1..table.num_cols() {
        write!(f, "\t{:>12}", format!("{}{}", prefix, i))?;
    }
    writeln!(f)?;

    for row in table.data().row_iter() {
        for (i, v) in row.iter().enumerate() {
            if i > 0 {
                write!(f, "\t")?;
            }
            write!(f, "{:>12.6}", v)?;
        }
        writeln!(f)?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
