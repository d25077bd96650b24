//! # Tables
//!
//! A table is a dense block of `f64` values whose first column is a sample
//! time. Every file making up a trajectory is loaded into one of these through
//! a [`TableLoader`]. The default loader, [`CsvTableLoader`], reads delimited
//! text files where the first line is a header naming the columns.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use csv::{ReaderBuilder, Trim};
use log::{debug, warn};
use nalgebra::{DMatrix, DVector};
use serde::Deserialize;
use std::fs::File;
use std::path::Path;

// Internal
use crate::params::Params;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Largest deviation (either way) from the nominal sample period tolerated
/// between two successive timestamps, as a multiple of machine epsilon.
pub const SPACING_TOLERANCE_EPS: f64 = 5.0;

/// Largest deviation from the nominal sample period tolerated between two
/// successive timestamps.
pub const SPACING_TOLERANCE: f64 = SPACING_TOLERANCE_EPS * std::f64::EPSILON;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A rectangular table of samples. Column 0 holds the sample time.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    data: DMatrix<f64>,
}

/// Loads tables from delimited text files using the `csv` crate.
#[derive(Debug, Clone, Copy)]
pub struct CsvTableLoader {
    delimiter: u8,
    non_numeric: NonNumericPolicy,
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A source of tables.
///
/// Given a path, implementors return a dense rectangular table, or an error if
/// the source cannot be read or is malformed.
pub trait TableLoader {
    fn read_table(&self, path: &Path) -> Result<Table, TableError>;
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// What to do with a field that doesn't parse as a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NonNumericPolicy {
    /// Silently replace the field with `0.0`.
    Zero,

    /// Replace the field with `0.0` and log a warning.
    Warn,

    /// Reject the whole table.
    Reject,
}

/// Errors raised while reading a table.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("Cannot open the table: {0}")]
    Open(std::io::Error),

    #[error("The table has no header row")]
    MissingHeader,

    #[error("The table is malformed: {0}")]
    Malformed(#[from] csv::Error),

    #[error("Non-numeric value {value:?} at data row {row}, column {col}")]
    NonNumeric {
        row: usize,
        col: usize,
        value: String,
    },
}

/// Ways in which the time column of a table can fail to be uniformly sampled.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SpacingError {
    #[error("At least 2 rows are needed to infer the sample period, found {rows}")]
    TooFewRows { rows: usize },

    #[error("The sample period must be positive, found dt = {dt}")]
    NonPositiveDt { dt: f64 },

    #[error(
        "Non-constant dt. Expected dt = {expected_dt} but got t[{row}] - t[{prev_row}] = \
         {actual_dt} (residual = {residual})"
    )]
    NonConstantDt {
        row: usize,
        prev_row: usize,
        expected_dt: f64,
        actual_dt: f64,
        residual: f64,
    },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Table {
    /// Wrap a matrix whose first column holds sample times.
    pub fn new(data: DMatrix<f64>) -> Self {
        Self { data }
    }

    /// Build a table from row-major values.
    ///
    /// # Panics
    /// - If `values.len() != num_rows * num_cols`.
    pub fn from_row_slice(num_rows: usize, num_cols: usize, values: &[f64]) -> Self {
        Self::new(DMatrix::from_row_slice(num_rows, num_cols, values))
    }

    pub fn num_rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn num_cols(&self) -> usize {
        self.data.ncols()
    }

    /// Number of value columns, i.e. excluding the time column.
    pub fn value_dim(&self) -> usize {
        self.num_cols().saturating_sub(1)
    }

    /// The raw matrix, time column included.
    pub fn data(&self) -> &DMatrix<f64> {
        &self.data
    }

    /// Timestamp of the given row.
    pub fn time(&self, row: usize) -> Option<f64> {
        if row < self.num_rows() && self.num_cols() > 0 {
            Some(self.data[(row, 0)])
        } else {
            None
        }
    }

    /// The values of a row with the time column removed.
    ///
    /// # Panics
    /// - If `row` is out of range.
    pub fn row_values(&self, row: usize) -> DVector<f64> {
        self.data
            .row(row)
            .columns(1, self.value_dim())
            .transpose()
    }

    /// Infer the sample period from the first two timestamps and check every
    /// later pair of timestamps is separated by the same period.
    ///
    /// A step may differ from the period by at most [`SPACING_TOLERANCE`]
    /// either way, so shrinking or backwards steps are rejected too.
    pub fn sample_period(&self) -> Result<f64, SpacingError> {
        let rows = self.num_rows();
        if rows < 2 || self.num_cols() == 0 {
            return Err(SpacingError::TooFewRows { rows });
        }

        let t = self.data.column(0);
        let dt = t[1] - t[0];

        if !(dt > 0.0) {
            return Err(SpacingError::NonPositiveDt { dt });
        }

        for row in 2..rows {
            let actual_dt = t[row] - t[row - 1];
            let residual = actual_dt - dt;

            if residual.abs() > SPACING_TOLERANCE {
                return Err(SpacingError::NonConstantDt {
                    row,
                    prev_row: row - 1,
                    expected_dt: dt,
                    actual_dt,
                    residual,
                });
            }
        }

        Ok(dt)
    }
}

impl From<DMatrix<f64>> for Table {
    fn from(data: DMatrix<f64>) -> Self {
        Self::new(data)
    }
}

impl Default for NonNumericPolicy {
    fn default() -> Self {
        NonNumericPolicy::Warn
    }
}

impl CsvTableLoader {
    pub fn new(delimiter: u8, non_numeric: NonNumericPolicy) -> Self {
        Self {
            delimiter,
            non_numeric,
        }
    }

    /// Build a loader from the trajectory parameters.
    ///
    /// Returns `None` if the configured delimiter isn't a single byte.
    pub fn from_params(params: &Params) -> Option<Self> {
        if params.delimiter.is_ascii() {
            Some(Self::new(params.delimiter as u8, params.non_numeric))
        } else {
            None
        }
    }

    fn parse_field(&self, field: &str, row: usize, col: usize, path: &Path) -> Result<f64, TableError> {
        match field.parse::<f64>() {
            Ok(v) => Ok(v),
            Err(_) => match self.non_numeric {
                NonNumericPolicy::Zero => Ok(0.0),
                NonNumericPolicy::Warn => {
                    warn!(
                        "{:?}: non-numeric value {:?} at data row {}, column {} read as 0.0",
                        path, field, row, col
                    );
                    Ok(0.0)
                }
                NonNumericPolicy::Reject => Err(TableError::NonNumeric {
                    row,
                    col,
                    value: field.to_string(),
                }),
            },
        }
    }
}

impl Default for CsvTableLoader {
    fn default() -> Self {
        Self::new(b',', NonNumericPolicy::default())
    }
}

impl TableLoader for CsvTableLoader {
    fn read_table(&self, path: &Path) -> Result<Table, TableError> {
        let file = File::open(path).map_err(TableError::Open)?;

        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(file);

        // The header is discarded but sizes the table
        let num_cols = reader.headers()?.len();
        if num_cols == 0 {
            return Err(TableError::MissingHeader);
        }

        let mut values = Vec::new();
        let mut num_rows = 0;

        for record in reader.records() {
            let record = record?;

            for (col, field) in record.iter().enumerate() {
                values.push(self.parse_field(field, num_rows, col, path)?);
            }

            num_rows += 1;
        }

        debug!("{:?}: read {} rows of {} columns", path, num_rows, num_cols);

        Ok(Table::from_row_slice(num_rows, num_cols, &values))
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_read_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "t-x.csv", "t,x,y\n0,1.5,2\n0.1, -3 ,4e-2\n");

        let table = CsvTableLoader::default().read_table(&path).unwrap();

        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.num_cols(), 3);
        assert_eq!(table.value_dim(), 2);
        assert_eq!(table.time(1), Some(0.1));
        assert_eq!(table.time(2), None);
        assert_eq!(table.row_values(1), DVector::from_vec(vec![-3.0, 0.04]));
    }

    #[test]
    fn test_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "t-x.csv", "t,x\n");

        let table = CsvTableLoader::default().read_table(&path).unwrap();
        assert_eq!(table.num_rows(), 0);
        assert_eq!(table.num_cols(), 2);
    }

    #[test]
    fn test_read_errors() {
        let dir = tempfile::tempdir().unwrap();
        let loader = CsvTableLoader::default();

        assert!(matches!(
            loader.read_table(&dir.path().join("missing.csv")),
            Err(TableError::Open(_))
        ));

        let empty = write_file(&dir, "empty.csv", "");
        assert!(matches!(
            loader.read_table(&empty),
            Err(TableError::MissingHeader)
        ));

        let ragged = write_file(&dir, "ragged.csv", "t,x\n0,1\n1,2,3\n");
        assert!(matches!(
            loader.read_table(&ragged),
            Err(TableError::Malformed(_))
        ));
    }

    #[test]
    fn test_non_numeric_policy() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "t-u.csv", "t,u\n0,abc\n1,\n");

        for policy in [NonNumericPolicy::Zero, NonNumericPolicy::Warn].iter() {
            let table = CsvTableLoader::new(b',', *policy).read_table(&path).unwrap();
            assert_eq!(table.row_values(0)[0], 0.0);
            assert_eq!(table.row_values(1)[0], 0.0);
        }

        match CsvTableLoader::new(b',', NonNumericPolicy::Reject).read_table(&path) {
            Err(TableError::NonNumeric { row, col, value }) => {
                assert_eq!((row, col), (0, 1));
                assert_eq!(value, "abc");
            }
            other => panic!("Expected a non-numeric error, got {:?}", other),
        }
    }

    #[test]
    fn test_delimiter() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "t-x.csv", "t;x\n0;1\n0.5;2\n");

        let table = CsvTableLoader::new(b';', NonNumericPolicy::Reject)
            .read_table(&path)
            .unwrap();
        assert_eq!(table.sample_period(), Ok(0.5));
    }

    #[test]
    fn test_sample_period() {
        let times: Vec<f64> = (0..100).map(|i| i as f64 * 0.05).collect();
        let table = Table::new(DMatrix::from_column_slice(100, 1, &times));
        assert_eq!(table.sample_period(), Ok(0.05));

        // Break in the spacing at row 3
        let table = Table::from_row_slice(4, 1, &[0.0, 0.05, 0.1, 0.2]);
        match table.sample_period() {
            Err(SpacingError::NonConstantDt {
                row,
                prev_row,
                residual,
                ..
            }) => {
                assert_eq!((row, prev_row), (3, 2));
                assert!((residual - 0.05).abs() < 1e-12);
            }
            other => panic!("Expected a spacing error, got {:?}", other),
        }

        // Shrinking and backwards steps
        for (times, expected_residual) in [
            ([0.0, 0.05, 0.06], -0.04),
            ([0.0, 0.05, 0.0], -0.1),
        ]
        .iter()
        {
            match Table::from_row_slice(3, 1, times).sample_period() {
                Err(SpacingError::NonConstantDt { row, residual, .. }) => {
                    assert_eq!(row, 2);
                    assert!((residual - expected_residual).abs() < 1e-12);
                }
                other => panic!("Expected a spacing error for {:?}, got {:?}", times, other),
            }
        }

        assert_eq!(
            Table::from_row_slice(1, 1, &[0.0]).sample_period(),
            Err(SpacingError::TooFewRows { rows: 1 })
        );
        assert_eq!(
            Table::from_row_slice(2, 1, &[1.0, 1.0]).sample_period(),
            Err(SpacingError::NonPositiveDt { dt: 0.0 })
        );
    }
}
