//! # Gain matrices
//!
//! The controller file stores one feedback gain matrix per sample, flattened
//! row-major into a single table row after the time column. For `U` controls
//! and `X` states, row `i` of the matrix occupies columns `i*X + 1` through
//! `i*X + X`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{DMatrix, SMatrix};

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Unpack row `row` of a gain table into a `control_dim x state_dim` matrix.
///
/// # Panics
/// - If `row` is out of range or the table has fewer than
///   `control_dim * state_dim + 1` columns.
pub fn unpack_gain_row(
    gains: &DMatrix<f64>,
    row: usize,
    control_dim: usize,
    state_dim: usize,
) -> DMatrix<f64> {
    DMatrix::from_fn(control_dim, state_dim, |i, j| {
        gains[(row, gain_column(i, j, state_dim))]
    })
}

/// Statically sized version of [`unpack_gain_row`].
///
/// # Panics
/// - As for [`unpack_gain_row`] with `control_dim = U` and `state_dim = X`.
pub fn unpack_gain_row_fixed<const U: usize, const X: usize>(
    gains: &DMatrix<f64>,
    row: usize,
) -> SMatrix<f64, U, X> {
    SMatrix::<f64, U, X>::from_fn(|i, j| gains[(row, gain_column(i, j, X))])
}

/// True if every row of the gain table holds the same gains. The time column
/// is ignored.
pub fn is_time_invariant(gains: &DMatrix<f64>) -> bool {
    if gains.nrows() == 0 || gains.ncols() < 2 {
        return true;
    }

    let num_gains = gains.ncols() - 1;
    let first = gains.row(0).columns(1, num_gains).into_owned();

    gains
        .row_iter()
        .skip(1)
        .all(|r| r.columns(1, num_gains) == first)
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Table column holding element `(i, j)` of the gain matrix. Column 0 is
/// time.
#[inline]
fn gain_column(i: usize, j: usize, state_dim: usize) -> usize {
    i * state_dim + j + 1
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
