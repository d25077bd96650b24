//! # Trajectory library.
//!
//! Loads precomputed trajectories (nominal state and control, feedback gains
//! and affine offsets sampled at a fixed rate) and looks up their samples by
//! time.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Gain matrix unpacking - converts flattened gain rows back into matrices
pub mod gain;

/// Loading parameters
pub mod params;

/// Tables - dense numeric tables and the loaders which read them from disk
pub mod table;

/// Time index mapping - converts query times into sample indices
pub mod time_index;

/// Trajectory - the validated set of tables making up one trajectory
pub mod trajectory;

#[cfg(test)]
mod test_util;

// ------------------------------------------------------------------------------------------------
// REEXPORTS
// ------------------------------------------------------------------------------------------------

pub use params::Params;
pub use table::{CsvTableLoader, NonNumericPolicy, Table, TableError, TableLoader};
pub use trajectory::{AccessError, ErrorKind, Trajectory, TrajectoryError};
