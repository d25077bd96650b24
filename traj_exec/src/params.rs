//! Trajectory loading parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use crate::table::NonNumericPolicy;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for loading trajectories
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Params {
    /// Suppress informational logging during loading. Validation is
    /// unaffected.
    pub quiet: bool,

    /// How fields which fail to parse as numbers are handled.
    pub non_numeric: NonNumericPolicy,

    /// Field delimiter of the trajectory files. Must be an ASCII character.
    pub delimiter: char,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            quiet: false,
            non_numeric: NonNumericPolicy::default(),
            delimiter: ',',
        }
    }
}
