//! # Time index mapping
//!
//! Trajectories are sampled at a constant rate, so the row nearest to a query
//! time can be computed directly instead of searched for.

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The time base of a uniformly sampled table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleGrid {
    /// Time of the first sample
    pub t0: f64,

    /// Time of the last sample
    pub tf: f64,

    /// Sample period
    pub dt: f64,

    /// Index of the last sample
    pub last_index: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SampleGrid {
    /// Index of the sample nearest to `t`.
    ///
    /// Times before the first sample map to 0 and times after the last sample
    /// map to `last_index`. In between, `t` is rounded to the nearest multiple
    /// of `dt` past `t0`; a time exactly halfway between two samples maps to the
    /// later one. No interpolation is done.
    pub fn index_from_time(&self, t: f64) -> usize {
        // NaN lands here too
        if !(t >= self.t0) {
            return 0;
        }
        if t > self.tf {
            return self.last_index;
        }

        let offset = t - self.t0;

        // `%` is exact, so `offset - remainder` is a whole number of periods
        // and the division only needs rounding, not flooring.
        let remainder = offset % self.dt;
        let mut num_dts = ((offset - remainder) / self.dt).round() as usize;

        if remainder >= 0.5 * self.dt {
            num_dts += 1;
        }

        num_dts.min(self.last_index)
    }

    /// Number of samples on the grid.
    pub fn num_samples(&self) -> usize {
        self.last_index + 1
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
