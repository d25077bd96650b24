//! Utility library for the trajectory software
//!
//! Holds the ambient pieces shared by the executables: session management,
//! logging, parameter loading and host lookups.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod host;
pub mod logger;
pub mod params;
pub mod session;
pub mod time;
