//! Trajectory inspection executable.
//!
//! Loads a single trajectory and dumps it for inspection.
//!
//! # Usage
//!
//! ```text
//! traj_exec <filename_prefix> [--quiet]
//! ```
//!
//! The prefix is the common part of the trajectory's file names, e.g.
//! `trajs/traj-00012` for `trajs/traj-00012-x.csv` and friends. Loading
//! parameters are read from `params/traj.toml` under the software root if it
//! exists.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, info, warn};
use std::env;

// Internal
use traj_lib::{Params, Trajectory};
use util::{
    logger::{logger_init, LevelFilter},
    params,
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Parameter file holding the loading parameters
const PARAMS_FILE: &str = "traj.toml";

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    let session = Session::new("traj_exec", "sessions").wrap_err("Failed to create the session")?;

    logger_init(LevelFilter::Debug, Some(&session)).wrap_err("Failed to initialise logging")?;

    info!("Trajectory Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- ARGUMENTS ----

    let args: Vec<String> = env::args().collect();
    debug!("CLI arguments: {:?}", args);

    let prefix = match args.get(1) {
        Some(p) => p.clone(),
        None => return Err(eyre!("Usage: traj_exec <filename_prefix> [--quiet]")),
    };
    let quiet_flag = args.iter().skip(2).any(|a| a == "--quiet");

    // ---- LOAD PARAMETERS ----

    let mut traj_params: Params = match params::load(PARAMS_FILE) {
        Ok(p) => p,
        Err(params::LoadError::FileLoadError(e)) => {
            warn!("Could not open {} ({}), using default parameters", PARAMS_FILE, e);
            Params::default()
        }
        Err(e) => return Err(e).wrap_err("Could not load trajectory params"),
    };
    traj_params.quiet |= quiet_flag;

    info!("Loading parameters: {:?}", traj_params);

    // ---- LOAD TRAJECTORY ----

    let traj = Trajectory::load_with_params(&prefix, &traj_params)
        .wrap_err_with(|| format!("Failed to load the trajectory {}", prefix))?;

    info!(
        "Trajectory {} spans {} s to {} s ({} samples)",
        traj.trajectory_id(),
        traj.min_time(),
        traj.max_time(),
        traj.num_samples()
    );

    traj.print();

    if traj.is_time_invariant() {
        match traj.max_rollout_deviation() {
            Ok(d) => info!("Maximum deviation of the rollout from nominal: {}", d),
            Err(e) => warn!("Cannot compare the rollout to nominal: {}", e),
        }
    }

    Ok(())
}
