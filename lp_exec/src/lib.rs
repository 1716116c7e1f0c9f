//! # Local planner library.
//!
//! This library allows the executable, benchmarks, and other crates in the workspace to access
//! the local planner and the items it is built from.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Cost functions - score trajectories against the cost map and the plan
pub mod cost;

/// Localisation types - planar poses and velocities
pub mod loc;

/// Local planner - selects the velocity command for each cycle
pub mod local_planner;

/// Maps - the cost map and the distance grids derived from it
pub mod map;

/// Executable parameters
pub mod params;

/// Paths - the global plan and tracking of the robot along it
pub mod path;

/// Planners - sampling and recovery planners producing trajectories
pub mod plan;

/// Simulation - a generated obstacle field and simple kinematic robot
pub mod sim;

/// Status - stuck detection and the recovery state machine
pub mod status;

/// Trajectories - forward simulation of velocity samples
pub mod traj;
