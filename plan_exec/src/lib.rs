//! # Planner library.
//!
//! This library allows other crates in the workspace to access items defined inside the planner
//! crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Tracking bound - the safety margin added around every obstacle
pub mod bound;

/// Replan coordinator - follows the current trajectory and decides when to ask for a new one
pub mod coord;

/// Dynamics models - the motion models the planner can plan for
pub mod dynamics;

/// Environment - the workspace and obstacles the planner avoids
pub mod env;

/// Executable parameters
pub mod params;

/// Problem - cost terms and the formulator building one problem per replan request
pub mod problem;

/// Scheduler - the single event queue driving the coordinator
pub mod sched;

/// Solver - the trajectory optimiser interface and its worker thread
pub mod solver;

/// Telemetry
pub mod tm;

/// Trajectory - the time-indexed sequence of states being followed
pub mod traj;
