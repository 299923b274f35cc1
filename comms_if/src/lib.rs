//! # Communications interface crate.
//!
//! Provides the serialisable messages exchanged between the planning executable and its
//! collaborators: the trajectory solver, the tracking controller and the tracking bound service.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Replan requests, trajectories and solver responses
pub mod plan;

/// Reference outputs, pose transforms and the tracking bound
pub mod tracking;
