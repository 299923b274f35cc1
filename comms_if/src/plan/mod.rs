//! # Planning messages
//!
//! Messages exchanged between the replan coordinator and the trajectory solver. A request is a
//! fire-and-forget message, the solver answers later with a [`PlanResponse`] carrying the same
//! request id.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod traj;

pub use traj::TrajectoryMsg;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A flat state vector, the meaning of each element is given by the dynamics model in use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StateMsg {
    pub x: Vec<f64>,
}

/// A request for a new trajectory from `start` to `goal`, beginning at `start_time_s`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplanRequest {
    /// Identifier of the request, echoed back in the response.
    pub id: u64,

    /// State the new trajectory should begin from.
    pub start: StateMsg,

    /// State the new trajectory should end at.
    pub goal: StateMsg,

    /// Session time at which the new trajectory begins, in seconds.
    pub start_time_s: f64,
}

/// The solver's answer to a [`ReplanRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResponse {
    /// Id of the request this is a response to.
    pub request_id: u64,

    pub result: PlanResult,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlanResult {
    /// A new trajectory was found.
    Trajectory(TrajectoryMsg),

    /// The solver could not find a trajectory, with the reason.
    Infeasible(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl StateMsg {
    pub fn new(x: Vec<f64>) -> Self {
        Self { x }
    }
}
