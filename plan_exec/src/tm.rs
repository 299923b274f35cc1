//! # Planner telemetry

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::tracking::ReferenceMsg;
use serde::Serialize;

use crate::coord::{CoordMode, ReplanCoordinator, StatusReport};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct PlanTm {
    pub time_s: f64,
    pub mode: CoordMode,
    pub awaiting_plan: bool,

    /// Number of samples in the current trajectory
    pub traj_len: usize,

    /// End time of the current trajectory, if there is one
    pub traj_end_s: Option<f64>,

    /// Duration of the current trajectory, if there is one
    pub traj_duration_s: Option<f64>,

    pub num_obstacles: usize,

    /// The last reference sent to the tracking controller
    pub reference: Option<ReferenceMsg>,

    pub report: StatusReport,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PlanTm {
    pub fn new(
        time_s: f64,
        coord: &ReplanCoordinator,
        num_obstacles: usize,
        reference: Option<ReferenceMsg>,
    ) -> Self {
        Self {
            time_s,
            mode: coord.mode(),
            awaiting_plan: coord.is_awaiting_plan(),
            traj_len: coord.trajectory().len(),
            traj_end_s: coord.trajectory().last_time().ok(),
            traj_duration_s: coord.trajectory().duration().ok(),
            num_obstacles,
            reference,
            report: *coord.report(),
        }
    }
}
