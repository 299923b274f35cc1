//! Problem formulator parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

use crate::dynamics::DynamicsKind;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the problem formulator, loaded from `problem.toml`.
#[derive(Debug, Deserialize, Clone)]
pub struct ProblemParams {
    /// Dynamics model of the robot
    #[serde(default)]
    pub dynamics: DynamicsKind,

    /// Length of each planned trajectory
    pub horizon_s: f64,

    /// Time between samples of the trajectory
    pub time_step_s: f64,

    /// Length of the window at the end of the horizon in which the goal costs are active
    pub final_time_window_s: f64,

    /// Weight on the control effort cost
    pub control_effort_weight: f64,

    /// Weight on each axis of the goal cost
    pub goal_weight: f64,

    /// Weight on each obstacle cost
    pub obstacle_weight: f64,
}

impl Default for ProblemParams {
    fn default() -> Self {
        Self {
            dynamics: DynamicsKind::DoubleIntegrator3D,
            horizon_s: 5.0,
            time_step_s: 0.25,
            final_time_window_s: 0.5,
            control_effort_weight: 1.0,
            goal_weight: 10.0,
            obstacle_weight: 100.0,
        }
    }
}
