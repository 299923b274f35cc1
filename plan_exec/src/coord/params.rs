//! Replan coordinator parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Deserialize, Clone)]
pub struct CoordParams {
    /// Frame the reference is expressed in
    pub fixed_frame: String,

    /// Frame attached to the reference position
    pub planner_frame: String,

    /// Control period, the time between ticks
    pub time_step_s: f64,

    /// Time allowed for the solver to produce a trajectory. New trajectories start this far in
    /// the future.
    pub planner_runtime_s: f64,

    /// Start state, used when there is no trajectory yet
    pub start: Vec<f64>,

    /// Goal state
    pub goal: Vec<f64>,

    #[serde(default)]
    pub replan_policy: ReplanPolicy,

    /// If set, a request which has not been answered after this long is abandoned
    #[serde(default)]
    pub solver_timeout_s: Option<f64>,

    /// Minimum time between replans while holding at the end of a trajectory
    pub hold_replan_period_s: f64,

    /// Minimum time between repeats of the same warning
    pub warn_period_s: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// When the coordinator asks for a new trajectory, other than when it has none.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReplanPolicy {
    /// Only replan on environment changes
    Once,

    /// Replan every `period_s` seconds
    Periodic { period_s: f64 },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for ReplanPolicy {
    fn default() -> Self {
        ReplanPolicy::Once
    }
}
