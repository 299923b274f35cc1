//! # Planner Executable Parameters
//!
//! This module provides parameters for the planner executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::coord::CoordParams;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the executable, loaded from `plan_exec.toml`.
#[derive(Debug, Deserialize, Clone)]
pub struct PlanExecParams {
    /// Time after startup at which the coordinator is told the system is ready
    pub ready_delay_s: f64,

    /// Period between telemetry packets
    pub tm_period_s: f64,

    /// Name of the environment parameter file, which is watched for changes
    pub env_file: String,

    /// Name of the tracking bound parameter file
    pub tracking_bound_file: String,

    /// If set the executable stops after running for this long
    #[serde(default)]
    pub max_run_time_s: Option<f64>,

    /// Per-target log level overrides, from module path to level name
    #[serde(default)]
    pub log_levels: BTreeMap<String, String>,

    /// Replan coordinator parameters
    pub coord: CoordParams,
}
