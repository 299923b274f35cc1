//! # Tracking messages
//!
//! Outputs consumed by the low-level tracking controller and diagnostics, and the tracking bound
//! reported by the controller.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{serde::ts_milliseconds, DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::plan::StateMsg;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Reference state for the tracking controller to follow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceMsg {
    /// Session time the reference is valid at, in seconds.
    pub time_s: f64,

    pub state: StateMsg,

    /// True if the reference is a hold at the end of the trajectory rather than a point along it.
    pub hold: bool,
}

/// Transform of the planner frame in the fixed frame, for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseTransform {
    /// UTC timestamp of the transform
    #[serde(with = "ts_milliseconds")]
    pub stamp: DateTime<Utc>,

    pub frame_id: String,
    pub child_frame_id: String,

    pub translation_m: [f64; 3],

    /// Rotation quaternion as `[x, y, z, w]`
    pub rotation_q: [f64; 4],
}

/// Worst-case tracking error box, as half extents along each axis of the planner frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackingBoundBox {
    pub x_m: f64,
    pub y_m: f64,
    pub z_m: f64,
}
