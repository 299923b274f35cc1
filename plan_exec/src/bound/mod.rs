//! # Tracking bound and safety margin
//!
//! The tracking controller cannot follow a reference perfectly. Its worst-case tracking error is
//! reported as a box of half extents along each axis, and the planner keeps trajectories far
//! enough from obstacles that the robot stays clear anywhere inside that box.
//!
//! The bound is queried exactly once, when the problem formulator is created. Failing to obtain
//! it is fatal.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::tracking::TrackingBoundBox;
use log::info;
use serde::Serialize;
use util::params::{self, LoadError};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Something which can report the tracking bound.
pub trait TrackingBoundSource {
    fn query(&self) -> Result<TrackingBoundBox, BoundError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Reads the tracking bound from a parameter file.
#[derive(Debug, Clone)]
pub struct ParamsBoundSource {
    file: String,
}

/// A tracking bound known in advance.
#[derive(Debug, Clone, Copy)]
pub struct FixedBoundSource(pub TrackingBoundBox);

/// The scalar margin added to every obstacle, derived from the tracking bound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SafetyMargin {
    bound: TrackingBoundBox,
    margin_m: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum BoundError {
    #[error("Could not load the tracking bound: {0}")]
    LoadError(#[from] LoadError),

    #[error("The tracking bound {0:?} is invalid, all extents must be finite and non-negative")]
    InvalidBound(TrackingBoundBox),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ParamsBoundSource {
    pub fn new(file: &str) -> Self {
        Self {
            file: file.to_string(),
        }
    }
}

impl TrackingBoundSource for ParamsBoundSource {
    fn query(&self) -> Result<TrackingBoundBox, BoundError> {
        Ok(params::load(&self.file)?)
    }
}

impl TrackingBoundSource for FixedBoundSource {
    fn query(&self) -> Result<TrackingBoundBox, BoundError> {
        Ok(self.0)
    }
}

impl SafetyMargin {
    /// Query the source for the tracking bound and compute the margin from it.
    pub fn from_source(source: &dyn TrackingBoundSource) -> Result<Self, BoundError> {
        Self::from_bound(source.query()?)
    }

    /// Compute the margin from a tracking bound box, which is the distance from the centre of the
    /// box to its corner.
    pub fn from_bound(bound: TrackingBoundBox) -> Result<Self, BoundError> {
        let extents = [bound.x_m, bound.y_m, bound.z_m];
        if extents.iter().any(|e| !e.is_finite() || *e < 0.0) {
            return Err(BoundError::InvalidBound(bound));
        }

        let margin_m = util::maths::norm(&[0.0; 3], &extents).unwrap_or(0.0);

        info!(
            "Tracking bound ({}, {}, {}) m gives a safety margin of {:.3} m",
            bound.x_m, bound.y_m, bound.z_m, margin_m
        );

        Ok(Self { bound, margin_m })
    }

    pub fn margin_m(&self) -> f64 {
        self.margin_m
    }

    /// Distance from an obstacle's centre inside which its cost is active.
    pub fn obstacle_threshold_m(&self, radius_m: f64) -> f64 {
        2.0 * (radius_m + self.margin_m)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
