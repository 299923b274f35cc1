//! # Trajectory
//!
//! A trajectory is an ordered, time-indexed sequence of `(state, control)` samples produced by
//! the solver. Trajectories are built once, in full, and are never modified afterwards: the
//! coordinator replaces its trajectory wholesale whenever a new plan arrives.
//!
//! Interpolation is linear in every state component between the two samples bracketing the
//! requested time. Times before the first sample clamp to the first state, times after the last
//! sample are an error, it is up to the caller to decide what to do beyond the end of a
//! trajectory.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::plan::{StateMsg, TrajectoryMsg};
use log::{error, trace};
use nalgebra::{DVector, Vector3};
use serde::Serialize;

use crate::dynamics::Dynamics;
use util::maths::unit_fraction;

// ------------------------------------------------------------------------------------------------
// TYPES
// ------------------------------------------------------------------------------------------------

/// A state vector, the layout of which is defined by the dynamics model.
pub type State = DVector<f64>;

/// A control vector, the layout of which is defined by the dynamics model.
pub type Control = DVector<f64>;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// One point along a trajectory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub time_s: f64,
    pub state: State,
    pub control: Control,
}

/// A time-ordered sequence of samples.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Trajectory {
    samples: Vec<Sample>,
}

/// Trajectory visualisation: the position of every sample coloured from blue (start) to red
/// (end) over the trajectory's duration.
#[derive(Debug, Clone, Serialize)]
pub struct TrajVis {
    pub frame_id: String,
    pub points_m: Vec<[f64; 3]>,

    /// `[r, g, b, a]` for each point
    pub colours: Vec<[f64; 4]>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TrajError {
    #[error("The trajectory is empty")]
    EmptyTrajectory,

    #[error("Cannot interpolate at {t_s} s, which is after the last time of the trajectory ({last_s} s)")]
    AfterLastTime { t_s: f64, last_s: f64 },

    #[error("Sample {index} has a {what} of dimension {found}, expected {expected}")]
    DimensionMismatch {
        index: usize,
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Sample {index} has a non-finite time ({time_s})")]
    NonFiniteTime { index: usize, time_s: f64 },

    #[error("Cannot interpolate at a non-finite time ({0})")]
    NonFiniteQuery(f64),

    #[error("No pair of samples brackets {t_s} s")]
    NotBracketed { t_s: f64 },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Trajectory {
    /// Create a trajectory from a list of samples.
    ///
    /// Timestamps must be non-decreasing, any inversion is repaired by carrying the larger time
    /// forward.
    pub fn new(mut samples: Vec<Sample>) -> Self {
        for i in 1..samples.len() {
            if samples[i - 1].time_s > samples[i].time_s {
                error!(
                    "Trajectory: fixing an inversion in the list of times at sample {} ({} s > {} s)",
                    i,
                    samples[i - 1].time_s,
                    samples[i].time_s
                );
                samples[i].time_s = samples[i - 1].time_s;
            }
        }

        Self { samples }
    }

    /// Create a trajectory from a wire message, checking every sample against the dimensions of
    /// the given dynamics model.
    ///
    /// If the message's arrays have different lengths the longer ones are truncated. Non-finite
    /// times are rejected.
    pub fn from_msg<D: Dynamics>(msg: &TrajectoryMsg, dynamics: &D) -> Result<Self, TrajError> {
        if !msg.is_consistent() {
            error!(
                "Trajectory: states/controls/times are not the same length ({}/{}/{}), truncating",
                msg.states.len(),
                msg.controls.len(),
                msg.times_s.len()
            );
        }

        let mut samples = Vec::with_capacity(msg.num_complete());

        for index in 0..msg.num_complete() {
            let x = &msg.states[index].x;
            let u = &msg.controls[index];
            let time_s = msg.times_s[index];

            if !time_s.is_finite() {
                return Err(TrajError::NonFiniteTime { index, time_s });
            }

            if x.len() != dynamics.x_dim() {
                return Err(TrajError::DimensionMismatch {
                    index,
                    what: "state",
                    expected: dynamics.x_dim(),
                    found: x.len(),
                });
            }
            if u.len() != dynamics.u_dim() {
                return Err(TrajError::DimensionMismatch {
                    index,
                    what: "control",
                    expected: dynamics.u_dim(),
                    found: u.len(),
                });
            }

            samples.push(Sample {
                time_s,
                state: DVector::from_column_slice(x),
                control: DVector::from_column_slice(u),
            });
        }

        Ok(Self::new(samples))
    }

    /// Convert into the wire format.
    pub fn to_msg(&self) -> TrajectoryMsg {
        TrajectoryMsg {
            states: self
                .samples
                .iter()
                .map(|s| StateMsg::new(s.state.as_slice().to_vec()))
                .collect(),
            controls: self
                .samples
                .iter()
                .map(|s| s.control.as_slice().to_vec())
                .collect(),
            times_s: self.samples.iter().map(|s| s.time_s).collect(),
        }
    }

    /// Number of samples in the trajectory.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn first_time(&self) -> Result<f64, TrajError> {
        self.first().map(|s| s.time_s)
    }

    pub fn last_time(&self) -> Result<f64, TrajError> {
        self.last().map(|s| s.time_s)
    }

    pub fn first_state(&self) -> Result<State, TrajError> {
        self.first().map(|s| s.state.clone())
    }

    pub fn last_state(&self) -> Result<State, TrajError> {
        self.last().map(|s| s.state.clone())
    }

    /// Duration between the first and last samples in seconds.
    pub fn duration(&self) -> Result<f64, TrajError> {
        Ok(self.last_time()? - self.first_time()?)
    }

    /// Interpolate the state at the given time.
    pub fn interpolate(&self, t_s: f64) -> Result<State, TrajError> {
        if !t_s.is_finite() {
            return Err(TrajError::NonFiniteQuery(t_s));
        }

        let first = self.first()?;
        let last = self.last()?;

        if t_s <= first.time_s {
            if t_s < first.time_s {
                trace!("Trajectory: interpolating before first time, clamping");
            }
            return Ok(first.state.clone());
        }

        if t_s > last.time_s {
            return Err(TrajError::AfterLastTime {
                t_s,
                last_s: last.time_s,
            });
        }

        // Index of the first sample not before t, in [1, len - 1] for ordered finite times
        let hi = self.samples.partition_point(|s| s.time_s < t_s);
        let (lo_sample, hi_sample) = match (
            hi.checked_sub(1).and_then(|lo| self.samples.get(lo)),
            self.samples.get(hi),
        ) {
            (Some(lo), Some(hi)) => (lo, hi),
            _ => return Err(TrajError::NotBracketed { t_s }),
        };

        if hi_sample.time_s == t_s {
            return Ok(hi_sample.state.clone());
        }

        let frac = (t_s - lo_sample.time_s) / (hi_sample.time_s - lo_sample.time_s);

        Ok(&lo_sample.state * (1.0 - frac) + &hi_sample.state * frac)
    }

    /// Build the visualisation of this trajectory in the given frame.
    pub fn visualise<D: Dynamics>(&self, dynamics: &D, frame_id: &str) -> TrajVis {
        let (t0, t1) = match (self.first_time(), self.last_time()) {
            (Ok(t0), Ok(t1)) => (t0, t1),
            _ => (0.0, 0.0),
        };

        let points_m = self
            .samples
            .iter()
            .map(|s| {
                let p: Vector3<f64> = dynamics.position(&s.state);
                [p.x, p.y, p.z]
            })
            .collect();

        let colours = self
            .samples
            .iter()
            .map(|s| {
                let r = unit_fraction(t0, t1, s.time_s, 1e-8);
                [r, 0.0, 1.0 - r, 0.9]
            })
            .collect();

        TrajVis {
            frame_id: frame_id.to_string(),
            points_m,
            colours,
        }
    }

    fn first(&self) -> Result<&Sample, TrajError> {
        self.samples.first().ok_or(TrajError::EmptyTrajectory)
    }

    fn last(&self) -> Result<&Sample, TrajError> {
        self.samples.last().ok_or(TrajError::EmptyTrajectory)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
