//! # Problem
//!
//! A problem is everything the solver needs to compute one trajectory: the dynamics, the ordered
//! cost terms, the horizon and time step, the initial state and a warm-start operating point.
//! Problems are built fresh by the [`ProblemFormulator`] for every replan request and are never
//! modified afterwards.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod cost;
mod formulator;
pub mod params;

pub use cost::{CostTerm, FinalTimeCost, ObstacleCost3D, QuadraticCost};
pub use formulator::{FormulatorError, ProblemFormulator};
pub use params::ProblemParams;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::DVector;

use crate::{
    dynamics::DynamicsKind,
    traj::{Control, Sample, State, Trajectory},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A single trajectory optimisation problem.
#[derive(Debug, Clone)]
pub struct Problem {
    pub dynamics: DynamicsKind,

    /// Cost terms, in the order they were added
    pub costs: Vec<CostTerm>,

    pub horizon_s: f64,
    pub time_step_s: f64,

    /// Session time the problem starts at
    pub start_time_s: f64,

    /// Initial state
    pub x0: State,

    /// Warm start
    pub operating_point: OperatingPoint,
}

/// A trajectory guess about which the solver iterates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperatingPoint {
    pub times_s: Vec<f64>,
    pub xs: Vec<State>,
    pub us: Vec<Control>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ProblemError {
    #[error("Initial state has dimension {found} but the dynamics expects {expected}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("The environment lock is poisoned")]
    EnvPoisoned,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Problem {
    pub fn num_time_steps(&self) -> usize {
        self.operating_point.len()
    }

    /// Total cost of the given operating point, summed over every time step and cost term.
    pub fn total_cost(&self, op: &OperatingPoint) -> f64 {
        op.times_s
            .iter()
            .zip(op.xs.iter().zip(op.us.iter()))
            .map(|(t, (x, u))| {
                let t_rel = t - self.start_time_s;
                self.costs
                    .iter()
                    .map(|c| c.evaluate(t_rel, x, u))
                    .sum::<f64>()
            })
            .sum()
    }

    /// Number of obstacle terms in the cost.
    pub fn num_obstacle_costs(&self) -> usize {
        self.costs
            .iter()
            .filter(|c| matches!(c, CostTerm::Obstacle(_)))
            .count()
    }
}

impl OperatingPoint {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            times_s: Vec::with_capacity(n),
            xs: Vec::with_capacity(n),
            us: Vec::with_capacity(n),
        }
    }

    pub fn push(&mut self, time_s: f64, x: State, u: DVector<f64>) {
        self.times_s.push(time_s);
        self.xs.push(x);
        self.us.push(u);
    }

    pub fn len(&self) -> usize {
        self.times_s.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times_s.is_empty()
    }

    /// Convert into a trajectory.
    pub fn into_trajectory(self) -> Trajectory {
        Trajectory::new(
            self.times_s
                .into_iter()
                .zip(self.xs.into_iter().zip(self.us.into_iter()))
                .map(|(time_s, (state, control))| Sample {
                    time_s,
                    state,
                    control,
                })
                .collect(),
        )
    }
}
