//! # Solver
//!
//! The solver turns a [`Problem`] into a [`Trajectory`]. The numerical method is hidden behind the
//! [`Solver`] trait, solvers are run on the worker thread in [`worker`] so that the event loop is
//! never blocked by a solve.
//!
//! A solver failing to find a trajectory is not an error for the rest of the system: the
//! coordinator keeps following its current trajectory and may ask again later.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod params;
pub mod worker;

pub use params::SolverParams;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::time::Instant;

use log::info;

use crate::{
    dynamics::Dynamics,
    env::Environment,
    problem::Problem,
    traj::Trajectory,
};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A trajectory optimiser.
pub trait Solver: Send {
    fn solve(&mut self, problem: &Problem) -> Result<Trajectory, SolveError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Returns the problem's warm start unchanged.
///
/// Used as the baseline planner, and wherever the straight line to the goal is good enough.
#[derive(Debug, Default, Clone)]
pub struct StraightLineSolver;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SolveError {
    #[error("No feasible trajectory: {0}")]
    Infeasible(String),

    #[error("The problem has no time steps")]
    EmptyProblem,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Solver for StraightLineSolver {
    fn solve(&mut self, problem: &Problem) -> Result<Trajectory, SolveError> {
        let start = Instant::now();

        if problem.operating_point.is_empty() {
            return Err(SolveError::EmptyProblem);
        }

        // The first sample is the state being replanned from, not the warm start's velocity
        let mut op = problem.operating_point.clone();
        if let Some(x) = op.xs.first_mut() {
            *x = problem.x0.clone();
        }
        let traj = op.into_trajectory();

        info!(
            "Planning took {:.6} s, cost {:.3}",
            start.elapsed().as_secs_f64(),
            problem.total_cost(&problem.operating_point)
        );

        Ok(traj)
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Check that every sample of the trajectory is valid in the environment with the given margin.
pub fn validate<D: Dynamics>(
    traj: &Trajectory,
    dynamics: &D,
    env: &dyn Environment,
    margin_m: f64,
) -> Result<(), SolveError> {
    for (i, s) in traj.samples().iter().enumerate() {
        let p = dynamics.position(&s.state);
        if !env.is_valid(&p, margin_m) {
            return Err(SolveError::Infeasible(format!(
                "sample {} at t = {:.3} s, position ({:.3}, {:.3}, {:.3}) m, is not valid",
                i, s.time_s, p.x, p.y, p.z
            )));
        }
    }

    Ok(())
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        bound::FixedBoundSource,
        env::{BallsInBox, EnvParams, ObstacleParams},
        problem::{ProblemFormulator, ProblemParams},
    };
    use comms_if::tracking::TrackingBoundBox;
    use nalgebra::{DVector, Vector3};

    fn env_params(obstacles: Vec<ObstacleParams>) -> EnvParams {
        EnvParams {
            bounds_min_m: [-1.0, -5.0, -5.0],
            bounds_max_m: [11.0, 5.0, 5.0],
            watch_period_s: 1.0,
            obstacles,
        }
    }

    fn problem(env: &BallsInBox) -> Problem {
        let f = ProblemFormulator::new(
            ProblemParams::default(),
            &FixedBoundSource(TrackingBoundBox {
                x_m: 0.1,
                y_m: 0.1,
                z_m: 0.1,
            }),
            env.clone().into_shared(),
        )
        .unwrap();

        f.build_problem(&DVector::zeros(6), &Vector3::new(10.0, 0.0, 0.0), 2.0)
            .unwrap()
    }

    #[test]
    fn test_straight_line() {
        let env = BallsInBox::new(&env_params(vec![])).unwrap();
        let p = problem(&env);

        let traj = StraightLineSolver.solve(&p).unwrap();

        assert_eq!(traj.len(), 20);
        assert_eq!(traj.first_time().unwrap(), 2.0);
        assert_eq!(traj.first_state().unwrap(), p.x0);
        assert_eq!(traj.first_state().unwrap(), DVector::zeros(6));

        // Later samples keep the straight line velocity
        assert!((traj.samples()[1].state[3] - 2.0).abs() < 1e-12);
        assert!((traj.samples()[10].state[0] - 5.0).abs() < 1e-9);
        assert!(validate(&traj, &p.dynamics, &env, 0.1).is_ok());
    }

    #[test]
    fn test_validate_detects_collision() {
        let env = BallsInBox::new(&env_params(vec![ObstacleParams {
            centre_m: [5.0, 0.0, 0.0],
            radius_m: 0.5,
        }]))
        .unwrap();
        let p = problem(&env);
        let traj = StraightLineSolver.solve(&p).unwrap();

        assert!(matches!(
            validate(&traj, &p.dynamics, &env, 0.1),
            Err(SolveError::Infeasible(_))
        ));
    }

    #[test]
    fn test_empty_problem() {
        let env = BallsInBox::new(&env_params(vec![])).unwrap();
        let mut p = problem(&env);
        p.operating_point = Default::default();

        assert_eq!(StraightLineSolver.solve(&p), Err(SolveError::EmptyProblem));
    }
}
