//! Problem formulator
//!
//! Turns a replan request into a [`Problem`]. The formulator holds everything which doesn't change
//! between requests: the parameters, the safety margin and a handle to the live environment.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;
use nalgebra::Vector3;

use super::{
    cost::{CostTerm, FinalTimeCost, ObstacleCost3D, QuadraticCost},
    OperatingPoint, Problem, ProblemError, ProblemParams,
};
use crate::{
    bound::{BoundError, SafetyMargin, TrackingBoundSource},
    dynamics::Dynamics,
    env::SharedEnv,
    traj::State,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Tolerance used when dividing the horizon into whole time steps.
const STEP_COUNT_EPSILON: f64 = 1e-9;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct ProblemFormulator {
    params: ProblemParams,
    margin: SafetyMargin,
    env: SharedEnv,
    num_time_steps: usize,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum FormulatorError {
    #[error("Could not get the tracking bound: {0}")]
    BoundError(#[from] BoundError),

    #[error("Could not access the environment")]
    EnvUnavailable,

    #[error("Invalid problem parameters: {0}")]
    InvalidParams(&'static str),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ProblemFormulator {
    /// Create a new formulator.
    ///
    /// The tracking bound is queried once here. Failure to obtain the bound or the environment is
    /// fatal.
    pub fn new(
        params: ProblemParams,
        bound_source: &dyn TrackingBoundSource,
        env: SharedEnv,
    ) -> Result<Self, FormulatorError> {
        if !(params.time_step_s > 0.0) {
            return Err(FormulatorError::InvalidParams("time_step_s must be positive"));
        }
        if !(params.horizon_s >= params.time_step_s) {
            return Err(FormulatorError::InvalidParams(
                "horizon_s must be at least one time step",
            ));
        }
        if !(params.final_time_window_s >= 0.0) {
            return Err(FormulatorError::InvalidParams(
                "final_time_window_s must not be negative",
            ));
        }

        if env.read().is_err() {
            return Err(FormulatorError::EnvUnavailable);
        }

        let margin = SafetyMargin::from_source(bound_source)?;

        let num_time_steps =
            (params.horizon_s / params.time_step_s + STEP_COUNT_EPSILON).floor() as usize;

        Ok(Self {
            params,
            margin,
            env,
            num_time_steps,
        })
    }

    pub fn params(&self) -> &ProblemParams {
        &self.params
    }

    pub fn margin(&self) -> &SafetyMargin {
        &self.margin
    }

    pub fn env(&self) -> &SharedEnv {
        &self.env
    }

    pub fn num_time_steps(&self) -> usize {
        self.num_time_steps
    }

    /// Build the problem of getting from `start` to `goal`, starting at session time
    /// `start_time_s`.
    ///
    /// The obstacles are read from the environment as it is at the time of the call.
    pub fn build_problem(
        &self,
        start: &State,
        goal: &Vector3<f64>,
        start_time_s: f64,
    ) -> Result<Problem, ProblemError> {
        let dynamics = self.params.dynamics;

        if start.len() != dynamics.x_dim() {
            return Err(ProblemError::DimensionMismatch {
                expected: dynamics.x_dim(),
                found: start.len(),
            });
        }

        // ---- WARM START ----

        let n = self.num_time_steps;
        let start_pos = dynamics.position(start);
        let velocity = (goal - start_pos) / self.params.horizon_s;

        let mut op = OperatingPoint::with_capacity(n);
        for k in 0..n {
            let frac = k as f64 / n as f64;
            let pos = start_pos * (1.0 - frac) + goal * frac;
            let (x, u) = dynamics.warm_start(&pos, &velocity);

            op.push(start_time_s + k as f64 * self.params.time_step_s, x, u);
        }

        // ---- COSTS ----

        let mut costs = vec![CostTerm::ControlEffort(QuadraticCost::new(
            self.params.control_effort_weight,
            None,
            0.0,
        ))];

        let goal_time_s = self.params.horizon_s - self.params.final_time_window_s;
        for (axis, &idx) in dynamics.position_indices().iter().enumerate() {
            costs.push(CostTerm::Goal(FinalTimeCost::new(
                QuadraticCost::new(self.params.goal_weight, Some(idx), goal[axis]),
                goal_time_s,
            )));
        }

        {
            let env = self.env.read().map_err(|_| ProblemError::EnvPoisoned)?;

            for obs in env.obstacles() {
                costs.push(CostTerm::Obstacle(ObstacleCost3D::new(
                    self.params.obstacle_weight,
                    dynamics.position_indices(),
                    obs.centre_m,
                    self.margin.obstacle_threshold_m(obs.radius_m),
                )));
            }
        }

        debug!(
            "Formulated problem from {:?} to {:?} at {:.3} s with {} steps and {} cost terms",
            start_pos.as_slice(),
            goal.as_slice(),
            start_time_s,
            n,
            costs.len()
        );

        Ok(Problem {
            dynamics,
            costs,
            horizon_s: self.params.horizon_s,
            time_step_s: self.params.time_step_s,
            start_time_s,
            x0: start.clone(),
            operating_point: op,
        })
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        bound::FixedBoundSource,
        dynamics::DynamicsKind,
        env::{BallsInBox, EnvParams, Obstacle},
    };
    use comms_if::tracking::TrackingBoundBox;
    use nalgebra::DVector;

    fn env(obstacles: Vec<Obstacle>) -> SharedEnv {
        let params = EnvParams {
            bounds_min_m: [-20.0; 3],
            bounds_max_m: [20.0; 3],
            watch_period_s: 1.0,
            obstacles: vec![],
        };
        let mut env = BallsInBox::new(&params).unwrap();
        crate::env::Environment::set_obstacles(&mut env, obstacles);
        env.into_shared()
    }

    fn bound() -> FixedBoundSource {
        FixedBoundSource(TrackingBoundBox {
            x_m: 0.1,
            y_m: 0.2,
            z_m: 0.2,
        })
    }

    #[test]
    fn test_warm_start_straight_line() {
        let f = ProblemFormulator::new(ProblemParams::default(), &bound(), env(vec![])).unwrap();

        let p = f
            .build_problem(&DVector::zeros(6), &Vector3::new(10.0, 0.0, 0.0), 3.0)
            .unwrap();

        assert_eq!(p.num_time_steps(), 20);

        let op = &p.operating_point;
        assert!((op.xs[10][0] - 5.0).abs() < 1e-9);
        for k in 0..20 {
            assert!((op.xs[k][3] - 2.0).abs() < 1e-12);
            assert_eq!(op.xs[k][4], 0.0);
            assert_eq!(op.us[k], DVector::zeros(3));
        }
        assert_eq!(op.times_s[0], 3.0);
        assert!((op.times_s[19] - 7.75).abs() < 1e-12);
        assert!(op.xs[0].rows(0, 3).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_cost_order_and_obstacle_threshold() {
        let f = ProblemFormulator::new(
            ProblemParams::default(),
            &bound(),
            env(vec![
                Obstacle::new(Vector3::new(5.0, 0.0, 0.0), 0.5),
                Obstacle::new(Vector3::new(5.0, 3.0, 0.0), 1.0),
            ]),
        )
        .unwrap();

        let p = f
            .build_problem(&DVector::zeros(6), &Vector3::new(10.0, 0.0, 0.0), 0.0)
            .unwrap();

        assert_eq!(p.costs.len(), 6);
        assert_eq!(p.num_obstacle_costs(), 2);
        assert!(matches!(p.costs[0], CostTerm::ControlEffort(_)));

        for (axis, cost) in p.costs[1..4].iter().enumerate() {
            match cost {
                CostTerm::Goal(g) => {
                    assert_eq!(g.inner.dimension, Some(axis));
                    assert!((g.threshold_time_s - 4.5).abs() < 1e-12);
                }
                c => panic!("Expected goal cost, got {:?}", c),
            }
        }

        // margin = norm(0.1, 0.2, 0.2) = 0.3
        match (&p.costs[4], &p.costs[5]) {
            (CostTerm::Obstacle(a), CostTerm::Obstacle(b)) => {
                assert!((a.threshold_m() - 1.6).abs() < 1e-9);
                assert!((b.threshold_m() - 2.6).abs() < 1e-9);
                assert_eq!(a.position_idxs, [0, 1, 2]);
            }
            c => panic!("Expected obstacle costs, got {:?}", c),
        }
    }

    #[test]
    fn test_environment_read_per_problem() {
        let shared = env(vec![]);
        let f = ProblemFormulator::new(ProblemParams::default(), &bound(), shared.clone()).unwrap();
        let start = DVector::zeros(6);
        let goal = Vector3::new(1.0, 1.0, 1.0);

        assert_eq!(f.build_problem(&start, &goal, 0.0).unwrap().num_obstacle_costs(), 0);

        shared
            .write()
            .unwrap()
            .set_obstacles(vec![Obstacle::new(Vector3::zeros(), 0.1)]);

        assert_eq!(f.build_problem(&start, &goal, 0.0).unwrap().num_obstacle_costs(), 1);
    }

    #[test]
    fn test_dimension_mismatch() {
        let f = ProblemFormulator::new(ProblemParams::default(), &bound(), env(vec![])).unwrap();

        assert!(matches!(
            f.build_problem(&DVector::zeros(3), &Vector3::zeros(), 0.0),
            Err(ProblemError::DimensionMismatch {
                expected: 6,
                found: 3
            })
        ));
    }

    #[test]
    fn test_single_integrator_warm_start() {
        let params = ProblemParams {
            dynamics: DynamicsKind::SingleIntegrator3D,
            ..Default::default()
        };
        let f = ProblemFormulator::new(params, &bound(), env(vec![])).unwrap();

        let p = f
            .build_problem(&DVector::zeros(3), &Vector3::new(0.0, 10.0, 0.0), 0.0)
            .unwrap();

        assert!((p.operating_point.us[0][1] - 2.0).abs() < 1e-12);
        assert!((p.operating_point.xs[10][1] - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_construction() {
        let params = ProblemParams {
            time_step_s: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            ProblemFormulator::new(params, &bound(), env(vec![])),
            Err(FormulatorError::InvalidParams(_))
        ));

        let bad_bound = FixedBoundSource(TrackingBoundBox {
            x_m: f64::NAN,
            y_m: 0.0,
            z_m: 0.0,
        });
        assert!(matches!(
            ProblemFormulator::new(ProblemParams::default(), &bad_bound, env(vec![])),
            Err(FormulatorError::BoundError(_))
        ));
    }

    #[test]
    fn test_total_cost() {
        let f = ProblemFormulator::new(ProblemParams::default(), &bound(), env(vec![])).unwrap();
        let p = f
            .build_problem(&DVector::zeros(6), &Vector3::new(10.0, 0.0, 0.0), 0.0)
            .unwrap();

        // Only the last two steps (t = 4.5, 4.75) are in the goal window, where the warm start is
        // at x = 9.0 and 9.5.
        let expected = 0.5 * 10.0 * (1.0f64.powi(2) + 0.5f64.powi(2));
        assert!((p.total_cost(&p.operating_point) - expected).abs() < 1e-9);
    }
}
