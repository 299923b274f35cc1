//! # Replan coordinator
//!
//! The coordinator owns the trajectory currently being followed. On every control tick it
//! interpolates the trajectory to produce the reference for the tracking controller, and decides
//! whether a new trajectory should be requested from the solver.
//!
//! New trajectories start `planner_runtime_s` in the future, so the coordinator takes the start
//! state of each request from its current trajectory at that time. At most one request is in
//! flight at once, responses are matched to requests by id.
//!
//! The coordinator does no I/O. Each handler returns what should be sent and the caller (the
//! event loop) sends it.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod params;

pub use params::{CoordParams, ReplanPolicy};

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::Utc;
use comms_if::{
    plan::{PlanResponse, PlanResult, ReplanRequest, StateMsg},
    tracking::{PoseTransform, ReferenceMsg},
};
use log::{debug, error, info, warn};
use nalgebra::{DVector, Vector3};
use serde::Serialize;

use crate::{
    dynamics::{Dynamics, DynamicsKind},
    traj::{State, TrajError, TrajVis, Trajectory},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct ReplanCoordinator {
    params: CoordParams,
    dynamics: DynamicsKind,

    /// Executing mode
    mode: CoordMode,

    /// The trajectory being followed, empty until the first plan arrives
    traj: Trajectory,

    start: State,
    goal: State,

    /// The request currently in flight
    pending: Option<PendingRequest>,
    next_request_id: u64,

    /// Time of the last request, used by the replan policy
    last_request_s: Option<f64>,

    /// Set when the environment changes while a request is in flight
    env_changed: bool,

    report: StatusReport,

    short_traj_warn: WarnThrottle,
    hold_warn: WarnThrottle,
}

/// Monitoring counters, reported in telemetry.
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct StatusReport {
    pub requests_sent: u64,
    pub plans_adopted: u64,
    pub infeasible_responses: u64,

    /// Responses which didn't match the request in flight
    pub stale_responses: u64,

    pub solver_timeouts: u64,
    pub env_changes: u64,

    /// Number of requests started from the last state because the trajectory ended before the
    /// request's start time
    pub short_traj_count: u64,

    /// How far the trajectory fell short, for the last such request
    pub last_shortfall_s: f64,

    /// Ticks spent holding at the end of the trajectory
    pub hold_ticks: u64,
}

/// Output of one control tick.
#[derive(Debug, Default, Clone)]
pub struct TickOutput {
    pub reference: Option<ReferenceMsg>,
    pub transform: Option<PoseTransform>,
    pub request: Option<ReplanRequest>,
}

#[derive(Debug, Clone, Copy)]
struct PendingRequest {
    id: u64,
    sent_s: f64,
}

/// Rate limit for a repeating warning.
#[derive(Debug, Clone, Copy)]
struct WarnThrottle {
    period_s: f64,
    last_s: Option<f64>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The modes of the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CoordMode {
    /// Waiting for the rest of the system to be ready
    NotReady,

    /// Following the current trajectory, no request in flight
    Idle,

    /// Following the current trajectory and waiting for a new one
    AwaitingPlan,

    /// An invariant was broken, no further processing
    Faulted,
}

#[derive(Debug, thiserror::Error)]
pub enum CoordError {
    #[error("Invalid coordinator parameters: {0}")]
    InvalidParams(String),

    #[error("Trajectory error: {0}")]
    TrajError(#[from] TrajError),

    #[error("The coordinator has faulted")]
    Faulted,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ReplanCoordinator {
    pub fn new(params: CoordParams, dynamics: DynamicsKind) -> Result<Self, CoordError> {
        for (name, v) in [("start", &params.start), ("goal", &params.goal)].iter() {
            if v.len() != dynamics.x_dim() {
                return Err(CoordError::InvalidParams(format!(
                    "{} has dimension {} but the dynamics expects {}",
                    name,
                    v.len(),
                    dynamics.x_dim()
                )));
            }
        }

        if !(params.time_step_s > 0.0) {
            return Err(CoordError::InvalidParams(
                "time_step_s must be positive".into(),
            ));
        }

        if !(params.planner_runtime_s >= 0.0) {
            return Err(CoordError::InvalidParams(
                "planner_runtime_s must not be negative".into(),
            ));
        }

        if let ReplanPolicy::Periodic { period_s } = params.replan_policy {
            if !(period_s > 0.0) {
                return Err(CoordError::InvalidParams(
                    "the replan period must be positive".into(),
                ));
            }
        }

        Ok(Self {
            start: DVector::from_column_slice(&params.start),
            goal: DVector::from_column_slice(&params.goal),
            dynamics,
            mode: CoordMode::NotReady,
            traj: Trajectory::default(),
            pending: None,
            next_request_id: 0,
            last_request_s: None,
            env_changed: false,
            report: StatusReport::default(),
            short_traj_warn: WarnThrottle::new(params.warn_period_s),
            hold_warn: WarnThrottle::new(params.warn_period_s),
            params,
        })
    }

    pub fn mode(&self) -> CoordMode {
        self.mode
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.traj
    }

    pub fn report(&self) -> &StatusReport {
        &self.report
    }

    pub fn is_awaiting_plan(&self) -> bool {
        self.pending.is_some()
    }

    /// The rest of the system is ready.
    ///
    /// Only the first call has any effect.
    pub fn handle_ready(&mut self) {
        if self.mode == CoordMode::NotReady {
            info!("Coordinator ready");
            self.mode = CoordMode::Idle;
        } else {
            debug!("Ignoring repeated ready signal in {:?}", self.mode);
        }
    }

    /// Process one control tick at session time `now_s`.
    pub fn tick(&mut self, now_s: f64) -> Result<TickOutput, CoordError> {
        let mut output = TickOutput::default();

        match self.mode {
            CoordMode::NotReady => return Ok(output),
            CoordMode::Faulted => return Err(CoordError::Faulted),
            CoordMode::Idle | CoordMode::AwaitingPlan => (),
        }

        self.check_timeout(now_s);

        if self.traj.is_empty() {
            output.request = self.maybe_request_trajectory(now_s)?;
            return Ok(output);
        }

        // ---- REFERENCE ----

        let (state, hold) = match self.traj.interpolate(now_s) {
            Ok(s) => (s, false),
            Err(TrajError::AfterLastTime { t_s, last_s }) => {
                self.report.hold_ticks += 1;
                if self.hold_warn.ready(now_s) {
                    warn!(
                        "Time {:.3} s is past the end of the trajectory ({:.3} s), holding at the last position",
                        t_s, last_s
                    );
                }
                (self.hold_state()?, true)
            }
            Err(e) => return Err(self.fault(e.into())),
        };

        let position = self.dynamics.position(&state);

        output.transform = Some(self.pose_transform(&position));
        output.reference = Some(ReferenceMsg {
            time_s: now_s,
            state: StateMsg::new(state.as_slice().to_vec()),
            hold,
        });

        // ---- REPLAN POLICY ----

        if self.replan_due(now_s, hold) {
            output.request = self.maybe_request_trajectory(now_s)?;
        }

        Ok(output)
    }

    /// Build a new replan request if one can be sent now.
    ///
    /// Nothing is sent before the coordinator is ready or while another request is in flight.
    pub fn maybe_request_trajectory(
        &mut self,
        now_s: f64,
    ) -> Result<Option<ReplanRequest>, CoordError> {
        match self.mode {
            CoordMode::Idle => (),
            CoordMode::Faulted => return Err(CoordError::Faulted),
            CoordMode::NotReady | CoordMode::AwaitingPlan => return Ok(None),
        }

        let start_time_s = now_s + self.params.planner_runtime_s;

        let start = if self.traj.is_empty() {
            self.start.clone()
        } else {
            let last_s = self.traj.last_time()?;

            if last_s < start_time_s {
                let shortfall_s = start_time_s - last_s;
                self.report.short_traj_count += 1;
                self.report.last_shortfall_s = shortfall_s;

                if self.short_traj_warn.ready(now_s) {
                    warn!(
                        "Trajectory ends {:.3} s before the next start time ({:.3} s), starting from its last state",
                        shortfall_s, start_time_s
                    );
                }

                self.traj.last_state()?
            } else {
                self.traj.interpolate(start_time_s)?
            }
        };

        let id = self.next_request_id;
        self.next_request_id += 1;

        self.pending = Some(PendingRequest { id, sent_s: now_s });
        self.last_request_s = Some(now_s);
        self.env_changed = false;
        self.mode = CoordMode::AwaitingPlan;
        self.report.requests_sent += 1;

        info!("Requesting trajectory {} starting at {:.3} s", id, start_time_s);

        Ok(Some(ReplanRequest {
            id,
            start: StateMsg::new(start.as_slice().to_vec()),
            goal: StateMsg::new(self.goal.as_slice().to_vec()),
            start_time_s,
        }))
    }

    /// Handle the solver's answer to a request.
    ///
    /// A new trajectory replaces the current one and its visualisation is returned. If the
    /// solver found no trajectory the current one is kept. Either way a new request may be made.
    pub fn handle_plan_response(
        &mut self,
        response: PlanResponse,
    ) -> Result<Option<TrajVis>, CoordError> {
        if self.mode == CoordMode::Faulted {
            return Err(CoordError::Faulted);
        }

        match self.pending {
            Some(p) if p.id == response.request_id => (),
            _ => {
                self.report.stale_responses += 1;
                warn!(
                    "Discarding response to request {}, which is not the request in flight ({:?})",
                    response.request_id,
                    self.pending.map(|p| p.id)
                );
                return Ok(None);
            }
        }

        self.pending = None;
        self.mode = CoordMode::Idle;

        let msg = match response.result {
            PlanResult::Trajectory(msg) => msg,
            PlanResult::Infeasible(reason) => {
                self.report.infeasible_responses += 1;
                warn!(
                    "Request {} infeasible ({}), keeping the current trajectory",
                    response.request_id, reason
                );
                return Ok(None);
            }
        };

        let traj = match Trajectory::from_msg(&msg, &self.dynamics) {
            Ok(t) => t,
            Err(e @ TrajError::NonFiniteTime { .. }) => {
                self.report.infeasible_responses += 1;
                warn!(
                    "Request {} returned an unusable trajectory ({}), keeping the current trajectory",
                    response.request_id, e
                );
                return Ok(None);
            }
            Err(e) => return Err(self.fault(e.into())),
        };

        if traj.is_empty() {
            self.report.infeasible_responses += 1;
            warn!(
                "Request {} returned an empty trajectory, keeping the current trajectory",
                response.request_id
            );
            return Ok(None);
        }

        info!(
            "Adopting trajectory {} ({} samples over {:.3} s, {:.3} s to {:.3} s)",
            response.request_id,
            traj.len(),
            traj.duration()?,
            traj.first_time()?,
            traj.last_time()?
        );

        let vis = traj.visualise(&self.dynamics, &self.params.fixed_frame);
        self.traj = traj;
        self.report.plans_adopted += 1;

        Ok(Some(vis))
    }

    /// The environment has changed, try to replan against the new one.
    ///
    /// If a request is already in flight it was formulated against the old environment, so
    /// another request is made as soon as it is answered.
    pub fn handle_environment_changed(
        &mut self,
        now_s: f64,
    ) -> Result<Option<ReplanRequest>, CoordError> {
        self.report.env_changes += 1;

        if self.mode == CoordMode::AwaitingPlan {
            info!("Environment changed while awaiting a plan, will replan once it arrives");
            self.env_changed = true;
        }

        self.maybe_request_trajectory(now_s)
    }

    /// Returns true if the replan policy calls for a request on this tick.
    fn replan_due(&self, now_s: f64, hold: bool) -> bool {
        let since_last = |period_s: f64| {
            self.last_request_s
                .map_or(true, |t| now_s - t >= period_s)
        };

        if self.env_changed {
            return true;
        }

        if hold && since_last(self.params.hold_replan_period_s) {
            return true;
        }

        match self.params.replan_policy {
            ReplanPolicy::Once => false,
            ReplanPolicy::Periodic { period_s } => since_last(period_s),
        }
    }

    /// Abandon the request in flight if it has been waiting longer than the solver timeout.
    fn check_timeout(&mut self, now_s: f64) {
        if let (Some(p), Some(timeout_s)) = (self.pending, self.params.solver_timeout_s) {
            if now_s - p.sent_s >= timeout_s {
                warn!(
                    "Request {} not answered after {:.3} s, abandoning it",
                    p.id,
                    now_s - p.sent_s
                );
                self.report.solver_timeouts += 1;
                self.pending = None;
                self.mode = CoordMode::Idle;
            }
        }
    }

    /// The last position of the trajectory at rest.
    fn hold_state(&self) -> Result<State, CoordError> {
        let last = self.traj.last_state()?;
        let (x, _) = self
            .dynamics
            .warm_start(&self.dynamics.position(&last), &Vector3::zeros());
        Ok(x)
    }

    fn pose_transform(&self, position: &Vector3<f64>) -> PoseTransform {
        PoseTransform {
            stamp: Utc::now(),
            frame_id: self.params.fixed_frame.clone(),
            child_frame_id: self.params.planner_frame.clone(),
            translation_m: [position.x, position.y, position.z],
            rotation_q: [0.0, 0.0, 0.0, 1.0],
        }
    }

    fn fault(&mut self, e: CoordError) -> CoordError {
        error!("Coordinator faulted: {}", e);
        self.mode = CoordMode::Faulted;
        self.pending = None;
        e
    }
}

impl WarnThrottle {
    fn new(period_s: f64) -> Self {
        Self {
            period_s,
            last_s: None,
        }
    }

    /// Returns true if the warning should be emitted at `now_s`.
    fn ready(&mut self, now_s: f64) -> bool {
        match self.last_s {
            Some(t) if now_s - t < self.period_s => false,
            _ => {
                self.last_s = Some(now_s);
                true
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::plan::TrajectoryMsg;

    fn params() -> CoordParams {
        CoordParams {
            fixed_frame: "world".into(),
            planner_frame: "planner".into(),
            time_step_s: 0.02,
            planner_runtime_s: 0.5,
            start: vec![0.0; 6],
            goal: vec![10.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            replan_policy: ReplanPolicy::Once,
            solver_timeout_s: None,
            hold_replan_period_s: 1.0,
            warn_period_s: 1.0,
        }
    }

    fn coord(params: CoordParams) -> ReplanCoordinator {
        let mut c = ReplanCoordinator::new(params, DynamicsKind::DoubleIntegrator3D).unwrap();
        c.handle_ready();
        c
    }

    /// A trajectory moving along x at 1 m/s from `t0` for `n` one-second steps.
    fn traj_msg(t0: f64, n: usize) -> TrajectoryMsg {
        TrajectoryMsg {
            states: (0..n)
                .map(|k| StateMsg::new(vec![k as f64, 0.0, 0.0, 1.0, 0.0, 0.0]))
                .collect(),
            controls: vec![vec![0.0; 3]; n],
            times_s: (0..n).map(|k| t0 + k as f64).collect(),
        }
    }

    fn respond(c: &mut ReplanCoordinator, id: u64, msg: TrajectoryMsg) -> Option<TrajVis> {
        c.handle_plan_response(PlanResponse {
            request_id: id,
            result: PlanResult::Trajectory(msg),
        })
        .unwrap()
    }

    #[test]
    fn test_not_ready_does_nothing() {
        let mut c = ReplanCoordinator::new(params(), DynamicsKind::DoubleIntegrator3D).unwrap();

        let out = c.tick(1.0).unwrap();
        assert!(out.reference.is_none());
        assert!(out.request.is_none());
        assert!(c.maybe_request_trajectory(1.0).unwrap().is_none());
        assert_eq!(c.mode(), CoordMode::NotReady);

        c.handle_ready();
        c.handle_ready();
        assert_eq!(c.mode(), CoordMode::Idle);
    }

    #[test]
    fn test_first_tick_requests_once() {
        let mut c = coord(params());

        let out = c.tick(2.0).unwrap();
        assert!(out.reference.is_none());
        assert!(out.transform.is_none());

        let req = out.request.unwrap();
        assert_eq!(req.id, 0);
        assert_eq!(req.start.x, vec![0.0; 6]);
        assert_eq!(req.goal.x[0], 10.0);
        assert!((req.start_time_s - 2.5).abs() < 1e-12);
        assert_eq!(c.mode(), CoordMode::AwaitingPlan);

        // No duplicate requests while one is in flight
        for i in 0..10 {
            let out = c.tick(2.0 + 0.02 * i as f64).unwrap();
            assert!(out.request.is_none());
            assert!(out.reference.is_none());
        }
        assert!(c.maybe_request_trajectory(3.0).unwrap().is_none());
        assert_eq!(c.report().requests_sent, 1);
    }

    #[test]
    fn test_adopt_and_follow() {
        let mut c = coord(params());
        let req = c.tick(0.0).unwrap().request.unwrap();

        let vis = respond(&mut c, req.id, traj_msg(0.5, 10)).unwrap();
        assert_eq!(vis.points_m.len(), 10);
        assert_eq!(vis.frame_id, "world");
        assert_eq!(c.mode(), CoordMode::Idle);
        assert_eq!(c.trajectory().len(), 10);

        let out = c.tick(2.25).unwrap();
        let reference = out.reference.unwrap();
        assert!(!reference.hold);
        assert!((reference.state.x[0] - 1.75).abs() < 1e-12);
        assert_eq!(reference.state.x[3], 1.0);

        let tf = out.transform.unwrap();
        assert!((tf.translation_m[0] - 1.75).abs() < 1e-12);
        assert_eq!(tf.frame_id, "world");
        assert_eq!(tf.child_frame_id, "planner");

        // Once policy doesn't replan on its own
        assert!(out.request.is_none());
    }

    #[test]
    fn test_request_starts_from_future_state() {
        let mut c = coord(params());
        let req = c.tick(0.0).unwrap().request.unwrap();
        respond(&mut c, req.id, traj_msg(0.0, 10));

        let req = c.maybe_request_trajectory(3.0).unwrap().unwrap();
        assert_eq!(req.id, 1);
        assert!((req.start_time_s - 3.5).abs() < 1e-12);
        assert!((req.start.x[0] - 3.5).abs() < 1e-12);
        assert_eq!(c.report().short_traj_count, 0);
    }

    #[test]
    fn test_short_trajectory_falls_back_to_last_state() {
        let mut c = coord(params());
        let req = c.tick(0.0).unwrap().request.unwrap();
        respond(&mut c, req.id, traj_msg(0.0, 3));

        // Trajectory ends at 2.0 s, the request would start at 2.2 s
        let req = c.maybe_request_trajectory(1.7).unwrap().unwrap();
        assert_eq!(req.start.x, vec![2.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
        assert_eq!(c.report().short_traj_count, 1);
        assert!((c.report().last_shortfall_s - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_infeasible_keeps_trajectory() {
        let mut c = coord(params());
        let req = c.tick(0.0).unwrap().request.unwrap();
        respond(&mut c, req.id, traj_msg(0.0, 10));
        let before = c.trajectory().clone();

        let req = c.handle_environment_changed(1.0).unwrap().unwrap();
        c.handle_plan_response(PlanResponse {
            request_id: req.id,
            result: PlanResult::Infeasible("blocked".into()),
        })
        .unwrap();

        assert_eq!(c.trajectory(), &before);
        assert_eq!(c.mode(), CoordMode::Idle);
        assert_eq!(c.report().infeasible_responses, 1);
        assert!(c.maybe_request_trajectory(1.5).unwrap().is_some());
    }

    #[test]
    fn test_infeasible_with_no_trajectory_retries() {
        let mut c = coord(params());
        let req = c.tick(0.0).unwrap().request.unwrap();

        c.handle_plan_response(PlanResponse {
            request_id: req.id,
            result: PlanResult::Infeasible("blocked".into()),
        })
        .unwrap();

        assert!(c.trajectory().is_empty());
        let out = c.tick(0.02).unwrap();
        assert!(out.reference.is_none());
        assert_eq!(out.request.unwrap().id, 1);
    }

    #[test]
    fn test_stale_response_discarded() {
        let mut c = coord(params());
        let req = c.tick(0.0).unwrap().request.unwrap();

        assert!(respond(&mut c, req.id + 5, traj_msg(0.0, 10)).is_none());
        assert!(c.trajectory().is_empty());
        assert_eq!(c.mode(), CoordMode::AwaitingPlan);
        assert_eq!(c.report().stale_responses, 1);
    }

    #[test]
    fn test_solver_timeout() {
        let mut c = coord(CoordParams {
            solver_timeout_s: Some(1.0),
            ..params()
        });
        let first = c.tick(0.0).unwrap().request.unwrap();

        assert!(c.tick(0.5).unwrap().request.is_none());

        // Timed out, a new request is made on the same tick
        let second = c.tick(1.0).unwrap().request.unwrap();
        assert_eq!(second.id, first.id + 1);
        assert_eq!(c.report().solver_timeouts, 1);

        // The late answer to the first request is ignored
        assert!(respond(&mut c, first.id, traj_msg(0.0, 10)).is_none());
        assert!(c.trajectory().is_empty());
        assert!(respond(&mut c, second.id, traj_msg(0.0, 10)).is_some());
    }

    #[test]
    fn test_periodic_replan() {
        let mut c = coord(CoordParams {
            replan_policy: ReplanPolicy::Periodic { period_s: 1.0 },
            ..params()
        });
        let req = c.tick(0.0).unwrap().request.unwrap();
        respond(&mut c, req.id, traj_msg(0.0, 10));

        assert!(c.tick(0.5).unwrap().request.is_none());

        let out = c.tick(1.0).unwrap();
        assert!(out.reference.is_some());
        assert_eq!(out.request.unwrap().id, 1);
    }

    #[test]
    fn test_hold_after_end() {
        let mut c = coord(params());
        let req = c.tick(0.0).unwrap().request.unwrap();
        respond(&mut c, req.id, traj_msg(0.0, 3));

        let out = c.tick(5.0).unwrap();
        let reference = out.reference.unwrap();
        assert!(reference.hold);
        assert_eq!(reference.state.x, vec![2.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(c.report().hold_ticks, 1);

        // A replan is attempted from the hold
        let req = out.request.unwrap();
        assert_eq!(req.start.x[0], 2.0);

        // But not again until the hold replan period has passed
        c.handle_plan_response(PlanResponse {
            request_id: req.id,
            result: PlanResult::Infeasible("blocked".into()),
        })
        .unwrap();
        assert!(c.tick(5.5).unwrap().request.is_none());
        assert!(c.tick(6.0).unwrap().request.is_some());
    }

    #[test]
    fn test_environment_change_while_awaiting() {
        let mut c = coord(params());
        let req = c.tick(0.0).unwrap().request.unwrap();

        assert!(c.handle_environment_changed(0.1).unwrap().is_none());

        respond(&mut c, req.id, traj_msg(0.0, 10));

        // The plan was made against the old environment, so replan straight away
        let out = c.tick(0.2).unwrap();
        assert!(out.reference.is_some());
        assert_eq!(out.request.unwrap().id, 1);
        assert!(c.tick(0.22).unwrap().request.is_none());
    }

    #[test]
    fn test_dimension_mismatch_faults() {
        let mut c = coord(params());
        let req = c.tick(0.0).unwrap().request.unwrap();

        let msg = TrajectoryMsg {
            states: vec![StateMsg::new(vec![0.0; 3])],
            controls: vec![vec![0.0; 3]],
            times_s: vec![0.0],
        };
        assert!(matches!(
            c.handle_plan_response(PlanResponse {
                request_id: req.id,
                result: PlanResult::Trajectory(msg),
            }),
            Err(CoordError::TrajError(TrajError::DimensionMismatch { .. }))
        ));

        assert_eq!(c.mode(), CoordMode::Faulted);
        assert!(matches!(c.tick(1.0), Err(CoordError::Faulted)));
    }

    #[test]
    fn test_non_finite_time_keeps_trajectory() {
        let mut c = coord(params());
        let req = c.tick(0.0).unwrap().request.unwrap();
        respond(&mut c, req.id, traj_msg(0.5, 10)).unwrap();

        let req = c.maybe_request_trajectory(1.0).unwrap().unwrap();
        let mut msg = traj_msg(1.5, 10);
        msg.times_s[0] = f64::NAN;
        assert!(respond(&mut c, req.id, msg).is_none());

        assert_eq!(c.mode(), CoordMode::Idle);
        assert_eq!(c.report().infeasible_responses, 1);
        assert_eq!(c.trajectory().first_time().unwrap(), 0.5);

        // The loop keeps following the old trajectory
        let reference = c.tick(1.5).unwrap().reference.unwrap();
        assert!((reference.state.x[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_params() {
        let p = CoordParams {
            goal: vec![1.0, 2.0, 3.0],
            ..params()
        };
        assert!(matches!(
            ReplanCoordinator::new(p, DynamicsKind::DoubleIntegrator3D),
            Err(CoordError::InvalidParams(_))
        ));

        let p = CoordParams {
            start: vec![0.0; 3],
            goal: vec![1.0, 2.0, 3.0],
            ..params()
        };
        assert!(ReplanCoordinator::new(p, DynamicsKind::SingleIntegrator3D).is_ok());
    }

    #[test]
    fn test_warn_throttle() {
        let mut t = WarnThrottle::new(1.0);
        assert!(t.ready(0.0));
        assert!(!t.ready(0.5));
        assert!(t.ready(1.0));
    }
}
