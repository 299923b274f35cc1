//! Solver worker thread
//!
//! Replan requests are sent to the worker, which formulates and solves the problem and posts the
//! response back into the event queue. The event loop never waits on the worker.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    sync::mpsc::{channel, Receiver, SendError, Sender},
    thread::{self, JoinHandle},
};

use comms_if::plan::{PlanResponse, PlanResult, ReplanRequest};
use log::{debug, info, warn};
use nalgebra::DVector;

use super::{validate, SolveError, Solver, SolverParams};
use crate::{dynamics::Dynamics, problem::ProblemFormulator, sched::Event};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Handle to the solver worker thread.
pub struct SolverWorker {
    sender: Sender<WorkerSignal>,
    jh: Option<JoinHandle<Result<(), WorkerError>>>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug)]
pub enum WorkerSignal {
    /// The worker should stop
    Stop,

    /// Plan a new trajectory
    Plan(ReplanRequest),
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Could not start the worker thread: {0}")]
    SpawnError(std::io::Error),

    #[error("Failed to send signal {0:?} to the worker")]
    SendError(WorkerSignal),

    #[error("The event queue is closed, dropping the response to request {0}")]
    EventQueueClosed(u64),

    #[error("The worker thread panicked")]
    Panicked,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SolverWorker {
    /// Start the worker thread, which posts its responses into `event_sender`.
    pub fn spawn<S: Solver + 'static>(
        formulator: ProblemFormulator,
        solver: S,
        params: SolverParams,
        event_sender: Sender<Event>,
    ) -> Result<Self, WorkerError> {
        let (sender, rx) = channel();

        let jh = thread::Builder::new()
            .name("solver::worker".into())
            .spawn(move || worker_thread(formulator, solver, params, event_sender, rx))
            .map_err(WorkerError::SpawnError)?;

        Ok(Self {
            sender,
            jh: Some(jh),
        })
    }

    /// Send a request to the worker. The response arrives later as an [`Event::PlanResponse`].
    pub fn request(&self, request: ReplanRequest) -> Result<(), WorkerError> {
        debug!("Sending replan request {} to the solver", request.id);
        self.sender.send(WorkerSignal::Plan(request))?;
        Ok(())
    }

    /// Stop the worker, waiting for any solve in progress to finish.
    pub fn stop(mut self) -> Result<(), WorkerError> {
        // The worker may already have exited, in which case the join below reports why
        self.sender.send(WorkerSignal::Stop).ok();

        match self.jh.take() {
            Some(jh) => jh.join().map_err(|_| WorkerError::Panicked)?,
            None => Ok(()),
        }
    }
}

impl From<SendError<WorkerSignal>> for WorkerError {
    fn from(e: SendError<WorkerSignal>) -> Self {
        Self::SendError(e.0)
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn worker_thread<S: Solver>(
    formulator: ProblemFormulator,
    mut solver: S,
    params: SolverParams,
    event_sender: Sender<Event>,
    receiver: Receiver<WorkerSignal>,
) -> Result<(), WorkerError> {
    while let Ok(signal) = receiver.recv() {
        match signal {
            WorkerSignal::Stop => break,
            WorkerSignal::Plan(request) => {
                let id = request.id;
                let response = plan(&formulator, &mut solver, &params, request);

                event_sender
                    .send(Event::PlanResponse(response))
                    .map_err(|_| WorkerError::EventQueueClosed(id))?;
            }
        }
    }

    info!("Solver worker stopped");

    Ok(())
}

/// Formulate and solve the problem for one request.
pub fn plan<S: Solver>(
    formulator: &ProblemFormulator,
    solver: &mut S,
    params: &SolverParams,
    request: ReplanRequest,
) -> PlanResponse {
    let result = match try_plan(formulator, solver, params, &request) {
        Ok(traj) => {
            info!(
                "Request {}: new trajectory with {} samples",
                request.id,
                traj.times_s.len()
            );
            PlanResult::Trajectory(traj)
        }
        Err(reason) => {
            warn!("Request {}: {}", request.id, reason);
            PlanResult::Infeasible(reason)
        }
    };

    PlanResponse {
        request_id: request.id,
        result,
    }
}

fn try_plan<S: Solver>(
    formulator: &ProblemFormulator,
    solver: &mut S,
    params: &SolverParams,
    request: &ReplanRequest,
) -> Result<comms_if::plan::TrajectoryMsg, String> {
    let dynamics = formulator.params().dynamics;

    if request.goal.x.len() != dynamics.x_dim() {
        return Err(format!(
            "goal has dimension {}, expected {}",
            request.goal.x.len(),
            dynamics.x_dim()
        ));
    }

    let start = DVector::from_column_slice(&request.start.x);
    let goal = dynamics.position(&DVector::from_column_slice(&request.goal.x));

    let problem = formulator
        .build_problem(&start, &goal, request.start_time_s)
        .map_err(|e| e.to_string())?;

    let traj = solver.solve(&problem).map_err(|e| e.to_string())?;

    if params.check_env {
        let env = formulator
            .env()
            .read()
            .map_err(|_| "the environment lock is poisoned".to_string())?;

        validate(&traj, &dynamics, &*env, formulator.margin().margin_m())
            .map_err(|e: SolveError| e.to_string())?;
    }

    Ok(traj.to_msg())
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        bound::FixedBoundSource,
        env::{BallsInBox, EnvParams, Obstacle},
        problem::ProblemParams,
        solver::StraightLineSolver,
    };
    use comms_if::{plan::StateMsg, tracking::TrackingBoundBox};
    use nalgebra::Vector3;
    use std::time::Duration;

    fn formulator() -> ProblemFormulator {
        let env = BallsInBox::new(&EnvParams {
            bounds_min_m: [-1.0, -5.0, -5.0],
            bounds_max_m: [11.0, 5.0, 5.0],
            watch_period_s: 1.0,
            obstacles: vec![],
        })
        .unwrap();

        ProblemFormulator::new(
            ProblemParams::default(),
            &FixedBoundSource(TrackingBoundBox {
                x_m: 0.1,
                y_m: 0.1,
                z_m: 0.1,
            }),
            env.into_shared(),
        )
        .unwrap()
    }

    fn request(id: u64) -> ReplanRequest {
        ReplanRequest {
            id,
            start: StateMsg::new(vec![0.0; 6]),
            goal: StateMsg::new(vec![10.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
            start_time_s: 1.0,
        }
    }

    #[test]
    fn test_plan() {
        let f = formulator();
        let resp = plan(&f, &mut StraightLineSolver, &SolverParams::default(), request(7));

        assert_eq!(resp.request_id, 7);
        match resp.result {
            PlanResult::Trajectory(t) => {
                assert_eq!(t.times_s.len(), 20);
                assert_eq!(t.times_s[0], 1.0);
            }
            r => panic!("Expected a trajectory, got {:?}", r),
        }
    }

    #[test]
    fn test_plan_infeasible() {
        let f = formulator();
        f.env()
            .write()
            .unwrap()
            .set_obstacles(vec![Obstacle::new(Vector3::new(5.0, 0.0, 0.0), 1.0)]);

        let resp = plan(&f, &mut StraightLineSolver, &SolverParams::default(), request(1));
        assert!(matches!(resp.result, PlanResult::Infeasible(_)));

        // Without the environment check the straight line is returned regardless
        let resp = plan(
            &f,
            &mut StraightLineSolver,
            &SolverParams { check_env: false },
            request(2),
        );
        assert!(matches!(resp.result, PlanResult::Trajectory(_)));
    }

    #[test]
    fn test_plan_bad_dimensions() {
        let f = formulator();

        let mut req = request(3);
        req.start = StateMsg::new(vec![0.0; 3]);
        let resp = plan(&f, &mut StraightLineSolver, &SolverParams::default(), req);
        assert!(matches!(resp.result, PlanResult::Infeasible(_)));

        let mut req = request(4);
        req.goal = StateMsg::new(vec![0.0; 2]);
        let resp = plan(&f, &mut StraightLineSolver, &SolverParams::default(), req);
        assert!(matches!(resp.result, PlanResult::Infeasible(_)));
    }

    #[test]
    fn test_worker_thread() {
        let (tx, rx) = channel();
        let worker =
            SolverWorker::spawn(formulator(), StraightLineSolver, SolverParams::default(), tx)
                .unwrap();

        worker.request(request(11)).unwrap();

        match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
            Event::PlanResponse(resp) => assert_eq!(resp.request_id, 11),
            e => panic!("Unexpected event {:?}", e),
        }

        worker.stop().unwrap();
    }
}
