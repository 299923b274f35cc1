//! Main planner executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules:
//!         - Environment and tracking bound (fatal on failure)
//!         - Problem formulator and solver worker thread
//!         - Environment watcher thread
//!         - Replan coordinator
//!     - Main loop, one event at a time from the event queue:
//!         - Tick: produce the reference and send any replan request
//!         - Ready: start planning
//!         - Plan response: adopt or reject the new trajectory
//!         - Environment changed: update the environment and replan
//!     - Shutdown: stop the worker threads and flush the session archives

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use comms_if::tracking::ReferenceMsg;
use log::{info, trace, warn};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread;

// Internal
use plan_lib::{
    bound::ParamsBoundSource,
    coord::ReplanCoordinator,
    env::{watch, BallsInBox, EnvParams, SharedEnv},
    params::PlanExecParams,
    problem::{ProblemFormulator, ProblemParams},
    sched::{Event, EventQueue},
    solver::{worker::SolverWorker, SolverParams, StraightLineSolver},
    tm::PlanTm,
};
use util::{
    logger::{logger_init, parse_target_levels, LevelFilter},
    session::{self, Session},
    time::seconds_to_std_duration,
};

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("plan_exec", "sessions").wrap_err("Failed to create the session")?;

    // Exec params are needed first for the log levels
    let exec_params: PlanExecParams =
        util::params::load("plan_exec.toml").wrap_err("Could not load exec params")?;

    // Initialise logger
    let target_levels =
        parse_target_levels(&exec_params.log_levels).wrap_err("Invalid log level overrides")?;
    logger_init(LevelFilter::Debug, &target_levels, &session)
        .wrap_err("Failed to initialise logging")?;

    info!("Recede Planner Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let problem_params: ProblemParams =
        util::params::load("problem.toml").wrap_err("Could not load problem params")?;
    let solver_params: SolverParams =
        util::params::load("solver.toml").wrap_err("Could not load solver params")?;
    let env_params =
        EnvParams::load(&exec_params.env_file).wrap_err("Could not load the environment")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE MODULES ----

    let env = BallsInBox::new(&env_params)
        .wrap_err("Failed to initialise the environment")?
        .into_shared();

    let formulator = ProblemFormulator::new(
        problem_params.clone(),
        &ParamsBoundSource::new(&exec_params.tracking_bound_file),
        env.clone(),
    )
    .wrap_err("Failed to initialise the problem formulator")?;

    let mut coord = ReplanCoordinator::new(exec_params.coord.clone(), problem_params.dynamics)
        .wrap_err("Failed to initialise the replan coordinator")?;

    let mut queue = EventQueue::new(seconds_to_std_duration(exec_params.coord.time_step_s));

    let worker = SolverWorker::spawn(
        formulator,
        StraightLineSolver,
        solver_params,
        queue.sender(),
    )
    .wrap_err("Failed to start the solver worker")?;

    let watch_stop = Arc::new(AtomicBool::new(false));
    let watch_jh = watch::spawn(
        util::params::param_file_path(&exec_params.env_file)?,
        env_params.watch_period_s,
        queue.sender(),
        watch_stop.clone(),
    )
    .wrap_err("Failed to start the environment watcher")?;

    // Signal ready once the delay has passed
    let ready_sender = queue.sender();
    let ready_delay = seconds_to_std_duration(exec_params.ready_delay_s);
    thread::Builder::new()
        .name("ready".into())
        .spawn(move || {
            thread::sleep(ready_delay);
            ready_sender.send(Event::Ready).ok();
        })
        .wrap_err("Failed to start the ready thread")?;

    info!("Modules initialised");

    // ---- MAIN LOOP ----

    info!("Beginning main loop\n");

    let mut state = LoopState {
        last_reference: None,
        last_tm_s: None,
    };

    let result = loop {
        let event = queue.next();
        let now_s = session::get_elapsed_seconds();

        if let Some(max_s) = exec_params.max_run_time_s {
            if now_s >= max_s {
                info!("Maximum run time reached");
                break Ok(());
            }
        }

        match handle_event(event, now_s, &mut coord, &worker, &env, &exec_params, &mut state) {
            Ok(true) => (),
            Ok(false) => break Ok(()),
            Err(e) => break Err(e),
        }
    };

    // ---- SHUTDOWN ----

    info!("Stopping worker threads");

    watch_stop.store(true, Ordering::Relaxed);
    if watch_jh.join().is_err() {
        warn!("Environment watcher panicked");
    }

    if let Err(e) = worker.stop() {
        warn!("Solver worker exited with an error: {}", e);
    }

    // Final telemetry
    session::save(
        "tm/final.json",
        PlanTm::new(
            session::get_elapsed_seconds(),
            &coord,
            num_obstacles(&env),
            state.last_reference,
        ),
    );

    session.exit();

    info!("End of execution");

    result
}

/// Loop data which lives between events.
struct LoopState {
    last_reference: Option<ReferenceMsg>,
    last_tm_s: Option<f64>,
}

/// Process one event, returning `Ok(false)` when the loop should stop.
fn handle_event(
    event: Event,
    now_s: f64,
    coord: &mut ReplanCoordinator,
    worker: &SolverWorker,
    env: &SharedEnv,
    params: &PlanExecParams,
    state: &mut LoopState,
) -> Result<bool, Report> {
    match event {
        Event::Tick => {
            let output = coord.tick(now_s).wrap_err("Coordinator tick failed")?;

            if let Some(request) = output.request {
                worker.request(request)?;
            }

            if let Some(tf) = output.transform {
                trace!(
                    "{} -> {}: {:?}",
                    tf.frame_id,
                    tf.child_frame_id,
                    tf.translation_m
                );
            }

            if let Some(reference) = output.reference {
                trace!("Reference: {:?}", reference.state.x);
                state.last_reference = Some(reference);
            }

            // ---- TELEMETRY ----

            let tm_due = state
                .last_tm_s
                .map_or(true, |t| now_s - t >= params.tm_period_s);
            if tm_due {
                session::save_with_timestamp(
                    "tm/tm.json",
                    PlanTm::new(now_s, coord, num_obstacles(env), state.last_reference.clone()),
                );
                state.last_tm_s = Some(now_s);
            }
        }
        Event::Ready => coord.handle_ready(),
        Event::PlanResponse(response) => {
            if let Some(vis) = coord
                .handle_plan_response(response)
                .wrap_err("Could not handle the plan response")?
            {
                session::save_with_timestamp("traj/traj.json", vis);
            }
        }
        Event::EnvironmentChanged(obstacles) => {
            env.write()
                .map_err(|_| eyre!("The environment lock is poisoned"))?
                .set_obstacles(obstacles);

            if let Some(request) = coord
                .handle_environment_changed(now_s)
                .wrap_err("Could not handle the environment change")?
            {
                worker.request(request)?;
            }
        }
        Event::Stop => {
            info!("Stop requested");
            return Ok(false);
        }
    }

    Ok(true)
}

fn num_obstacles(env: &SharedEnv) -> usize {
    env.read().map(|e| e.obstacles().len()).unwrap_or(0)
}
