//! # Event scheduler
//!
//! All inputs to the coordinator arrive through a single queue and are processed one at a time,
//! to completion, on the main thread. Other threads (the solver worker, the environment watcher)
//! hold a [`Sender<Event>`] and post into it.
//!
//! Ticks are not posted by anyone, the queue generates them itself at the control rate.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender},
    time::{Duration, Instant},
};

use comms_if::plan::PlanResponse;
use log::warn;

use crate::env::Obstacle;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct EventQueue {
    sender: Sender<Event>,
    receiver: Receiver<Event>,

    tick_period: Duration,
    next_tick: Instant,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug)]
pub enum Event {
    /// Periodic control tick
    Tick,

    /// The system is ready to start planning
    Ready,

    /// The solver has answered a replan request
    PlanResponse(PlanResponse),

    /// The environment now contains the given obstacles
    EnvironmentChanged(Vec<Obstacle>),

    /// Stop processing events
    Stop,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl EventQueue {
    /// Create a queue which generates a tick every `tick_period`, the first one after one period.
    pub fn new(tick_period: Duration) -> Self {
        let (sender, receiver) = channel();

        Self {
            sender,
            receiver,
            tick_period,
            next_tick: Instant::now() + tick_period,
        }
    }

    /// A sender which can be given to other threads to post events.
    pub fn sender(&self) -> Sender<Event> {
        self.sender.clone()
    }

    /// Block until the next event.
    ///
    /// A due tick is returned before any posted event. If ticks are missed because processing
    /// took too long they are dropped rather than delivered in a burst.
    pub fn next(&mut self) -> Event {
        loop {
            let now = Instant::now();

            if now >= self.next_tick {
                self.next_tick += self.tick_period;

                if self.next_tick <= now {
                    let behind = now - self.next_tick;
                    warn!(
                        "Event loop overran, skipping {} tick(s)",
                        behind.as_nanos() / self.tick_period.as_nanos().max(1) + 1
                    );
                    self.next_tick = now + self.tick_period;
                }

                return Event::Tick;
            }

            match self.receiver.recv_timeout(self.next_tick - now) {
                Ok(e) => return e,
                Err(RecvTimeoutError::Timeout) => continue,
                // Cannot happen while we hold a sender, but stop cleanly if it ever does
                Err(RecvTimeoutError::Disconnected) => return Event::Stop,
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
    use comms_if::plan::PlanResult;

    #[test]
    fn test_posted_events_in_order() {
        let mut q = EventQueue::new(Duration::from_secs(60));
        let tx = q.sender();

        tx.send(Event::Ready).unwrap();
        tx.send(Event::PlanResponse(PlanResponse {
            request_id: 0,
            result: PlanResult::Infeasible("none".into()),
        }))
        .unwrap();
        tx.send(Event::Stop).unwrap();

        assert!(matches!(q.next(), Event::Ready));
        assert!(matches!(q.next(), Event::PlanResponse(_)));
        assert!(matches!(q.next(), Event::Stop));
    }

    #[test]
    fn test_ticks_generated() {
        let period = Duration::from_millis(10);
        let mut q = EventQueue::new(period);

        let start = Instant::now();
        assert!(matches!(q.next(), Event::Tick));
        assert!(matches!(q.next(), Event::Tick));
        assert!(start.elapsed() >= 2 * period);
    }
}
