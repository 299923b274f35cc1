//! Trajectory wire format

use serde::{Deserialize, Serialize};

use super::StateMsg;

/// A trajectory as a set of parallel arrays.
///
/// `states`, `controls` and `times_s` are expected to have the same length, receivers must cope
/// with messages where they don't.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TrajectoryMsg {
    pub states: Vec<StateMsg>,
    pub controls: Vec<Vec<f64>>,
    pub times_s: Vec<f64>,
}

impl TrajectoryMsg {
    /// Number of complete samples in the message.
    pub fn num_complete(&self) -> usize {
        self.states
            .len()
            .min(self.controls.len())
            .min(self.times_s.len())
    }

    /// Returns true if the arrays all have the same length.
    pub fn is_consistent(&self) -> bool {
        self.states.len() == self.times_s.len() && self.controls.len() == self.times_s.len()
    }
}
