//! Solver worker parameters

use serde::Deserialize;

/// Parameters for the solver worker, loaded from `solver.toml`.
#[derive(Debug, Deserialize, Clone)]
pub struct SolverParams {
    /// If true every trajectory produced by the solver is checked against the environment, inflated
    /// by the safety margin, and reported as infeasible if any sample is invalid.
    pub check_env: bool,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self { check_env: true }
    }
}
