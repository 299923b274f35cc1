//! # Dynamics models
//!
//! The planner can be run with any model implementing [`Dynamics`]. Which model is used is chosen
//! in the problem parameters through [`DynamicsKind`], which dispatches to the concrete model with
//! a `match` rather than through a trait object.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod double_integrator;
mod single_integrator;

pub use double_integrator::DoubleIntegrator3D;
pub use single_integrator::SingleIntegrator3D;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::{DMatrix, DVector, Vector3};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A continuous-time dynamical system with fixed state and control dimensions.
pub trait Dynamics {
    /// Dimension of the state vector
    fn x_dim(&self) -> usize;

    /// Dimension of the control vector
    fn u_dim(&self) -> usize;

    /// Indices of the x, y and z position components within the state.
    fn position_indices(&self) -> [usize; 3];

    /// Time derivative of the state.
    fn evaluate(&self, t: f64, x: &DVector<f64>, u: &DVector<f64>) -> DVector<f64>;

    /// Discrete-time Jacobian linearisation `(A, B)` about `(x, u)` for the given time step, such
    /// that `x[k+1] ≈ A x[k] + B u[k]`.
    fn linearize(
        &self,
        t: f64,
        time_step: f64,
        x: &DVector<f64>,
        u: &DVector<f64>,
    ) -> (DMatrix<f64>, DMatrix<f64>);

    /// Build the warm start `(x, u)` for a point moving through `position` at `velocity`.
    ///
    /// Models which carry velocity in their state put it there, models which are driven by
    /// velocity put it in the control.
    fn warm_start(
        &self,
        position: &Vector3<f64>,
        velocity: &Vector3<f64>,
    ) -> (DVector<f64>, DVector<f64>);

    /// Extract the position from a state.
    fn position(&self, x: &DVector<f64>) -> Vector3<f64> {
        let [px, py, pz] = self.position_indices();
        Vector3::new(x[px], x[py], x[pz])
    }
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The dynamics models available to the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DynamicsKind {
    #[serde(rename = "double_integrator_3d")]
    DoubleIntegrator3D,

    #[serde(rename = "single_integrator_3d")]
    SingleIntegrator3D,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Dynamics for DynamicsKind {
    fn x_dim(&self) -> usize {
        match self {
            DynamicsKind::DoubleIntegrator3D => DoubleIntegrator3D.x_dim(),
            DynamicsKind::SingleIntegrator3D => SingleIntegrator3D.x_dim(),
        }
    }

    fn u_dim(&self) -> usize {
        match self {
            DynamicsKind::DoubleIntegrator3D => DoubleIntegrator3D.u_dim(),
            DynamicsKind::SingleIntegrator3D => SingleIntegrator3D.u_dim(),
        }
    }

    fn position_indices(&self) -> [usize; 3] {
        match self {
            DynamicsKind::DoubleIntegrator3D => DoubleIntegrator3D.position_indices(),
            DynamicsKind::SingleIntegrator3D => SingleIntegrator3D.position_indices(),
        }
    }

    fn evaluate(&self, t: f64, x: &DVector<f64>, u: &DVector<f64>) -> DVector<f64> {
        match self {
            DynamicsKind::DoubleIntegrator3D => DoubleIntegrator3D.evaluate(t, x, u),
            DynamicsKind::SingleIntegrator3D => SingleIntegrator3D.evaluate(t, x, u),
        }
    }

    fn linearize(
        &self,
        t: f64,
        time_step: f64,
        x: &DVector<f64>,
        u: &DVector<f64>,
    ) -> (DMatrix<f64>, DMatrix<f64>) {
        match self {
            DynamicsKind::DoubleIntegrator3D => DoubleIntegrator3D.linearize(t, time_step, x, u),
            DynamicsKind::SingleIntegrator3D => SingleIntegrator3D.linearize(t, time_step, x, u),
        }
    }

    fn warm_start(
        &self,
        position: &Vector3<f64>,
        velocity: &Vector3<f64>,
    ) -> (DVector<f64>, DVector<f64>) {
        match self {
            DynamicsKind::DoubleIntegrator3D => DoubleIntegrator3D.warm_start(position, velocity),
            DynamicsKind::SingleIntegrator3D => SingleIntegrator3D.warm_start(position, velocity),
        }
    }
}

impl Default for DynamicsKind {
    fn default() -> Self {
        DynamicsKind::DoubleIntegrator3D
    }
}
