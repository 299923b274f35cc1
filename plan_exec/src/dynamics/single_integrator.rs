//! Point with direct velocity control.
//!
//! State is `[px, py, pz]`, control is `[vx, vy, vz]`, and the dynamics are `d/dt p = v`.

use nalgebra::{DMatrix, DVector, Vector3};

use super::Dynamics;

pub const PX_IDX: usize = 0;
pub const PY_IDX: usize = 1;
pub const PZ_IDX: usize = 2;

pub const VX_IDX: usize = 0;
pub const VY_IDX: usize = 1;
pub const VZ_IDX: usize = 2;

const X_DIM: usize = 3;
const U_DIM: usize = 3;

#[derive(Debug, Clone, Copy, Default)]
pub struct SingleIntegrator3D;

impl Dynamics for SingleIntegrator3D {
    fn x_dim(&self) -> usize {
        X_DIM
    }

    fn u_dim(&self) -> usize {
        U_DIM
    }

    fn position_indices(&self) -> [usize; 3] {
        [PX_IDX, PY_IDX, PZ_IDX]
    }

    fn evaluate(&self, _t: f64, _x: &DVector<f64>, u: &DVector<f64>) -> DVector<f64> {
        let mut xdot = DVector::zeros(X_DIM);
        xdot[PX_IDX] = u[VX_IDX];
        xdot[PY_IDX] = u[VY_IDX];
        xdot[PZ_IDX] = u[VZ_IDX];

        xdot
    }

    fn linearize(
        &self,
        _t: f64,
        time_step: f64,
        _x: &DVector<f64>,
        _u: &DVector<f64>,
    ) -> (DMatrix<f64>, DMatrix<f64>) {
        let a = DMatrix::identity(X_DIM, X_DIM);

        let mut b = DMatrix::zeros(X_DIM, U_DIM);
        b[(PX_IDX, VX_IDX)] = time_step;
        b[(PY_IDX, VY_IDX)] = time_step;
        b[(PZ_IDX, VZ_IDX)] = time_step;

        (a, b)
    }

    fn warm_start(
        &self,
        position: &Vector3<f64>,
        velocity: &Vector3<f64>,
    ) -> (DVector<f64>, DVector<f64>) {
        (
            DVector::from_vec(vec![position.x, position.y, position.z]),
            DVector::from_vec(vec![velocity.x, velocity.y, velocity.z]),
        )
    }
}
