//! Point mass with direct acceleration control.
//!
//! State is `[px, py, pz, vx, vy, vz]`, control is `[ax, ay, az]`, and the dynamics are:
//!
//! ```text
//! d/dt p = v
//! d/dt v = a
//! ```

use nalgebra::{DMatrix, DVector, Vector3};

use super::Dynamics;

pub const PX_IDX: usize = 0;
pub const PY_IDX: usize = 1;
pub const PZ_IDX: usize = 2;
pub const VX_IDX: usize = 3;
pub const VY_IDX: usize = 4;
pub const VZ_IDX: usize = 5;

pub const AX_IDX: usize = 0;
pub const AY_IDX: usize = 1;
pub const AZ_IDX: usize = 2;

const X_DIM: usize = 6;
const U_DIM: usize = 3;

#[derive(Debug, Clone, Copy, Default)]
pub struct DoubleIntegrator3D;

impl Dynamics for DoubleIntegrator3D {
    fn x_dim(&self) -> usize {
        X_DIM
    }

    fn u_dim(&self) -> usize {
        U_DIM
    }

    fn position_indices(&self) -> [usize; 3] {
        [PX_IDX, PY_IDX, PZ_IDX]
    }

    fn evaluate(&self, _t: f64, x: &DVector<f64>, u: &DVector<f64>) -> DVector<f64> {
        let mut xdot = DVector::zeros(X_DIM);
        xdot[PX_IDX] = x[VX_IDX];
        xdot[PY_IDX] = x[VY_IDX];
        xdot[PZ_IDX] = x[VZ_IDX];
        xdot[VX_IDX] = u[AX_IDX];
        xdot[VY_IDX] = u[AY_IDX];
        xdot[VZ_IDX] = u[AZ_IDX];

        xdot
    }

    fn linearize(
        &self,
        _t: f64,
        time_step: f64,
        _x: &DVector<f64>,
        _u: &DVector<f64>,
    ) -> (DMatrix<f64>, DMatrix<f64>) {
        let mut a = DMatrix::identity(X_DIM, X_DIM);
        a[(PX_IDX, VX_IDX)] += time_step;
        a[(PY_IDX, VY_IDX)] += time_step;
        a[(PZ_IDX, VZ_IDX)] += time_step;

        let mut b = DMatrix::zeros(X_DIM, U_DIM);
        b[(VX_IDX, AX_IDX)] = time_step;
        b[(VY_IDX, AY_IDX)] = time_step;
        b[(VZ_IDX, AZ_IDX)] = time_step;

        (a, b)
    }

    fn warm_start(
        &self,
        position: &Vector3<f64>,
        velocity: &Vector3<f64>,
    ) -> (DVector<f64>, DVector<f64>) {
        let x = DVector::from_vec(vec![
            position.x, position.y, position.z, velocity.x, velocity.y, velocity.z,
        ]);

        (x, DVector::zeros(U_DIM))
    }
}
