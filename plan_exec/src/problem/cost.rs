//! Cost terms
//!
//! Every cost can be evaluated at a point and quadraticised about it. Quadraticisation accumulates
//! into a gradient and Hessian supplied by the caller so that the contributions of several terms
//! can be summed without intermediate allocations.
//!
//! All times passed to the costs are relative to the start of the problem.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::{DMatrix, DVector, Matrix3, Vector3};
use serde::Serialize;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Below this distance from an obstacle centre the direction of the obstacle cost gradient is
/// undefined.
const MIN_OBSTACLE_DIST_M: f64 = 1e-9;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// `0.5 · weight · (input[i] − nominal)²`, summed over one dimension or over all of them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuadraticCost {
    pub weight: f64,

    /// Dimension the cost applies to, `None` for all of them
    pub dimension: Option<usize>,

    pub nominal: f64,
}

/// A cost which is only active at or after a given time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalTimeCost {
    pub inner: QuadraticCost,

    /// Relative time from which the cost is active
    pub threshold_time_s: f64,
}

/// Penalises getting closer to an obstacle centre than `threshold_m`.
///
/// The cost is `0.5 · weight · (threshold − d)²` for a distance `d` below the threshold, and zero
/// otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObstacleCost3D {
    pub weight: f64,
    pub position_idxs: [usize; 3],
    pub centre_m: Vector3<f64>,
    threshold_m: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A term in a problem's cost, tagged with whether it acts on the state or the control.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CostTerm {
    /// Penalty on control effort
    ControlEffort(QuadraticCost),

    /// Attraction to the goal near the end of the horizon
    Goal(FinalTimeCost),

    /// Repulsion from an obstacle
    Obstacle(ObstacleCost3D),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl QuadraticCost {
    pub fn new(weight: f64, dimension: Option<usize>, nominal: f64) -> Self {
        Self {
            weight,
            dimension,
            nominal,
        }
    }

    pub fn evaluate(&self, input: &DVector<f64>) -> f64 {
        match self.dimension {
            Some(i) => 0.5 * self.weight * (input[i] - self.nominal).powi(2),
            None => {
                0.5 * self.weight
                    * input
                        .iter()
                        .map(|v| (v - self.nominal).powi(2))
                        .sum::<f64>()
            }
        }
    }

    pub fn quadraticize(&self, input: &DVector<f64>, hess: &mut DMatrix<f64>, grad: &mut DVector<f64>) {
        let mut add = |i: usize| {
            grad[i] += self.weight * (input[i] - self.nominal);
            hess[(i, i)] += self.weight;
        };

        match self.dimension {
            Some(i) => add(i),
            None => (0..input.len()).for_each(add),
        }
    }
}

impl FinalTimeCost {
    pub fn new(inner: QuadraticCost, threshold_time_s: f64) -> Self {
        Self {
            inner,
            threshold_time_s,
        }
    }

    pub fn is_active(&self, t_rel_s: f64) -> bool {
        t_rel_s >= self.threshold_time_s
    }

    pub fn evaluate(&self, t_rel_s: f64, input: &DVector<f64>) -> f64 {
        if self.is_active(t_rel_s) {
            self.inner.evaluate(input)
        } else {
            0.0
        }
    }

    pub fn quadraticize(
        &self,
        t_rel_s: f64,
        input: &DVector<f64>,
        hess: &mut DMatrix<f64>,
        grad: &mut DVector<f64>,
    ) {
        if self.is_active(t_rel_s) {
            self.inner.quadraticize(input, hess, grad);
        }
    }
}

impl ObstacleCost3D {
    pub fn new(weight: f64, position_idxs: [usize; 3], centre_m: Vector3<f64>, threshold_m: f64) -> Self {
        Self {
            weight,
            position_idxs,
            centre_m,
            threshold_m,
        }
    }

    pub fn threshold_m(&self) -> f64 {
        self.threshold_m
    }

    pub fn evaluate(&self, x: &DVector<f64>) -> f64 {
        let gap = self.threshold_m - self.offset(x).norm();

        if gap > 0.0 {
            0.5 * self.weight * gap * gap
        } else {
            0.0
        }
    }

    pub fn quadraticize(&self, x: &DVector<f64>, hess: &mut DMatrix<f64>, grad: &mut DVector<f64>) {
        let offset = self.offset(x);
        let dist = offset.norm();
        let gap = self.threshold_m - dist;

        if gap <= 0.0 || dist < MIN_OBSTACLE_DIST_M {
            return;
        }

        let n = offset / dist;
        let nnt = n * n.transpose();

        let g = -self.weight * gap * n;
        let h = self.weight * (nnt - (Matrix3::identity() - nnt) * (gap / dist));

        for (r, &ri) in self.position_idxs.iter().enumerate() {
            grad[ri] += g[r];
            for (c, &ci) in self.position_idxs.iter().enumerate() {
                hess[(ri, ci)] += h[(r, c)];
            }
        }
    }

    fn offset(&self, x: &DVector<f64>) -> Vector3<f64> {
        let [px, py, pz] = self.position_idxs;
        Vector3::new(x[px], x[py], x[pz]) - self.centre_m
    }
}

impl CostTerm {
    /// Cost at relative time `t_rel_s` for state `x` and control `u`.
    pub fn evaluate(&self, t_rel_s: f64, x: &DVector<f64>, u: &DVector<f64>) -> f64 {
        match self {
            CostTerm::ControlEffort(c) => c.evaluate(u),
            CostTerm::Goal(c) => c.evaluate(t_rel_s, x),
            CostTerm::Obstacle(c) => c.evaluate(x),
        }
    }

    /// Accumulate this term's gradient and Hessian with respect to either the state or the
    /// control into the matching outputs.
    #[allow(clippy::too_many_arguments)]
    pub fn quadraticize(
        &self,
        t_rel_s: f64,
        x: &DVector<f64>,
        u: &DVector<f64>,
        hess_x: &mut DMatrix<f64>,
        grad_x: &mut DVector<f64>,
        hess_u: &mut DMatrix<f64>,
        grad_u: &mut DVector<f64>,
    ) {
        match self {
            CostTerm::ControlEffort(c) => c.quadraticize(u, hess_u, grad_u),
            CostTerm::Goal(c) => c.quadraticize(t_rel_s, x, hess_x, grad_x),
            CostTerm::Obstacle(c) => c.quadraticize(x, hess_x, grad_x),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn obstacle() -> ObstacleCost3D {
        ObstacleCost3D::new(2.0, [0, 1, 2], Vector3::new(1.0, 0.0, 0.0), 1.0)
    }

    #[test]
    fn test_quadratic() {
        let x = DVector::from_vec(vec![1.0, 2.0, 3.0]);

        assert_eq!(QuadraticCost::new(2.0, None, 0.0).evaluate(&x), 14.0);
        assert_eq!(QuadraticCost::new(2.0, Some(1), 1.0).evaluate(&x), 1.0);

        let mut hess = DMatrix::zeros(3, 3);
        let mut grad = DVector::zeros(3);
        QuadraticCost::new(2.0, Some(2), 1.0).quadraticize(&x, &mut hess, &mut grad);
        assert_eq!(grad, DVector::from_vec(vec![0.0, 0.0, 4.0]));
        assert_eq!(hess[(2, 2)], 2.0);
        assert_eq!(hess.sum(), 2.0);
    }

    #[test]
    fn test_final_time() {
        let c = FinalTimeCost::new(QuadraticCost::new(1.0, Some(0), 10.0), 4.5);
        let x = DVector::from_vec(vec![8.0, 0.0]);

        assert_eq!(c.evaluate(4.0, &x), 0.0);
        assert_eq!(c.evaluate(4.5, &x), 2.0);
        assert_eq!(c.evaluate(5.0, &x), 2.0);
    }

    #[test]
    fn test_obstacle_evaluate() {
        let c = obstacle();

        // Outside the threshold
        assert_eq!(c.evaluate(&DVector::from_vec(vec![3.0, 0.0, 0.0, 9.0])), 0.0);
        assert_eq!(c.evaluate(&DVector::from_vec(vec![2.0, 0.0, 0.0, 9.0])), 0.0);

        // Half way in: 0.5 * 2 * 0.5^2
        let v = c.evaluate(&DVector::from_vec(vec![1.5, 0.0, 0.0, 9.0]));
        assert!((v - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_obstacle_quadraticize_matches_finite_difference() {
        let c = obstacle();
        let x = DVector::from_vec(vec![1.3, 0.2, -0.1]);
        let eps = 1e-6;

        let mut hess = DMatrix::zeros(3, 3);
        let mut grad = DVector::zeros(3);
        c.quadraticize(&x, &mut hess, &mut grad);

        for i in 0..3 {
            let mut xp = x.clone();
            let mut xm = x.clone();
            xp[i] += eps;
            xm[i] -= eps;

            let fd_grad = (c.evaluate(&xp) - c.evaluate(&xm)) / (2.0 * eps);
            assert!((fd_grad - grad[i]).abs() < 1e-6, "grad[{}]", i);

            let mut gp = DVector::zeros(3);
            let mut gm = DVector::zeros(3);
            c.quadraticize(&xp, &mut DMatrix::zeros(3, 3), &mut gp);
            c.quadraticize(&xm, &mut DMatrix::zeros(3, 3), &mut gm);
            for j in 0..3 {
                let fd_hess = (gp[j] - gm[j]) / (2.0 * eps);
                assert!((fd_hess - hess[(j, i)]).abs() < 1e-5, "hess[{}, {}]", j, i);
            }
        }
    }

    #[test]
    fn test_term_routing() {
        let x = DVector::from_vec(vec![1.5, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let u = DVector::from_vec(vec![1.0, 1.0, 1.0]);

        let effort = CostTerm::ControlEffort(QuadraticCost::new(1.0, None, 0.0));
        assert_eq!(effort.evaluate(0.0, &x, &u), 1.5);

        let mut hx = DMatrix::zeros(6, 6);
        let mut gx = DVector::zeros(6);
        let mut hu = DMatrix::zeros(3, 3);
        let mut gu = DVector::zeros(3);
        CostTerm::Obstacle(obstacle()).quadraticize(0.0, &x, &u, &mut hx, &mut gx, &mut hu, &mut gu);

        assert!(gx[0] < 0.0);
        assert_eq!(gu, DVector::zeros(3));
    }
}
